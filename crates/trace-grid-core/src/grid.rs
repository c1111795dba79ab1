//! Construction of the common time grid.
//!
//! The grid is defined purely in tick space:
//!
//! - Every timestamp of every available stream is quantized with
//!   [`Resolution::tick`].
//! - `start`/`end` are the smallest and largest observed ticks across all
//!   streams combined.
//! - The grid holds every tick in `start..=end`, so its length is
//!   `end - start + 1 == round((t_max - t_min) / r) + 1`.
//!
//! Bucket times are derived from an integer counter (`start + k`), never by
//! repeatedly adding `r`, so there is no accumulated drift.

use log::debug;
use roaring::RoaringBitmap;
use snafu::prelude::*;

use crate::{
    coverage::Bucket,
    error::{GridTooLargeSnafu, NoTimeDataSnafu, PipelineError},
    resolution::Resolution,
};

/// Upper bound on grid length; bucket offsets must fit in a [`Bucket`].
pub const MAX_GRID_BUCKETS: u64 = Bucket::MAX as u64;

/// A regular, gapless, strictly ascending sequence of bucket ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    resolution: Resolution,
    start_tick: i64,
    len: usize,
}

impl TimeGrid {
    /// Grid spanning `start_tick..=end_tick`.
    pub fn from_tick_range(
        resolution: Resolution,
        start_tick: i64,
        end_tick: i64,
    ) -> Result<Self, PipelineError> {
        debug_assert!(start_tick <= end_tick);
        let span = (end_tick as i128) - (start_tick as i128) + 1;
        if span > MAX_GRID_BUCKETS as i128 {
            return GridTooLargeSnafu {
                buckets: span as u128,
                resolution,
                max: MAX_GRID_BUCKETS,
            }
            .fail();
        }
        Ok(Self {
            resolution,
            start_tick,
            len: span as usize,
        })
    }

    /// Grid resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Number of buckets. Never zero.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; a grid is only built when at least one tick exists.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tick of the first bucket.
    pub fn start_tick(&self) -> i64 {
        self.start_tick
    }

    /// Tick of the last bucket.
    pub fn end_tick(&self) -> i64 {
        self.start_tick + self.len as i64 - 1
    }

    /// First bucket time (`t_min`).
    pub fn t_min(&self) -> f64 {
        self.resolution.tick_time(self.start_tick)
    }

    /// Last bucket time (`t_max`).
    pub fn t_max(&self) -> f64 {
        self.resolution.tick_time(self.end_tick())
    }

    /// Bucket time at row `index`.
    pub fn time_at(&self, index: usize) -> f64 {
        self.resolution.tick_time(self.start_tick + index as i64)
    }

    /// Row index of `tick`, if it lies on the grid.
    pub fn index_of(&self, tick: i64) -> Option<usize> {
        let offset = tick.checked_sub(self.start_tick)?;
        usize::try_from(offset).ok().filter(|&i| i < self.len)
    }

    /// All bucket ticks in ascending order.
    pub fn ticks(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len as i64).map(move |k| self.start_tick + k)
    }

    /// All bucket times in ascending order.
    pub fn times(&self) -> Vec<f64> {
        self.ticks().map(|t| self.resolution.tick_time(t)).collect()
    }

    /// Every row offset `0..len` as a bitmap, the domain used for coverage.
    pub fn expected_buckets(&self) -> RoaringBitmap {
        RoaringBitmap::from_iter(0..self.len as Bucket)
    }
}

/// Accumulates quantized timestamps from every stream, then produces the grid.
#[derive(Debug, Clone)]
pub struct TimeGridBuilder {
    resolution: Resolution,
    bounds: Option<(i64, i64)>,
    observed: u64,
}

impl TimeGridBuilder {
    /// Start an empty builder.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            bounds: None,
            observed: 0,
        }
    }

    /// Quantize and record `timestamps`; returns how many were usable.
    pub fn observe<I>(&mut self, timestamps: I) -> usize
    where
        I: IntoIterator<Item = f64>,
    {
        let resolution = self.resolution;
        let mut used = 0;
        for tick in timestamps.into_iter().filter_map(|t| resolution.tick(t)) {
            self.bounds = Some(match self.bounds {
                Some((lo, hi)) => (lo.min(tick), hi.max(tick)),
                None => (tick, tick),
            });
            used += 1;
        }
        self.observed += used as u64;
        used
    }

    /// Build the grid, failing with `NoTimeData` when nothing was observed.
    pub fn build(self) -> Result<TimeGrid, PipelineError> {
        let (lo, hi) = self.bounds.context(NoTimeDataSnafu)?;
        let grid = TimeGrid::from_tick_range(self.resolution, lo, hi)?;
        debug!(
            "time grid: {} buckets from {:.6}s to {:.6}s ({} timestamps)",
            grid.len(),
            grid.t_min(),
            grid.t_max(),
            self.observed
        );
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms() -> Resolution {
        Resolution::default()
    }

    #[test]
    fn grid_spans_min_to_max_of_all_streams() {
        let mut b = TimeGridBuilder::new(ms());
        assert_eq!(b.observe([0.0, 0.0011]), 2);
        assert_eq!(b.observe([0.0024]), 1);
        let grid = b.build().unwrap();

        assert_eq!(grid.len(), 3);
        assert_eq!(grid.times(), vec![0.0, 0.001, 0.002]);
        assert_eq!(grid.t_min(), 0.0);
        assert_eq!(grid.t_max(), 0.002);
    }

    #[test]
    fn empty_builder_is_no_time_data() {
        let mut b = TimeGridBuilder::new(ms());
        b.observe(std::iter::empty());
        b.observe([f64::NAN]);
        assert!(matches!(b.build(), Err(PipelineError::NoTimeData)));
    }

    #[test]
    fn length_matches_rounded_span_for_many_resolutions() {
        for (r, times) in [
            (0.001, vec![0.1234, 7.5, 3.3]),
            (0.01, vec![-1.0, 2.005, 0.5]),
            (0.25, vec![10.0, 10.1]),
            (0.0005, vec![1.0, 1.0]),
        ] {
            let res = Resolution::from_secs(r).unwrap();
            let mut b = TimeGridBuilder::new(res);
            b.observe(times.iter().copied());
            let grid = b.build().unwrap();

            let qs: Vec<f64> = times.iter().map(|&t| res.quantize(t).unwrap()).collect();
            let t_min = qs.iter().copied().fold(f64::INFINITY, f64::min);
            let t_max = qs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let expected = ((t_max - t_min) / r).round() as usize + 1;
            assert_eq!(grid.len(), expected, "resolution {r}");

            let ts = grid.times();
            assert_eq!(ts.first().copied(), Some(t_min));
            assert_eq!(ts.last().copied(), Some(t_max));
            assert!(ts.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn index_of_rejects_off_grid_ticks() {
        let grid = TimeGrid::from_tick_range(ms(), 10, 12).unwrap();
        assert_eq!(grid.index_of(10), Some(0));
        assert_eq!(grid.index_of(12), Some(2));
        assert_eq!(grid.index_of(9), None);
        assert_eq!(grid.index_of(13), None);
        assert_eq!(grid.index_of(i64::MIN), None);
        assert_eq!(grid.expected_buckets().len(), 3);
    }

    #[test]
    fn long_grids_do_not_drift() {
        let grid = TimeGrid::from_tick_range(ms(), 0, 1_000_000).unwrap();
        assert_eq!(grid.time_at(1_000_000), 1000.0);
        assert_eq!(grid.time_at(123_457), 123.457);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let err = TimeGrid::from_tick_range(ms(), 0, MAX_GRID_BUCKETS as i64 + 5).unwrap_err();
        assert!(matches!(err, PipelineError::GridTooLarge { .. }));
    }
}
