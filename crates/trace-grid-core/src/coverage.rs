//! Bucket coverage of a stream relative to the time grid.
//!
//! Buckets are identified by their row offset on the grid (`0..len`), stored
//! in a `roaring::RoaringBitmap`. A stream's coverage is the set of offsets
//! where it produced an aggregate row; everything else on the grid is a gap
//! that the fill stage will paper over.
//!
//! ```
//! use roaring::RoaringBitmap;
//! use trace_grid_core::coverage::Coverage;
//!
//! let expected: RoaringBitmap = (0u32..10).collect();
//! let cov: Coverage = (0u32..10).filter(|b| *b != 5).collect();
//!
//! assert!(cov.missing_points(&expected).contains(5));
//! assert!((cov.coverage_ratio(&expected) - 0.9).abs() < 1e-9);
//! ```

use std::ops::RangeInclusive;

use roaring::RoaringBitmap;

use crate::grid::TimeGrid;

/// Row offset of a bucket on the grid.
pub type Bucket = u32;

/// Set of grid buckets a stream populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    bitmap: RoaringBitmap,
}

impl Coverage {
    /// No bucket present.
    pub fn empty() -> Self {
        Self {
            bitmap: RoaringBitmap::new(),
        }
    }

    /// Coverage of the given bucket ticks on `grid`; off-grid ticks are ignored.
    pub fn from_ticks<'a, I>(grid: &TimeGrid, ticks: I) -> Self
    where
        I: IntoIterator<Item = &'a i64>,
    {
        ticks
            .into_iter()
            .filter_map(|&t| grid.index_of(t))
            .map(|i| i as Bucket)
            .collect()
    }

    /// Number of buckets present.
    pub fn cardinality(&self) -> u64 {
        self.bitmap.len()
    }

    /// Buckets expected but not present (`expected - present`).
    pub fn missing_points(&self, expected: &RoaringBitmap) -> RoaringBitmap {
        let mut missing = expected.clone();
        missing -= &self.bitmap;
        missing
    }

    /// Missing buckets grouped into contiguous inclusive runs, in grid order.
    pub fn missing_runs(&self, expected: &RoaringBitmap) -> Vec<RangeInclusive<u64>> {
        runs_from_bitmap(&self.missing_points(expected))
    }

    /// `|present ∩ expected| / |expected|`; `1.0` for an empty domain.
    pub fn coverage_ratio(&self, expected: &RoaringBitmap) -> f64 {
        let expected_count = expected.len();
        if expected_count == 0 {
            return 1.0;
        }
        let covered = &self.bitmap & expected;
        covered.len() as f64 / expected_count as f64
    }
}

/// Length of the longest run in `runs`, `0` when there are none.
pub fn longest_run(runs: &[RangeInclusive<u64>]) -> u64 {
    runs.iter()
        .map(|r| r.end() - r.start() + 1)
        .max()
        .unwrap_or(0)
}

impl FromIterator<Bucket> for Coverage {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Bucket>,
    {
        Self {
            bitmap: iter.into_iter().collect(),
        }
    }
}

fn runs_from_bitmap(bitmap: &RoaringBitmap) -> Vec<RangeInclusive<u64>> {
    let mut out = Vec::new();
    let mut iter = bitmap.iter();

    let Some(mut start) = iter.next() else {
        return out;
    };
    let mut prev = start;

    for v in iter {
        if v == prev + 1 {
            prev = v;
        } else {
            out.push(start as u64..=prev as u64);
            start = v;
            prev = v;
        }
    }

    out.push(start as u64..=prev as u64);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::Resolution;

    fn bm_from_range(start: u32, end_exclusive: u32) -> RoaringBitmap {
        (start..end_exclusive).collect()
    }

    fn pairs(runs: &[RangeInclusive<u64>]) -> Vec<(u64, u64)> {
        runs.iter().map(|r| (*r.start(), *r.end())).collect()
    }

    #[test]
    fn full_coverage() {
        let expected = bm_from_range(0, 10);
        let cov: Coverage = (0u32..10).collect();

        assert!(cov.missing_points(&expected).is_empty());
        assert!(cov.missing_runs(&expected).is_empty());
        assert_eq!(cov.coverage_ratio(&expected), 1.0);
        assert_eq!(longest_run(&cov.missing_runs(&expected)), 0);
    }

    #[test]
    fn gaps_group_into_runs() {
        let expected = bm_from_range(0, 20);
        let cov: Coverage = (0u32..20)
            .filter(|b| ![3, 4, 10, 11, 12, 18].contains(b))
            .collect();

        let runs = cov.missing_runs(&expected);
        assert_eq!(pairs(&runs), vec![(3, 4), (10, 12), (18, 18)]);
        assert_eq!(longest_run(&runs), 3);
        assert!((cov.coverage_ratio(&expected) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn runs_touching_grid_edges() {
        let expected = bm_from_range(0, 8);
        let cov: Coverage = [2u32, 3, 5].into_iter().collect();
        assert_eq!(
            pairs(&cov.missing_runs(&expected)),
            vec![(0, 1), (4, 4), (6, 7)]
        );
    }

    #[test]
    fn empty_present_and_empty_domain() {
        let expected = bm_from_range(0, 5);
        let cov = Coverage::empty();
        assert_eq!(cov.coverage_ratio(&expected), 0.0);
        assert_eq!(pairs(&cov.missing_runs(&expected)), vec![(0, 4)]);
        assert_eq!(longest_run(&cov.missing_runs(&expected)), 5);

        let cov: Coverage = (0u32..3).collect();
        assert_eq!(cov.coverage_ratio(&RoaringBitmap::new()), 1.0);
        assert!(cov.missing_runs(&RoaringBitmap::new()).is_empty());
        assert_eq!(longest_run(&[]), 0);
    }

    #[test]
    fn from_ticks_maps_onto_grid_offsets() {
        let grid = TimeGrid::from_tick_range(Resolution::default(), 100, 109).unwrap();
        let cov = Coverage::from_ticks(&grid, &[100, 103, 109, 250]);
        assert_eq!(cov.cardinality(), 3);
        assert!(!cov.missing_points(&grid.expected_buckets()).contains(3));
        assert_eq!(
            pairs(&cov.missing_runs(&grid.expected_buckets())),
            vec![(1, 2), (4, 8)]
        );
        assert_eq!(longest_run(&cov.missing_runs(&grid.expected_buckets())), 5);
    }
}
