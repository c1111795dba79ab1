//! Run report: what each stream contributed and how sparse each column is.

use serde::Serialize;

use crate::{error::StreamIssue, table::UnifiedTable};

/// Whether a stream took part in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamStatus {
    /// Loaded and aggregated.
    Loaded,
    /// The loader failed.
    Unavailable {
        /// Loader error message.
        reason: String,
    },
    /// Loaded, but no time column was found.
    NoTimeColumn,
}

impl StreamStatus {
    /// Short label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            StreamStatus::Loaded => "loaded",
            StreamStatus::Unavailable { .. } => "unavailable",
            StreamStatus::NoTimeColumn => "no time column",
        }
    }
}

/// Per-stream outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamReport {
    /// Stream name.
    pub stream: String,
    /// Load outcome.
    pub status: StreamStatus,
    /// Records with a usable timestamp.
    pub records: usize,
    /// Grid buckets holding at least one record.
    pub occupied_buckets: u64,
    /// `occupied_buckets / grid.len()`.
    pub coverage_ratio: f64,
    /// Longest run of consecutive empty buckets.
    pub max_gap: u64,
    /// Number of separate runs of empty buckets.
    pub gap_runs: usize,
    /// Contained problems raised for this stream.
    pub issues: Vec<StreamIssue>,
}

impl StreamReport {
    /// Report for a stream that contributed nothing.
    pub fn absent(stream: impl Into<String>, status: StreamStatus, grid_len: usize) -> Self {
        Self {
            stream: stream.into(),
            status,
            records: 0,
            occupied_buckets: 0,
            coverage_ratio: 0.0,
            max_gap: grid_len as u64,
            gap_runs: usize::from(grid_len > 0),
            issues: Vec::new(),
        }
    }
}

/// Non-zero cell count of one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReport {
    /// Column name.
    pub name: String,
    /// Cells that are present and non-zero.
    pub nonzero: usize,
}

/// Report for a whole run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DatasetReport {
    /// One entry per catalog stream, in catalog order.
    pub streams: Vec<StreamReport>,
    /// One entry per output column except `time`.
    pub columns: Vec<ColumnReport>,
}

impl DatasetReport {
    /// Every contained issue across all streams.
    pub fn issues(&self) -> impl Iterator<Item = &StreamIssue> {
        self.streams.iter().flat_map(|s| s.issues.iter())
    }

    /// Streams that were loaded.
    pub fn loaded_streams(&self) -> usize {
        self.streams
            .iter()
            .filter(|s| s.status == StreamStatus::Loaded)
            .count()
    }

    /// Report entry for `stream`.
    pub fn stream(&self, stream: &str) -> Option<&StreamReport> {
        self.streams.iter().find(|s| s.stream == stream)
    }
}

/// Incrementally assembled [`DatasetReport`].
#[derive(Debug, Default)]
pub struct DatasetReportBuilder {
    streams: Vec<StreamReport>,
}

impl DatasetReportBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one stream's outcome.
    pub fn push_stream(&mut self, report: StreamReport) {
        self.streams.push(report);
    }

    /// Attach per-column counts from the final table and finish.
    pub fn finish(self, table: &UnifiedTable) -> DatasetReport {
        let columns = table
            .columns()
            .iter()
            .map(|c| ColumnReport {
                name: c.name().to_string(),
                nonzero: c.nonzero_count(),
            })
            .collect();
        DatasetReport {
            streams: self.streams,
            columns,
        }
    }
}
