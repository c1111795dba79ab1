//! Error types and SNAFU context selectors for the pipeline.
//!
//! Two families live here:
//!
//! - [`PipelineError`]: fatal errors. Any of these aborts dataset
//!   construction and no table is produced.
//! - [`StreamIssue`]: contained, per-stream or per-field problems. They are
//!   logged and recorded in the run report; the affected columns degrade to
//!   gaps and the run continues.

use arrow::error::ArrowError;
use serde::Serialize;
use snafu::prelude::*;

use crate::{catalog::CatalogError, resolution::Resolution};

/// Fatal errors from dataset construction.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    /// No available stream contributed a single usable timestamp, so there is
    /// no range to build a grid over.
    #[snafu(display("No stream contributed any timestamp; cannot build a time grid"))]
    NoTimeData,

    /// The observed time range needs more buckets than the grid can index.
    #[snafu(display(
        "Time grid would need {buckets} buckets at resolution {resolution} (max {max}); use a coarser resolution"
    ))]
    GridTooLarge {
        /// Number of buckets the observed range requires.
        buckets: u128,
        /// Resolution the grid was requested at.
        resolution: Resolution,
        /// Largest supported number of buckets.
        max: u64,
    },

    /// The stream catalog failed validation.
    #[snafu(display("Invalid stream catalog: {source}"))]
    Catalog {
        /// Underlying catalog validation error.
        source: CatalogError,
    },

    /// Arrow error while materializing the final table.
    #[snafu(display("Arrow error while building the dataset batch: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

/// Non-fatal problems contained to one stream or one column.
#[derive(Debug, Clone, PartialEq, Eq, Snafu, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamIssue {
    /// The stream's log could not be loaded or parsed. All of its columns
    /// stay null through the merge.
    #[snafu(display("stream {stream} unavailable: {reason}"))]
    StreamUnavailable {
        /// Stream name.
        stream: String,
        /// Loader error message.
        reason: String,
    },

    /// The stream loaded but no time column could be identified. It is
    /// treated like an unavailable stream.
    #[snafu(display("stream {stream} has no time column (columns: {columns:?})"))]
    MissingTimeColumn {
        /// Stream name.
        stream: String,
        /// Columns the table did have.
        columns: Vec<String>,
    },

    /// A declared source field is absent from an otherwise available stream.
    /// Only the reducer reading it is skipped.
    #[snafu(display("stream {stream}: field {field} not found, column {column} left empty"))]
    AggregationColumnMissing {
        /// Stream name.
        stream: String,
        /// Missing source field.
        field: String,
        /// Output column that stays null.
        column: String,
    },
}
