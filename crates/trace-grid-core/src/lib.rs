//! Core engine that aligns independently time-stamped simulation trace logs
//! onto one uniformly sampled time grid.
//!
//! The pipeline is a chain of immutable stages:
//!
//! - Loading raw per-stream tables through a [`loader::StreamLoader`]
//!   (`loader` module).
//! - Building a gapless [`grid::TimeGrid`] from the quantized timestamps of
//!   every available stream (`grid` module).
//! - Reducing each stream's records into one row per occupied bucket
//!   (`aggregate` module).
//! - Left-joining every stream's aggregate onto the grid (`merge` module),
//!   applying the fill policy (`fill` module) and deriving throughput, delay
//!   and jitter (`derive` module).
//!
//! [`pipeline::Pipeline`] threads these stages together and returns a
//! [`pipeline::Dataset`] plus a [`report::DatasetReport`] describing which
//! streams contributed and which columns degraded to gaps.
//!
//! Output columns are namespaced by stream prefix (`dl_sinr_rnti`,
//! `dl_mac_tb_size_total`); [`catalog::COLUMN_NAMING_NOTE`] spells out the
//! renamed identifiers.
#![deny(missing_docs)]
pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod coverage;
pub mod derive;
pub mod error;
pub mod fill;
pub mod grid;
pub mod loader;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod resolution;
pub mod stream;
pub mod table;

pub use catalog::{COLUMN_NAMING_NOTE, CatalogError, StreamCatalog, StreamSpec};
pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, StreamIssue};
pub use pipeline::{Dataset, Pipeline};
pub use resolution::{ParseResolutionError, Resolution};
