//! Writing the finished dataset and its report.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use arrow::{array::RecordBatch, error::ArrowError};
use arrow_csv::WriterBuilder;
use snafu::prelude::*;

use crate::report::DatasetReport;

/// Errors writing output files.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum OutputError {
    /// CSV encoding failed.
    #[snafu(display("Failed to encode CSV: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The output file could not be created.
    #[snafu(display("Cannot create output file {path}: {source}"))]
    Create {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Flushing the output failed.
    #[snafu(display("Failed to write output: {source}"))]
    Write {
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Report serialization failed.
    #[snafu(display("Failed to write report JSON: {source}"))]
    Json {
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Write `batch` as CSV with a header row.
pub fn write_csv<W: Write>(batch: &RecordBatch, out: W) -> Result<(), OutputError> {
    let mut writer = WriterBuilder::new().with_header(true).build(out);
    writer.write(batch).context(ArrowSnafu)?;
    let mut out = writer.into_inner();
    out.flush().context(WriteSnafu)?;
    Ok(())
}

/// Create `path` and write `batch` into it as CSV.
pub fn write_csv_file(path: impl AsRef<Path>, batch: &RecordBatch) -> Result<(), OutputError> {
    let path = path.as_ref();
    let file = File::create(path).context(CreateSnafu {
        path: path.display().to_string(),
    })?;
    write_csv(batch, BufWriter::new(file))
}

/// Write `report` as pretty JSON to `path`.
pub fn write_report_json(path: impl AsRef<Path>, report: &DatasetReport) -> Result<(), OutputError> {
    let path = path.as_ref();
    let file = File::create(path).context(CreateSnafu {
        path: path.display().to_string(),
    })?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, report).context(JsonSnafu)?;
    out.flush().context(WriteSnafu)?;
    Ok(())
}
