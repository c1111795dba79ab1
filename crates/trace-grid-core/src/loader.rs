//! Stream loaders.
//!
//! A loader turns a [`StreamSpec`] into a raw [`StreamTable`] or reports the
//! stream as unavailable. Unavailability is never fatal for the pipeline.
//!
//! [`TraceDirLoader`] reads whitespace or tab separated trace files from one
//! directory. Two header conventions exist:
//!
//! - Plain: `%` starts a comment (whole line or rest of line), and the first
//!   remaining non-blank line names the columns.
//! - Percent header: the first line that starts with `%` is the header. If
//!   it contains a tab the data is tab separated, otherwise any run of
//!   whitespace separates fields. Without such a line the file is read as
//!   plain.
//!
//! Cells that do not parse as finite numbers become nulls. Rows with fewer
//! fields than the header are padded with nulls; rows with more fields make
//! the whole file unreadable.

use std::{collections::BTreeMap, path::PathBuf};

use snafu::prelude::*;

use crate::{
    catalog::{HeaderStyle, StreamSpec},
    stream::StreamTable,
};

/// Errors raised while loading one stream.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    /// The trace file could not be read.
    #[snafu(display("Trace file not found or not readable: {path}"))]
    Read {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file has no header line.
    #[snafu(display("Trace file {path} has no header line"))]
    MissingHeader {
        /// Offending file.
        path: String,
    },

    /// A data row has more fields than the header.
    #[snafu(display("{path}:{line}: expected at most {expected} fields, found {found}"))]
    RowTooWide {
        /// Offending file.
        path: String,
        /// 1-based line number.
        line: usize,
        /// Header width.
        expected: usize,
        /// Fields found on the line.
        found: usize,
    },

    /// An in-memory loader has no table for the stream.
    #[snafu(display("No table registered for stream {stream}"))]
    NotRegistered {
        /// Stream name.
        stream: String,
    },
}

/// Source of raw stream tables.
pub trait StreamLoader {
    /// Load the table for `spec`. Errors mark the stream unavailable.
    fn load(&self, spec: &StreamSpec) -> Result<StreamTable, LoadError>;
}

/// Loads trace files from a directory by their declared file names.
#[derive(Debug, Clone)]
pub struct TraceDirLoader {
    dir: PathBuf,
}

impl TraceDirLoader {
    /// Loader reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StreamLoader for TraceDirLoader {
    fn load(&self, spec: &StreamSpec) -> Result<StreamTable, LoadError> {
        let path = self.dir.join(&spec.file_name);
        let display = path.display().to_string();
        let text = std::fs::read_to_string(&path).context(ReadSnafu { path: &display })?;
        parse_trace(&text, spec.header, &display)
    }
}

/// In-memory loader keyed by stream name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    tables: BTreeMap<String, StreamTable>,
}

impl MemoryLoader {
    /// Empty loader; every stream is unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `table` for stream `name`.
    pub fn insert(&mut self, name: impl Into<String>, table: StreamTable) {
        self.tables.insert(name.into(), table);
    }

    /// Builder-style [`MemoryLoader::insert`].
    pub fn with(mut self, name: impl Into<String>, table: StreamTable) -> Self {
        self.insert(name, table);
        self
    }
}

impl StreamLoader for MemoryLoader {
    fn load(&self, spec: &StreamSpec) -> Result<StreamTable, LoadError> {
        self.tables
            .get(&spec.name)
            .cloned()
            .context(NotRegisteredSnafu { stream: &spec.name })
    }
}

#[derive(Debug, Clone, Copy)]
enum Delimiter {
    Whitespace,
    Tab,
}

impl Delimiter {
    fn split(self, line: &str) -> Vec<&str> {
        match self {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Tab => line.trim().split('\t').map(str::trim).collect(),
        }
    }
}

/// Parse the contents of one trace file.
pub fn parse_trace(text: &str, header: HeaderStyle, path: &str) -> Result<StreamTable, LoadError> {
    let lines: Vec<&str> = text.lines().collect();

    if header == HeaderStyle::PercentHeader {
        if let Some(pos) = lines.iter().position(|l| l.starts_with('%')) {
            let header_line = lines[pos][1..].trim();
            let delimiter = if header_line.contains('\t') {
                Delimiter::Tab
            } else {
                Delimiter::Whitespace
            };
            let body = lines[pos + 1..]
                .iter()
                .enumerate()
                .map(|(i, l)| (pos + i + 2, *l));
            return build_table(header_line, body, delimiter, path);
        }
    }

    // `%` starts a comment anywhere on a plain line.
    let mut body = lines
        .iter()
        .enumerate()
        .map(|(i, l)| (i + 1, l.split('%').next().unwrap_or_default()))
        .filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header_line)) = body.next() else {
        return MissingHeaderSnafu { path }.fail();
    };
    build_table(header_line, body, Delimiter::Whitespace, path)
}

fn build_table<'a, I>(
    header_line: &str,
    body: I,
    delimiter: Delimiter,
    path: &str,
) -> Result<StreamTable, LoadError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let columns = delimiter.split(header_line);
    ensure!(
        !columns.is_empty() && columns.iter().any(|c| !c.is_empty()),
        MissingHeaderSnafu { path }
    );

    let mut table = StreamTable::new(columns.iter().copied());
    let width = table.columns().len();

    for (line_no, line) in body {
        if line.trim().is_empty() {
            continue;
        }
        let fields = delimiter.split(line);
        ensure!(
            fields.len() <= width,
            RowTooWideSnafu {
                path,
                line: line_no,
                expected: width,
                found: fields.len(),
            }
        );
        table.push_row(fields.into_iter().map(parse_cell).collect());
    }

    Ok(table)
}

fn parse_cell(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plain_file_with_comments() {
        let text = "% generated by a simulator\n\
                    Time\tCellId\tRNTI\tSINR(dB)\n\
                    0.0004\t1\t2\t10.5   % trailing note\n\
                    \n\
                    0.0011\t1\t2\tnan\n";
        let t = parse_trace(text, HeaderStyle::Plain, "DlDataSinr.txt").unwrap();
        assert_eq!(t.columns(), ["Time", "CellId", "RNTI", "SINR(dB)"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.value(0, 3), Some(10.5));
        assert_eq!(t.value(1, 3), None);
    }

    #[test]
    fn percent_header_with_tabs() {
        let text = "%\ttime(s)\tcellId\ttbSize\tharqId\n\
                    0.001\t1\t300\t0\n\
                    0.001\t1\t200\n";
        let t = parse_trace(text, HeaderStyle::PercentHeader, "mac").unwrap();
        assert_eq!(t.columns(), ["time(s)", "cellId", "tbSize", "harqId"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.value(1, 2), Some(200.0));
        assert_eq!(t.value(1, 3), None);
    }

    #[test]
    fn percent_header_with_spaces_and_fallback_to_plain() {
        let text = "% time(s) cellId mcs\n0.002  1  7\n";
        let t = parse_trace(text, HeaderStyle::PercentHeader, "mac").unwrap();
        assert_eq!(t.columns(), ["time(s)", "cellId", "mcs"]);
        assert_eq!(t.value(0, 2), Some(7.0));

        let text = "time(s) mcs\n0.002 7\n";
        let t = parse_trace(text, HeaderStyle::PercentHeader, "mac").unwrap();
        assert_eq!(t.columns(), ["time(s)", "mcs"]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn over_wide_row_is_an_error() {
        let text = "Time v\n0.1 1 2\n";
        let err = parse_trace(text, HeaderStyle::Plain, "x.txt").unwrap_err();
        assert!(matches!(
            err,
            LoadError::RowTooWide {
                line: 2,
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn empty_file_has_no_header() {
        let err = parse_trace("% only a comment\n\n", HeaderStyle::Plain, "x").unwrap_err();
        assert!(matches!(err, LoadError::MissingHeader { .. }));
    }

    #[test]
    fn dir_loader_reads_declared_file_and_reports_missing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "Time v\n0.1 1\n0.2 2\n").unwrap();

        let loader = TraceDirLoader::new(tmp.path());
        let spec = StreamSpec::new("a", "a.txt", "Time");
        assert_eq!(loader.load(&spec).unwrap().len(), 2);

        let missing = StreamSpec::new("b", "b.txt", "Time");
        assert!(matches!(
            loader.load(&missing),
            Err(LoadError::Read { .. })
        ));
    }

    #[test]
    fn memory_loader_reports_unregistered_streams() {
        let loader = MemoryLoader::new().with("a", StreamTable::new(["Time"]).with_row(&[0.5]));
        assert_eq!(
            loader
                .load(&StreamSpec::new("a", "", "Time"))
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            loader.load(&StreamSpec::new("b", "", "Time")),
            Err(LoadError::NotRegistered { .. })
        ));
    }
}
