//! Raw per-stream tables as handed over by a loader.
//!
//! A [`StreamTable`] is a row-major table of nullable numeric cells with
//! named columns. Row order is the stream's ingestion order and is never
//! changed afterwards; the `first` reducer depends on it.

/// Column names recognised as time columns when the declared one is absent.
const TIME_COLUMN_CANDIDATES: [&str; 4] = ["Time", "time", "time(s)", "Time(sec)"];

/// Raw table of one stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

/// One logged event: where it sits in the table and when it happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRecord {
    /// Position of the record in ingestion order.
    pub row: usize,
    /// Raw timestamp in seconds.
    pub timestamp: f64,
}

impl StreamTable {
    /// Empty table with the given header.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls; extra cells are
    /// dropped (loaders reject over-wide rows before getting here).
    pub fn push_row(&mut self, mut row: Vec<Option<f64>>) {
        debug_assert!(row.len() <= self.columns.len());
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Builder-style [`StreamTable::push_row`] taking plain values.
    pub fn with_row(mut self, row: &[f64]) -> Self {
        self.push_row(row.iter().map(|v| Some(*v)).collect());
        self
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (`row`, `column`).
    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.rows.get(row)?.get(column).copied().flatten()
    }

    /// Locate the time column: `declared` when present, otherwise the first
    /// column with a well-known time name or containing `time`.
    pub fn time_column_index(&self, declared: &str) -> Option<usize> {
        self.column_index(declared).or_else(|| {
            self.columns.iter().position(|c| {
                TIME_COLUMN_CANDIDATES.contains(&c.as_str()) || c.to_lowercase().contains("time")
            })
        })
    }

    /// Records with a non-null timestamp, in ingestion order.
    pub fn records(&self, time_column: usize) -> impl Iterator<Item = RawRecord> + '_ {
        (0..self.rows.len()).filter_map(move |row| {
            self.value(row, time_column)
                .map(|timestamp| RawRecord { row, timestamp })
        })
    }
}
