//! The unified, grid-aligned table that flows through the last three stages.
//!
//! A [`UnifiedTable`] has one row per grid bucket: the `time` column plus any
//! number of nullable `f64` columns. Stages never mutate a table they were
//! given; they return a new one.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, Float64Array, RecordBatch},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
};

use crate::catalog::{MetricKind, TIME_COLUMN};

/// One named column of a unified table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: MetricKind,
    values: Vec<Option<f64>>,
}

impl Column {
    /// Build a column.
    pub fn new(name: impl Into<String>, kind: MetricKind, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// State-like or instantaneous.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Cell values, one per grid bucket.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Number of null cells.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Number of cells holding a non-zero value.
    pub fn nonzero_count(&self) -> usize {
        self.values
            .iter()
            .filter(|v| v.is_some_and(|x| x != 0.0))
            .count()
    }

    /// Same name and kind, new values.
    pub fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            values,
        }
    }
}

/// Grid-aligned table: `time` plus nullable numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedTable {
    times: Vec<f64>,
    columns: Vec<Column>,
}

impl UnifiedTable {
    /// Table with only the time column.
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            times,
            columns: Vec::new(),
        }
    }

    /// Append a column; its length must match the row count.
    pub fn push_column(&mut self, column: Column) {
        debug_assert_eq!(column.values.len(), self.times.len());
        self.columns.push(column);
    }

    /// Builder-style [`UnifiedTable::push_column`].
    pub fn with_column(mut self, column: Column) -> Self {
        self.push_column(column);
        self
    }

    /// Same time axis, columns replaced by `f` applied to each.
    pub fn map_columns<F>(&self, f: F) -> Self
    where
        F: FnMut(&Column) -> Column,
    {
        Self {
            times: self.times.clone(),
            columns: self.columns.iter().map(f).collect(),
        }
    }

    /// Number of rows (grid buckets).
    pub fn num_rows(&self) -> usize {
        self.times.len()
    }

    /// Number of columns, `time` included.
    pub fn num_columns(&self) -> usize {
        self.columns.len() + 1
    }

    /// Bucket times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Data columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column named `name`.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Header: `time` followed by every column name.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(TIME_COLUMN)
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Materialize as an Arrow batch of `Float64` columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let mut fields = Vec::with_capacity(self.num_columns());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.num_columns());

        fields.push(Field::new(TIME_COLUMN, DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(self.times.clone())));

        for col in &self.columns {
            fields.push(Field::new(
                col.name.as_str(),
                DataType::Float64,
                col.null_count() > 0,
            ));
            arrays.push(Arc::new(Float64Array::from(col.values.clone())));
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
    }
}
