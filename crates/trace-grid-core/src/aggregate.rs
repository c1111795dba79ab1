//! Per-stream bucket aggregation.
//!
//! Each record's timestamp is quantized with the same [`Resolution::tick`]
//! the grid builder uses. Records sharing a tick form one group; groups keep
//! ingestion order. Every declared reducer then collapses its source field
//! over the group into one value, giving one row per occupied bucket.

use std::collections::BTreeMap;

use log::warn;

use crate::{
    catalog::{Reducer, StreamSpec},
    error::StreamIssue,
    resolution::Resolution,
    stream::StreamTable,
};

/// One reduced output column, aligned with [`StreamAggregate::ticks`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    /// Final output column name.
    pub name: String,
    /// Reduced value per occupied bucket.
    pub values: Vec<Option<f64>>,
}

/// Aggregated rows of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamAggregate {
    /// Stream name.
    pub stream: String,
    /// Occupied bucket ticks, ascending.
    pub ticks: Vec<i64>,
    /// Reduced columns in declaration order. Reducers whose source field
    /// was missing are absent.
    pub columns: Vec<AggregateColumn>,
    /// Contained problems found while aggregating.
    pub issues: Vec<StreamIssue>,
}

impl StreamAggregate {
    /// Column named `name`, if it was produced.
    pub fn column(&self, name: &str) -> Option<&AggregateColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Running state for every reducer over one group.
///
/// Variance uses Welford's online update.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: u64,
    sum: f64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    first: Option<f64>,
}

impl Accumulator {
    fn update(&mut self, x: f64) {
        if self.count == 0 {
            self.min = x;
            self.max = x;
            self.first = Some(x);
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        self.count += 1;
        self.sum += x;

        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn finalize(&self, reducer: Reducer) -> Option<f64> {
        let n = self.count;
        match reducer {
            Reducer::Sum => Some(self.sum),
            Reducer::Count => Some(n as f64),
            Reducer::Mean => (n > 0).then(|| self.sum / n as f64),
            Reducer::Min => (n > 0).then_some(self.min),
            Reducer::Max => (n > 0).then_some(self.max),
            Reducer::Std => match n {
                0 => None,
                1 => Some(0.0),
                _ => Some((self.m2.max(0.0) / (n - 1) as f64).sqrt()),
            },
            Reducer::First => self.first,
        }
    }
}

/// Reduce `values` (nulls skipped) with `reducer`.
pub fn reduce<I>(reducer: Reducer, values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut acc = Accumulator::default();
    values.into_iter().flatten().for_each(|v| acc.update(v));
    acc.finalize(reducer)
}

/// Aggregate one stream's table onto buckets of width `resolution`.
///
/// `time_column` is the index of the resolved time column.
pub fn aggregate_stream(
    spec: &StreamSpec,
    table: &StreamTable,
    time_column: usize,
    resolution: Resolution,
) -> StreamAggregate {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for record in table.records(time_column) {
        if let Some(tick) = resolution.tick(record.timestamp) {
            groups.entry(tick).or_default().push(record.row);
        }
    }

    let mut issues = Vec::new();
    let mut columns = Vec::with_capacity(spec.columns.len());

    for col in &spec.columns {
        let Some(field) = table.column_index(&col.source) else {
            let issue = StreamIssue::AggregationColumnMissing {
                stream: spec.name.clone(),
                field: col.source.clone(),
                column: col.output.clone(),
            };
            warn!("{issue}");
            issues.push(issue);
            continue;
        };

        let values = groups
            .values()
            .map(|rows| reduce(col.reducer, rows.iter().map(|&row| table.value(row, field))))
            .collect();

        columns.push(AggregateColumn {
            name: col.output.clone(),
            values,
        });
    }

    StreamAggregate {
        stream: spec.name.clone(),
        ticks: groups.into_keys().collect(),
        columns,
        issues,
    }
}
