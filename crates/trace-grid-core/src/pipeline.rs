//! End-to-end dataset construction.
//!
//! [`Pipeline::run`] threads the stages together:
//!
//! 1. Load every catalog stream and resolve its time column. Failures are
//!    contained: the stream is logged, recorded in the report and skipped.
//! 2. Build the grid from all usable timestamps of the loaded streams.
//! 3. Aggregate each loaded stream onto the grid resolution (optionally on
//!    the rayon pool; streams are independent).
//! 4. Merge, fill, derive.
//!
//! The only fatal outcomes are an invalid catalog, a grid that cannot be
//! built, and Arrow failures while materializing the result.

use std::collections::HashMap;

use arrow::array::RecordBatch;
use log::{debug, info, warn};
use rayon::prelude::*;
use snafu::prelude::*;

use crate::{
    aggregate::{StreamAggregate, aggregate_stream},
    catalog::{StreamCatalog, StreamSpec},
    config::PipelineConfig,
    coverage::{Coverage, longest_run},
    derive::derive_metrics,
    error::{ArrowSnafu, CatalogSnafu, PipelineError, StreamIssue},
    fill::apply_fill,
    grid::{TimeGrid, TimeGridBuilder},
    loader::StreamLoader,
    merge::merge_onto_grid,
    report::{DatasetReport, DatasetReportBuilder, StreamReport, StreamStatus},
    stream::StreamTable,
    table::UnifiedTable,
};

/// A catalog plus the configuration to run it with.
#[derive(Debug, Clone)]
pub struct Pipeline {
    catalog: StreamCatalog,
    config: PipelineConfig,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Dataset {
    grid: TimeGrid,
    table: UnifiedTable,
    report: DatasetReport,
}

impl Dataset {
    /// The grid every row sits on.
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// The filled table with derived metrics.
    pub fn table(&self) -> &UnifiedTable {
        &self.table
    }

    /// What each stream contributed.
    pub fn report(&self) -> &DatasetReport {
        &self.report
    }

    /// Materialize the table as an Arrow batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch, PipelineError> {
        self.table.to_record_batch().context(ArrowSnafu)
    }
}

enum StreamInput<'a> {
    Ready {
        spec: &'a StreamSpec,
        table: StreamTable,
        time_column: usize,
    },
    Skipped {
        spec: &'a StreamSpec,
        status: StreamStatus,
        issue: StreamIssue,
    },
}

impl Pipeline {
    /// Pipeline over an already validated catalog.
    pub fn new(catalog: StreamCatalog, config: PipelineConfig) -> Self {
        Self { catalog, config }
    }

    /// Pipeline over the default NR catalog.
    pub fn nr(config: PipelineConfig) -> Result<Self, PipelineError> {
        let catalog = StreamCatalog::nr_default().context(CatalogSnafu)?;
        Ok(Self::new(catalog, config))
    }

    /// The stream catalog.
    pub fn catalog(&self) -> &StreamCatalog {
        &self.catalog
    }

    /// The run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the aligned dataset from whatever `loader` can provide.
    pub fn run<L>(&self, loader: &L) -> Result<Dataset, PipelineError>
    where
        L: StreamLoader + ?Sized,
    {
        let resolution = self.config.resolution;
        let inputs = self.load_streams(loader);

        let mut builder = TimeGridBuilder::new(resolution);
        for input in &inputs {
            if let StreamInput::Ready {
                table, time_column, ..
            } = input
            {
                builder.observe(table.records(*time_column).map(|r| r.timestamp));
            }
        }
        let grid = builder.build()?;

        let aggregates = self.aggregate(&inputs);

        let merged = merge_onto_grid(&grid, &self.catalog, &aggregates);
        let filled = apply_fill(&merged, &self.config.fill);
        let table = derive_metrics(&filled, self.catalog.derived(), resolution);

        let report = build_report(&grid, &inputs, &aggregates, &table);
        info!(
            "dataset: {} rows x {} columns, {}/{} streams loaded",
            table.num_rows(),
            table.num_columns(),
            report.loaded_streams(),
            self.catalog.streams().len()
        );

        Ok(Dataset {
            grid,
            table,
            report,
        })
    }

    fn load_streams<'a, L>(&'a self, loader: &L) -> Vec<StreamInput<'a>>
    where
        L: StreamLoader + ?Sized,
    {
        self.catalog
            .streams()
            .iter()
            .map(|spec| match loader.load(spec) {
                Err(err) => {
                    let issue = StreamIssue::StreamUnavailable {
                        stream: spec.name.clone(),
                        reason: err.to_string(),
                    };
                    warn!("{issue}");
                    StreamInput::Skipped {
                        spec,
                        status: StreamStatus::Unavailable {
                            reason: err.to_string(),
                        },
                        issue,
                    }
                }
                Ok(table) => match table.time_column_index(&spec.time_column) {
                    None => {
                        let issue = StreamIssue::MissingTimeColumn {
                            stream: spec.name.clone(),
                            columns: table.columns().to_vec(),
                        };
                        warn!("{issue}");
                        StreamInput::Skipped {
                            spec,
                            status: StreamStatus::NoTimeColumn,
                            issue,
                        }
                    }
                    Some(time_column) => {
                        debug!(
                            "loaded stream {} ({} rows, time column {})",
                            spec.name,
                            table.len(),
                            table.columns()[time_column]
                        );
                        StreamInput::Ready {
                            spec,
                            table,
                            time_column,
                        }
                    }
                },
            })
            .collect()
    }

    fn aggregate(&self, inputs: &[StreamInput<'_>]) -> Vec<StreamAggregate> {
        let resolution = self.config.resolution;
        let ready: Vec<_> = inputs
            .iter()
            .filter_map(|input| match input {
                StreamInput::Ready {
                    spec,
                    table,
                    time_column,
                } => Some((*spec, table, *time_column)),
                StreamInput::Skipped { .. } => None,
            })
            .collect();

        if self.config.parallel {
            ready
                .par_iter()
                .map(|(spec, table, tc)| aggregate_stream(spec, table, *tc, resolution))
                .collect()
        } else {
            ready
                .iter()
                .map(|(spec, table, tc)| aggregate_stream(spec, table, *tc, resolution))
                .collect()
        }
    }
}

fn build_report(
    grid: &TimeGrid,
    inputs: &[StreamInput<'_>],
    aggregates: &[StreamAggregate],
    table: &UnifiedTable,
) -> DatasetReport {
    let by_stream: HashMap<&str, &StreamAggregate> =
        aggregates.iter().map(|a| (a.stream.as_str(), a)).collect();
    let expected = grid.expected_buckets();
    let resolution = grid.resolution();

    let mut builder = DatasetReportBuilder::new();
    for input in inputs {
        match input {
            StreamInput::Skipped {
                spec,
                status,
                issue,
            } => {
                let mut report = StreamReport::absent(&spec.name, status.clone(), grid.len());
                report.issues.push(issue.clone());
                builder.push_stream(report);
            }
            StreamInput::Ready {
                spec,
                table,
                time_column,
            } => {
                let records = table
                    .records(*time_column)
                    .filter(|r| resolution.tick(r.timestamp).is_some())
                    .count();
                let (coverage, issues) = match by_stream.get(spec.name.as_str()) {
                    Some(agg) => (Coverage::from_ticks(grid, &agg.ticks), agg.issues.clone()),
                    None => (Coverage::empty(), Vec::new()),
                };
                let gaps = coverage.missing_runs(&expected);
                builder.push_stream(StreamReport {
                    stream: spec.name.clone(),
                    status: StreamStatus::Loaded,
                    records,
                    occupied_buckets: coverage.cardinality(),
                    coverage_ratio: coverage.coverage_ratio(&expected),
                    max_gap: longest_run(&gaps),
                    gap_runs: gaps.len(),
                    issues,
                });
            }
        }
    }
    builder.finish(table)
}
