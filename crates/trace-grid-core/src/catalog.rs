//! Declarative stream configuration.
//!
//! Every stream the pipeline knows about is described once by a
//! [`StreamSpec`]: where its log lives, which column carries time, which
//! prefix namespaces its output columns, and which reducers to apply to which
//! source fields. A [`StreamCatalog`] is the ordered set of specs plus the
//! derived metrics, validated once at construction. Catalog order is the
//! merge order and therefore the output column order.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Name of the grid column in every unified table.
pub const TIME_COLUMN: &str = "time";

/// How output columns are named, for readers used to the unprefixed names
/// other NR post-processing tools emit.
pub const COLUMN_NAMING_NOTE: &str = "Every aggregated column is named <prefix>_<suffix> after its stream, \
so the serving cell and RNTI are dl_sinr_cellid and dl_sinr_rnti (not cellid and rnti) \
and MAC statistics are dl_mac_tb_size_total and dl_mac_mcs_mean (not dl_tb_size_total and dl_mcs_mean).";

/// Per-bucket reduction applied to one source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Sum of values (`0` for an empty bucket).
    Sum,
    /// Arithmetic mean.
    Mean,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Sample standard deviation; `0` for a single value.
    Std,
    /// Number of non-null values.
    Count,
    /// First non-null value in input order.
    First,
}

impl Reducer {
    /// Whether the reduced value describes a state or a one-shot event.
    pub fn kind(self) -> MetricKind {
        match self {
            Reducer::Sum | Reducer::Count => MetricKind::Instantaneous,
            Reducer::Mean | Reducer::Min | Reducer::Max | Reducer::Std | Reducer::First => {
                MetricKind::State
            }
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Std => "std",
            Reducer::Count => "count",
            Reducer::First => "first",
        };
        f.write_str(s)
    }
}

/// Whether a column's value persists between events or only exists at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Value holds until the next observation (SINR, path loss, mean delay).
    State,
    /// Value describes events inside one bucket (byte sums, packet counts).
    Instantaneous,
}

/// How a trace file announces its column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    /// First non-comment line is the header; `%` starts a comment.
    #[default]
    Plain,
    /// Header is the first line starting with `%`; tab separated when the
    /// header contains a tab.
    PercentHeader,
}

/// One reducer applied to one source field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Field name in the stream's table.
    pub source: String,
    /// Reduction to apply per bucket.
    pub reducer: Reducer,
    /// Final output column name (already namespaced).
    pub output: String,
}

impl ColumnSpec {
    /// Metric kind of the output column.
    pub fn kind(&self) -> MetricKind {
        self.reducer.kind()
    }
}

/// Static configuration of one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    /// Stream identity, e.g. `dl_pdcp_rx`.
    pub name: String,
    /// Trace file name relative to the trace directory.
    pub file_name: String,
    /// Header convention of the trace file.
    #[serde(default)]
    pub header: HeaderStyle,
    /// Declared time column.
    pub time_column: String,
    /// Namespace for this stream's output columns; `None` for streams that
    /// only contribute timestamps to the grid.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Reducers in output order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl StreamSpec {
    /// A stream that contributes timestamps only.
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
        time_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
            header: HeaderStyle::Plain,
            time_column: time_column.into(),
            prefix: None,
            columns: Vec::new(),
        }
    }

    /// Set the header convention.
    pub fn with_header(mut self, header: HeaderStyle) -> Self {
        self.header = header;
        self
    }

    /// Set the output namespace. Call before [`StreamSpec::aggregate`].
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Add a reducer; the output column is `<prefix>_<suffix>`, or just
    /// `<prefix>` when `suffix` is empty.
    pub fn aggregate(mut self, source: impl Into<String>, reducer: Reducer, suffix: &str) -> Self {
        let output = match (self.prefix.as_deref(), suffix) {
            (Some(p), "") => p.to_string(),
            (Some(p), s) => format!("{p}_{s}"),
            (None, s) => s.to_string(),
        };
        self.columns.push(ColumnSpec {
            source: source.into(),
            reducer,
            output,
        });
        self
    }

    /// Output column names in declaration order.
    pub fn output_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.output.as_str())
    }
}

/// Transform computed from the filled table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DerivedKind {
    /// `bytes * 8 / (r * scale)`; `scale = 1e6` gives Mbps.
    Throughput {
        /// Divisor turning bits/s into the reported unit.
        scale: f64,
    },
    /// Seconds to milliseconds.
    DelayMs,
    /// `|x[i] - x[i-1]|`, `0` at the first bucket.
    Jitter,
}

/// A derived output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetric {
    /// Output column name.
    pub output: String,
    /// Column read, either merged or derived earlier.
    pub input: String,
    /// Transform to apply.
    pub kind: DerivedKind,
}

impl DerivedMetric {
    /// Throughput in Mbps from a per-bucket byte sum.
    pub fn throughput_mbps(output: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
            kind: DerivedKind::Throughput { scale: 1e6 },
        }
    }

    /// Delay in milliseconds from a delay in seconds.
    pub fn delay_ms(output: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
            kind: DerivedKind::DelayMs,
        }
    }

    /// Jitter between consecutive buckets.
    pub fn jitter(output: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
            kind: DerivedKind::Jitter,
        }
    }
}

/// Errors raised while validating a catalog.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two streams share a name.
    #[snafu(display("duplicate stream name {name}"))]
    DuplicateStream {
        /// Repeated stream name.
        name: String,
    },

    /// Two streams share an output prefix.
    #[snafu(display("streams {first} and {second} share prefix {prefix}"))]
    DuplicatePrefix {
        /// Shared prefix.
        prefix: String,
        /// First stream using it.
        first: String,
        /// Second stream using it.
        second: String,
    },

    /// An output column is produced twice.
    #[snafu(display("output column {column} is produced more than once"))]
    DuplicateColumn {
        /// Repeated column name.
        column: String,
    },

    /// An output column uses the reserved grid column name or is empty.
    #[snafu(display("stream {stream} declares invalid output column name '{column}'"))]
    InvalidColumnName {
        /// Stream declaring it.
        stream: String,
        /// Offending name.
        column: String,
    },

    /// A stream has reducers but no prefix to namespace them.
    #[snafu(display("stream {stream} declares reducers but no column prefix"))]
    MissingPrefix {
        /// Stream name.
        stream: String,
    },

    /// A reducer's output does not carry its stream's prefix.
    #[snafu(display("column {column} of stream {stream} is outside prefix {prefix}"))]
    ColumnOutsidePrefix {
        /// Stream name.
        stream: String,
        /// Output column name.
        column: String,
        /// Prefix it should carry.
        prefix: String,
    },

    /// A derived metric reads a column that does not exist before it.
    #[snafu(display("derived metric {metric} reads unknown column {input}"))]
    UnknownDerivedInput {
        /// Derived output name.
        metric: String,
        /// Column it tried to read.
        input: String,
    },
}

/// Ordered, validated set of stream specs and derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamCatalog {
    streams: Vec<StreamSpec>,
    derived: Vec<DerivedMetric>,
}

impl StreamCatalog {
    /// Validate and build a catalog.
    pub fn new(
        streams: Vec<StreamSpec>,
        derived: Vec<DerivedMetric>,
    ) -> Result<Self, CatalogError> {
        let mut names = BTreeSet::new();
        let mut prefixes: Vec<(&str, &str)> = Vec::new();
        let mut columns = BTreeSet::new();

        for spec in &streams {
            ensure!(
                names.insert(spec.name.as_str()),
                DuplicateStreamSnafu { name: &spec.name }
            );

            let Some(prefix) = spec.prefix.as_deref() else {
                ensure!(
                    spec.columns.is_empty(),
                    MissingPrefixSnafu { stream: &spec.name }
                );
                continue;
            };

            if let Some((_, first)) = prefixes.iter().find(|(p, _)| *p == prefix) {
                return DuplicatePrefixSnafu {
                    prefix,
                    first: *first,
                    second: &spec.name,
                }
                .fail();
            }
            prefixes.push((prefix, &spec.name));

            for col in &spec.columns {
                let name = col.output.as_str();
                ensure!(
                    !name.is_empty() && name != TIME_COLUMN,
                    InvalidColumnNameSnafu {
                        stream: &spec.name,
                        column: name,
                    }
                );
                ensure!(
                    name == prefix || name.starts_with(&format!("{prefix}_")),
                    ColumnOutsidePrefixSnafu {
                        stream: &spec.name,
                        column: name,
                        prefix,
                    }
                );
                ensure!(
                    columns.insert(name),
                    DuplicateColumnSnafu { column: name }
                );
            }
        }

        for metric in &derived {
            ensure!(
                columns.contains(metric.input.as_str()),
                UnknownDerivedInputSnafu {
                    metric: &metric.output,
                    input: &metric.input,
                }
            );
            ensure!(
                !metric.output.is_empty() && metric.output != TIME_COLUMN,
                InvalidColumnNameSnafu {
                    stream: "<derived>",
                    column: &metric.output,
                }
            );
            ensure!(
                columns.insert(metric.output.as_str()),
                DuplicateColumnSnafu {
                    column: &metric.output
                }
            );
        }

        Ok(Self { streams, derived })
    }

    /// The catalog for 5G NR simulation traces: signal quality, path loss,
    /// MAC/RLC/PDCP statistics and the receive-packet trace.
    ///
    /// Columns always carry their stream's prefix, see [`COLUMN_NAMING_NOTE`].
    /// The cell and UE identifiers come from the SINR trace as
    /// `dl_sinr_cellid`/`dl_sinr_rnti`, and the MAC reducers produce
    /// `dl_mac_tb_size_total`, `dl_mac_mcs_mean` and their `ul_mac_*` twins.
    pub fn nr_default() -> Result<Self, CatalogError> {
        use Reducer::*;

        let rx_layer = |name: &str, file: &str, prefix: &str| {
            StreamSpec::new(name, file, "time(s)")
                .with_prefix(prefix)
                .aggregate("packetSize", Sum, "bytes")
                .aggregate("packetSize", Mean, "pkt_size_mean")
                .aggregate("packetSize", Count, "packets")
                .aggregate("delay(s)", Mean, "delay_mean")
        };
        let mac = |name: &str, file: &str, prefix: &str| {
            StreamSpec::new(name, file, "time(s)")
                .with_header(HeaderStyle::PercentHeader)
                .with_prefix(prefix)
                .aggregate("tbSize", Sum, "tb_size_total")
                .aggregate("tbSize", Mean, "tb_size_mean")
                .aggregate("mcs", Mean, "mcs_mean")
                .aggregate("harqId", Count, "transmissions")
        };
        let pathloss = |name: &str, file: &str, prefix: &str| {
            StreamSpec::new(name, file, "Time(sec)")
                .with_prefix(prefix)
                .aggregate("pathLoss(dB)", Mean, "")
        };

        let streams = vec![
            StreamSpec::new("dl_data_sinr", "DlDataSinr.txt", "Time")
                .with_prefix("dl_sinr")
                .aggregate("SINR(dB)", Mean, "mean")
                .aggregate("SINR(dB)", Std, "std")
                .aggregate("SINR(dB)", Min, "min")
                .aggregate("SINR(dB)", Max, "max")
                .aggregate("CellId", First, "cellid")
                .aggregate("RNTI", First, "rnti"),
            StreamSpec::new("dl_ctrl_sinr", "DlCtrlSinr.txt", "Time"),
            pathloss("dl_pathloss", "DlPathlossTrace.txt", "dl_pathloss"),
            pathloss("ul_pathloss", "UlPathlossTrace.txt", "ul_pathloss"),
            mac("dl_mac", "NrDlMacStats.txt", "dl_mac"),
            mac("ul_mac", "NrUlMacStats.txt", "ul_mac"),
            rx_layer("dl_pdcp_rx", "NrDlPdcpRxStats.txt", "dl_pdcp"),
            rx_layer("ul_pdcp_rx", "NrUlPdcpRxStats.txt", "ul_pdcp"),
            rx_layer("dl_rlc_rx", "NrDlRxRlcStats.txt", "dl_rlc"),
            rx_layer("ul_rlc_rx", "NrUlRlcRxStats.txt", "ul_rlc"),
            StreamSpec::new("rx_packet", "RxPacketTrace.txt", "Time")
                .with_prefix("rx")
                .aggregate("SINR(dB)", Mean, "sinr_mean")
                .aggregate("CQI", Mean, "cqi_mean")
                .aggregate("corrupt", Sum, "corrupt_count")
                .aggregate("TBler", Mean, "bler_mean")
                .aggregate("tbSize", Sum, "tb_size_total"),
            StreamSpec::new("dl_pdcp_tx", "NrDlPdcpTxStats.txt", "time(s)"),
            StreamSpec::new("dl_rlc_tx", "NrDlTxRlcStats.txt", "time(s)"),
            StreamSpec::new("ul_pdcp_tx", "NrUlPdcpTxStats.txt", "time(s)"),
            StreamSpec::new("ul_rlc_tx", "NrUlRlcTxStats.txt", "time(s)"),
        ];

        let derived = vec![
            DerivedMetric::throughput_mbps("dl_throughput_mbps", "dl_pdcp_bytes"),
            DerivedMetric::throughput_mbps("ul_throughput_mbps", "ul_pdcp_bytes"),
            DerivedMetric::delay_ms("dl_delay_ms", "dl_pdcp_delay_mean"),
            DerivedMetric::delay_ms("ul_delay_ms", "ul_pdcp_delay_mean"),
            DerivedMetric::jitter("dl_jitter_ms", "dl_delay_ms"),
            DerivedMetric::jitter("ul_jitter_ms", "ul_delay_ms"),
        ];

        Self::new(streams, derived)
    }

    /// Stream specs in merge order.
    pub fn streams(&self) -> &[StreamSpec] {
        &self.streams
    }

    /// Derived metrics in computation order.
    pub fn derived(&self) -> &[DerivedMetric] {
        &self.derived
    }

    /// Look up a stream by name.
    pub fn stream(&self, name: &str) -> Option<&StreamSpec> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Every merged (non-derived) output column in merge order.
    pub fn merged_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.streams.iter().flat_map(|s| s.columns.iter())
    }

    /// Full output header: `time`, merged columns, derived columns.
    pub fn output_header(&self) -> Vec<String> {
        std::iter::once(TIME_COLUMN.to_string())
            .chain(self.merged_columns().map(|c| c.output.clone()))
            .chain(self.derived.iter().map(|d| d.output.clone()))
            .collect()
    }
}
