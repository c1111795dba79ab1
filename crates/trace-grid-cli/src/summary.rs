use tabled::{
    builder::Builder,
    settings::{Style, object::Rows, style::LineText, width::MinWidth},
};
use trace_grid_core::{COLUMN_NAMING_NOTE, StreamCatalog, report::DatasetReport};

const LABEL_OFFSET: usize = 2;

fn render_table(label: &str, columns: &[&str], rows: &[Vec<String>]) -> String {
    let min_width = LABEL_OFFSET + label.len() + 4;

    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.to_string()));
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.with(MinWidth::new(min_width));
    table.with(LineText::new(label, Rows::first()).offset(LABEL_OFFSET));
    // LineText re-estimates dimensions, so re-apply MinWidth afterwards.
    table.with(MinWidth::new(min_width));
    table.to_string()
}

/// Per-stream coverage of a finished run.
pub fn render_report(report: &DatasetReport) -> String {
    let rows: Vec<Vec<String>> = report
        .streams
        .iter()
        .map(|s| {
            vec![
                s.stream.clone(),
                s.status.label().to_string(),
                s.records.to_string(),
                s.occupied_buckets.to_string(),
                format!("{:.1}%", s.coverage_ratio * 100.0),
                s.max_gap.to_string(),
                s.gap_runs.to_string(),
                s.issues.len().to_string(),
            ]
        })
        .collect();

    render_table(
        "Streams",
        &[
            "stream", "status", "records", "buckets", "coverage", "max gap", "gaps", "issues",
        ],
        &rows,
    )
}

/// Columns that hold at least one non-zero value, and how many.
pub fn render_nonzero(report: &DatasetReport) -> String {
    let rows: Vec<Vec<String>> = report
        .columns
        .iter()
        .filter(|c| c.nonzero > 0)
        .map(|c| vec![c.name.clone(), c.nonzero.to_string()])
        .collect();
    render_table("Non-zero cells", &["column", "non-zero"], &rows)
}

/// The catalog: one row per stream, the derived metrics, then the naming note.
pub fn render_catalog(catalog: &StreamCatalog) -> String {
    let streams: Vec<Vec<String>> = catalog
        .streams()
        .iter()
        .map(|s| {
            let columns: Vec<&str> = s.output_columns().collect();
            vec![
                s.name.clone(),
                s.file_name.clone(),
                s.time_column.clone(),
                if columns.is_empty() {
                    "-".to_string()
                } else {
                    columns.join(", ")
                },
            ]
        })
        .collect();

    let derived: Vec<Vec<String>> = catalog
        .derived()
        .iter()
        .map(|d| vec![d.output.clone(), d.input.clone(), format!("{:?}", d.kind)])
        .collect();

    format!(
        "{}\n{}\n{}",
        render_table("Streams", &["stream", "file", "time", "columns"], &streams),
        render_table("Derived", &["column", "from", "kind"], &derived),
        COLUMN_NAMING_NOTE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_grid_core::report::{ColumnReport, StreamReport, StreamStatus};

    #[test]
    fn catalog_lists_every_stream() {
        let catalog = StreamCatalog::nr_default().unwrap();
        let rendered = render_catalog(&catalog);
        assert!(rendered.contains("DlDataSinr.txt"));
        assert!(rendered.contains("dl_sinr_mean"));
        assert!(rendered.contains("dl_jitter_ms"));
        assert!(rendered.contains("Streams"));
        assert!(rendered.ends_with(COLUMN_NAMING_NOTE));
        assert!(rendered.contains("dl_sinr_rnti (not cellid and rnti)"));
    }

    #[test]
    fn report_table_shows_status_and_coverage() {
        let report = DatasetReport {
            streams: vec![
                StreamReport {
                    stream: "dl_data_sinr".into(),
                    status: StreamStatus::Loaded,
                    records: 4,
                    occupied_buckets: 3,
                    coverage_ratio: 0.75,
                    max_gap: 1,
                    gap_runs: 7,
                    issues: vec![],
                },
                StreamReport::absent(
                    "rx_packet",
                    StreamStatus::Unavailable {
                        reason: "missing".into(),
                    },
                    4,
                ),
            ],
            columns: vec![
                ColumnReport {
                    name: "dl_sinr_mean".into(),
                    nonzero: 3,
                },
                ColumnReport {
                    name: "rx_sinr_mean".into(),
                    nonzero: 0,
                },
            ],
        };

        let rendered = render_report(&report);
        assert!(rendered.contains("75.0%"));
        assert!(rendered.contains("gaps"));
        assert!(rendered.contains(" 7 "));
        assert!(rendered.contains("unavailable"));

        let nonzero = render_nonzero(&report);
        assert!(nonzero.contains("dl_sinr_mean"));
        assert!(!nonzero.contains("rx_sinr_mean"));
    }
}
