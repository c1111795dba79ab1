//! Derived per-bucket metrics computed from the filled table.
//!
//! Derivations run in declaration order and may read columns produced by
//! earlier derivations (jitter reads the millisecond delay).

use log::warn;

use crate::{
    catalog::{DerivedKind, DerivedMetric, MetricKind},
    resolution::Resolution,
    table::{Column, UnifiedTable},
};

/// `bytes * 8 / (r * scale)`.
pub fn throughput(bytes: &[Option<f64>], resolution: Resolution, scale: f64) -> Vec<Option<f64>> {
    let denom = resolution.as_secs() * scale;
    bytes.iter().map(|b| b.map(|b| b * 8.0 / denom)).collect()
}

/// Seconds to milliseconds.
pub fn seconds_to_ms(delay: &[Option<f64>]) -> Vec<Option<f64>> {
    delay.iter().map(|d| d.map(|d| d * 1000.0)).collect()
}

/// `|x[i] - x[i-1]|` for `i > 0`, `0` at the first bucket.
///
/// A null on either side gives a null difference.
pub fn jitter(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(Some(0.0));
    }
    out.extend(values.windows(2).map(|w| match (w[0], w[1]) {
        (Some(prev), Some(cur)) => Some((cur - prev).abs()),
        _ => None,
    }));
    out
}

fn kind_of(kind: DerivedKind) -> MetricKind {
    match kind {
        DerivedKind::DelayMs => MetricKind::State,
        DerivedKind::Throughput { .. } | DerivedKind::Jitter => MetricKind::Instantaneous,
    }
}

/// Append every derived metric to a copy of `table`.
pub fn derive_metrics(
    table: &UnifiedTable,
    metrics: &[DerivedMetric],
    resolution: Resolution,
) -> UnifiedTable {
    let mut out = table.clone();
    for metric in metrics {
        let Some(input) = out.column(&metric.input) else {
            warn!(
                "derived metric {} skipped: column {} not in table",
                metric.output, metric.input
            );
            continue;
        };
        let values = match metric.kind {
            DerivedKind::Throughput { scale } => throughput(input.values(), resolution, scale),
            DerivedKind::DelayMs => seconds_to_ms(input.values()),
            DerivedKind::Jitter => jitter(input.values()),
        };
        out.push_column(Column::new(
            metric.output.clone(),
            kind_of(metric.kind),
            values,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_of_125_bytes_per_ms_is_one_mbps() {
        let t = throughput(&[Some(125.0)], Resolution::default(), 1e6);
        assert!((t[0].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn throughput_scales_with_resolution() {
        let r = Resolution::from_secs(0.01).unwrap();
        let t = throughput(&[Some(125.0), None], r, 1e6);
        assert!((t[0].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(t[1], None);
    }

    #[test]
    fn delay_conversion() {
        assert_eq!(seconds_to_ms(&[Some(0.0025)]), vec![Some(2.5)]);
    }

    #[test]
    fn jitter_starts_at_zero() {
        assert_eq!(jitter(&[Some(7.0)]), vec![Some(0.0)]);
        assert_eq!(
            jitter(&[Some(5.0), Some(2.0), Some(2.0), Some(6.0)]),
            vec![Some(0.0), Some(3.0), Some(0.0), Some(4.0)]
        );
        assert!(jitter(&[]).is_empty());
        assert_eq!(jitter(&[None, Some(1.0)]), vec![Some(0.0), None]);
    }

    #[test]
    fn derivations_chain_in_order() {
        let table = UnifiedTable::new(vec![0.0, 0.001, 0.002])
            .with_column(Column::new(
                "bytes",
                MetricKind::Instantaneous,
                vec![Some(0.0), Some(125.0), Some(250.0)],
            ))
            .with_column(Column::new(
                "delay",
                MetricKind::State,
                vec![Some(0.001), Some(0.003), Some(0.002)],
            ));
        let metrics = vec![
            DerivedMetric::throughput_mbps("tput", "bytes"),
            DerivedMetric::delay_ms("delay_ms", "delay"),
            DerivedMetric::jitter("jitter_ms", "delay_ms"),
            DerivedMetric::jitter("ghost", "missing"),
        ];

        let out = derive_metrics(&table, &metrics, Resolution::default());
        assert_eq!(
            out.column_names(),
            vec!["time", "bytes", "delay", "tput", "delay_ms", "jitter_ms"]
        );
        let jit = out.column("jitter_ms").unwrap().values();
        assert_eq!(jit[0], Some(0.0));
        assert!((jit[1].unwrap() - 2.0).abs() < 1e-9);
        assert!((jit[2].unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(table.num_columns(), 3);
    }
}
