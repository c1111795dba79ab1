//! Fill policy engine.
//!
//! The default ([`FillMode::Uniform`]) forward-fills every merged column and
//! then zero-fills whatever is still null at the start of the series. This
//! carries instantaneous metrics (a packet count seen once) into the idle
//! buckets that follow. [`FillMode::ByKind`] instead zero-fills columns whose
//! reducer describes one-shot events. Per-column overrides win in both modes.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::MetricKind,
    table::{Column, UnifiedTable},
};

/// What to do with a column's null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Carry the last observation forward; `0` before the first one.
    Forward,
    /// Every null becomes `0`.
    Zero,
}

/// How the default policy of a column is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Forward-fill every column.
    #[default]
    Uniform,
    /// Forward-fill state-like columns, zero-fill instantaneous ones.
    ByKind,
}

/// Fill configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FillConfig {
    /// Default policy selection.
    pub mode: FillMode,
    /// Column-specific policies.
    pub overrides: BTreeMap<String, FillPolicy>,
}

impl FillConfig {
    /// Policy for column `name` of the given kind.
    pub fn policy_for(&self, name: &str, kind: MetricKind) -> FillPolicy {
        if let Some(policy) = self.overrides.get(name) {
            return *policy;
        }
        match (self.mode, kind) {
            (FillMode::ByKind, MetricKind::Instantaneous) => FillPolicy::Zero,
            _ => FillPolicy::Forward,
        }
    }
}

/// Forward-fill then zero-fill leading nulls.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = 0.0;
    values
        .iter()
        .map(|v| {
            if let Some(x) = v {
                last = *x;
            }
            Some(last)
        })
        .collect()
}

/// Replace every null with `0`.
pub fn zero_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values.iter().map(|v| Some(v.unwrap_or(0.0))).collect()
}

/// Apply the configured policy to every column of `table`.
pub fn apply_fill(table: &UnifiedTable, config: &FillConfig) -> UnifiedTable {
    table.map_columns(|col: &Column| {
        let policy = config.policy_for(col.name(), col.kind());
        debug!("fill {} with {policy:?}", col.name());
        let values = match policy {
            FillPolicy::Forward => forward_fill(col.values()),
            FillPolicy::Zero => zero_fill(col.values()),
        };
        col.with_values(values)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Vec<Option<f64>> {
        vec![None, None, Some(3.0), None, Some(0.0), Some(5.0), None]
    }

    #[test]
    fn forward_fill_law() {
        let raw = raw();
        let filled = forward_fill(&raw);
        assert_eq!(filled[0], Some(0.0));
        for i in 1..raw.len() {
            match raw[i] {
                None => assert_eq!(filled[i], filled[i - 1]),
                Some(v) => assert_eq!(filled[i], Some(v)),
            }
        }
        assert_eq!(
            filled,
            vec![
                Some(0.0),
                Some(0.0),
                Some(3.0),
                Some(3.0),
                Some(0.0),
                Some(5.0),
                Some(5.0)
            ]
        );
    }

    #[test]
    fn first_cell_kept_when_present() {
        assert_eq!(forward_fill(&[Some(-2.0), None]), vec![Some(-2.0), Some(-2.0)]);
        assert!(forward_fill(&[]).is_empty());
    }

    #[test]
    fn zero_fill_does_not_carry() {
        assert_eq!(
            zero_fill(&raw()),
            vec![
                Some(0.0),
                Some(0.0),
                Some(3.0),
                Some(0.0),
                Some(0.0),
                Some(5.0),
                Some(0.0)
            ]
        );
    }

    #[test]
    fn policy_selection() {
        let uniform = FillConfig::default();
        assert_eq!(
            uniform.policy_for("x_bytes", MetricKind::Instantaneous),
            FillPolicy::Forward
        );

        let mut by_kind = FillConfig {
            mode: FillMode::ByKind,
            ..Default::default()
        };
        assert_eq!(
            by_kind.policy_for("x_bytes", MetricKind::Instantaneous),
            FillPolicy::Zero
        );
        assert_eq!(
            by_kind.policy_for("x_mean", MetricKind::State),
            FillPolicy::Forward
        );

        by_kind
            .overrides
            .insert("x_mean".to_string(), FillPolicy::Zero);
        assert_eq!(
            by_kind.policy_for("x_mean", MetricKind::State),
            FillPolicy::Zero
        );
    }

    #[test]
    fn apply_fill_leaves_no_nulls() {
        let table = UnifiedTable::new(vec![0.0, 1.0, 2.0])
            .with_column(Column::new(
                "s",
                MetricKind::State,
                vec![None, Some(1.0), None],
            ))
            .with_column(Column::new(
                "n",
                MetricKind::Instantaneous,
                vec![Some(4.0), None, None],
            ));

        let config = FillConfig {
            mode: FillMode::ByKind,
            ..Default::default()
        };
        let filled = apply_fill(&table, &config);
        assert!(filled.columns().iter().all(|c| c.null_count() == 0));
        assert_eq!(
            filled.column("s").unwrap().values(),
            &[Some(0.0), Some(1.0), Some(1.0)]
        );
        assert_eq!(
            filled.column("n").unwrap().values(),
            &[Some(4.0), Some(0.0), Some(0.0)]
        );

        // The input table is untouched.
        assert_eq!(table.column("s").unwrap().null_count(), 2);
    }
}
