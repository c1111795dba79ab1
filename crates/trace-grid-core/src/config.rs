//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```
//! use trace_grid_core::PipelineConfig;
//!
//! let cfg = PipelineConfig::from_json_str(r#"{ "resolution": "10ms" }"#, "inline").unwrap();
//! assert_eq!(cfg.resolution.as_secs(), 0.01);
//! assert!(!cfg.parallel);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{fill::FillConfig, resolution::Resolution};

/// Errors loading a [`PipelineConfig`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// The config file could not be read.
    #[snafu(display("Cannot read config file {path}: {source}"))]
    Read {
        /// Config path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config is not valid JSON for [`PipelineConfig`].
    #[snafu(display("Invalid config {path}: {source}"))]
    Parse {
        /// Config path (or a label for inline text).
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// Knobs of one pipeline run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bucket width.
    pub resolution: Resolution,
    /// Fill policy selection.
    pub fill: FillConfig,
    /// Aggregate streams on the rayon pool.
    pub parallel: bool,
}

impl PipelineConfig {
    /// Parse a JSON document; `label` names it in errors.
    pub fn from_json_str(text: &str, label: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).context(ParseSnafu { path: label })
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).context(ReadSnafu { path: &display })?;
        Self::from_json_str(&text, &display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::{FillMode, FillPolicy};

    #[test]
    fn empty_object_is_default() {
        let cfg = PipelineConfig::from_json_str("{}", "t").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.resolution.as_secs(), 0.001);
    }

    #[test]
    fn full_config() {
        let cfg = PipelineConfig::from_json_str(
            r#"{
                "resolution": 0.01,
                "fill": { "mode": "by_kind", "overrides": { "dl_sinr_mean": "zero" } },
                "parallel": true
            }"#,
            "t",
        )
        .unwrap();
        assert_eq!(cfg.resolution.as_secs(), 0.01);
        assert_eq!(cfg.fill.mode, FillMode::ByKind);
        assert_eq!(cfg.fill.overrides["dl_sinr_mean"], FillPolicy::Zero);
        assert!(cfg.parallel);
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            r#"{ "resolution": 0 }"#,
            r#"{ "resolution": "fast" }"#,
            r#"{ "fill": { "mode": "backward" } }"#,
            r#"{ "unknown": 1 }"#,
        ] {
            let err = PipelineConfig::from_json_str(bad, "bad.json").unwrap_err();
            assert!(matches!(err, ConfigError::Parse { .. }), "{bad}");
            assert!(err.to_string().contains("bad.json"));
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
