//! Pipeline configuration.
//!
//! Use [`PipelineConfig::default`] for common cases, [`PipelineConfig::from_env`] to pick up
//! deployment overrides, or [`PipelineConfig::from_json_str`] to load a JSON config file.

use std::env;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::observability::PipelineSeverity;

/// Default maximum number of datasets a single owner may retain.
pub const DEFAULT_MAX_DATASETS_PER_OWNER: i64 = 5;
/// Default upload size ceiling (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Environment variable overriding [`PipelineConfig::max_datasets_per_owner`].
pub const ENV_MAX_DATASETS: &str = "EQUIPMENT_MAX_DATASETS";
/// Environment variable overriding [`PipelineConfig::max_upload_bytes`].
pub const ENV_MAX_UPLOAD_BYTES: &str = "EQUIPMENT_MAX_UPLOAD_BYTES";

/// Options controlling ingestion and retention.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Retention cap. Values below 1 are configuration errors, not clamped.
    pub max_datasets_per_owner: i64,
    /// Uploads larger than this are rejected before parsing.
    pub max_upload_bytes: u64,
    /// Severity threshold at which observers receive `on_alert`.
    pub alert_at_or_above: PipelineSeverity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_datasets_per_owner: DEFAULT_MAX_DATASETS_PER_OWNER,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            alert_at_or_above: PipelineSeverity::Critical,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `EQUIPMENT_MAX_DATASETS` / `EQUIPMENT_MAX_UPLOAD_BYTES`.
    ///
    /// Values that are present but not integers are configuration errors.
    pub fn from_env() -> PipelineResult<Self> {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var(ENV_MAX_DATASETS) {
            cfg.max_datasets_per_owner = raw.trim().parse().map_err(|_| {
                PipelineError::config(format!("{ENV_MAX_DATASETS} must be an integer, got '{raw}'"))
            })?;
        }
        if let Ok(raw) = env::var(ENV_MAX_UPLOAD_BYTES) {
            cfg.max_upload_bytes = raw.trim().parse().map_err(|_| {
                PipelineError::config(format!(
                    "{ENV_MAX_UPLOAD_BYTES} must be a non-negative integer, got '{raw}'"
                ))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a JSON config document. Missing keys take their defaults.
    pub fn from_json_str(input: &str) -> PipelineResult<Self> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| PipelineError::config(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check invariants: the retention cap must be >= 1 and the size ceiling non-zero.
    pub fn validate(&self) -> PipelineResult<()> {
        retention_cap(self.max_datasets_per_owner)?;
        if self.max_upload_bytes == 0 {
            return Err(PipelineError::config("max_upload_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Convert a configured cap into a usable count, rejecting values below 1.
pub(crate) fn retention_cap(raw: i64) -> PipelineResult<usize> {
    if raw < 1 {
        return Err(PipelineError::config(format!(
            "max_datasets_per_owner must be >= 1, got {raw}"
        )));
    }
    usize::try_from(raw)
        .map_err(|_| PipelineError::config(format!("max_datasets_per_owner out of range: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn default_config_is_valid() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.max_datasets_per_owner, 5);
        assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_or_negative_cap_is_a_config_error() {
        for cap in [0, -1, -100] {
            let cfg = PipelineConfig {
                max_datasets_per_owner: cap,
                ..Default::default()
            };
            assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::Config);
        }
    }

    #[test]
    fn json_config_fills_missing_keys_with_defaults() {
        let cfg = PipelineConfig::from_json_str(r#"{"max_datasets_per_owner": 3}"#).unwrap();
        assert_eq!(cfg.max_datasets_per_owner, 3);
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(cfg.alert_at_or_above, PipelineSeverity::Critical);
    }

    #[test]
    fn json_config_rejects_zero_cap() {
        let err = PipelineConfig::from_json_str(r#"{"max_datasets_per_owner": 0}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains(">= 1"));
    }
}
