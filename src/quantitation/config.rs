//! Tunable thresholds for quantitation-type inference.
//!
//! The defaults are the empirically chosen constants the classifier has always
//! used; changing them changes classification outcomes on real data. They can
//! be overridden from a TOML file:
//!
//! ```toml
//! # qtlens.toml
//! [inference]
//! atol = 1e-8
//! min_count_values = 10
//! log_upper_bounds = [4.81, 11.0, 20.0]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Root configuration structure for qtlens.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Inference-specific settings.
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

/// Thresholds used by [`QuantitationTypeDetector`](super::QuantitationTypeDetector)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Relative tolerance of `isclose`
    pub rtol: f64,
    /// Absolute tolerance of `isclose`
    pub atol: f64,
    /// Minimum number of finite values before data can be reported as counts
    pub min_count_values: usize,
    /// Z-scored data with a maximum below this is reported as log-transformed
    pub zscore_log_maximum: f64,
    /// A column is ratiometric when its mean is strictly within this distance of zero
    pub ratiometric_mean_bound: f64,
    /// Upper bounds on the maximum for log10, unknown-base log and log2 data
    pub log_upper_bounds: [f64; 3],
    /// Same as `log_upper_bounds`, for ratiometric data
    pub ratiometric_upper_bounds: [f64; 3],
    /// Maximum at or above which non-log data is reported as linear
    pub linear_minimum_maximum: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
            min_count_values: 10,
            zscore_log_maximum: 20.0,
            ratiometric_mean_bound: 2.0,
            log_upper_bounds: [4.81, 11.0, 20.0],
            ratiometric_upper_bounds: [2.5, 2.5, 12.0],
            linear_minimum_maximum: 10f64.powf(3.2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [inference]
            atol = 1e-6
            min_count_values = 25
            log_upper_bounds = [5.0, 12.0, 21.0]
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.inference.atol, 1e-6);
        assert_eq!(config.inference.min_count_values, 25);
        assert_eq!(config.inference.log_upper_bounds, [5.0, 12.0, 21.0]);
        // untouched fields keep their defaults
        assert_eq!(config.inference.rtol, 1e-5);
        assert_eq!(config.inference.ratiometric_upper_bounds, [2.5, 2.5, 12.0]);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.inference, InferenceConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_toml_str("[inference]\nlog_upper_bounds = [1.0]").is_err());
    }

    #[test]
    fn test_linear_threshold() {
        let config = InferenceConfig::default();
        assert!((config.linear_minimum_maximum - 1584.893).abs() < 1e-3);
    }
}
