//! Immutable analysis configuration.
//!
//! Defaults reproduce the published figures. A JSON file may override any
//! subset of fields; omitted fields keep their defaults.

use crate::trend::{Aggregation, DecadeScheme, OutlierMode};
use chla_obs::{ChlaError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub phenology: PhenologyConfig,
    pub trend: TrendConfig,
    pub fit: FitConfig,
}

/// Smoothing and metric windows for the Phenology Estimator. Days are day-of-year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhenologyConfig {
    pub grid_start: u16,
    pub grid_end: u16,
    /// centered rolling mean, days
    pub rolling_window: usize,
    /// odd; 1 switches the Savitzky-Golay pass off
    pub savgol_window: usize,
    pub savgol_order: usize,
    pub season_start: u16,
    pub season_end: u16,
    pub sos_fraction: f64,
    pub min_observations: usize,
    pub min_span_days: u16,
    /// values within this distance of the maximum, on or after SOS, count as the peak
    pub peak_tolerance: f64,
}

impl Default for PhenologyConfig {
    fn default() -> Self {
        PhenologyConfig {
            grid_start: 151,
            grid_end: 290,
            rolling_window: 30,
            savgol_window: 15,
            savgol_order: 3,
            season_start: 120,
            season_end: 304,
            sos_fraction: 0.2,
            min_observations: 4,
            min_span_days: 45,
            peak_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendConfig {
    pub decades: DecadeScheme,
    pub iqr_multiplier: f64,
    pub outlier_mode: OutlierMode,
    /// buckets smaller than this are left untouched by outlier correction
    pub min_bucket_size: usize,
    pub aggregation: Aggregation,
    pub alpha: f64,
    /// largest tie-free sample that gets the exact Mann-Kendall p-value
    pub exact_max_n: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            decades: DecadeScheme::balaton(),
            iqr_multiplier: 1.5,
            outlier_mode: OutlierMode::Cap,
            min_bucket_size: 4,
            aggregation: Aggregation::Mean,
            alpha: 0.05,
            exact_max_n: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    pub polynomial_degree: usize,
    /// starting decay rate for the exponential model
    pub exp_initial_rate: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            polynomial_degree: 2,
            exp_initial_rate: 0.05,
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

impl AnalysisConfig {
    /// Read and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ChlaError::Config(format!("cannot open {}: {}", path.display(), e))
        })?;
        let config: AnalysisConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ChlaError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.phenology.validate()?;
        self.trend.validate()?;
        self.fit.validate()
    }
}

impl PhenologyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_start > self.grid_end || self.grid_start == 0 || self.grid_end > 366 {
            return Err(invalid("grid_start..grid_end must be an ordered day-of-year range"));
        }
        if self.season_start >= self.season_end || self.season_end > 366 {
            return Err(invalid("season_start must precede season_end"));
        }
        if self.season_start > self.grid_end || self.season_end < self.grid_start {
            return Err(invalid("season window does not overlap the daily grid"));
        }
        if self.savgol_window % 2 == 0 {
            return Err(invalid("savgol_window must be odd"));
        }
        if self.savgol_window > 1 && self.savgol_window <= self.savgol_order {
            return Err(invalid("savgol_window must exceed savgol_order"));
        }
        if !(self.sos_fraction > 0.0 && self.sos_fraction < 1.0) {
            return Err(invalid("sos_fraction must lie in (0, 1)"));
        }
        if self.min_observations < 2 {
            return Err(invalid("min_observations must be at least 2"));
        }
        if !(self.peak_tolerance >= 0.0) {
            return Err(invalid("peak_tolerance must be non-negative"));
        }
        Ok(())
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<()> {
        self.decades.validate().map_err(ChlaError::Config)?;
        if !(self.iqr_multiplier > 0.0) {
            return Err(invalid("iqr_multiplier must be positive"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(invalid("alpha must lie in (0, 1)"));
        }
        if self.exact_max_n > 20 {
            // n! permutations are enumerated by inversion count; keep it small
            return Err(invalid("exact_max_n must not exceed 20"));
        }
        Ok(())
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.polynomial_degree == 0 {
            return Err(invalid("polynomial_degree must be at least 1"));
        }
        if !(self.exp_initial_rate.is_finite() && self.exp_initial_rate > 0.0) {
            return Err(invalid("exp_initial_rate must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be at least 1"));
        }
        if !(self.tolerance > 0.0) {
            return Err(invalid("tolerance must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ChlaError {
    ChlaError::Config(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.phenology.rolling_window, 30);
        assert_eq!(config.trend.decades.spans().len(), 4);
        assert_eq!(config.fit.polynomial_degree, 2);
    }

    #[test]
    fn test_from_file_partial_override() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        let config_data = r#"
    {
        "phenology": { "sos_fraction": 0.25 },
        "trend": { "aggregation": "median", "outlier_mode": "remove" }
    }
    "#;
        file.write_all(config_data.as_bytes()).unwrap();

        let config = AnalysisConfig::from_file(&file_path).unwrap();
        assert_eq!(config.phenology.sos_fraction, 0.25);
        assert_eq!(config.phenology.savgol_window, 15);
        assert_eq!(config.trend.aggregation, Aggregation::Median);
        assert_eq!(config.trend.outlier_mode, OutlierMode::Remove);
    }

    #[test]
    fn test_from_file_rejects_even_window() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        std::fs::write(&file_path, r#"{ "phenology": { "savgol_window": 14 } }"#).unwrap();
        let err = AnalysisConfig::from_file(&file_path).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }

    #[test]
    fn test_from_file_rejects_overlapping_decades() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let config_data = r#"
    {
        "trend": { "decades": [
            { "label": "a", "start": 1984, "end": 1995 },
            { "label": "b", "start": 1995, "end": 2004 },
            { "label": "c", "start": 2005, "end": 2014 }
        ] }
    }
    "#;
        std::fs::write(&file_path, config_data).unwrap();
        assert!(AnalysisConfig::from_file(&file_path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::from_file("/nonexistent/config.json").unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
