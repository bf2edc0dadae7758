//! Paths and analysis configuration shared by every task.

use chla_analysis::AnalysisConfig;
use chla_obs::Result;
use log::info;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_FIGURES_DIR: &str = "figures";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub figures_dir: PathBuf,
    pub config: AnalysisConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            figures_dir: PathBuf::from(DEFAULT_FIGURES_DIR),
            config: AnalysisConfig::default(),
        }
    }
}

impl Settings {
    /// Overrides the defaults with whatever was given on the command line.
    pub fn new(
        data_dir: Option<PathBuf>,
        figures_dir: Option<PathBuf>,
        config: Option<&Path>,
    ) -> Result<Settings> {
        let config = match config {
            Some(path) => {
                info!("loading analysis configuration from {}", path.display());
                AnalysisConfig::from_file(path)?
            }
            None => AnalysisConfig::default(),
        };
        Ok(Settings {
            data_dir: data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            figures_dir: figures_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_FIGURES_DIR)),
            config,
        })
    }

    pub fn input(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn output(&self, file: &str) -> PathBuf {
        self.figures_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new(None, None, None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.input("a.csv"), Path::new("data/a.csv"));
        assert_eq!(settings.output("b.png"), Path::new("figures/b.png"));
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = Settings::new(None, None, Some(Path::new("/nonexistent/chla.json"))).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
