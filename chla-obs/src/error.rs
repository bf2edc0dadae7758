/// Error types for loading and analysing Chl-a data
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the phenology toolkit.
///
/// Loader and output errors are fatal to one figure task; `InsufficientData`
/// is raised per series and usually recovered by skipping that unit.
#[derive(Error, Debug)]
pub enum ChlaError {
    /// Input CSV does not exist
    #[error("input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    /// A required column is missing or was renamed
    #[error("{}: missing column '{column}'", path.display())]
    SchemaMismatch { path: PathBuf, column: String },

    /// A cell could not be parsed
    #[error("{}:{line}: cannot parse {column} value '{value}'", path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    /// The CSV reader itself failed (I/O, malformed quoting)
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Too few valid points for a metric or a trend test
    #[error("insufficient data for {unit}: {reason}")]
    InsufficientData { unit: String, reason: String },

    /// A figure or table could not be written
    #[error("failed to write {}: {reason}", path.display())]
    OutputWriteFailure { path: PathBuf, reason: String },

    /// Analysis configuration could not be read or is inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ChlaError {
    /// Short name of the error kind, printed by the binaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ChlaError::MissingInputFile { .. } => "MissingInputFile",
            ChlaError::SchemaMismatch { .. } => "SchemaMismatch",
            ChlaError::InvalidValue { .. } => "InvalidValue",
            ChlaError::Csv { .. } => "CsvRead",
            ChlaError::InsufficientData { .. } => "InsufficientData",
            ChlaError::OutputWriteFailure { .. } => "OutputWriteFailure",
            ChlaError::Config(_) => "Config",
        }
    }

    /// The offending file, column or analysis unit.
    pub fn identifier(&self) -> String {
        match self {
            ChlaError::MissingInputFile { path }
            | ChlaError::Csv { path, .. }
            | ChlaError::OutputWriteFailure { path, .. } => path.display().to_string(),
            ChlaError::SchemaMismatch { path, column } => {
                format!("{} [{}]", path.display(), column)
            }
            ChlaError::InvalidValue {
                path, line, column, ..
            } => format!("{}:{} [{}]", path.display(), line, column),
            ChlaError::InsufficientData { unit, .. } => unit.clone(),
            ChlaError::Config(_) => "config".to_string(),
        }
    }

    pub fn insufficient(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        ChlaError::InsufficientData {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using ChlaError
pub type Result<T> = std::result::Result<T, ChlaError>;
