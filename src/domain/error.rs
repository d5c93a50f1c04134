//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for stockanalyzer.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("invalid date range: {reason}")]
    InvalidDateRange { reason: String },

    #[error("invalid instrument {instrument:?}: {reason}")]
    InvalidInstrument { instrument: String, reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {instrument} between {start} and {end}")]
    NoData {
        instrument: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("empty series for {instrument}")]
    EmptySeries { instrument: String },

    #[error("insufficient data for {instrument}: have {points} points, need {minimum}")]
    InsufficientData {
        instrument: String,
        points: usize,
        minimum: usize,
    },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("analysis cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub(crate) fn storage(reason: impl ToString) -> Self {
        AnalyzerError::Storage {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn data_source(reason: impl ToString) -> Self {
        AnalyzerError::DataSource {
            reason: reason.to_string(),
        }
    }
}

impl From<&AnalyzerError> for std::process::ExitCode {
    fn from(err: &AnalyzerError) -> Self {
        let code: u8 = match err {
            AnalyzerError::Io(_) => 1,
            AnalyzerError::InvalidDateRange { .. }
            | AnalyzerError::InvalidInstrument { .. }
            | AnalyzerError::ConfigParse { .. }
            | AnalyzerError::ConfigMissing { .. }
            | AnalyzerError::ConfigInvalid { .. } => 2,
            AnalyzerError::Storage { .. } => 3,
            AnalyzerError::DataSource { .. } => 4,
            AnalyzerError::NoData { .. }
            | AnalyzerError::EmptySeries { .. }
            | AnalyzerError::InsufficientData { .. } => 5,
            AnalyzerError::Cancelled => 6,
        };
        std::process::ExitCode::from(code)
    }
}
