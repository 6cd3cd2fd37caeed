use thiserror::Error;

/// Main error type for benchviz
#[derive(Error, Debug)]
pub enum BenchVizError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed benchmark name {name:?}: {reason}")]
    MalformedName { name: String, reason: String },

    #[error("History document contains no snapshots")]
    EmptyHistory,

    #[error("Snapshot {0} contains no usable benchmarks")]
    EmptySnapshot(usize),

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Control group {group} received {actual} values, expected {expected}")]
    ControlMismatch {
        group: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid form: {0}")]
    InvalidForm(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<toml::de::Error> for BenchVizError {
    fn from(error: toml::de::Error) -> Self {
        BenchVizError::Config(error.to_string())
    }
}

impl From<toml::ser::Error> for BenchVizError {
    fn from(error: toml::ser::Error) -> Self {
        BenchVizError::Config(error.to_string())
    }
}

impl BenchVizError {
    /// Whether the error was caused by the caller's input rather than the data
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BenchVizError::UnknownField(_)
                | BenchVizError::ControlMismatch { .. }
                | BenchVizError::InvalidForm(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BenchVizError>;
