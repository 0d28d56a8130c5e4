use thiserror::Error;

/// Top-level error type for the lineage batch job.
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<::config::ConfigError> for LineageError {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LineageError>;
