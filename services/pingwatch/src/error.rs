//! Error types for the pingwatch service

/// Errors that can occur in the pingwatch service
#[derive(Debug, thiserror::Error)]
pub enum PingwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Target {0} not found")]
    NotFound(i64),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("API error: {0}")]
    Api(String),
}

impl From<rusqlite::Error> for PingwatchError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, ref message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                PingwatchError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            other => PingwatchError::Storage(other.to_string()),
        }
    }
}

/// Result type alias for pingwatch operations
pub type Result<T> = std::result::Result<T, PingwatchError>;
