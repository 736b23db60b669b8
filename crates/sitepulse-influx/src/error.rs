//! Error types for the store adapter.

/// Adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum InfluxError {
    /// Transport failure talking to the store.
    #[error("store unreachable: {message}")]
    Network { message: String },

    /// Token rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// The store answered with a non-success status.
    #[error("store error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The query response could not be parsed.
    #[error("malformed query response: {message}")]
    InvalidResponse { message: String },

    /// Configuration problem (missing env var, bad URL).
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl InfluxError {
    /// Whether a retry can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for InfluxError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

impl From<InfluxError> for sitepulse_core::CoreError {
    fn from(err: InfluxError) -> Self {
        sitepulse_core::CoreError::store(err.to_string())
    }
}

/// Result type for adapter operations.
pub type InfluxResult<T> = Result<T, InfluxError>;
