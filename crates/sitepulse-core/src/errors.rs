//! Error types for the results pipeline.

/// Pipeline errors.
///
/// Data-shape problems (missing fields, malformed values) never surface
/// here: they degrade to unavailable fields during reconstruction. These
/// variants cover request-shape and infrastructure failures only.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No points exist for the requested run id. Distinct from a run whose
    /// points exist but whose fields are all unavailable.
    #[error("no data for test run: {test_id}")]
    RunNotFound { test_id: String },

    /// Comparison called with the wrong number of run ids.
    #[error("comparison requires 2 or 3 test run ids, got {got}")]
    InvalidComparison { got: usize },

    /// The runner's results directory for a run is missing entirely.
    #[error("results directory not found: {path}")]
    ResultsNotFound { path: String },

    /// The backing point store failed a write or read.
    #[error("store error: {message}")]
    Store { message: String },
}

impl CoreError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations.
pub type CoreResult<T> = Result<T, CoreError>;
