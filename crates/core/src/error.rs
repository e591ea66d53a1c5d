//! Error taxonomy shared by every remote operation.

use thiserror::Error;

/// Failure of a single remote operation, scoped to the user action that triggered it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Request rejected locally before reaching the network.
    #[error("invalid request: {0}")]
    Validation(String),
    /// The backend reported that the entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend refused the bearer token (or its absence).
    #[error("not authorised: {0}")]
    Unauthorized(String),
    /// Connection, timeout or other transport failure.
    #[error("fetch failed: {0}")]
    Network(String),
    /// Non-success HTTP status other than the ones mapped above.
    #[error("{path} returned HTTP {status}")]
    Status {
        /// Request path that failed.
        path: String,
        /// Numeric HTTP status.
        status: u16,
    },
    /// Response body did not match any known payload shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether a manual retry by the user can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }

    /// Whether the backend explicitly reported the entity as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            FetchError::Decode(error.to_string())
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Decode(error.to_string())
    }
}

/// Result alias for remote operations.
pub type FetchResult<T> = Result<T, FetchError>;
