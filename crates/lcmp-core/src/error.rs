use std::time::Duration;

use thiserror::Error;

/// Failure reported by an environment collaborator for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Session or credentials are invalid or expired.
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("{0}")]
    Transient(String),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    pub fn auth(message: impl Into<String>) -> Self {
        SourceError::Auth(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        SourceError::Transient(message.into())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::Auth(_))
    }
}

/// Errors that make an environment's inventory unusable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authentication failed for {environment} environment: {message}")]
    Auth {
        environment: String,
        message: String,
    },
    #[error("listing functions in {environment} environment failed: {source}")]
    Listing {
        environment: String,
        #[source]
        source: SourceError,
    },
}

impl FetchError {
    pub fn environment(&self) -> &str {
        match self {
            FetchError::Auth { environment, .. } | FetchError::Listing { environment, .. } => {
                environment
            }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Auth { .. })
    }
}
