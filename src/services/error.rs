//! Walk and link-source error types.

use thiserror::Error;

use super::feedback::Severity;

/// Failure talking to the link source. Never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Link source request failed: {0}")]
    Transport(String),

    #[error("Link source returned error status: {0}")]
    Status(u16),

    #[error("Link source API error: {0}")]
    Api(String),

    #[error("Failed to decode link source response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the walk engine and run controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("No active page. Start a walk first.")]
    NoSeed,

    #[error("No further links available after backtracking. Walk stopped.")]
    NoLinksAvailable,

    #[error("Unrecognized title: {0:?}")]
    InvalidTitle(String),

    #[error("Walk cannot be resumed without a current page")]
    NotResumable,

    #[error("Branch factor must be between 1 and 50, got {0}")]
    InvalidBranchFactor(usize),

    #[error("Walk was reset while the step was in flight")]
    Superseded,
}

impl WalkError {
    /// Severity used when the error is reported on the feedback channel.
    pub fn severity(&self) -> Severity {
        match self {
            WalkError::NoLinksAvailable | WalkError::Superseded => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether the error stops the run loop.
    pub fn halts_run(&self) -> bool {
        matches!(
            self,
            WalkError::Fetch(_) | WalkError::NoSeed | WalkError::NoLinksAvailable
        )
    }
}

/// Result type for walk operations
pub type WalkResult<T> = Result<T, WalkError>;
