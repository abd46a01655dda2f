//! Error types for breaker-wrapped calls.

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BreakerError {
    /// The breaker short-circuited the call; the wrapped function never ran.
    #[error("circuit open for '{service}'")]
    Open { service: String },

    /// The wrapped call ran and failed.
    #[error(transparent)]
    Call(#[from] TransportError),
}

impl BreakerError {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }
}
