//! Session error types.

use thiserror::Error;

/// Errors that can occur while driving a claim session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Storage backend could not read or write a key.
    #[error("storage: {0}")]
    Storage(String),

    /// Storage key is not usable by the backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Persisted session could not be encoded or decoded.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Action not permitted in the current session state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        /// Name of the current state.
        state: &'static str,
        /// Attempted action.
        action: &'static str,
    },

    /// Client identity lookup failed.
    #[error("identity resolution: {0}")]
    Identity(String),
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}
