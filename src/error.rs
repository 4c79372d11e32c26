//! Error types for the tiered cache access layer
//!
//! The taxonomy is deliberately closed: call sites branch on kind, never on
//! string comparison. `NotFound` is an authoritative outcome, not a failure.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tiered cache access layer
#[derive(Error, Debug)]
pub enum Error {
    /// Clean miss reported by a reachable remote tier. Authoritative: the
    /// caller must never fall through to a stale local copy.
    #[error("key not found")]
    NotFound,

    /// Session establishment against a remote endpoint failed. When this
    /// happens against the primary it triggers backoff marking.
    #[error("connect to {endpoint} failed: {cause}")]
    ConnectFailure { endpoint: String, cause: String },

    /// Session established but the remote operation itself failed with
    /// something other than not-found. Never affects backoff state.
    #[error("{op} against {endpoint} failed: {cause}")]
    OperationFailure {
        endpoint: String,
        op: &'static str,
        cause: String,
    },

    /// Aggregate outcome: neither primary nor backup could be reached.
    /// This is the trigger for fallback-store consultation.
    #[error("no remote tier reachable: {cause}")]
    RemoteUnavailable { cause: String },

    /// No remote endpoints exist at all.
    #[error("no remote servers available")]
    NoServersConfigured,

    /// The local shared-state store reported a failure. The only error a
    /// caller can see from `set`, and only when the remote path also failed.
    #[error("shared state error: {0}")]
    SharedState(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the authoritative clean-miss outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// True when no remote tier could be reached (including the case where
    /// none was ever configured). Both conditions route reads and writes to
    /// the local fallback store.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Error::RemoteUnavailable { .. } | Error::NoServersConfigured
        )
    }

    /// Build a `ConnectFailure` from any displayable cause.
    pub fn connect_failure(endpoint: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Error::ConnectFailure {
            endpoint: endpoint.into(),
            cause: cause.to_string(),
        }
    }

    /// Build an `OperationFailure` from any displayable cause.
    pub fn operation_failure(
        endpoint: impl Into<String>,
        op: &'static str,
        cause: impl std::fmt::Display,
    ) -> Self {
        Error::OperationFailure {
            endpoint: endpoint.into(),
            op,
            cause: cause.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
