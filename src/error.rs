//! Discovery errors
//!
//! One error type flows through clients, steps and generators unchanged.

use thiserror::Error;

/// Errors surfaced while discovering resources
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The remote API answered with a non-success status
    #[error("{operation} failed with status {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    /// The request never produced a response (connect, timeout, TLS...)
    #[error("{operation} could not be sent: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response could not be interpreted
    #[error("malformed response from {operation}: {reason}")]
    Malformed { operation: String, reason: String },

    /// Invalid or unavailable client/session configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no generator registered for {provider}/{service}")]
    UnknownGenerator { provider: String, service: String },

    /// A generator definition is internally inconsistent
    #[error("invalid definition for {kind}: {reason}")]
    Definition { kind: String, reason: String },
}

impl DiscoveryError {
    pub fn malformed(operation: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for failures reported by the remote side or the transport
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Api { .. } | Self::Transport { .. } | Self::Malformed { .. }
        )
    }
}

pub type Result<T, E = DiscoveryError> = std::result::Result<T, E>;
