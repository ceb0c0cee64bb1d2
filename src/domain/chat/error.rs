//! Chat error taxonomy.

use thiserror::Error;

/// Errors surfaced by session management and the turn protocol.
///
/// `InvalidModel` is a caller fault; the upstream variants abort only the
/// current request and never leave a partially created session behind.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The caller supplied a model alias outside the recognized set.
    #[error("invalid model alias: {0}")]
    InvalidModel(String),

    /// Session negotiation failed, or the conversation no longer holds a
    /// usable session token.
    #[error("upstream session unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream chat call answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Transport-level failure talking to the upstream service.
    #[error("network error: {0}")]
    Network(String),

    /// Deletion was requested for a client with no stored conversation.
    #[error("no chat session exists for this client")]
    SessionNotFound,
}

impl ChatError {
    /// Whether the error is attributable to the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidModel(_) | Self::SessionNotFound)
    }
}
