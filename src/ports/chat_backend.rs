//! Chat Backend Port - Interface to the upstream conversational service.
//!
//! The port covers the two calls a conversation needs: negotiating a session
//! token, and opening one chat turn that streams the reply incrementally.
//! Implementations translate between the upstream wire protocol and domain
//! types; the mock implementation lives in `adapters::upstream::mock`.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::chat::{ChatError, ChatModel, Message, SessionToken};

/// Incremental reply text, delivered in upstream event order.
///
/// The stream terminates on the upstream's end-of-reply sentinel, on stream
/// end, or with a single error item on transport failure.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, BackendError>> + Send>>;

/// An opened chat turn: the refreshed session token plus the reply stream.
pub struct TurnResponse {
    /// Token to use for the next turn. Empty when the upstream omitted the
    /// refresh header.
    pub refreshed_token: SessionToken,
    /// Incremental reply chunks.
    pub chunks: ChunkStream,
}

/// Port for the upstream chat service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Negotiates a fresh session token for a new conversation.
    async fn negotiate_session(&self) -> Result<SessionToken, BackendError>;

    /// Opens one chat turn carrying the full history, authenticated with the
    /// conversation's current token.
    ///
    /// A non-success upstream status or transport failure is returned here;
    /// failures after the response opened surface inside the chunk stream.
    async fn open_turn(
        &self,
        model: ChatModel,
        history: &[Message],
        token: &SessionToken,
    ) -> Result<TurnResponse, BackendError>;
}

/// Failure modes at the upstream boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure before or while the request was sent.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The negotiation response carried no session token.
    #[error("upstream response did not include a session token")]
    MissingToken,
}

impl From<BackendError> for ChatError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Network(message) => ChatError::Network(message),
            BackendError::Upstream { status, body } => ChatError::Upstream { status, body },
            BackendError::MissingToken => {
                ChatError::UpstreamUnavailable(BackendError::MissingToken.to_string())
            }
        }
    }
}
