//! DuckDuckGo AI Chat backend - implementation of the ChatBackend port.
//!
//! Protocol:
//!
//! - `GET /duckchat/v1/status` with `x-vqd-accept: 1` negotiates a session;
//!   the token comes back in the `x-vqd-4` response header.
//! - `POST /duckchat/v1/chat` carries `{model, messages}` with the current
//!   token in `x-vqd-4` and yields an SSE reply; the refreshed token for the
//!   next turn arrives in the response's `x-vqd-4` header.

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::Serialize;

use crate::config::UpstreamConfig;
use crate::domain::chat::{ChatModel, Message, SessionToken};
use crate::ports::{BackendError, ChatBackend, ChunkStream, TurnResponse};

use super::sse::{parse_event_line, SseEvent, SseLineDecoder};

/// Session token header, on requests and responses alike.
const VQD_HEADER: &str = "x-vqd-4";

/// Header requesting a token from the status endpoint.
const VQD_ACCEPT_HEADER: &str = "x-vqd-accept";

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: &'a [Message],
}

/// Reqwest-based client for the DuckDuckGo AI Chat endpoints.
pub struct DuckDuckGoBackend {
    config: UpstreamConfig,
    client: Client,
}

impl DuckDuckGoBackend {
    pub fn new(config: UpstreamConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Extracts the session token header; absent or unreadable becomes empty.
    fn token_from_headers(response: &Response) -> SessionToken {
        SessionToken::new(
            response
                .headers()
                .get(VQD_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default(),
        )
    }

    async fn fail_on_status(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatBackend for DuckDuckGoBackend {
    async fn negotiate_session(&self) -> Result<SessionToken, BackendError> {
        let response = self
            .client
            .get(self.config.status_url())
            .header(VQD_ACCEPT_HEADER, "1")
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        let response = Self::fail_on_status(response).await?;

        let token = Self::token_from_headers(&response);
        if token.is_empty() {
            return Err(BackendError::MissingToken);
        }
        Ok(token)
    }

    async fn open_turn(
        &self,
        model: ChatModel,
        history: &[Message],
        token: &SessionToken,
    ) -> Result<TurnResponse, BackendError> {
        let payload = ChatPayload {
            model: model.upstream_id(),
            messages: history,
        };

        let response = self
            .client
            .post(self.config.chat_url())
            .header(VQD_HEADER, token.as_str())
            .header(ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await
            .map_err(|err| BackendError::Network(err.to_string()))?;
        let response = Self::fail_on_status(response).await?;

        let refreshed_token = Self::token_from_headers(&response);
        Ok(TurnResponse {
            refreshed_token,
            chunks: event_stream(response.bytes_stream()),
        })
    }
}

/// Turns a raw byte stream into reply chunks.
///
/// Lines are reassembled across chunk boundaries, malformed events are
/// skipped, and the stream ends at the `[DONE]` sentinel. A transport failure
/// becomes one error item; consumers treat it as early stream end.
fn event_stream<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let chunks = body
        .scan(SseLineDecoder::new(), |decoder, chunk| {
            let events: Vec<Result<SseEvent, BackendError>> = match chunk {
                Ok(bytes) => decoder
                    .push(bytes.as_ref())
                    .into_iter()
                    .filter_map(|line| parse_event_line(&line))
                    .map(Ok)
                    .collect(),
                Err(err) => vec![Err(BackendError::Network(err.to_string()))],
            };
            future::ready(Some(stream::iter(events)))
        })
        .flatten()
        .take_while(|event| future::ready(!matches!(event, Ok(SseEvent::Done))))
        .filter_map(|event| {
            future::ready(match event {
                Ok(SseEvent::Delta(text)) => Some(Ok(text)),
                Ok(SseEvent::Done) => None,
                Err(err) => Some(Err(err)),
            })
        });

    Box::pin(chunks)
}
