//! HTTP handlers for the chat gateway endpoints.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use futures::StreamExt;

use crate::application::ChatService;
use crate::domain::chat::{ChatError, ClientId};

use super::dto::{
    ChatMessageRequest, ChatMessageResponse, DeleteSessionResponse, ErrorResponse, HealthResponse,
};

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct GatewayState {
    pub chat: Arc<ChatService>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Client identification
// ════════════════════════════════════════════════════════════════════════════════

/// Client identity extracted from the `User-ID` request header.
#[derive(Debug, Clone)]
pub struct RequestedClient {
    pub client_id: ClientId,
}

/// Rejection type for RequestedClient extraction.
pub struct MissingClientId;

impl IntoResponse for MissingClientId {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("MISSING_CLIENT_ID", "User-ID header is required");
        (StatusCode::BAD_REQUEST, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for RequestedClient
where
    S: Send + Sync,
{
    type Rejection = MissingClientId;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let client_id = parts
                .headers
                .get("User-ID")
                .and_then(|value| value.to_str().ok())
                .and_then(ClientId::new)
                .ok_or(MissingClientId)?;

            Ok(RequestedClient { client_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /chat/{model} - run one turn and return the aggregated reply
pub async fn send_chat_message(
    State(state): State<GatewayState>,
    Path(model): Path<String>,
    client: RequestedClient,
    Json(request): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse, GatewayApiError> {
    let response = state
        .chat
        .send_message(&client.client_id, &model, &request.message)
        .await?;

    Ok(Json(ChatMessageResponse { response }))
}

/// POST /chat/{model}/stream - run one turn, relaying chunks live over SSE
///
/// Session resolution and the upstream exchange happen before the response
/// starts, so early failures still map to proper status codes. The reply
/// stream ends with a `[DONE]` data event.
pub async fn stream_chat_message(
    State(state): State<GatewayState>,
    Path(model): Path<String>,
    client: RequestedClient,
    Json(request): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse, GatewayApiError> {
    let chunks = state
        .chat
        .open_stream(&client.client_id, &model, &request.message)
        .await?;

    let deltas = futures::stream::unfold(chunks, |mut chunks| async move {
        chunks
            .recv()
            .await
            .map(|delta| (Event::default().data(delta), chunks))
    });
    let stream = deltas
        .chain(futures::stream::once(async {
            Event::default().data("[DONE]")
        }))
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// DELETE /chat/{model} - remove the client's conversation
pub async fn delete_chat_session(
    State(state): State<GatewayState>,
    client: RequestedClient,
) -> Result<impl IntoResponse, GatewayApiError> {
    if state.chat.end_conversation(&client.client_id).await {
        Ok(Json(DeleteSessionResponse {
            message: "Chat session deleted".to_string(),
        }))
    } else {
        Err(GatewayApiError(ChatError::SessionNotFound))
    }
}

/// GET /health - liveness probe, independent of session state
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts chat errors to HTTP responses.
pub struct GatewayApiError(pub ChatError);

impl From<ChatError> for GatewayApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for GatewayApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            ChatError::InvalidModel(_) => (StatusCode::BAD_REQUEST, "INVALID_MODEL"),
            ChatError::SessionNotFound => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ChatError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            ChatError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ChatError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
