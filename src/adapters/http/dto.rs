//! Request/response DTOs for the chat endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST /chat/{model}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageRequest {
    /// The new user message.
    pub message: String,
}

/// Successful reply from `POST /chat/{model}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    /// Full aggregated assistant reply.
    pub response: String,
}

/// Reply from `DELETE /chat/{model}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSessionResponse {
    pub message: String,
}

/// Reply from `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error envelope used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
