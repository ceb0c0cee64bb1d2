//! Axum router configuration for the gateway.
//!
//! # Routes
//! - `POST /chat/:model` - run one turn, aggregated reply
//! - `POST /chat/:model/stream` - run one turn, chunks relayed over SSE
//! - `DELETE /chat/:model` - delete the client's conversation
//! - `GET /health` - liveness probe

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{
    delete_chat_session, health, send_chat_message, stream_chat_message, GatewayState,
};

/// Create the gateway router with CORS applied.
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/chat/:model",
            post(send_chat_message).delete(delete_chat_session),
        )
        .route("/chat/:model/stream", post(stream_chat_message))
        .route("/health", get(health))
        .layer(cors_layer())
        .with_state(state)
}

/// Permissive CORS policy: the gateway fronts browser extensions and local
/// tooling on arbitrary origins.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS, Method::DELETE])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("user-id"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("cache-control"),
        ])
}
