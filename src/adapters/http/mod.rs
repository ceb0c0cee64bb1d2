//! HTTP adapter - the REST surface of the gateway.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::GatewayState;
pub use routes::gateway_router;
