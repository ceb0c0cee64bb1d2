//! Application layer - session registry and the chat turn protocol.

mod chat_service;
mod session_registry;

pub use chat_service::ChatService;
pub use session_registry::SessionRegistry;
