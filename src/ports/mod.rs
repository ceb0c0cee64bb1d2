//! Ports - interfaces between the application core and the outside world.

mod chat_backend;

pub use chat_backend::{BackendError, ChatBackend, ChunkStream, TurnResponse};
