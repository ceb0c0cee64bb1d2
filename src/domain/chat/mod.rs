//! Chat domain: conversations, messages, models, and their errors.

mod client;
mod conversation;
mod error;
mod message;
mod model;

pub use client::ClientId;
pub use conversation::{Conversation, SessionToken};
pub use error::ChatError;
pub use message::{Message, Role};
pub use model::ChatModel;
