//! Upstream adapters - clients for the chat backend port.

mod duckduckgo;
mod mock;
mod sse;

pub use duckduckgo::DuckDuckGoBackend;
pub use mock::{MockChatBackend, MockTurn, RecordedTurn};
pub use sse::{parse_event_line, SseEvent, SseLineDecoder};
