//! Adapters - implementations at the edges of the application.

pub mod http;
pub mod upstream;
