//! Duckgate - Streaming Chat Gateway
//!
//! This crate implements a small HTTP gateway in front of the DuckDuckGo AI
//! Chat service. It keeps one conversation per client, forwards each user
//! message with the accumulated history, and aggregates the streamed reply.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
