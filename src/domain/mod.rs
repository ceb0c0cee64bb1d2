//! Domain layer - core types with no I/O.

pub mod chat;
