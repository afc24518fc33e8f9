//! WebSocket transport: upgrade handler, session hub and wire protocol

pub mod handler;
pub mod hub;
pub mod protocol;
