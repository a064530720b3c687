//! Request and response payloads of the HTTP, SSE and WebSocket surfaces.

pub mod admin;
pub mod common;
pub mod health;
pub mod host;
pub mod player;
pub mod sse;
pub mod state;
pub mod validation;
pub mod ws;
