//! Persistence of event aggregates and the AI question catalog.
//!
//! The engine keeps the authoritative copy in memory and writes whole documents
//! through a [`game_store::GameStore`] on every committed mutation.

pub mod game_store;
/// Persisted document shapes.
pub mod models;
pub mod storage;
