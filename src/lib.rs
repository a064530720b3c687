//! Library crate for qr-hunt-back, the game-state engine of a QR scavenger hunt.
//!
//! Exposes the modules used by the server binary, the OpenAPI generator and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
