//! Error handling
//!
//! Defines error types and handling for the file store server.

pub mod types;

pub use types::*;
