//! Server core functionality
//!
//! Contains the accept loop, connection bootstrap, and shared server state.

pub mod core;

pub use core::Server;
