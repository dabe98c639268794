//! Control protocol implementation
//!
//! Handles command parsing, dispatch, and response generation for the depot
//! control connection.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::{handle_auth_command, handle_command};
