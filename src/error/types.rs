//! Error types
//!
//! Defines domain-specific error types for each module of the file store
//! server.

use std::fmt;
use std::io;

/// Store module errors.
///
/// `PathEscape` stays distinct from `NotFound` internally so rejections are
/// loggable and testable, but the protocol layer answers both with the same
/// reply: untrusted callers cannot probe the distinction.
#[derive(Debug)]
pub enum StoreError {
    PathEscape(String),
    NotFound(String),
    NotDirectory(String),
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::PathEscape(p) => write!(f, "Path escapes the store root: {}", p),
            StoreError::NotFound(p) => write!(f, "Not found: {}", p),
            StoreError::NotDirectory(p) => write!(f, "Not a directory: {}", p),
            StoreError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::Io(error)
    }
}

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    InvalidUsername(String),
    InvalidPassword(String),
    UserNotFound(String),
    MalformedInput(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidUsername(u) => write!(f, "Invalid username: {}", u),
            AuthError::InvalidPassword(u) => write!(f, "Invalid password for user: {}", u),
            AuthError::UserNotFound(u) => write!(f, "User not found: {}", u),
            AuthError::MalformedInput(s) => write!(f, "Malformed input: {}", s),
        }
    }
}

impl std::error::Error for AuthError {}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ServerError {
    Store(StoreError),
    Auth(AuthError),
    Io(io::Error),
    Protocol(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Store(e) => write!(f, "Store error: {}", e),
            ServerError::Auth(e) => write!(f, "Authentication error: {}", e),
            ServerError::Io(e) => write!(f, "I/O error: {}", e),
            ServerError::Protocol(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<StoreError> for ServerError {
    fn from(error: StoreError) -> Self {
        ServerError::Store(error)
    }
}

impl From<AuthError> for ServerError {
    fn from(error: AuthError) -> Self {
        ServerError::Auth(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::Io(error)
    }
}
