//! FileDepot - a managed file store server
//!
//! Exposes a single rooted directory tree for upload, download, listing,
//! deletion, and hierarchical browsing over a line-oriented control
//! protocol. Every client-supplied path goes through the store's resolver,
//! which guarantees no request can escape the configured root.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod store;

pub use server::Server;
pub use store::Store;
