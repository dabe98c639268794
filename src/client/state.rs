//! Client session state
//!
//! Defines the `Session` struct and associated methods to manage connected
//! client state: authentication progress and connection address.

use std::net::SocketAddr;

/// State of one connected client.
#[derive(Default)]
pub struct Session {
    username: Option<String>,
    client_addr: Option<SocketAddr>,
    is_user_valid: bool,
    is_logged_in: bool,
}

impl Session {
    /// Resets the session, logging out and clearing all stored state.
    pub fn logout(&mut self) {
        self.username = None;
        self.client_addr = None;
        self.is_user_valid = false;
        self.is_logged_in = false;
    }

    // --------------------
    // Getter methods
    // --------------------

    /// Whether the username provided by the client was accepted.
    pub fn is_user_valid(&self) -> bool {
        self.is_user_valid
    }

    /// Whether the client has completed authentication.
    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// Username of the client, if set.
    pub fn username(&self) -> Option<&String> {
        self.username.as_ref()
    }

    /// The client's socket address, if known.
    pub fn client_addr(&self) -> Option<&SocketAddr> {
        self.client_addr.as_ref()
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Sets the validity state of the username.
    pub fn set_user_valid(&mut self, valid: bool) {
        self.is_user_valid = valid;
    }

    /// Sets the login state of the client.
    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.is_logged_in = logged_in;
    }

    /// Sets the username of the client.
    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    /// Sets the client's socket address.
    pub fn set_client_addr(&mut self, addr: Option<SocketAddr>) {
        self.client_addr = addr;
    }
}
