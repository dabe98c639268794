//! Authentication validator
//!
//! Implements username and password validation against the static in-memory
//! credential store.

use super::credentials::CREDENTIALS;
use crate::config::StartupConfig;
use crate::error::AuthError;

/// Basic input sanitation for usernames and passwords.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.trim().is_empty() && input.len() <= max_length && !input.contains(['\r', '\n', '\0'])
}

/// Validates that the given username exists in the credential store.
pub fn validate_user(username: &str, config: &StartupConfig) -> Result<(), AuthError> {
    if !is_valid_input(username, config.max_username_length) {
        return Err(AuthError::MalformedInput("Invalid username format".into()));
    }

    if CREDENTIALS.contains_key(username) {
        Ok(())
    } else {
        Err(AuthError::UserNotFound(username.to_string()))
    }
}

/// Validates that the provided password matches the stored password for the
/// username.
pub fn validate_password(
    username: &str,
    password: &str,
    config: &StartupConfig,
) -> Result<(), AuthError> {
    if !is_valid_input(password, config.max_username_length) {
        return Err(AuthError::MalformedInput("Invalid password format".into()));
    }

    match CREDENTIALS.get(username) {
        Some(stored) if stored == &password => Ok(()),
        Some(_) => Err(AuthError::InvalidPassword(username.to_string())),
        None => Err(AuthError::UserNotFound(username.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartupConfig;

    fn startup() -> StartupConfig {
        StartupConfig {
            bind_address: "127.0.0.1".into(),
            port: 2121,
            store_root: "./depot_root".into(),
            read_timeout_secs: 30,
            max_command_length: 512,
            max_username_length: 64,
        }
    }

    #[test]
    fn accepts_known_credentials() {
        let config = startup();
        assert!(validate_user("admin", &config).is_ok());
        assert!(validate_password("admin", "password", &config).is_ok());
    }

    #[test]
    fn rejects_wrong_password() {
        let config = startup();
        assert!(matches!(
            validate_password("admin", "nope", &config),
            Err(AuthError::InvalidPassword(_))
        ));
    }

    #[test]
    fn rejects_unknown_user() {
        let config = startup();
        assert!(matches!(
            validate_user("mallory", &config),
            Err(AuthError::UserNotFound(_))
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        let config = startup();
        assert!(matches!(
            validate_user("", &config),
            Err(AuthError::MalformedInput(_))
        ));
        assert!(matches!(
            validate_user("a\r\nb", &config),
            Err(AuthError::MalformedInput(_))
        ));
    }
}
