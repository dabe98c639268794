//! Command definitions and parsing
//!
//! Defines the control-channel command set of the depot server and the
//! parsing logic that turns raw client lines into commands.

/// A command parsed from client input.
///
/// Commands that take a path keep it as the raw client string; validation
/// happens in the store's path resolver, never here.
#[derive(Debug, PartialEq)]
pub enum Command {
    QUIT,
    LIST,
    PING,
    USER(String),
    PASS(String),
    /// Upload: declared body size in bytes, then the target path.
    PUT { size: u64, path: String },
    GET(String),
    DEL(String),
    /// Browse a directory level; empty path is the store root.
    BROWSE(String),
    UNKNOWN,
}

/// Outcome status of executing a command.
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Full result of a command execution.
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message.into()),
        }
    }

    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failure(reason.into()),
            message: Some(message.into()),
        }
    }
}

/// Parses a raw command line received from a client.
///
/// Validates required arguments and returns `UNKNOWN` if a known command is
/// misused.
pub fn parse_command(raw: &str) -> Command {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim();

    match cmd.as_str() {
        "QUIT" | "Q" => Command::QUIT,
        "LIST" => Command::LIST,
        "PING" => Command::PING,
        "USER" if !arg.is_empty() => Command::USER(arg.to_string()),
        "PASS" if !arg.is_empty() => Command::PASS(arg.to_string()),
        "PUT" if !arg.is_empty() => parse_put(arg),
        "GET" if !arg.is_empty() => Command::GET(arg.to_string()),
        "DEL" if !arg.is_empty() => Command::DEL(arg.to_string()),
        "BROWSE" => Command::BROWSE(arg.to_string()),
        _ => Command::UNKNOWN,
    }
}

/// `PUT <size> <path>` - the size comes first so the path may contain
/// whitespace.
fn parse_put(arg: &str) -> Command {
    let mut parts = arg.splitn(2, char::is_whitespace);
    let size = parts.next().and_then(|s| s.parse::<u64>().ok());
    let path = parts.next().unwrap_or("").trim();

    match (size, path.is_empty()) {
        (Some(size), false) => Command::PUT {
            size,
            path: path.to_string(),
        },
        _ => Command::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("QUIT"), Command::QUIT);
        assert_eq!(parse_command("list"), Command::LIST);
        assert_eq!(parse_command("PING"), Command::PING);
    }

    #[test]
    fn parses_path_arguments() {
        assert_eq!(
            parse_command("GET a/b.txt"),
            Command::GET("a/b.txt".to_string())
        );
        assert_eq!(
            parse_command("DEL old.log"),
            Command::DEL("old.log".to_string())
        );
    }

    #[test]
    fn browse_accepts_empty_path() {
        assert_eq!(parse_command("BROWSE"), Command::BROWSE(String::new()));
        assert_eq!(
            parse_command("BROWSE docs"),
            Command::BROWSE("docs".to_string())
        );
    }

    #[test]
    fn parses_put_with_size_and_path() {
        assert_eq!(
            parse_command("PUT 1024 reports/q1 final.pdf"),
            Command::PUT {
                size: 1024,
                path: "reports/q1 final.pdf".to_string()
            }
        );
    }

    #[test]
    fn rejects_malformed_put() {
        assert_eq!(parse_command("PUT"), Command::UNKNOWN);
        assert_eq!(parse_command("PUT notasize a.txt"), Command::UNKNOWN);
        assert_eq!(parse_command("PUT 42"), Command::UNKNOWN);
    }

    #[test]
    fn unknown_commands_fall_through() {
        assert_eq!(parse_command("NOOP"), Command::UNKNOWN);
        assert_eq!(parse_command(""), Command::UNKNOWN);
        assert_eq!(parse_command("USER"), Command::UNKNOWN);
    }
}
