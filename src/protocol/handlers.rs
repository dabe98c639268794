//! Command handlers for the depot control protocol.
//!
//! Dispatches parsed commands to the store, streams upload and download
//! bodies over the control connection, and shapes store results into
//! protocol replies.

use log::{info, warn};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time::timeout;

use crate::auth;
use crate::client::Session;
use crate::config::{SharedRuntimeConfig, StartupConfig};
use crate::protocol::responses::{self, format_response, store_error_reply};
use crate::protocol::{Command, CommandResult, CommandStatus};
use crate::store::Store;

/// Dispatches a command from an authenticated session.
pub async fn handle_command<R, W>(
    session: &mut Session,
    command: &Command,
    store: &Store,
    startup: &StartupConfig,
    runtime: &SharedRuntimeConfig,
    reader: &mut R,
    writer: &mut W,
) -> CommandResult
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match command {
        Command::QUIT => handle_cmd_quit(session),
        Command::PING => handle_cmd_ping(),
        Command::LIST => handle_cmd_list(store, writer).await,
        Command::PUT { size, path } => {
            handle_cmd_put(store, startup, runtime, reader, writer, *size, path).await
        }
        Command::GET(path) => handle_cmd_get(store, startup, writer, path).await,
        Command::DEL(path) => handle_cmd_del(store, path).await,
        Command::BROWSE(path) => handle_cmd_browse(store, writer, path).await,
        Command::USER(_) | Command::PASS(_) => {
            CommandResult::success(format_response(responses::OK, "Already logged in"))
        }
        Command::UNKNOWN => handle_cmd_unknown(),
    }
}

/// Dispatches a command during the authentication phase.
pub fn handle_auth_command(
    session: &mut Session,
    command: &Command,
    startup: &StartupConfig,
) -> CommandResult {
    match command {
        Command::USER(username) => handle_cmd_user(session, username, startup),
        Command::PASS(password) => handle_cmd_pass(session, password, startup),
        Command::QUIT => handle_cmd_quit(session),
        _ => CommandResult::failure(
            "authentication required",
            format_response(responses::AUTH_FAILED, "Please login with USER and PASS"),
        ),
    }
}

/// Handles QUIT: logs the session out and signals connection close.
fn handle_cmd_quit(session: &mut Session) -> CommandResult {
    session.logout();
    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(format_response(responses::GOODBYE, "Goodbye")),
    }
}

fn handle_cmd_ping() -> CommandResult {
    CommandResult::success(format_response(responses::OK, "Hello from FileDepot"))
}

fn handle_cmd_unknown() -> CommandResult {
    CommandResult::failure(
        "unknown command",
        format_response(responses::UNKNOWN_COMMAND, "Unknown command"),
    )
}

/// Handles USER: validates the username and advances the auth state.
fn handle_cmd_user(session: &mut Session, username: &str, startup: &StartupConfig) -> CommandResult {
    match auth::validate_user(username, startup) {
        Ok(()) => {
            session.set_user_valid(true);
            session.set_logged_in(false);
            session.set_username(Some(username.to_string()));
            CommandResult::success(format_response(
                responses::PASSWORD_REQUIRED,
                "Password required",
            ))
        }
        Err(e) => {
            session.set_user_valid(false);
            session.set_logged_in(false);
            session.set_username(None);
            info!("Rejected USER command: {}", e);
            CommandResult::failure(
                e.to_string(),
                format_response(responses::AUTH_FAILED, "Login incorrect"),
            )
        }
    }
}

/// Handles PASS: validates the password if a username was accepted first.
fn handle_cmd_pass(session: &mut Session, password: &str, startup: &StartupConfig) -> CommandResult {
    if !session.is_user_valid() {
        return CommandResult::failure(
            "no username",
            format_response(responses::AUTH_FAILED, "Please enter the username first"),
        );
    }

    let Some(username) = session.username().cloned() else {
        return CommandResult::failure(
            "no username",
            format_response(responses::AUTH_FAILED, "Please enter the username first"),
        );
    };

    match auth::validate_password(&username, password, startup) {
        Ok(()) => {
            session.set_logged_in(true);
            CommandResult::success(format_response(responses::LOGIN_SUCCESS, "Login successful"))
        }
        Err(e) => {
            session.set_logged_in(false);
            info!("Rejected PASS command for {}: {}", username, e);
            CommandResult::failure(
                e.to_string(),
                format_response(responses::AUTH_FAILED, "Login incorrect"),
            )
        }
    }
}

/// Handles PUT: announces readiness, then streams exactly `size` body bytes
/// from the control connection into the store.
async fn handle_cmd_put<R, W>(
    store: &Store,
    startup: &StartupConfig,
    runtime: &SharedRuntimeConfig,
    reader: &mut R,
    writer: &mut W,
    size: u64,
    path: &str,
) -> CommandResult
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (max_bytes, max_mb) = {
        let runtime = runtime.read().await;
        (runtime.max_file_size_bytes(), runtime.max_file_size_mb)
    };
    if size > max_bytes {
        return CommandResult::failure(
            "upload too large",
            format_response(
                responses::FILE_TOO_LARGE,
                &format!("File too large (max {} MB)", max_mb),
            ),
        );
    }

    let ready = format_response(
        responses::OPENING,
        &format!("Ready to receive {} bytes", size),
    );
    if send(writer, &ready).await.is_err() {
        return close_quietly();
    }

    let mut body = ExactBody::new(reader, size);
    match timeout(startup.read_timeout(), store.upload(path, &mut body)).await {
        Err(_) => {
            warn!("Upload of {} timed out", path);
            close_with(format_response(
                responses::TRANSFER_ABORTED,
                "Transfer timed out",
            ))
        }
        Ok(Ok(written)) => CommandResult::success(format_response(
            responses::TRANSFER_COMPLETE,
            &format!("Stored {} bytes", written),
        )),
        Ok(Err(e)) => {
            // Resync the control channel: whatever part of the declared
            // body the store did not consume still sits on the wire.
            let drained = timeout(
                startup.read_timeout(),
                tokio::io::copy(&mut body, &mut tokio::io::sink()),
            )
            .await;
            match drained {
                Ok(Ok(_)) => CommandResult::failure(e.to_string(), store_error_reply(&e)),
                _ => close_with(store_error_reply(&e)),
            }
        }
    }
}

/// Handles GET: announces the length, then streams the file to the client.
async fn handle_cmd_get<W>(
    store: &Store,
    startup: &StartupConfig,
    writer: &mut W,
    path: &str,
) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let (file, len) = match store.download(path) {
        Ok(opened) => opened,
        Err(e) => return CommandResult::failure(e.to_string(), store_error_reply(&e)),
    };

    let opening = format_response(
        responses::OPENING,
        &format!("Opening data stream ({} bytes)", len),
    );
    if send(writer, &opening).await.is_err() {
        return close_quietly();
    }

    let mut file = tokio::fs::File::from_std(file);
    match timeout(startup.read_timeout(), tokio::io::copy(&mut file, writer)).await {
        Err(_) => {
            warn!("Download of {} timed out", path);
            close_quietly()
        }
        Ok(Err(e)) => {
            warn!("Download of {} aborted: {}", path, e);
            close_quietly()
        }
        Ok(Ok(sent)) => CommandResult::success(format_response(
            responses::TRANSFER_COMPLETE,
            &format!("Transfer complete ({} bytes)", sent),
        )),
    }
}

/// Handles LIST: streams the relative path of every stored file.
async fn handle_cmd_list<W>(store: &Store, writer: &mut W) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let paths = match store.list_all() {
        Ok(paths) => paths,
        Err(e) => return CommandResult::failure(e.to_string(), store_error_reply(&e)),
    };

    let mut body = format_response(responses::OPENING, "Listing follows");
    for path in &paths {
        body.push_str(path);
        body.push_str("\r\n");
    }
    if send(writer, &body).await.is_err() {
        return close_quietly();
    }

    CommandResult::success(format_response(
        responses::TRANSFER_COMPLETE,
        &format!("End of list ({} files)", paths.len()),
    ))
}

/// Handles DEL: removes one file from the store.
async fn handle_cmd_del(store: &Store, path: &str) -> CommandResult {
    match store.delete(path).await {
        Ok(()) => {
            CommandResult::success(format_response(responses::ACTION_COMPLETE, "File deleted"))
        }
        Err(e) => CommandResult::failure(e.to_string(), store_error_reply(&e)),
    }
}

/// Handles BROWSE: streams one rendered directory level.
///
/// Body lines use the `P|parent`, `D|name|path`, `F|name|path` record
/// format.
async fn handle_cmd_browse<W>(store: &Store, writer: &mut W, path: &str) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let view = match store.browse(path) {
        Ok(view) => view,
        Err(e) => return CommandResult::failure(e.to_string(), store_error_reply(&e)),
    };

    let mut body = format_response(responses::OPENING, "Browse follows");
    if let Some(parent) = &view.parent {
        body.push_str(&format!("P|{}\r\n", parent));
    }
    for dir in &view.directories {
        body.push_str(&format!("D|{}|{}\r\n", dir.name, dir.path));
    }
    for file in &view.files {
        body.push_str(&format!("F|{}|{}\r\n", file.name, file.path));
    }
    if send(writer, &body).await.is_err() {
        return close_quietly();
    }

    CommandResult::success(format_response(
        responses::TRANSFER_COMPLETE,
        "End of browse",
    ))
}

async fn send<W>(writer: &mut W, message: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(message.as_bytes()).await?;
    writer.flush().await
}

fn close_with(message: String) -> CommandResult {
    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(message),
    }
}

fn close_quietly() -> CommandResult {
    CommandResult {
        status: CommandStatus::CloseConnection,
        message: None,
    }
}

/// Adapter that reads exactly `size` bytes from the control connection.
///
/// Yields EOF once the declared size is consumed, and turns a connection
/// closed mid-body into an `UnexpectedEof` error so a truncated upload never
/// publishes.
struct ExactBody<'a, R> {
    inner: &'a mut R,
    remaining: u64,
}

impl<'a, R: AsyncRead + Unpin> ExactBody<'a, R> {
    fn new(inner: &'a mut R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ExactBody<'_, R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.remaining == 0 {
            return Poll::Ready(Ok(()));
        }

        let limit = self.remaining.min(buf.remaining() as u64) as usize;
        let slice = buf.initialize_unfilled_to(limit);
        let mut window = ReadBuf::new(&mut slice[..limit]);
        match Pin::new(&mut *self.inner).poll_read(cx, &mut window) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Ready(Ok(())) => {
                let n = window.filled().len();
                if n == 0 {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before the declared upload size",
                    )));
                }
                buf.advance(n);
                self.remaining -= n as u64;
                Poll::Ready(Ok(()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn exact_body_stops_at_declared_size() {
        let mut source: &[u8] = b"0123456789tail";
        let mut body = ExactBody::new(&mut source, 10);
        let mut collected = Vec::new();
        body.read_to_end(&mut collected).await.unwrap();
        assert_eq!(collected, b"0123456789");
    }

    #[tokio::test]
    async fn exact_body_rejects_short_streams() {
        let mut source: &[u8] = b"abc";
        let mut body = ExactBody::new(&mut source, 10);
        let mut collected = Vec::new();
        let err = body.read_to_end(&mut collected).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
