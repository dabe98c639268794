//! Client session loop
//!
//! Reads command lines from an authenticated client, dispatches them through
//! the protocol handlers, and writes back replies until the connection
//! closes.

use log::{error, info, warn};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::client::Session;
use crate::config::{SharedRuntimeConfig, StartupConfig};
use crate::protocol::responses::{self, format_response};
use crate::protocol::{CommandStatus, handle_command, parse_command};
use crate::store::Store;

/// Runs the session loop for one authenticated client.
///
/// Each read is bounded by the configured timeout so a stalled client never
/// parks the task forever; command handlers stream upload/download bodies
/// over the same connection.
pub async fn handle_client(
    cmd_stream: TcpStream,
    sessions: Arc<Mutex<HashSet<SocketAddr>>>,
    client_addr: SocketAddr,
    mut session: Session,
    store: Arc<Store>,
    startup: Arc<StartupConfig>,
    runtime: SharedRuntimeConfig,
) {
    let (read_half, mut write_half) = cmd_stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match timeout(startup.read_timeout(), reader.read_line(&mut line)).await {
            Err(_) => {
                info!("Client {} idle past timeout, closing", client_addr);
                let _ = write_half
                    .write_all(
                        format_response(responses::TRANSFER_ABORTED, "Idle timeout").as_bytes(),
                    )
                    .await;
                break;
            }
            Ok(Ok(0)) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Ok(Ok(_)) => {
                if line.len() > startup.max_command_length {
                    let _ = write_half
                        .write_all(
                            format_response(responses::UNKNOWN_COMMAND, "Command too long")
                                .as_bytes(),
                        )
                        .await;
                    continue;
                }

                let command = parse_command(line.trim_end_matches(['\r', '\n']));
                info!("Received from {}: {:?}", client_addr, command);

                let result = handle_command(
                    &mut session,
                    &command,
                    &store,
                    &startup,
                    &runtime,
                    &mut reader,
                    &mut write_half,
                )
                .await;

                match result.status {
                    CommandStatus::CloseConnection => {
                        if let Some(msg) = result.message {
                            let _ = write_half.write_all(msg.as_bytes()).await;
                        }
                        info!("Closing connection to client {}", client_addr);
                        break;
                    }
                    CommandStatus::Success => {
                        if let Some(msg) = result.message {
                            let _ = write_half.write_all(msg.as_bytes()).await;
                        }
                    }
                    CommandStatus::Failure(reason) => {
                        warn!("Command from {} failed: {}", client_addr, reason);
                        if let Some(msg) = result.message {
                            let _ = write_half.write_all(msg.as_bytes()).await;
                        }
                    }
                }
                let _ = write_half.flush().await;
            }
            Ok(Err(e)) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        }
    }

    sessions.lock().await.remove(&client_addr);
    info!("Client {} disconnected", client_addr);
}
