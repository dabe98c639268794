//! Server core
//!
//! Owns the listener, the shared store, and the session registry; accepts
//! connections, runs the greeting/authentication phase, and hands
//! authenticated clients to the session loop.

use log::{error, info, warn};
use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::client::{Session, handle_client};
use crate::config::{ServerConfig, SharedRuntimeConfig, StartupConfig};
use crate::protocol::responses::{self, format_response};
use crate::protocol::{CommandStatus, handle_auth_command, parse_command};
use crate::store::Store;

pub struct Server {
    sessions: Arc<Mutex<HashSet<SocketAddr>>>,
    listener: TcpListener,
    store: Arc<Store>,
    startup: Arc<StartupConfig>,
    runtime: SharedRuntimeConfig,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Self {
        let (startup, runtime) = config.split();
        let socket = startup.control_socket();

        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                panic!("Server startup failed on socket {}: {}", socket, e);
            }
        };

        let store = match Store::open(&startup.store_root_path()) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to open store root {}: {}", startup.store_root, e);
                panic!(
                    "Server startup failed: store root {} unusable: {}",
                    startup.store_root, e
                );
            }
        };

        Self {
            sessions: Arc::new(Mutex::new(HashSet::new())),
            listener,
            store,
            startup: Arc::new(startup),
            runtime,
        }
    }

    pub async fn start(&self) {
        info!(
            "Starting file depot server on {} (store root {})",
            self.startup.control_socket(),
            self.store.root_path().display()
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let sessions = Arc::clone(&self.sessions);
                    let store = Arc::clone(&self.store);
                    let startup = Arc::clone(&self.startup);
                    let runtime = Arc::clone(&self.runtime);

                    // Spawn a task per client so the accept loop never blocks
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_new_client(stream, addr, sessions, store, startup, runtime).await
                        {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Handles a new connection: greets, authenticates, registers, and hands
/// off to the session loop.
async fn handle_new_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    sessions: Arc<Mutex<HashSet<SocketAddr>>>,
    store: Arc<Store>,
    startup: Arc<StartupConfig>,
    runtime: SharedRuntimeConfig,
) -> Result<(), io::Error> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    reader
        .get_mut()
        .write_all(format_response(responses::READY, "FileDepot server ready").as_bytes())
        .await?;
    reader.get_mut().flush().await?;

    let mut session = Session::default();

    loop {
        line.clear();
        let n = match timeout(startup.read_timeout(), reader.read_line(&mut line)).await {
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "Client idle during authentication",
                ));
            }
            Ok(read) => read?,
        };
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "Client disconnected during authentication",
            ));
        }

        let command = parse_command(&line);
        let result = handle_auth_command(&mut session, &command, &startup);

        if let Some(msg) = result.message {
            reader.get_mut().write_all(msg.as_bytes()).await?;
            reader.get_mut().flush().await?;
        }
        if matches!(result.status, CommandStatus::CloseConnection) {
            return Ok(());
        }

        if session.is_logged_in() {
            let mut sessions_guard = sessions.lock().await;
            let max_clients = runtime.read().await.max_clients;

            if sessions_guard.len() >= max_clients {
                reader
                    .get_mut()
                    .write_all(
                        format_response(
                            responses::TOO_MANY_CONNECTIONS,
                            "Too many connections. Try again later.",
                        )
                        .as_bytes(),
                    )
                    .await?;
                return Ok(());
            }

            session.set_client_addr(Some(client_addr));
            sessions_guard.insert(client_addr);

            info!(
                "Authenticated client: {} ({}/{} clients)",
                client_addr,
                sessions_guard.len(),
                max_clients
            );

            drop(sessions_guard);

            let cmd_stream = reader.into_inner();

            // Hand off to the session loop
            handle_client(
                cmd_stream,
                sessions,
                client_addr,
                session,
                store,
                startup,
                runtime,
            )
            .await;

            return Ok(());
        }
    }
}
