//! FileDepot Server - Entry Point
//!
//! A managed file store server exposing upload, download, listing,
//! deletion, and directory browsing over a line-oriented control protocol.

use log::info;

use filedepot_server::Server;
use filedepot_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching file depot server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => panic!("Failed to load configuration: {}", e),
    };

    let server = Server::new(config).await;
    server.start().await;
}
