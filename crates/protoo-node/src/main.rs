//! protoo demo node
//!
//! - WebSocket endpoint: /v1/ws?peer=...&room=...
//! - one peer per connection, joined to the named room
//! - notifications relayed to the rest of the room

use std::net::SocketAddr;
use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter};

use protoo_node::{app_state, config, router};

const CONFIG_PATH: &str = "protoo.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path).expect("config load failed")
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        config::NodeConfig::default()
    };
    let state = app_state::AppState::new(cfg).expect("invalid config");
    let listen: SocketAddr = state
        .cfg()
        .server
        .listen
        .parse()
        .expect("server.listen must be a valid SocketAddr");

    let app = router::build_router(state);

    tracing::info!(%listen, "protoo-node starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
