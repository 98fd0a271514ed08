//! Client-side bootstrap: dial a protoo server.

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream};

use protoo_core::error::{ProtooError, Result};

use crate::config::TransportConfig;
use crate::transport::{TungsteniteConnection, WebSocketTransport};

/// WebSocket subprotocol offered and accepted by both sides.
pub const SUBPROTOCOL: &str = "protoo";

pub type ClientTransport = WebSocketTransport<TungsteniteConnection<MaybeTlsStream<TcpStream>>>;

/// Open a WebSocket to `url` and wrap it in an unstarted transport.
pub async fn connect(url: &str, cfg: TransportConfig) -> Result<ClientTransport> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ProtooError::Config(format!("invalid url {url}: {e}")))?;
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));

    tracing::debug!(%url, "connecting");
    let (stream, _response) = connect_async(request)
        .await
        .map_err(|e| ProtooError::Internal(format!("connect failed: {e}")))?;
    tracing::debug!(%url, "websocket handshake completed");

    Ok(WebSocketTransport::new(
        TungsteniteConnection::new(stream),
        cfg,
    ))
}
