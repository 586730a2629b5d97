//! WebSocket transport for the push service.
//!
//! # Connection Lifecycle
//!
//! 1. **Connect**: handshake with `<endpoint>/<namespace>`, bounded by the
//!    configured timeout, optionally carrying a bearer token
//! 2. **Send**: commands are written as JSON text frames
//! 3. **Receive**: text frames are decoded into [`ServerEvent`]s; malformed
//!    frames are logged and skipped
//! 4. **Termination**: a close frame, socket error or stream end is reported
//!    once as [`TransportEvent::Closed`] and drops the socket
//!
//! This transport does NOT reconnect on its own; the client decides when to
//! call [`connect`](Transport::connect) again.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use super::{DisconnectReason, Transport, TransportEvent};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::protocol::{ClientCommand, ServerEvent};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push service connection over a (TLS) WebSocket.
pub struct WebSocketTransport {
    url: Url,
    handshake_timeout: Duration,
    auth_token: Option<String>,
    ws: Option<Socket>,
}

impl WebSocketTransport {
    #[must_use]
    pub const fn new(url: Url, handshake_timeout: Duration) -> Self {
        Self {
            url,
            handshake_timeout,
            auth_token: None,
            ws: None,
        }
    }

    /// Build a transport from the `[stream]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint does not resolve to a WebSocket URL.
    pub fn from_config(config: &StreamConfig) -> Result<Self> {
        let transport = Self::new(config.url()?, config.handshake_timeout());
        Ok(match &config.auth_token {
            Some(token) => transport.with_auth_token(token.clone()),
            None => transport,
        })
    }

    /// Send `Authorization: Bearer <token>` with the handshake.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.ws.is_some()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<()> {
        if let Some(mut stale) = self.ws.take() {
            let _ = stale.close(None).await;
        }

        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        info!(url = %self.url, "Connecting to push service");
        let (ws, response) = timeout(self.handshake_timeout, connect_async(request))
            .await
            .map_err(|_| Error::Timeout(self.handshake_timeout))??;
        info!(status = %response.status(), "WebSocket connected");

        self.ws = Some(ws);
        Ok(())
    }

    async fn send(&mut self, command: &ClientCommand) -> Result<()> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected".into()))?;

        let json = command.encode()?;
        debug!(event = command.name(), "Sending command");
        ws.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        let ws = self.ws.as_mut()?;

        loop {
            let reason = match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(bytes = text.len(), "Received WebSocket text frame");
                    match ServerEvent::decode(&text) {
                        Ok(event) => return Some(TransportEvent::Message(event)),
                        Err(e) => {
                            warn!(error = %e, bytes = text.len(), "Failed to parse message");
                            continue;
                        }
                    }
                }
                // tungstenite queues the pong and flushes it on the next read
                Some(Ok(Message::Ping(_))) => {
                    trace!("Received WebSocket ping");
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "WebSocket closed by server");
                    DisconnectReason::ServerInitiated(
                        frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    )
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    error!(error = %e, "WebSocket error");
                    DisconnectReason::TransportError(e.to_string())
                }
                None => {
                    warn!("WebSocket stream ended");
                    DisconnectReason::TransportClosed
                }
            };

            self.ws = None;
            return Some(TransportEvent::Closed(reason));
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            debug!(url = %self.url, "Closing WebSocket");
            if let Err(e) = ws.close(None).await {
                debug!(error = %e, "WebSocket close handshake failed");
            }
        }
    }

    fn endpoint(&self) -> &str {
        self.url.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_resolves_namespace_url() {
        let transport = WebSocketTransport::from_config(&StreamConfig::default()).unwrap();
        assert_eq!(transport.endpoint(), "ws://localhost:3001/metrics");
        assert!(!transport.is_open());
    }

    #[test]
    fn from_config_keeps_auth_token() {
        let config = StreamConfig {
            auth_token: Some("jwt".into()),
            ..StreamConfig::default()
        };
        let transport = WebSocketTransport::from_config(&config).unwrap();
        assert_eq!(transport.auth_token.as_deref(), Some("jwt"));
    }

    #[test]
    fn from_config_rejects_bad_endpoint() {
        let config = StreamConfig {
            endpoint: "not a url".into(),
            ..StreamConfig::default()
        };
        assert!(WebSocketTransport::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn send_without_connection_fails() {
        let mut transport = WebSocketTransport::from_config(&StreamConfig::default()).unwrap();
        let err = transport
            .send(&ClientCommand::GetCurrentMetrics)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn next_event_without_connection_is_none() {
        let mut transport = WebSocketTransport::from_config(&StreamConfig::default()).unwrap();
        assert!(transport.next_event().await.is_none());
    }

    #[tokio::test]
    async fn close_without_connection_is_noop() {
        let mut transport = WebSocketTransport::from_config(&StreamConfig::default()).unwrap();
        transport.close().await;
        transport.close().await;
        assert!(!transport.is_open());
    }
}
