use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::{ClientMessage, Connector, Transport};
use crate::error::{BridgeError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on opening the WebSocket, including the TCP and HTTP upgrade.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connects to the renderer's WebSocket endpoint
pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>> {
        let connecting = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()));
        let (stream, _response) = connecting
            .await
            .map_err(|_| BridgeError::Connection {
                url: self.url.clone(),
                reason: format!("timed out after {:?}", self.connect_timeout),
            })?
            .map_err(|e| BridgeError::Connection {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Arc::new(WsTransport::new(stream)))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// WebSocket session split into independently locked halves
///
/// Sends (audio chunks, interrupts) and receives (frame batches) never
/// contend for the same lock.
pub struct WsTransport {
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WsTransport {
    pub fn new(stream: WsStream) -> Self {
        let (sink, stream) = stream.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, message: &ClientMessage) -> Result<()> {
        let text = serde_json::to_string(message)
            .map_err(|e| BridgeError::Transport(format!("failed to encode message: {}", e)))?;

        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| BridgeError::Transport(format!("send failed: {}", e)))
    }

    async fn recv(&self, timeout: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut stream = self.stream.lock().await;

        loop {
            let next = match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            };

            match next {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("{} {}", f.code, f.reason))
                        .unwrap_or_else(|| "no close frame".to_string());
                    return Err(BridgeError::Transport(format!(
                        "renderer closed the connection: {}",
                        reason
                    )));
                }
                Some(Ok(other)) => {
                    debug!("Ignoring non-text WebSocket message ({} bytes)", other.len());
                }
                Some(Err(e)) => {
                    return Err(BridgeError::Transport(format!("receive failed: {}", e)));
                }
                None => {
                    return Err(BridgeError::Transport("connection closed".to_string()));
                }
            }
        }
    }
}
