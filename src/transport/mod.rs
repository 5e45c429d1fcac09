//! Bidirectional session with the rendering service.

pub mod messages;
pub mod session;
pub mod websocket;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

pub use messages::{
    AudioChunkMessage, ClientMessage, FrameBatch, HandshakeMessage, HandshakeMetadata,
    InterruptMessage, RenderedFrameMessage, AUDIO_FORMAT_PCM_16000,
};
pub use session::SessionSlot;
pub use websocket::{WsConnector, WsTransport, DEFAULT_CONNECT_TIMEOUT};

/// An open, message-oriented session
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one JSON message.
    async fn send(&self, message: &ClientMessage) -> Result<()>;

    /// Receive the next text message, or `None` if nothing arrived within `timeout`.
    async fn recv(&self, timeout: Duration) -> Result<Option<String>>;
}

/// Opens new sessions to the renderer
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn Transport>>;

    /// Endpoint description for logging
    fn endpoint(&self) -> &str;
}
