use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use super::{ClientMessage, Connector, Transport};
use crate::error::{BridgeError, Result};

/// Holds the current renderer session, if any, and opens one on demand
///
/// Shared by the sender, the receiver, and the interrupt coordinator.
pub struct SessionSlot {
    connector: Arc<dyn Connector>,
    sent_frame_buffer: u32,
    session: RwLock<Option<Arc<dyn Transport>>>,
}

impl SessionSlot {
    pub fn new(connector: Arc<dyn Connector>, sent_frame_buffer: u32) -> Self {
        Self {
            connector,
            sent_frame_buffer,
            session: RwLock::new(None),
        }
    }

    /// The open session, if one exists.
    pub fn current(&self) -> Option<Arc<dyn Transport>> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    /// Open a new session and send the handshake.
    pub async fn connect(&self) -> Result<Arc<dyn Transport>> {
        info!("Connecting to renderer at {}", self.connector.endpoint());

        let transport = self.connector.connect().await?;

        transport
            .send(&ClientMessage::handshake(self.sent_frame_buffer))
            .await
            .map_err(|e| BridgeError::Connection {
                url: self.connector.endpoint().to_string(),
                reason: format!("handshake failed: {}", e),
            })?;

        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&transport));

        info!(
            "Connected to renderer (sent_frame_buffer={})",
            self.sent_frame_buffer
        );

        Ok(transport)
    }

    /// Return the open session, connecting lazily if there is none.
    ///
    /// A failed attempt is logged and reported as `None`; the caller retries
    /// on its next unit of work.
    pub async fn ensure(&self) -> Option<Arc<dyn Transport>> {
        if let Some(session) = self.current() {
            return Some(session);
        }

        match self.connect().await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Renderer connection failed: {}", e);
                None
            }
        }
    }

    /// Forget the current session.
    pub fn clear(&self) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
