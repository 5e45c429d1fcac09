use thiserror::Error;

/// Errors raised by the bridge loops and the transport session.
///
/// Receive timeouts are not errors: [`crate::transport::Transport::recv`]
/// reports them as `Ok(None)`.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Renderer unreachable. Retried lazily on the next input unit.
    #[error("failed to connect to renderer at {url}: {reason}")]
    Connection { url: String, reason: String },

    /// No session has been established yet.
    #[error("no renderer session")]
    NoSession,

    /// Send/receive failure on an open session. Fatal to the owning loop.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed server payload.
    #[error("malformed frame payload: {0}")]
    Decode(String),

    /// Failure while computing or sending an interrupt. Never fatal.
    #[error("interrupt failed: {0}")]
    Interrupt(String),
}

impl BridgeError {
    /// Whether this error should tear down the loop that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Transport(_) | BridgeError::Decode(_))
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
