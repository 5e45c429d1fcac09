use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::DEFAULT_CHUNK_BYTES;

/// What the receiver does with a frame it cannot decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Stop the receiver (and with it the whole bridge)
    #[default]
    Fatal,
    /// Log the frame, drop it, and keep receiving
    SkipFrame,
}

/// Configuration for a bridge session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// WebSocket endpoint of the rendering service
    pub renderer_url: String,

    /// Frame buffer depth requested from the renderer in the handshake
    pub sent_frame_buffer: u32,

    /// Rendered video frame rate
    pub frame_rate: u32,

    /// Size of a full audio chunk in bytes (16 kHz mono PCM16)
    pub chunk_bytes: usize,

    /// Upper bound on any single wait inside the sender and receiver loops
    pub poll_timeout: Duration,

    /// Delay between session checks while the receiver has no session
    pub reconnect_delay: Duration,

    pub decode_policy: DecodePolicy,
}

impl BridgeConfig {
    /// Seconds between consecutive frames.
    pub fn frame_period(&self) -> f64 {
        1.0 / self.frame_rate.max(1) as f64
    }

    /// Frames (about a third of a second) treated as already committed to playback
    /// when computing an interrupt resume point.
    pub fn interrupt_lookahead(&self) -> usize {
        (self.frame_rate / 3) as usize
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            renderer_url: "ws://localhost:8008/ws".to_string(),
            sent_frame_buffer: 20,
            frame_rate: 25,
            chunk_bytes: DEFAULT_CHUNK_BYTES,     // 0.4s at 16kHz mono PCM16
            poll_timeout: Duration::from_millis(200),
            reconnect_delay: Duration::from_millis(100),
            decode_policy: DecodePolicy::Fatal,
        }
    }
}
