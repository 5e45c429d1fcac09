use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::AudioChunk;

/// Audio format tag sent with every chunk
pub const AUDIO_FORMAT_PCM_16000: &str = "pcm_16000";

/// Message sent from the bridge to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Handshake(HandshakeMessage),
    AudioChunk(AudioChunkMessage),
    Interrupt(InterruptMessage),
}

impl ClientMessage {
    pub fn handshake(sent_frame_buffer: u32) -> Self {
        ClientMessage::Handshake(HandshakeMessage {
            metadata: HandshakeMetadata { sent_frame_buffer },
        })
    }

    pub fn audio_chunk(chunk: &AudioChunk) -> Self {
        ClientMessage::AudioChunk(AudioChunkMessage {
            audio_data: base64::engine::general_purpose::STANDARD.encode(&chunk.pcm),
            start_seconds: chunk.start_seconds,
            duration: chunk.duration,
            audio_format: AUDIO_FORMAT_PCM_16000.to_string(),
            id: chunk.id,
        })
    }

    pub fn interrupt(start_frame_idx: u64) -> Self {
        ClientMessage::Interrupt(InterruptMessage {
            interrupt: true,
            start_frame_idx,
        })
    }
}

/// Sent once, right after the connection opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub metadata: HandshakeMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeMetadata {
    /// Number of frames the renderer may keep in flight
    pub sent_frame_buffer: u32,
}

/// Audio chunk for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChunkMessage {
    pub audio_data: String,  // Base64-encoded PCM16 16kHz mono
    pub start_seconds: f64,
    pub duration: f64,
    pub audio_format: String,
    pub id: Uuid,
}

/// Barge-in: stop the current utterance and resume rendering at `start_frame_idx`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptMessage {
    pub interrupt: bool,
    pub start_frame_idx: u64,
}

/// Batch of rendered frames received from the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameBatch {
    #[serde(default)]
    pub image_data: Vec<RenderedFrameMessage>,
}

impl FrameBatch {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// One rendered frame as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFrameMessage {
    pub frame_idx: u64,
    pub image: String,  // Base64-encoded JPEG
    pub audio: String,  // Base64-encoded WAV (PCM16 16kHz mono)
    pub silence_flag: bool,
}
