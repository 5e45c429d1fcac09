pub mod audio;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod transport;

pub use audio::{AudioChunk, AudioChunker, AudioFile, AudioFrame, AudioUnit, WavRecorder};
pub use bridge::{
    Bridge, BridgeConfig, BridgeOutputs, BridgeStats, DecodePolicy, InterruptOutcome, SpeechState,
};
pub use clock::{MonotonicClock, PlaybackClock};
pub use config::Config;
pub use error::BridgeError;
pub use http::{create_router, AppState};
pub use media::{AudioItem, StreamQueue, VideoItem};
pub use transport::{ClientMessage, Connector, FrameBatch, Transport, WsConnector};
