//! The duplex bridge between agent audio and the lip-sync renderer
//!
//! This module provides the `Bridge` abstraction that manages:
//! - Chunking agent audio and streaming it to the renderer
//! - Receiving rendered frames and pacing them onto the playback clock
//! - Silence/speech tracking and reclassification of queued output
//! - Barge-in handling and renderer resynchronisation
//! - Shared shutdown of all loops

mod config;
mod interrupt;
mod receiver;
mod sender;
mod session;
mod state;
mod stats;

pub use config::{BridgeConfig, DecodePolicy};
pub use interrupt::{resume_frame_idx, InterruptCoordinator, InterruptOutcome};
pub use receiver::{keep_alternate, keep_before, FramePacer, FrameReceiver};
pub use sender::AudioSender;
pub use session::{Bridge, BridgeOutputs};
pub use state::{SharedSpeechState, SpeechState};
pub use stats::{BridgeCounters, BridgeStats};
