//! Output media types and the queues that carry them to the host.

pub mod item;
pub mod queue;

pub use item::{decode_audio_slice, decode_base64, AudioItem, Timed, VideoItem, RENDER_SAMPLE_RATE};
pub use queue::StreamQueue;
