pub mod chunk;
pub mod file;
pub mod frame;
pub mod recorder;
pub mod resample;

pub use chunk::{AudioChunk, AudioChunker, DEFAULT_CHUNK_BYTES};
pub use file::AudioFile;
pub use frame::{AudioFrame, AudioUnit};
pub use recorder::{RecordingSummary, WavRecorder};
pub use resample::{to_mono_16k, to_pcm_bytes, TARGET_SAMPLE_RATE};
