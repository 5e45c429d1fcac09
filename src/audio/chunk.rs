use tracing::debug;
use uuid::Uuid;

use super::frame::AudioFrame;
use super::resample::{to_mono_16k, to_pcm_bytes};

/// Bytes of 16 kHz mono PCM16 in one full chunk (0.4 s).
pub const DEFAULT_CHUNK_BYTES: usize = 12800;

/// A block of renderer-ready audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// PCM16 mono samples at 16 kHz, little-endian
    pub pcm: Vec<u8>,
    /// Offset of the chunk within the utterance (0 for an end-of-stream flush)
    pub start_seconds: f64,
    /// Duration covered by the chunk (0 for an end-of-stream flush)
    pub duration: f64,
    pub id: Uuid,
}

impl AudioChunk {
    /// Playback length of the PCM payload itself.
    pub fn pcm_duration_seconds(&self) -> f64 {
        self.pcm.len() as f64 / (2.0 * super::resample::TARGET_SAMPLE_RATE as f64)
    }
}

/// Accumulates arbitrary-sized input frames into fixed-size chunks
///
/// A chunk is emitted as soon as the buffer reaches `chunk_bytes`. The only
/// shorter chunk ever produced is the one returned by [`AudioChunker::flush`].
#[derive(Debug)]
pub struct AudioChunker {
    chunk_bytes: usize,
    buffer: Vec<u8>,
    start_seconds: Option<f64>,
    duration: f64,
}

impl AudioChunker {
    pub fn new(chunk_bytes: usize) -> Self {
        Self {
            chunk_bytes,
            buffer: Vec::with_capacity(chunk_bytes),
            start_seconds: None,
            duration: 0.0,
        }
    }

    /// Number of bytes waiting for the next chunk.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Append a frame, returning a chunk once the buffer is full.
    pub fn push(&mut self, frame: &AudioFrame) -> Option<AudioChunk> {
        let bytes = to_pcm_bytes(&to_mono_16k(frame));
        if bytes.is_empty() {
            return None;
        }

        if self.start_seconds.is_none() {
            self.start_seconds = Some(frame.start_seconds);
        }
        self.duration += frame.duration_seconds();
        self.buffer.extend_from_slice(&bytes);

        if self.buffer.len() < self.chunk_bytes {
            return None;
        }

        let chunk = AudioChunk {
            pcm: std::mem::take(&mut self.buffer),
            start_seconds: self.start_seconds.take().unwrap_or_default(),
            duration: std::mem::take(&mut self.duration),
            id: Uuid::new_v4(),
        };

        debug!(
            "Chunk ready: {} bytes, start={:.2}s, duration={:.2}s",
            chunk.pcm.len(),
            chunk.start_seconds,
            chunk.duration
        );

        Some(chunk)
    }

    /// Emit whatever is buffered as a final chunk, if anything is.
    pub fn flush(&mut self) -> Option<AudioChunk> {
        self.start_seconds = None;
        self.duration = 0.0;

        if self.buffer.is_empty() {
            return None;
        }

        let pcm = std::mem::take(&mut self.buffer);
        debug!("Flushing final chunk: {} bytes", pcm.len());

        Some(AudioChunk {
            pcm,
            start_seconds: 0.0,
            duration: 0.0,
            id: Uuid::new_v4(),
        })
    }
}

impl Default for AudioChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_BYTES)
    }
}
