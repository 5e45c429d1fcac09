use base64::Engine;
use std::io::Cursor;

use crate::error::{BridgeError, Result};

/// Sample rate of audio slices produced by the renderer.
pub const RENDER_SAMPLE_RATE: u32 = 16000;

/// One rendered video frame scheduled for playback
#[derive(Debug, Clone, PartialEq)]
pub struct VideoItem {
    /// JPEG-encoded image
    pub jpeg: Vec<u8>,
    /// Playback timestamp in seconds
    pub relative_start_time: f64,
    /// Server-assigned frame index
    pub frame_idx: u64,
    /// Whether the rendered subject is silent in this frame
    pub silence_flag: bool,
}

/// One rendered audio slice scheduled for playback
#[derive(Debug, Clone, PartialEq)]
pub struct AudioItem {
    /// PCM16 mono samples
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Playback timestamp in seconds
    pub relative_start_time: f64,
    /// Index of the frame this slice was rendered with
    pub frame_idx: u64,
}

impl AudioItem {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels.max(1) as f64)
    }
}

/// Timing accessors shared by both output item kinds.
pub trait Timed {
    fn relative_start_time(&self) -> f64;
    fn set_relative_start_time(&mut self, t: f64);
    fn frame_idx(&self) -> u64;
}

impl Timed for VideoItem {
    fn relative_start_time(&self) -> f64 {
        self.relative_start_time
    }

    fn set_relative_start_time(&mut self, t: f64) {
        self.relative_start_time = t;
    }

    fn frame_idx(&self) -> u64 {
        self.frame_idx
    }
}

impl Timed for AudioItem {
    fn relative_start_time(&self) -> f64 {
        self.relative_start_time
    }

    fn set_relative_start_time(&mut self, t: f64) {
        self.relative_start_time = t;
    }

    fn frame_idx(&self) -> u64 {
        self.frame_idx
    }
}

pub fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| BridgeError::Decode(format!("{} is not valid base64: {}", field, e)))
}

/// Decode a rendered audio slice into PCM16 samples.
///
/// Slices normally arrive as WAV; a payload without a RIFF header is taken as
/// bare little-endian PCM16 at [`RENDER_SAMPLE_RATE`].
pub fn decode_audio_slice(bytes: &[u8]) -> Result<(Vec<i16>, u32, u16)> {
    if bytes.starts_with(b"RIFF") {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| BridgeError::Decode(format!("invalid WAV audio: {}", e)))?;
        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(BridgeError::Decode(format!(
                "expected PCM16 audio, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }
        let samples = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::Decode(format!("truncated WAV audio: {}", e)))?;
        return Ok((samples, spec.sample_rate, spec.channels));
    }

    if bytes.len() % 2 != 0 {
        return Err(BridgeError::Decode(format!(
            "raw PCM16 audio has odd length {}",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok((samples, RENDER_SAMPLE_RATE, 1))
}
