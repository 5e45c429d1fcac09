/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Offset of the first sample within the utterance, in seconds
    pub start_seconds: f64,
}

impl AudioFrame {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// One unit read from the input audio stream
#[derive(Debug, Clone, PartialEq)]
pub enum AudioUnit {
    /// Synthesized speech
    Audio(AudioFrame),
    /// The current utterance has ended; the stream may resume later
    EndOfStream,
    /// Non-audio session marker from the upstream agent
    Control(String),
}
