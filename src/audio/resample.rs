//! Conversion of agent audio to the renderer's input format (16 kHz mono PCM16).

use super::frame::AudioFrame;

/// Sample rate expected by the renderer.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Convert a frame to 16 kHz mono samples.
pub fn to_mono_16k(frame: &AudioFrame) -> Vec<i16> {
    let mono = downmix(&frame.samples, frame.channels);
    resample(&mono, frame.sample_rate, TARGET_SAMPLE_RATE)
}

/// Serialize samples as little-endian PCM16 bytes.
pub fn to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Mix interleaved channels down to mono by averaging.
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / n as i32) as i16
                })
                .collect()
        }
    }
}

/// Linear-interpolation resampler.
fn resample(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate == target_rate || samples.is_empty() || source_rate == 0 {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = pos - idx as f64;
            let a = samples[idx] as f64;
            let b = samples[next] as f64;
            (a + (b - a) * frac).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}
