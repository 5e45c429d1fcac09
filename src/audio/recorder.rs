use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::frame::AudioFrame;
use super::resample::to_mono_16k;
use crate::clock::PlaybackClock;
use crate::media::{AudioItem, StreamQueue, RENDER_SAMPLE_RATE};

/// Summary of a finished playback recording
#[derive(Debug, Clone)]
pub struct RecordingSummary {
    pub file_path: PathBuf,
    /// Number of audio items written
    pub items: usize,
    /// Number of samples written
    pub sample_count: usize,
    /// Timestamp of the last item written, in seconds
    pub last_start_time: f64,
}

/// Playback sink that drains the audio output queue into a WAV file
///
/// Stands in for a host player: items are dequeued in order and written once the
/// playback clock reaches their start time.
pub struct WavRecorder {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    summary: RecordingSummary,
}

impl WavRecorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RENDER_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        Ok(Self {
            writer: Some(writer),
            summary: RecordingSummary {
                file_path,
                items: 0,
                sample_count: 0,
                last_start_time: 0.0,
            },
        })
    }

    /// Append one slice, converting it to 16 kHz mono if it arrived in another format.
    pub fn write_item(&mut self, item: &AudioItem) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            let converted;
            let samples = if item.sample_rate == RENDER_SAMPLE_RATE && item.channels == 1 {
                &item.samples
            } else {
                converted = to_mono_16k(&AudioFrame {
                    samples: item.samples.clone(),
                    sample_rate: item.sample_rate,
                    channels: item.channels,
                    start_seconds: item.relative_start_time,
                });
                &converted
            };

            for &sample in samples {
                writer.write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }

            self.summary.items += 1;
            self.summary.sample_count += samples.len();
            self.summary.last_start_time = item.relative_start_time;
        }

        Ok(())
    }

    /// Consume audio items until `cancel` fires, then finalize the file.
    pub async fn record(
        mut self,
        queue: Arc<StreamQueue<AudioItem>>,
        clock: Arc<dyn PlaybackClock>,
        cancel: CancellationToken,
    ) -> Result<RecordingSummary> {
        info!("Recording playback audio to {}", self.summary.file_path.display());

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => break,
                item = queue.pop() => item,
            };

            let wait = item.relative_start_time - clock.playback_time();
            if wait > 0.0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs_f64(wait)) => {}
                }
            }

            self.write_item(&item)?;
        }

        self.finish()
    }

    pub fn finish(mut self) -> Result<RecordingSummary> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()
                .context("Failed to finalize WAV file")?;
        }

        info!(
            "Playback recording complete: {} items, {} samples",
            self.summary.items, self.summary.sample_count
        );

        Ok(self.summary.clone())
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
