//! Frame reception, silence/speech tracking, and playback pacing.
//!
//! Each received frame is first checked against the previous silence flag:
//!
//! ```text
//! silent,  last speaking          -> speech ended, remember it
//! speaking, last silent           -> speech resumed: halve and re-time the queues
//! silent,  interrupt outstanding  -> drop queued frames at or after this one, keep speaking
//! ```
//!
//! and is then scheduled at `max(playback clock, running start time)`.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::DecodePolicy;
use super::state::{SharedSpeechState, SpeechState};
use super::stats::BridgeCounters;
use crate::clock::PlaybackClock;
use crate::error::{BridgeError, Result};
use crate::media::{decode_audio_slice, decode_base64, AudioItem, StreamQueue, Timed, VideoItem};
use crate::transport::{FrameBatch, RenderedFrameMessage, SessionSlot};

/// Turns frame batches into paced video/audio output items
pub struct FramePacer {
    frame_period: f64,
    decode_policy: DecodePolicy,
    state: SharedSpeechState,
    video: Arc<StreamQueue<VideoItem>>,
    audio: Arc<StreamQueue<AudioItem>>,
    clock: Arc<dyn PlaybackClock>,
    counters: Arc<BridgeCounters>,
    running_start_time: f64,
}

impl FramePacer {
    pub fn new(
        frame_rate: u32,
        decode_policy: DecodePolicy,
        state: SharedSpeechState,
        video: Arc<StreamQueue<VideoItem>>,
        audio: Arc<StreamQueue<AudioItem>>,
        clock: Arc<dyn PlaybackClock>,
        counters: Arc<BridgeCounters>,
    ) -> Self {
        Self {
            frame_period: 1.0 / frame_rate.max(1) as f64,
            decode_policy,
            state,
            video,
            audio,
            clock,
            counters,
            running_start_time: 0.0,
        }
    }

    /// Timestamp the next frame will get if the playback clock is behind.
    pub fn running_start_time(&self) -> f64 {
        self.running_start_time
    }

    /// Process one batch, returning the number of frames enqueued.
    pub fn process_batch(&mut self, batch: &FrameBatch) -> Result<usize> {
        let shared = self.state.clone();
        let mut state = shared.lock();

        // Playback has caught up with silence.
        if state.speaking && self.video.peek_with(|v| v.silence_flag) == Some(true) {
            debug!("Playback reached silence, clearing speaking flag");
            state.speaking = false;
        }

        let mut enqueued = 0;
        for frame in &batch.image_data {
            self.reclassify(&mut state, frame);

            match self.enqueue_frame(&mut state, frame) {
                Ok(()) => enqueued += 1,
                Err(e) if self.decode_policy == DecodePolicy::SkipFrame => {
                    warn!("Skipping frame {}: {}", frame.frame_idx, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(enqueued)
    }

    fn reclassify(&self, state: &mut SpeechState, frame: &RenderedFrameMessage) {
        if frame.silence_flag && !state.last_silence_flag {
            debug!("Speech ended at frame {}", frame.frame_idx);
            state.last_silence_flag = true;
        } else if !frame.silence_flag && state.last_silence_flag {
            debug!("Speech resumed at frame {}", frame.frame_idx);
            state.speaking = true;
            state.last_silence_flag = false;

            // While the subject is silent the renderer produces roughly two frames
            // per real-time frame; keeping every other one restores real-time
            // pacing. Empirical, and worth re-checking when the renderer changes.
            let period = self.frame_period;
            let video_kept = self.video.rewrite(|items| keep_alternate(items, period));
            let audio_kept = self.audio.rewrite(|items| keep_alternate(items, period));
            BridgeCounters::incr(&self.counters.reclassifications);

            debug!("Re-timed queued output: {} video, {} audio kept", video_kept, audio_kept);
        } else if frame.silence_flag && state.interrupted {
            let trigger = frame.frame_idx;
            let video_kept = self.video.rewrite(|items| keep_before(items, trigger));
            let audio_kept = self.audio.rewrite(|items| keep_before(items, trigger));
            state.interrupted = false;
            // The kept frames are committed speech; the renderer's next speaking
            // frame must not halve them again.
            state.speaking = true;
            state.last_silence_flag = false;
            BridgeCounters::incr(&self.counters.reclassifications);

            info!(
                "Interrupt applied at frame {}: {} video, {} audio kept",
                trigger, video_kept, audio_kept
            );
        }
    }

    fn enqueue_frame(&mut self, state: &mut SpeechState, frame: &RenderedFrameMessage) -> Result<()> {
        let jpeg = decode_base64("image", &frame.image)?;
        let audio_bytes = decode_base64("audio", &frame.audio)?;
        let (samples, sample_rate, channels) = decode_audio_slice(&audio_bytes)?;

        let start_time = self.clock.playback_time().max(self.running_start_time);

        self.video.push(VideoItem {
            jpeg,
            relative_start_time: start_time,
            frame_idx: frame.frame_idx,
            silence_flag: frame.silence_flag,
        });
        self.audio.push(AudioItem {
            samples,
            sample_rate,
            channels,
            relative_start_time: start_time,
            frame_idx: frame.frame_idx,
        });

        self.running_start_time = start_time + self.frame_period;
        state.last_frame_idx = frame.frame_idx;
        BridgeCounters::incr(&self.counters.frames_received);

        Ok(())
    }
}

/// Keep items 0, 2, 4, ... and lay them back to back from the first item's timestamp.
pub fn keep_alternate<T: Timed>(items: Vec<T>, frame_period: f64) -> Vec<T> {
    let mut start = items.first().map(|i| i.relative_start_time()).unwrap_or(0.0);

    items
        .into_iter()
        .step_by(2)
        .map(|mut item| {
            item.set_relative_start_time(start);
            start += frame_period;
            item
        })
        .collect()
}

/// Keep items rendered strictly before `frame_idx`.
pub fn keep_before<T: Timed>(items: Vec<T>, frame_idx: u64) -> Vec<T> {
    items.into_iter().filter(|i| i.frame_idx() < frame_idx).collect()
}

/// Receives frame batches from the renderer and feeds them to a [`FramePacer`]
pub struct FrameReceiver {
    pacer: FramePacer,
    sessions: Arc<SessionSlot>,
    poll_timeout: Duration,
    reconnect_delay: Duration,
}

impl FrameReceiver {
    pub fn new(
        pacer: FramePacer,
        sessions: Arc<SessionSlot>,
        poll_timeout: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            pacer,
            sessions,
            poll_timeout,
            reconnect_delay,
        }
    }

    /// Run until cancelled. A fatal error cancels `cancel` for every other loop;
    /// any other error is logged and receiving resumes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Frame receiver task started");

        loop {
            match self.receive_loop(&cancel).await {
                Ok(()) => break,
                Err(e) if e.is_fatal() => {
                    error!("Frame receiver stopped: {}", e);
                    cancel.cancel();
                    break;
                }
                Err(e) => warn!("Frame receiver error, continuing: {}", e),
            }
        }

        info!("Frame receiver task stopped");
    }

    async fn receive_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        while !cancel.is_cancelled() {
            let Some(session) = self.sessions.current() else {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.reconnect_delay) => {}
                }
                continue;
            };

            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = session.recv(self.poll_timeout) => received?,
            };

            let Some(text) = received else {
                continue;
            };

            let batch = match FrameBatch::parse(&text) {
                Ok(batch) => batch,
                Err(e) => {
                    let err = BridgeError::Decode(format!("invalid frame batch: {}", e));
                    if self.pacer.decode_policy == DecodePolicy::SkipFrame {
                        warn!("Skipping message: {}", err);
                        continue;
                    }
                    return Err(err);
                }
            };

            let enqueued = self.pacer.process_batch(&batch)?;
            debug!(
                "Received batch of {} frames ({} enqueued, next slot at {:.2}s)",
                batch.image_data.len(),
                enqueued,
                self.pacer.running_start_time()
            );
        }

        Ok(())
    }
}
