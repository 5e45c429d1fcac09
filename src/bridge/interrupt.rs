use std::sync::Arc;
use tracing::{debug, info};

use super::state::SharedSpeechState;
use super::stats::BridgeCounters;
use crate::audio::AudioUnit;
use crate::error::{BridgeError, Result};
use crate::media::{AudioItem, StreamQueue, VideoItem};
use crate::transport::{ClientMessage, SessionSlot};

/// Result of an interrupt request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// Nothing was playing or pending; no message sent
    Idle,
    /// The renderer was told to resume at `start_frame_idx`
    Sent { start_frame_idx: u64 },
}

/// Handles barge-in: truncates pending speech and tells the renderer where to resume
pub struct InterruptCoordinator {
    state: SharedSpeechState,
    input: Arc<StreamQueue<AudioUnit>>,
    video: Arc<StreamQueue<VideoItem>>,
    audio: Arc<StreamQueue<AudioItem>>,
    sessions: Arc<SessionSlot>,
    counters: Arc<BridgeCounters>,
    lookahead: usize,
}

impl InterruptCoordinator {
    pub fn new(
        state: SharedSpeechState,
        input: Arc<StreamQueue<AudioUnit>>,
        video: Arc<StreamQueue<VideoItem>>,
        audio: Arc<StreamQueue<AudioItem>>,
        sessions: Arc<SessionSlot>,
        counters: Arc<BridgeCounters>,
        lookahead: usize,
    ) -> Self {
        Self {
            state,
            input,
            video,
            audio,
            sessions,
            counters,
            lookahead,
        }
    }

    /// Interrupt the current utterance.
    ///
    /// Errors are reported to the caller but leave the bridge running; a later
    /// barge-in simply tries again.
    pub async fn interrupt(&self) -> Result<InterruptOutcome> {
        let session = self.sessions.current().ok_or(BridgeError::NoSession)?;

        let Some(start_frame_idx) = self.plan() else {
            debug!("Nothing to interrupt");
            return Ok(InterruptOutcome::Idle);
        };

        info!("Interrupting renderer, resuming at frame {}", start_frame_idx);

        if let Err(e) = session.send(&ClientMessage::interrupt(start_frame_idx)).await {
            // The renderer never heard about it; don't reclassify on its behalf.
            self.state.lock().interrupted = false;
            return Err(BridgeError::Interrupt(e.to_string()));
        }

        BridgeCounters::incr(&self.counters.interrupts_sent);
        info!("Interrupt sent");

        Ok(InterruptOutcome::Sent { start_frame_idx })
    }

    /// Steps run under the speech-state lock: check, drain input, pick the resume
    /// frame, and mark the state interrupted. `None` means nothing to interrupt.
    fn plan(&self) -> Option<u64> {
        let mut state = self.state.lock();

        if !state.speaking && self.input.is_empty() {
            return None;
        }

        let dropped = self.input.clear();
        if dropped > 0 {
            debug!("Discarded {} pending input units", dropped);
        }

        let start_frame_idx =
            resume_frame_idx(&self.video, &self.audio, state.last_frame_idx, self.lookahead);
        state.interrupted = true;

        Some(start_frame_idx)
    }
}

/// Pick the frame the renderer should resume from after an interrupt.
///
/// The first `lookahead` queued frames are considered committed to playback.
/// Starting there, walk the audio queue and the (possibly longer) video queue in
/// step and return the last video frame reached. With nothing to walk, fall back
/// to the oldest queued frame (or the one after the last received) plus the
/// offset.
pub fn resume_frame_idx(
    video: &StreamQueue<VideoItem>,
    audio: &StreamQueue<AudioItem>,
    last_frame_idx: u64,
    lookahead: usize,
) -> u64 {
    let video_len = video.len();
    let audio_len = audio.len();
    let diff = video_len.saturating_sub(audio_len);
    let mut i = lookahead.min(audio_len);

    let first_frame_idx = video
        .peek_with(|v| v.frame_idx)
        .unwrap_or(last_frame_idx + 1);

    let mut target = None;
    while audio.get_with(i, |_| ()).is_some() {
        match video.get_with(i + diff, |v| v.frame_idx) {
            Some(frame_idx) => {
                target = Some(frame_idx);
                i += 1;
            }
            None => break,
        }
    }

    target.unwrap_or(first_frame_idx + i as u64)
}
