use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Speech/silence state shared by the frame receiver and the interrupt coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechState {
    /// The rendered subject is (or is about to be) speaking on screen
    pub speaking: bool,
    /// An interrupt was sent and queued frames still need reclassifying
    pub interrupted: bool,
    /// Silence flag of the most recently received frame
    pub last_silence_flag: bool,
    /// Index of the most recently enqueued frame
    pub last_frame_idx: u64,
}

impl Default for SpeechState {
    fn default() -> Self {
        Self {
            speaking: false,
            interrupted: false,
            last_silence_flag: true,
            last_frame_idx: 0,
        }
    }
}

/// Mutex-guarded [`SpeechState`]
///
/// Lock order: this lock first, then the video queue, then the audio queue,
/// then the input queue. The guard is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedSpeechState(Arc<Mutex<SpeechState>>);

impl SharedSpeechState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, SpeechState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SpeechState {
        *self.lock()
    }

    pub fn reset(&self) {
        *self.lock() = SpeechState::default();
    }
}
