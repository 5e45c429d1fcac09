use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the bridge loops
#[derive(Debug, Default)]
pub struct BridgeCounters {
    pub chunks_sent: AtomicU64,
    pub chunks_dropped: AtomicU64,
    pub frames_received: AtomicU64,
    pub reclassifications: AtomicU64,
    pub interrupts_sent: AtomicU64,
}

impl BridgeCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Statistics about a bridge session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Whether the bridge loops are running
    pub is_running: bool,

    /// When the bridge was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Whether a renderer session is open
    pub connected: bool,

    /// Audio chunks transmitted to the renderer
    pub chunks_sent: u64,

    /// Audio chunks discarded because no session was available
    pub chunks_dropped: u64,

    /// Rendered frames enqueued for playback
    pub frames_received: u64,

    /// Bulk reclassifications of queued output
    pub reclassifications: u64,

    /// Interrupt messages sent to the renderer
    pub interrupts_sent: u64,

    /// Queue depths at snapshot time
    pub video_queued: usize,
    pub audio_queued: usize,
    pub input_queued: usize,

    pub speaking: bool,
    pub last_frame_idx: u64,
}
