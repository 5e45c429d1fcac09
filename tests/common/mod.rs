// Shared test doubles: an in-memory renderer session, a manually driven
// playback clock, and frame builders.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use lipsync_bridge::bridge::{BridgeCounters, DecodePolicy, FramePacer, SharedSpeechState};
use lipsync_bridge::error::{BridgeError, Result};
use lipsync_bridge::media::{AudioItem, StreamQueue, VideoItem};
use lipsync_bridge::transport::{ClientMessage, Connector, FrameBatch, RenderedFrameMessage, Transport};
use lipsync_bridge::PlaybackClock;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const FRAME_RATE: u32 = 25;
pub const FRAME_PERIOD: f64 = 1.0 / FRAME_RATE as f64;

// ============================================================================
// In-memory renderer session
// ============================================================================

/// Renderer side of a [`MockTransport`]: inspect what the bridge sent, feed it messages
pub struct MockTransport {
    sent: Mutex<Vec<ClientMessage>>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<std::result::Result<String, String>>>,
    incoming_tx: mpsc::UnboundedSender<std::result::Result<String, String>>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            incoming: tokio::sync::Mutex::new(incoming),
            incoming_tx,
            fail_sends: AtomicBool::new(false),
        })
    }

    /// Everything the bridge has sent so far.
    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_chunks(&self) -> Vec<lipsync_bridge::transport::AudioChunkMessage> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::AudioChunk(chunk) => Some(chunk),
                _ => None,
            })
            .collect()
    }

    pub fn sent_interrupts(&self) -> Vec<u64> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::Interrupt(i) => Some(i.start_frame_idx),
                _ => None,
            })
            .collect()
    }

    /// Deliver a text message to the bridge.
    pub fn push_text(&self, text: impl Into<String>) {
        self.incoming_tx.send(Ok(text.into())).unwrap();
    }

    pub fn push_batch(&self, batch: &FrameBatch) {
        self.push_text(serde_json::to_string(batch).unwrap());
    }

    /// Make the next `recv` fail as if the connection broke.
    pub fn push_error(&self, reason: &str) {
        self.incoming_tx.send(Err(reason.to_string())).unwrap();
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, message: &ClientMessage) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BridgeError::Transport("send failed".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn recv(&self, timeout: Duration) -> Result<Option<String>> {
        let mut incoming = self.incoming.lock().await;
        match tokio::time::timeout(timeout, incoming.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(Ok(text))) => Ok(Some(text)),
            Ok(Some(Err(reason))) => Err(BridgeError::Transport(reason)),
            Ok(None) => Err(BridgeError::Transport("connection closed".to_string())),
        }
    }
}

/// Hands out one shared [`MockTransport`], optionally failing the first attempts
pub struct MockConnector {
    pub transport: Arc<MockTransport>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Self::failing(0)
    }

    pub fn failing(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            transport: MockTransport::new(),
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(BridgeError::Connection {
                url: self.endpoint().to_string(),
                reason: "refused".to_string(),
            });
        }
        let transport: Arc<dyn Transport> = self.transport.clone();
        Ok(transport)
    }

    fn endpoint(&self) -> &str {
        "mock://renderer"
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Playback clock set explicitly by the test
#[derive(Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::SeqCst);
    }
}

impl PlaybackClock for ManualClock {
    fn playback_time(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Frames
// ============================================================================

/// 40ms of 16kHz mono audio as a WAV file
pub fn wav_slice(value: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..640 {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub fn frame(frame_idx: u64, silence_flag: bool) -> RenderedFrameMessage {
    let b64 = base64::engine::general_purpose::STANDARD;
    RenderedFrameMessage {
        frame_idx,
        image: b64.encode([0xFF, 0xD8, 0xFF, 0xD9]),
        audio: b64.encode(wav_slice(frame_idx as i16)),
        silence_flag,
    }
}

/// Batch built from `(frame_idx, silence_flag)` pairs
pub fn batch(frames: &[(u64, bool)]) -> FrameBatch {
    FrameBatch {
        image_data: frames.iter().map(|&(idx, silent)| frame(idx, silent)).collect(),
    }
}

// ============================================================================
// Pacer harness
// ============================================================================

pub struct PacerHarness {
    pub pacer: FramePacer,
    pub state: SharedSpeechState,
    pub video: Arc<StreamQueue<VideoItem>>,
    pub audio: Arc<StreamQueue<AudioItem>>,
    pub clock: Arc<ManualClock>,
    pub counters: Arc<BridgeCounters>,
}

impl PacerHarness {
    pub fn new(decode_policy: DecodePolicy) -> Self {
        let state = SharedSpeechState::new();
        let video = Arc::new(StreamQueue::new());
        let audio = Arc::new(StreamQueue::new());
        let clock = ManualClock::new();
        let counters = Arc::new(BridgeCounters::default());

        let pacer = FramePacer::new(
            FRAME_RATE,
            decode_policy,
            state.clone(),
            Arc::clone(&video),
            Arc::clone(&audio),
            clock.clone(),
            Arc::clone(&counters),
        );

        Self {
            pacer,
            state,
            video,
            audio,
            clock,
            counters,
        }
    }

    pub fn video_indices(&self) -> Vec<u64> {
        let items = self.video.drain_all();
        let idx = items.iter().map(|v| v.frame_idx).collect();
        self.video.extend(items);
        idx
    }

    pub fn audio_indices(&self) -> Vec<u64> {
        let items = self.audio.drain_all();
        let idx = items.iter().map(|a| a.frame_idx).collect();
        self.audio.extend(items);
        idx
    }

    pub fn video_times(&self) -> Vec<f64> {
        let items = self.video.drain_all();
        let times = items.iter().map(|v| v.relative_start_time).collect();
        self.video.extend(items);
        times
    }

    pub fn audio_times(&self) -> Vec<f64> {
        let items = self.audio.drain_all();
        let times = items.iter().map(|a| a.relative_start_time).collect();
        self.audio.extend(items);
        times
    }
}

// ============================================================================
// Async helpers
// ============================================================================

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
