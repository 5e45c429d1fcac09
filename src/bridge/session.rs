use super::config::BridgeConfig;
use super::interrupt::{InterruptCoordinator, InterruptOutcome};
use super::receiver::{FramePacer, FrameReceiver};
use super::sender::AudioSender;
use super::state::{SharedSpeechState, SpeechState};
use super::stats::{BridgeCounters, BridgeStats};
use crate::audio::AudioUnit;
use crate::clock::PlaybackClock;
use crate::media::{AudioItem, StreamQueue, VideoItem};
use crate::transport::{Connector, SessionSlot};
use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Queues the host reads rendered output from
#[derive(Clone)]
pub struct BridgeOutputs {
    pub video: Arc<StreamQueue<VideoItem>>,
    pub audio: Arc<StreamQueue<AudioItem>>,
}

/// A bridge session between the agent's audio and the lip-sync renderer
///
/// Owns the sender, receiver, and barge-in tasks. All three share one
/// cancellation token: a fatal error in any loop, or [`Bridge::stop`], ends them all.
pub struct Bridge {
    /// Bridge configuration
    config: BridgeConfig,

    /// Lazily opened renderer session
    sessions: Arc<SessionSlot>,

    clock: Arc<dyn PlaybackClock>,

    state: SharedSpeechState,

    /// Agent audio waiting to be chunked
    input: Arc<StreamQueue<AudioUnit>>,

    video: Arc<StreamQueue<VideoItem>>,
    audio: Arc<StreamQueue<AudioItem>>,

    counters: Arc<BridgeCounters>,

    coordinator: Arc<InterruptCoordinator>,

    /// When the bridge was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether the loops have been started
    started: AtomicBool,

    cancel: CancellationToken,

    barge_in_tx: mpsc::Sender<()>,
    barge_in_rx: Mutex<Option<mpsc::Receiver<()>>>,

    /// Handles for the spawned loops
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge {
    /// Create a new bridge. No connection is made until audio arrives.
    pub fn new(
        config: BridgeConfig,
        connector: Arc<dyn Connector>,
        clock: Arc<dyn PlaybackClock>,
    ) -> Self {
        info!("Creating bridge for renderer at {}", connector.endpoint());

        let sessions = Arc::new(SessionSlot::new(connector, config.sent_frame_buffer));
        let state = SharedSpeechState::new();
        let input = Arc::new(StreamQueue::new());
        let video = Arc::new(StreamQueue::new());
        let audio = Arc::new(StreamQueue::new());
        let counters = Arc::new(BridgeCounters::default());

        let coordinator = Arc::new(InterruptCoordinator::new(
            state.clone(),
            Arc::clone(&input),
            Arc::clone(&video),
            Arc::clone(&audio),
            Arc::clone(&sessions),
            Arc::clone(&counters),
            config.interrupt_lookahead(),
        ));

        let (barge_in_tx, barge_in_rx) = mpsc::channel(8);

        Self {
            config,
            sessions,
            clock,
            state,
            input,
            video,
            audio,
            counters,
            coordinator,
            started_at: Utc::now(),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            barge_in_tx,
            barge_in_rx: Mutex::new(Some(barge_in_rx)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Queue the host pushes agent audio into
    pub fn input(&self) -> Arc<StreamQueue<AudioUnit>> {
        Arc::clone(&self.input)
    }

    /// Queues the host consumes rendered output from
    pub fn outputs(&self) -> BridgeOutputs {
        BridgeOutputs {
            video: Arc::clone(&self.video),
            audio: Arc::clone(&self.audio),
        }
    }

    /// Sender for barge-in signals (e.g. from a voice-activity detector)
    pub fn barge_in(&self) -> mpsc::Sender<()> {
        self.barge_in_tx.clone()
    }

    /// Token cancelled when the bridge shuts down for any reason
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn speech_state(&self) -> SpeechState {
        self.state.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    /// Spawn the sender, receiver, and barge-in loops
    pub async fn start(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            anyhow::bail!("Bridge has already been stopped");
        }

        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Bridge already started");
            return Ok(());
        }

        info!("Starting bridge");

        let sender = AudioSender::new(
            self.config.chunk_bytes,
            Arc::clone(&self.input),
            Arc::clone(&self.sessions),
            Arc::clone(&self.counters),
            self.config.poll_timeout,
        );

        let pacer = FramePacer::new(
            self.config.frame_rate,
            self.config.decode_policy,
            self.state.clone(),
            Arc::clone(&self.video),
            Arc::clone(&self.audio),
            Arc::clone(&self.clock),
            Arc::clone(&self.counters),
        );
        let receiver = FrameReceiver::new(
            pacer,
            Arc::clone(&self.sessions),
            self.config.poll_timeout,
            self.config.reconnect_delay,
        );

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(sender.run(self.cancel.clone())));
        tasks.push(tokio::spawn(receiver.run(self.cancel.clone())));

        if let Some(barge_in_rx) = self.barge_in_rx.lock().await.take() {
            let coordinator = Arc::clone(&self.coordinator);
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(listen_for_barge_in(coordinator, barge_in_rx, cancel)));
        }

        info!("Bridge started");

        Ok(())
    }

    /// Interrupt the current utterance directly.
    pub async fn interrupt(&self) -> crate::error::Result<InterruptOutcome> {
        self.coordinator.interrupt().await
    }

    /// Stop all loops, drop the renderer session, and return final stats
    pub async fn stop(&self) -> Result<BridgeStats> {
        info!("Stopping bridge");

        self.cancel.cancel();

        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!("Bridge task panicked: {}", e);
            }
        }

        let stats = self.stats();

        self.sessions.clear();
        self.state.reset();

        info!(
            "Bridge stopped: {} chunks sent, {} frames received, {} interrupts",
            stats.chunks_sent, stats.frames_received, stats.interrupts_sent
        );

        Ok(stats)
    }

    /// Get current bridge statistics
    pub fn stats(&self) -> BridgeStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let state = self.state.snapshot();

        BridgeStats {
            is_running: self.is_running(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            connected: self.sessions.is_connected(),
            chunks_sent: BridgeCounters::get(&self.counters.chunks_sent),
            chunks_dropped: BridgeCounters::get(&self.counters.chunks_dropped),
            frames_received: BridgeCounters::get(&self.counters.frames_received),
            reclassifications: BridgeCounters::get(&self.counters.reclassifications),
            interrupts_sent: BridgeCounters::get(&self.counters.interrupts_sent),
            video_queued: self.video.len(),
            audio_queued: self.audio.len(),
            input_queued: self.input.len(),
            speaking: state.speaking,
            last_frame_idx: state.last_frame_idx,
        }
    }
}

async fn listen_for_barge_in(
    coordinator: Arc<InterruptCoordinator>,
    mut barge_in_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    info!("Barge-in listener started");

    loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => break,
            signal = barge_in_rx.recv() => signal,
        };

        if signal.is_none() {
            break;
        }

        if let Err(e) = coordinator.interrupt().await {
            warn!("Barge-in interrupt failed: {}", e);
        }
    }

    info!("Barge-in listener stopped");
}
