use anyhow::{Context, Result};
use clap::Parser;
use lipsync_bridge::audio::AudioUnit;
use lipsync_bridge::{
    create_router, AppState, AudioFile, Bridge, Config, MonotonicClock, PlaybackClock,
    StreamQueue, VideoItem, WavRecorder, WsConnector,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Input frame size when streaming a WAV file into the bridge
const INPUT_FRAME_MS: u64 = 100;

#[derive(Debug, Parser)]
#[command(name = "lipsync-bridge", version, about = "Bridge agent speech to a lip-sync renderer")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/lipsync-bridge")]
    config: String,

    /// WAV file to stream into the bridge as the agent's speech
    #[arg(long)]
    input: Option<PathBuf>,

    /// Write the paced output audio to this WAV file
    #[arg(long)]
    record_audio: Option<PathBuf>,

    /// Do not start the HTTP control API
    #[arg(long)]
    no_http: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Lipsync Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Renderer endpoint: {}", cfg.renderer.url);

    let clock: Arc<dyn PlaybackClock> = Arc::new(MonotonicClock::new());
    let bridge = Arc::new(Bridge::new(
        cfg.bridge_config(),
        Arc::new(WsConnector::new(cfg.renderer.url.clone())),
        Arc::clone(&clock),
    ));

    bridge.start().await?;
    let cancel = bridge.cancel_token();
    let outputs = bridge.outputs();

    // Host playback stand-ins
    tokio::spawn(play_video(outputs.video, Arc::clone(&clock), cancel.clone()));
    let recorder_task = match &args.record_audio {
        Some(path) => {
            let recorder = WavRecorder::create(path)?;
            Some(tokio::spawn(recorder.record(outputs.audio, Arc::clone(&clock), cancel.clone())))
        }
        None => {
            let audio = outputs.audio;
            let clock = Arc::clone(&clock);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                while let Some(_item) = next_due(&audio, clock.as_ref(), &cancel).await {}
            });
            None
        }
    };

    if let Some(path) = &args.input {
        let audio = AudioFile::open(path)
            .with_context(|| format!("Failed to open input {}", path.display()))?;
        tokio::spawn(feed_input(audio, bridge.input(), cancel.clone()));
    }

    if !args.no_http {
        let router = create_router(AppState::new(Arc::clone(&bridge)));
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
        info!("HTTP API listening on {}", addr);

        let shutdown = cancel.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                warn!("HTTP server stopped: {}", e);
            }
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
        _ = cancel.cancelled() => warn!("Bridge stopped after a fatal error"),
    }

    let stats = bridge.stop().await?;
    info!(
        "Session summary: {:.1}s, {} chunks sent ({} dropped), {} frames, {} interrupts",
        stats.duration_secs,
        stats.chunks_sent,
        stats.chunks_dropped,
        stats.frames_received,
        stats.interrupts_sent
    );

    if let Some(task) = recorder_task {
        let summary = task.await??;
        info!(
            "Wrote {} audio items ({} samples) to {}",
            summary.items,
            summary.sample_count,
            summary.file_path.display()
        );
    }

    Ok(())
}

/// Push a WAV file into the input queue at real-time pace, then end the utterance.
async fn feed_input(audio: AudioFile, input: Arc<StreamQueue<AudioUnit>>, cancel: CancellationToken) {
    let frames = audio.frames(INPUT_FRAME_MS);
    info!("Streaming {} input frames from {}", frames.len(), audio.path);

    let mut ticker = tokio::time::interval(Duration::from_millis(INPUT_FRAME_MS));
    for frame in frames {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => input.push(AudioUnit::Audio(frame)),
        }
    }

    input.push(AudioUnit::EndOfStream);
    info!("Input stream finished");
}

async fn play_video(video: Arc<StreamQueue<VideoItem>>, clock: Arc<dyn PlaybackClock>, cancel: CancellationToken) {
    while let Some(item) = next_due(&video, clock.as_ref(), &cancel).await {
        debug!(
            "Showing frame {} at {:.2}s ({} bytes, silent={})",
            item.frame_idx,
            item.relative_start_time,
            item.jpeg.len(),
            item.silence_flag
        );
    }
}

/// Dequeue the next item and wait until the playback clock reaches it.
async fn next_due<T: lipsync_bridge::media::Timed>(
    queue: &StreamQueue<T>,
    clock: &dyn PlaybackClock,
    cancel: &CancellationToken,
) -> Option<T> {
    let item = tokio::select! {
        _ = cancel.cancelled() => return None,
        item = queue.pop() => item,
    };

    let wait = item.relative_start_time() - clock.playback_time();
    if wait > 0.0 {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(Duration::from_secs_f64(wait)) => {}
        }
    }

    Some(item)
}
