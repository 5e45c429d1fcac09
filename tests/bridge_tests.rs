// End-to-end tests for the bridge loops against an in-memory renderer

mod common;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use common::{batch, wait_for, ManualClock, MockConnector};
use lipsync_bridge::audio::{AudioFrame, AudioUnit};
use lipsync_bridge::bridge::{Bridge, BridgeConfig, DecodePolicy};
use lipsync_bridge::transport::{ClientMessage, Connector, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn test_config() -> BridgeConfig {
    BridgeConfig {
        poll_timeout: Duration::from_millis(20),
        reconnect_delay: Duration::from_millis(10),
        ..BridgeConfig::default()
    }
}

fn speech(samples: usize, start_seconds: f64) -> AudioUnit {
    AudioUnit::Audio(AudioFrame {
        samples: vec![500i16; samples],
        sample_rate: 16000,
        channels: 1,
        start_seconds,
    })
}

async fn connected_bridge(config: BridgeConfig) -> Result<(Arc<Bridge>, Arc<MockConnector>)> {
    let connector = MockConnector::new();
    let bridge = Arc::new(Bridge::new(config, connector.clone(), ManualClock::new()));
    bridge.start().await?;

    // Any input unit opens the session
    bridge.input().push(AudioUnit::Control("session-start".to_string()));
    let b = Arc::clone(&bridge);
    assert!(wait_for(WAIT, || b.stats().connected).await, "Bridge never connected");

    Ok((bridge, connector))
}

#[tokio::test]
async fn test_handshake_precedes_audio_chunks() -> Result<()> {
    let connector = MockConnector::new();
    let transport = Arc::clone(&connector.transport);
    let bridge = Bridge::new(test_config(), connector.clone(), ManualClock::new());
    bridge.start().await?;

    // Nothing is sent before audio arrives
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts(), 0, "Connection must be lazy");

    let input = bridge.input();
    for i in 0..6 {
        input.push(speech(1600, i as f64 * 0.1));
    }
    input.push(AudioUnit::EndOfStream);

    assert!(wait_for(WAIT, || transport.sent_chunks().len() == 2).await);

    let sent = transport.sent();
    assert!(matches!(&sent[0], ClientMessage::Handshake(h) if h.metadata.sent_frame_buffer == 20));

    let chunks = transport.sent_chunks();
    let b64 = base64::engine::general_purpose::STANDARD;
    assert_eq!(b64.decode(&chunks[0].audio_data)?.len(), 12800);
    assert_eq!(chunks[0].start_seconds, 0.0);
    assert!((chunks[0].duration - 0.4).abs() < 1e-9);

    // End-of-stream flush
    assert_eq!(b64.decode(&chunks[1].audio_data)?.len(), 6400);
    assert_eq!(chunks[1].start_seconds, 0.0);
    assert_eq!(chunks[1].duration, 0.0);

    let stats = bridge.stop().await?;
    assert_eq!(stats.chunks_sent, 2);
    assert_eq!(stats.chunks_dropped, 0);
    assert_eq!(connector.attempts(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_connect_drops_chunk_and_retries() -> Result<()> {
    let connector = MockConnector::failing(1);
    let transport = Arc::clone(&connector.transport);
    let bridge = Bridge::new(test_config(), connector.clone(), ManualClock::new());
    bridge.start().await?;

    let input = bridge.input();
    // A full chunk with no session is dropped
    input.push(speech(6400, 0.0));
    assert!(wait_for(WAIT, || bridge.stats().chunks_dropped == 1).await);
    assert!(bridge.is_running(), "A failed connect is not fatal");

    // The next unit reconnects
    input.push(speech(6400, 0.4));
    assert!(wait_for(WAIT, || bridge.stats().chunks_sent == 1).await);

    assert_eq!(connector.attempts(), 2);
    let handshakes = transport
        .sent()
        .iter()
        .filter(|m| matches!(m, ClientMessage::Handshake(_)))
        .count();
    assert_eq!(handshakes, 1);

    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_rendered_frames_reach_outputs() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;
    let outputs = bridge.outputs();

    connector.transport.push_batch(&batch(&[(1, true), (2, true), (3, true)]));

    assert!(wait_for(WAIT, || outputs.video.len() == 3).await);
    assert_eq!(outputs.audio.len(), 3);

    let stats = bridge.stats();
    assert_eq!(stats.frames_received, 3);
    assert_eq!(stats.last_frame_idx, 3);

    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_transport_error_stops_all_loops() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;
    let cancel = bridge.cancel_token();

    connector.transport.push_error("connection reset");

    assert!(wait_for(WAIT, || cancel.is_cancelled()).await);
    assert!(!bridge.is_running());

    // The sender has stopped too: new input is never consumed
    bridge.input().push(speech(1600, 0.0));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bridge.input().len(), 1);

    let stats = bridge.stop().await?;
    assert!(!stats.is_running);
    Ok(())
}

#[tokio::test]
async fn test_send_failure_stops_all_loops() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;
    let cancel = bridge.cancel_token();

    connector.transport.fail_sends(true);
    bridge.input().push(speech(6400, 0.0));

    assert!(wait_for(WAIT, || cancel.is_cancelled()).await);
    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_batch_is_fatal_by_default() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;
    let cancel = bridge.cancel_token();

    connector.transport.push_text("{ not json");

    assert!(wait_for(WAIT, || cancel.is_cancelled()).await);
    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_batch_skipped_when_configured() -> Result<()> {
    let config = BridgeConfig {
        decode_policy: DecodePolicy::SkipFrame,
        ..test_config()
    };
    let (bridge, connector) = connected_bridge(config).await?;
    let outputs = bridge.outputs();

    connector.transport.push_text("{ not json");
    connector.transport.push_batch(&batch(&[(1, true)]));

    assert!(wait_for(WAIT, || outputs.video.len() == 1).await);
    assert!(bridge.is_running());

    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_barge_in_sends_interrupt() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;

    connector.transport.push_batch(&batch(&[(1, false), (2, false), (3, false)]));
    let b = Arc::clone(&bridge);
    assert!(wait_for(WAIT, || b.speech_state().speaking && b.stats().frames_received == 3).await);

    bridge.barge_in().send(()).await?;

    let transport = Arc::clone(&connector.transport);
    assert!(wait_for(WAIT, || !transport.sent_interrupts().is_empty()).await);

    // Three queued frames, lookahead of 8 clamped to 3: resume at 1 + 3
    assert_eq!(transport.sent_interrupts(), vec![4]);
    assert!(bridge.speech_state().interrupted);
    assert_eq!(bridge.stats().interrupts_sent, 1);

    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_direct_interrupt_when_idle() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;

    let outcome = bridge.interrupt().await?;

    assert_eq!(outcome, lipsync_bridge::InterruptOutcome::Idle);
    assert!(connector.transport.sent_interrupts().is_empty());

    bridge.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_resets_session_and_state() -> Result<()> {
    let (bridge, connector) = connected_bridge(test_config()).await?;
    connector.transport.push_batch(&batch(&[(1, false)]));
    let b = Arc::clone(&bridge);
    assert!(wait_for(WAIT, || b.speech_state().speaking).await);

    let stats = bridge.stop().await?;

    assert!(!stats.is_running);
    assert_eq!(stats.frames_received, 1);
    assert!(!bridge.stats().connected);
    assert!(!bridge.speech_state().speaking);

    // A stopped bridge cannot be restarted
    assert!(bridge.start().await.is_err());
    Ok(())
}

/// Connector whose connection attempt never completes, like an unreachable host
struct StalledConnector {
    attempted: AtomicBool,
}

#[async_trait]
impl Connector for StalledConnector {
    async fn connect(&self) -> lipsync_bridge::error::Result<Arc<dyn Transport>> {
        self.attempted.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(lipsync_bridge::BridgeError::Connection {
            url: self.endpoint().to_string(),
            reason: "unreachable".to_string(),
        })
    }

    fn endpoint(&self) -> &str {
        "mock://unreachable"
    }
}

#[tokio::test]
async fn test_stop_does_not_wait_for_stalled_connect() -> Result<()> {
    let connector = Arc::new(StalledConnector {
        attempted: AtomicBool::new(false),
    });
    let bridge = Bridge::new(test_config(), connector.clone(), ManualClock::new());
    bridge.start().await?;

    bridge.input().push(speech(1600, 0.0));
    assert!(wait_for(WAIT, || connector.attempted.load(Ordering::SeqCst)).await);

    let stats = tokio::time::timeout(Duration::from_secs(1), bridge.stop()).await??;

    assert!(!stats.is_running);
    assert!(!stats.connected);
    Ok(())
}
