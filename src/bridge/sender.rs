use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::stats::BridgeCounters;
use crate::audio::{AudioChunk, AudioChunker, AudioUnit};
use crate::error::Result;
use crate::media::StreamQueue;
use crate::transport::{ClientMessage, SessionSlot, Transport};

/// Drains the input audio queue and streams fixed-size chunks to the renderer
pub struct AudioSender {
    chunker: AudioChunker,
    input: Arc<StreamQueue<AudioUnit>>,
    sessions: Arc<SessionSlot>,
    counters: Arc<BridgeCounters>,
    poll_timeout: Duration,
}

impl AudioSender {
    pub fn new(
        chunk_bytes: usize,
        input: Arc<StreamQueue<AudioUnit>>,
        sessions: Arc<SessionSlot>,
        counters: Arc<BridgeCounters>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            chunker: AudioChunker::new(chunk_bytes),
            input,
            sessions,
            counters,
            poll_timeout,
        }
    }

    /// Run until cancelled. A fatal error cancels `cancel` for every other loop;
    /// any other error is logged and sending resumes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Audio sender task started");

        loop {
            match self.send_loop(&cancel).await {
                Ok(()) => break,
                Err(e) if e.is_fatal() => {
                    error!("Audio sender stopped: {}", e);
                    cancel.cancel();
                    break;
                }
                Err(e) => warn!("Audio sender error, continuing: {}", e),
            }
        }

        info!("Audio sender task stopped");
    }

    async fn send_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            let unit = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                unit = tokio::time::timeout(self.poll_timeout, self.input.pop()) => match unit {
                    Ok(unit) => unit,
                    Err(_) => continue,
                },
            };

            // An unreachable renderer can stall the connect; shutdown must not wait on it.
            let session = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                session = self.sessions.ensure() => session,
            };

            let chunk = match unit {
                AudioUnit::Audio(frame) => self.chunker.push(&frame),
                AudioUnit::EndOfStream => {
                    debug!("End of stream, {} bytes buffered", self.chunker.buffered_bytes());
                    self.chunker.flush()
                }
                AudioUnit::Control(marker) => {
                    debug!("Ignoring control unit: {}", marker);
                    continue;
                }
            };

            if let Some(chunk) = chunk {
                self.transmit(session.as_deref(), chunk).await?;
            }
        }
    }

    async fn transmit(&self, session: Option<&dyn Transport>, chunk: AudioChunk) -> Result<()> {
        let Some(session) = session else {
            warn!(
                "No renderer session, dropping chunk {} ({} bytes)",
                chunk.id,
                chunk.pcm.len()
            );
            BridgeCounters::incr(&self.counters.chunks_dropped);
            return Ok(());
        };

        session.send(&ClientMessage::audio_chunk(&chunk)).await?;
        BridgeCounters::incr(&self.counters.chunks_sent);

        debug!(
            "Sent audio chunk {} (bytes={}, audio={:.2}s, start={:.2}s, duration={:.2}s)",
            chunk.id,
            chunk.pcm.len(),
            chunk.pcm_duration_seconds(),
            chunk.start_seconds,
            chunk.duration
        );

        Ok(())
    }
}
