use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::bridge::{BridgeConfig, DecodePolicy};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub renderer: RendererConfig,
    pub bridge: BridgeSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RendererConfig {
    pub url: String,
    pub sent_frame_buffer: u32,
    pub frame_rate: u32,
}

#[derive(Debug, Deserialize)]
pub struct BridgeSettings {
    pub chunk_bytes: usize,
    pub poll_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
    pub decode_policy: DecodePolicy,
}

impl Config {
    /// Load configuration from built-in defaults, an optional file at `path`
    /// (any format the `config` crate recognises by extension), and
    /// `LIPSYNC__SECTION__KEY` environment variables, in increasing priority.
    pub fn load(path: &str) -> Result<Self> {
        let defaults = BridgeConfig::default();

        let settings = config::Config::builder()
            .set_default("service.name", "lipsync-bridge")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8080_i64)?
            .set_default("renderer.url", defaults.renderer_url.clone())?
            .set_default("renderer.sent_frame_buffer", defaults.sent_frame_buffer as i64)?
            .set_default("renderer.frame_rate", defaults.frame_rate as i64)?
            .set_default("bridge.chunk_bytes", defaults.chunk_bytes as i64)?
            .set_default("bridge.poll_timeout_ms", defaults.poll_timeout.as_millis() as i64)?
            .set_default("bridge.reconnect_delay_ms", defaults.reconnect_delay.as_millis() as i64)?
            .set_default("bridge.decode_policy", "fatal")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LIPSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Runtime settings for the bridge
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            renderer_url: self.renderer.url.clone(),
            sent_frame_buffer: self.renderer.sent_frame_buffer,
            frame_rate: self.renderer.frame_rate,
            chunk_bytes: self.bridge.chunk_bytes,
            poll_timeout: Duration::from_millis(self.bridge.poll_timeout_ms),
            reconnect_delay: Duration::from_millis(self.bridge.reconnect_delay_ms),
            decode_policy: self.bridge.decode_policy,
        }
    }
}
