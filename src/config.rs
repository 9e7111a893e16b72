use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::session::SessionConfig;
use crate::signaling::PeerSide;
use crate::vad::VadConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub pairing: PairingConfig,
    pub vad: VadConfig,
    pub control: ControlConfig,
    pub telemetry: TelemetryConfig,
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
pub struct NatsConfig {
    pub url: String,
    /// Prefix for signaling subjects (`<prefix>.signal.<code>`)
    pub subject_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct PairingConfig {
    pub code_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ControlConfig {
    pub chunk_size: usize,
    pub chunk_timeout_secs: u64,
    pub max_chunks: usize,
    pub max_pending_messages: usize,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryConfig {
    pub volume_interval_ms: u64,
    pub housekeeping_interval_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        let config: Self = settings.try_deserialize()?;
        config.vad.validate()?;

        Ok(config)
    }

    /// Session settings for one side of a pairing
    pub fn session_config(&self, side: PeerSide) -> SessionConfig {
        SessionConfig {
            side,
            code_ttl: Duration::from_secs(self.pairing.code_ttl_secs),
            vad: self.vad,
            chunk_size: self.control.chunk_size,
            chunk_timeout: Duration::from_secs(self.control.chunk_timeout_secs),
            max_chunks: self.control.max_chunks,
            max_pending_messages: self.control.max_pending_messages,
            volume_interval: Duration::from_millis(self.telemetry.volume_interval_ms),
            housekeeping_interval: Duration::from_millis(self.telemetry.housekeeping_interval_ms),
            ..SessionConfig::default()
        }
    }
}
