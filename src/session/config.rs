use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::code::DEFAULT_CODE_TTL;
use crate::signaling::PeerSide;
use crate::vad::VadConfig;

/// Configuration for a pairing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier, used to scope transcription subjects
    pub session_id: String,

    /// Desktop host (issues codes, offers) or browser guest (enters codes, answers)
    pub side: PeerSide,

    /// Lifetime of an issued pairing code
    /// Default: 5 minutes
    pub code_ttl: Duration,

    /// Voice activity gate settings, shared by both channels
    pub vad: VadConfig,

    /// Payloads longer than this many characters are sent as chunks
    pub chunk_size: usize,

    /// Incomplete chunked messages idle for this long are dropped
    pub chunk_timeout: Duration,

    /// Upper bound on the chunk count a fragment may announce
    pub max_chunks: usize,

    /// Upper bound on chunked messages awaiting fragments at once
    pub max_pending_messages: usize,

    /// How often volume telemetry is sent to the peer
    pub volume_interval: Duration,

    /// How often code expiry and chunk timeouts are checked
    pub housekeeping_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("pairing-{}", uuid::Uuid::new_v4()),
            side: PeerSide::Host,
            code_ttl: DEFAULT_CODE_TTL,
            vad: VadConfig::default(),
            chunk_size: 16 * 1024,
            chunk_timeout: Duration::from_secs(30),
            max_chunks: 4096,
            max_pending_messages: 32,
            volume_interval: Duration::from_millis(100),
            housekeeping_interval: Duration::from_secs(1),
        }
    }
}
