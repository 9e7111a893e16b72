use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::ConnectionState;
use crate::signaling::PeerSide;
use crate::tracks::AudioChannelRole;

/// Per-role counter pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCounts {
    pub local_participant: u64,
    pub remote_participant: u64,
}

impl RoleCounts {
    pub fn increment(&mut self, role: AudioChannelRole) {
        match role {
            AudioChannelRole::LocalParticipant => self.local_participant += 1,
            AudioChannelRole::RemoteParticipant => self.remote_participant += 1,
        }
    }

    pub fn get(&self, role: AudioChannelRole) -> u64 {
        match role {
            AudioChannelRole::LocalParticipant => self.local_participant,
            AudioChannelRole::RemoteParticipant => self.remote_participant,
        }
    }
}

/// Snapshot of a pairing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub side: PeerSide,

    /// Effective state (an expired pairing attempt reports disconnected)
    pub state: ConnectionState,

    /// Current pairing code, if one is outstanding
    pub code: Option<String>,
    pub code_expires_at: Option<DateTime<Utc>>,

    /// Audio frames forwarded to transcription
    pub frames_forwarded: RoleCounts,

    /// Audio frames held back by the gate
    pub frames_gated: RoleCounts,

    /// Chunked messages fully reassembled
    pub messages_reassembled: u64,

    /// Control messages rejected by the codec
    pub messages_rejected: u64,

    /// Chunked messages waiting for fragments
    pub pending_chunk_messages: usize,

    /// Remote ICE candidates applied / failed
    pub candidates_applied: u64,
    pub candidates_failed: u64,

    /// Remote ICE candidates waiting for the remote description
    pub pending_candidates: usize,

    /// Roles with a bound incoming track
    pub bound_roles: usize,
}
