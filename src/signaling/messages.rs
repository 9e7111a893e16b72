use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::negotiation::{IceCandidate, SessionDescription};
use crate::tracks::TrackRoleAnnouncement;

/// Which end of the pairing a message comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerSide {
    /// Desktop capture app: issues the code, sends the offer
    Host,
    /// Browser session: enters the code, answers
    Guest,
}

impl PeerSide {
    pub fn other(self) -> Self {
        match self {
            PeerSide::Host => PeerSide::Guest,
            PeerSide::Guest => PeerSide::Host,
        }
    }
}

impl fmt::Display for PeerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerSide::Host => f.write_str("host"),
            PeerSide::Guest => f.write_str("guest"),
        }
    }
}

/// Messages understood by the signaling service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    RegisterPairingCode {
        code: String,
        #[serde(rename = "expiresAt")]
        expires_at: DateTime<Utc>,
    },
    ConnectWithCode {
        code: String,
    },
    Offer {
        description: SessionDescription,
        /// Explicit role per track; receivers fall back to label heuristics without it
        #[serde(rename = "trackRoles", default)]
        track_roles: Vec<TrackRoleAnnouncement>,
    },
    Answer {
        description: SessionDescription,
    },
    IceCandidate {
        candidate: IceCandidate,
    },
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl SignalMessage {
    pub fn name(&self) -> &'static str {
        match self {
            SignalMessage::RegisterPairingCode { .. } => "register-pairing-code",
            SignalMessage::ConnectWithCode { .. } => "connect-with-code",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::IceCandidate { .. } => "ice-candidate",
            SignalMessage::Disconnect { .. } => "disconnect",
        }
    }
}

/// A signaling message addressed by pairing code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub code: String,
    pub from: PeerSide,
    pub message: SignalMessage,
}
