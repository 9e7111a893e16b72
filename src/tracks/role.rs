use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic role of one of the two captured audio channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioChannelRole {
    /// The person practising: their microphone
    LocalParticipant,
    /// The counterpart: system/loopback audio from the meeting app
    RemoteParticipant,
}

impl AudioChannelRole {
    pub const ALL: [AudioChannelRole; 2] = [
        AudioChannelRole::LocalParticipant,
        AudioChannelRole::RemoteParticipant,
    ];

    /// Canonical wire label, also used as the track/stream tag
    pub fn label(self) -> &'static str {
        match self {
            AudioChannelRole::LocalParticipant => "localParticipant",
            AudioChannelRole::RemoteParticipant => "remoteParticipant",
        }
    }

    /// Stream id the sender attaches this role's track under
    pub fn stream_id(self) -> String {
        format!("{}-stream", self.label())
    }

    pub fn counterpart(self) -> Self {
        match self {
            AudioChannelRole::LocalParticipant => AudioChannelRole::RemoteParticipant,
            AudioChannelRole::RemoteParticipant => AudioChannelRole::LocalParticipant,
        }
    }

    /// Exact match against the canonical labels (stream ids included)
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| label == role.label() || label == role.stream_id())
    }
}

impl fmt::Display for AudioChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
