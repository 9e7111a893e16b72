use serde::{Deserialize, Serialize};

use crate::control::{TranscriptPhase, TranscriptStatus, TranscriptText};
use crate::tracks::AudioChannelRole;

/// Audio frame message published to NATS for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub role: AudioChannelRole,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    /// Marks the end of a speaking turn; `pcm` is empty
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the STT service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    /// Channel the text was recognized on; older publishers omit it
    #[serde(default)]
    pub role: Option<AudioChannelRole>,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl TranscriptMessage {
    /// Live transcription text for the UI; untagged text is attributed to the local participant
    pub fn to_transcript_text(&self, timestamp: i64) -> TranscriptText {
        let (phase, status) = if self.partial {
            (TranscriptPhase::Recognizing, TranscriptStatus::Pending)
        } else {
            (TranscriptPhase::Recognized, TranscriptStatus::Received)
        };

        TranscriptText {
            role: self.role.unwrap_or(AudioChannelRole::LocalParticipant),
            text: self.text.clone(),
            phase,
            status,
            timestamp,
        }
    }
}
