use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::tracks::TaggedTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Session description exchanged through signaling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

/// ICE candidate for trickle signaling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    /// Candidate string
    pub candidate: String,
    /// SDP media stream identification
    #[serde(default)]
    pub sdp_mid: Option<String>,
    /// SDP media line index
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// The peer connection transport, provided by the embedding application
///
/// `create_offer` / `create_answer` also apply the result as the local description.
#[async_trait::async_trait]
pub trait PeerConnection: Send {
    /// Attach one tagged track as its own track/stream pair
    async fn add_track(&mut self, track: &TaggedTrack) -> Result<()>;

    async fn create_offer(&mut self) -> Result<SessionDescription>;

    async fn create_answer(&mut self) -> Result<SessionDescription>;

    async fn set_remote_description(&mut self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<()>;

    /// Send one text frame on the ordered, reliable control data channel
    async fn send_data(&mut self, text: String) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Creates a fresh peer connection for each pairing attempt
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn PeerConnection>>;
}
