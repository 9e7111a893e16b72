use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::role::AudioChannelRole;

/// A local audio track produced by one capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    /// Track id as assigned by the capture layer
    pub id: String,
    /// Device label (e.g. "MacBook Pro Microphone", "BlackHole 2ch")
    pub label: String,
}

impl LocalTrack {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A local track with its role fixed, ready to attach as its own track/stream pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedTrack {
    pub track: LocalTrack,
    pub role: AudioChannelRole,
    /// Stream id unique to the role, so role identity survives transport
    pub stream_id: String,
}

/// Role table entry carried in the offer payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRoleAnnouncement {
    pub track_id: String,
    pub stream_id: String,
    pub role: AudioChannelRole,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("role {role} is already tagged on track {existing}")]
    RoleTaken {
        role: AudioChannelRole,
        existing: String,
    },
    #[error("track {0} is already tagged")]
    TrackTaken(String),
}

/// Sender-side tagging of the two capture tracks
#[derive(Debug, Default)]
pub struct TrackRoleTagger {
    tagged: Vec<TaggedTrack>,
}

impl TrackRoleTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `track` with `role`. Each role and each track can be tagged once.
    pub fn tag(
        &mut self,
        track: LocalTrack,
        role: AudioChannelRole,
    ) -> Result<TaggedTrack, TagError> {
        if let Some(existing) = self.tagged.iter().find(|t| t.role == role) {
            return Err(TagError::RoleTaken {
                role,
                existing: existing.track.id.clone(),
            });
        }
        if self.tagged.iter().any(|t| t.track.id == track.id) {
            return Err(TagError::TrackTaken(track.id));
        }

        info!("Tagged track {} ({}) as {}", track.id, track.label, role);

        let tagged = TaggedTrack {
            track,
            role,
            stream_id: role.stream_id(),
        };
        self.tagged.push(tagged.clone());
        Ok(tagged)
    }

    /// Tagged tracks in tagging order
    pub fn tracks(&self) -> &[TaggedTrack] {
        &self.tagged
    }

    pub fn track_for(&self, role: AudioChannelRole) -> Option<&TaggedTrack> {
        self.tagged.iter().find(|t| t.role == role)
    }

    /// Role table for the offer payload
    pub fn announcements(&self) -> Vec<TrackRoleAnnouncement> {
        self.tagged
            .iter()
            .map(|t| TrackRoleAnnouncement {
                track_id: t.track.id.clone(),
                stream_id: t.stream_id.clone(),
                role: t.role,
            })
            .collect()
    }
}
