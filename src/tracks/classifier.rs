//! Receiver-side recovery of track roles
//!
//! Classification runs in passes, first hit wins:
//!   1. role announced in the offer payload (by track id, then stream id)
//!   2. exact canonical label on the stream id or the track label
//!   3. device-label substring hints; system-audio hints before microphone hints
//!   4. best-effort fallback to RemoteParticipant
//!
//! Passes 2-4 depend only on the label text, see `classify_label`.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::role::AudioChannelRole;
use super::tagger::TrackRoleAnnouncement;

/// Substrings that mark loopback/system capture devices
const SYSTEM_AUDIO_HINTS: &[&str] = &[
    "system",
    "loopback",
    "stereo mix",
    "blackhole",
    "soundflower",
    "monitor of",
    "what u hear",
    "desktop audio",
    "speaker",
];

/// Substrings that mark microphone devices
const MICROPHONE_HINTS: &[&str] = &["microphone", "headset", "built-in input", "airpods"];

/// Whole-word tokens that mark microphone devices ("mic" would otherwise match "Microsoft")
const MICROPHONE_TOKENS: &[&str] = &["mic", "mike"];

/// How a role was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMethod {
    Announced,
    Exact,
    Heuristic,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub role: AudioChannelRole,
    pub method: ClassificationMethod,
}

/// A remote track as reported by the peer connection's track event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingTrack {
    pub track_id: String,
    pub stream_id: Option<String>,
    pub label: String,
}

/// A remote track bound to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTrack {
    pub track: IncomingTrack,
    pub role: AudioChannelRole,
    pub method: ClassificationMethod,
}

/// Result of binding an incoming track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackBinding {
    pub classified: ClassifiedTrack,
    /// Previous binding for the same role, replaced by this one
    pub replaced: Option<ClassifiedTrack>,
}

/// Classify a track from its label alone.
///
/// Deterministic: the canonical labels map to their role, anything else goes through
/// the hint tables (system audio first), and unrecognized labels fall back to
/// `RemoteParticipant`.
pub fn classify_label(label: &str) -> Classification {
    if let Some(role) = AudioChannelRole::from_label(label) {
        return Classification {
            role,
            method: ClassificationMethod::Exact,
        };
    }

    let lowered = label.to_lowercase();

    if SYSTEM_AUDIO_HINTS.iter().any(|hint| lowered.contains(hint)) {
        return Classification {
            role: AudioChannelRole::RemoteParticipant,
            method: ClassificationMethod::Heuristic,
        };
    }

    let has_mic_token = lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| MICROPHONE_TOKENS.contains(&token));

    if has_mic_token || MICROPHONE_HINTS.iter().any(|hint| lowered.contains(hint)) {
        return Classification {
            role: AudioChannelRole::LocalParticipant,
            method: ClassificationMethod::Heuristic,
        };
    }

    Classification {
        role: AudioChannelRole::RemoteParticipant,
        method: ClassificationMethod::Fallback,
    }
}

/// Binds incoming tracks to the two role slots
#[derive(Debug, Default)]
pub struct TrackRoleClassifier {
    /// Announced roles keyed by track id and by stream id
    announced: HashMap<String, AudioChannelRole>,
    bindings: HashMap<AudioChannelRole, ClassifiedTrack>,
}

impl TrackRoleClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the role table received with the offer
    pub fn announce(&mut self, announcements: &[TrackRoleAnnouncement]) {
        for a in announcements {
            self.announced.insert(a.track_id.clone(), a.role);
            self.announced.insert(a.stream_id.clone(), a.role);
        }
        debug!("Recorded {} track role announcements", announcements.len());
    }

    pub fn classify(&self, track: &IncomingTrack) -> Classification {
        let announced = self.announced.get(&track.track_id).or_else(|| {
            track
                .stream_id
                .as_ref()
                .and_then(|stream_id| self.announced.get(stream_id))
        });

        if let Some(&role) = announced {
            return Classification {
                role,
                method: ClassificationMethod::Announced,
            };
        }

        if let Some(role) = track
            .stream_id
            .as_deref()
            .and_then(AudioChannelRole::from_label)
        {
            return Classification {
                role,
                method: ClassificationMethod::Exact,
            };
        }

        classify_label(&track.label)
    }

    /// Classify and bind `track`; last write wins per role
    pub fn on_track(&mut self, track: IncomingTrack) -> TrackBinding {
        let Classification { role, method } = self.classify(&track);

        match method {
            ClassificationMethod::Fallback => warn!(
                "Track {} ({:?}) matched no role hints, exposing it as {}",
                track.track_id, track.label, role
            ),
            _ => info!(
                "Track {} classified as {} ({:?})",
                track.track_id, role, method
            ),
        }

        let classified = ClassifiedTrack {
            track,
            role,
            method,
        };
        let replaced = self.bindings.insert(role, classified.clone());

        if let Some(previous) = &replaced {
            info!(
                "Track {} replaces {} for {}",
                classified.track.track_id, previous.track.track_id, role
            );
        }

        TrackBinding {
            classified,
            replaced,
        }
    }

    pub fn binding(&self, role: AudioChannelRole) -> Option<&ClassifiedTrack> {
        self.bindings.get(&role)
    }

    pub fn bound_roles(&self) -> usize {
        self.bindings.len()
    }

    /// Forget bindings and announcements (session teardown)
    pub fn clear(&mut self) {
        self.announced.clear();
        self.bindings.clear();
    }
}
