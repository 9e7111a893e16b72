//! Audio track roles
//!
//! The sender tags its two capture tracks (microphone and system audio) before they
//! are attached to the connection; the receiver recovers those roles from incoming
//! track events and keeps one binding per role.

mod classifier;
mod role;
mod tagger;

pub use classifier::{
    classify_label, Classification, ClassificationMethod, ClassifiedTrack, IncomingTrack,
    TrackBinding, TrackRoleClassifier,
};
pub use role::AudioChannelRole;
pub use tagger::{LocalTrack, TagError, TaggedTrack, TrackRoleAnnouncement, TrackRoleTagger};
