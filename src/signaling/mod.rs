//! Signaling messages and the outbound signaling seam

mod channel;
mod messages;

pub use channel::Signaling;
pub use messages::{PeerSide, SignalEnvelope, SignalMessage};
