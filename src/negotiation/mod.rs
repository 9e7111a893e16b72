//! Peer connection negotiation
//!
//! The transport itself is supplied by the embedder through [`PeerConnection`];
//! this module owns the ordering problem around it: remote ICE candidates that
//! arrive before the remote description.

mod connection;
mod ice;

pub use connection::{ConnectionFactory, IceCandidate, PeerConnection, SdpType, SessionDescription};
pub use ice::{FlushReport, IceCandidateBuffer};
