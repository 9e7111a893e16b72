pub mod audio;
pub mod config;
pub mod control;
pub mod http;
pub mod nats;
pub mod negotiation;
pub mod session;
pub mod signaling;
pub mod tracks;
pub mod vad;

pub use audio::{AudioFile, AudioFrame, TranscriptionSink};
pub use config::Config;
pub use control::{ChunkBuffers, ChunkEncoder, CodecError, CommandKind, CommandRegistry};
pub use http::{create_router, AppState};
pub use nats::{AudioFrameMessage, NatsClient, TranscriptMessage};
pub use negotiation::{ConnectionFactory, IceCandidate, IceCandidateBuffer, PeerConnection};
pub use session::{
    ConnectionState, PairingCode, PairingError, PairingSession, SessionConfig, SessionDriver,
    SessionHandle, SessionStats,
};
pub use signaling::{PeerSide, SignalEnvelope, SignalMessage, Signaling};
pub use tracks::{AudioChannelRole, TrackRoleClassifier, TrackRoleTagger};
pub use vad::{DualChannelGate, VadConfig, VoiceActivityGate};
