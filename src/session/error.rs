use thiserror::Error;

use super::state::ConnectionState;
use crate::signaling::PeerSide;
use crate::tracks::TagError;
use crate::vad::VadConfigError;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("pairing code must be 6 digits in 100000-999999, got {0:?}")]
    InvalidCode(String),

    #[error("cannot start pairing while {0}")]
    Busy(ConnectionState),

    #[error("not connected")]
    NotConnected,

    #[error("operation is only available on the {expected} side")]
    WrongSide { expected: PeerSide },

    #[error(transparent)]
    Vad(#[from] VadConfigError),

    #[error(transparent)]
    Tag(#[from] TagError),
}
