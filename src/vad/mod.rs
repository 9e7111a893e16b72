//! Voice activity gating
//!
//! One [`VoiceActivityGate`] per channel decides, frame by frame, whether that
//! channel's audio goes to transcription. [`DualChannelGate`] runs the pair so that
//! whoever already holds the floor keeps it when both microphones pick up the same
//! speech.

mod config;
mod gate;
mod pair;

pub use config::{VadConfig, VadConfigError};
pub use gate::{GateInput, VoiceActivityGate, VoiceActivityState};
pub use pair::DualChannelGate;
