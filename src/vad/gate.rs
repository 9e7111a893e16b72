use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{VadConfig, VadConfigError};
use crate::tracks::AudioChannelRole;

/// Per-channel speaking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceActivityState {
    Silent,
    Speaking,
}

/// Inputs for one evaluation tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateInput {
    /// Tick time in milliseconds (frame timestamp)
    pub now_ms: u64,
    /// This channel's normalized volume
    pub volume: f32,
    /// The other channel's latest normalized volume
    pub counterpart_volume: f32,
    /// Whether the other channel currently holds SPEAKING
    pub counterpart_speaking: bool,
}

/// Decides per tick whether one channel's audio is forwarded for transcription
///
/// Evaluation order:
/// 1. counterpart above threshold and louder than us: SILENT immediately
/// 2. SILENT: active (and counterpart not speaking) for `activation_delay_ms` -> SPEAKING
/// 3. SPEAKING: inactive for `silence_duration_ms` -> SILENT
///
/// Any interruption of a debounce window restarts it from zero.
#[derive(Debug, Clone)]
pub struct VoiceActivityGate {
    role: AudioChannelRole,
    config: VadConfig,
    state: VoiceActivityState,
    activation_started_ms: Option<u64>,
    silence_started_ms: Option<u64>,
}

impl VoiceActivityGate {
    pub fn new(role: AudioChannelRole, config: VadConfig) -> Result<Self, VadConfigError> {
        config.validate()?;

        Ok(Self {
            role,
            config,
            state: VoiceActivityState::Silent,
            activation_started_ms: None,
            silence_started_ms: None,
        })
    }

    /// Evaluate one tick and return whether this frame should be forwarded
    pub fn detect_activity(&mut self, input: GateInput) -> bool {
        let threshold = self.config.volume_threshold;
        let active = input.volume > threshold;

        if input.counterpart_volume > threshold && input.volume < input.counterpart_volume {
            if self.state == VoiceActivityState::Speaking {
                debug!(
                    "{} yields to louder counterpart ({:.3} < {:.3})",
                    self.role, input.volume, input.counterpart_volume
                );
            }
            self.enter(VoiceActivityState::Silent);
            return false;
        }

        match self.state {
            VoiceActivityState::Silent => {
                if active && !input.counterpart_speaking {
                    let started = *self.activation_started_ms.get_or_insert(input.now_ms);
                    if input.now_ms.saturating_sub(started) >= self.config.activation_delay_ms {
                        debug!("{} SILENT -> SPEAKING at {}ms", self.role, input.now_ms);
                        self.enter(VoiceActivityState::Speaking);
                    }
                } else {
                    self.activation_started_ms = None;
                }
            }
            VoiceActivityState::Speaking => {
                if active {
                    self.silence_started_ms = None;
                } else {
                    let started = *self.silence_started_ms.get_or_insert(input.now_ms);
                    if input.now_ms.saturating_sub(started) >= self.config.silence_duration_ms {
                        debug!("{} SPEAKING -> SILENT at {}ms", self.role, input.now_ms);
                        self.enter(VoiceActivityState::Silent);
                    }
                }
            }
        }

        self.should_transmit()
    }

    pub fn should_transmit(&self) -> bool {
        self.state == VoiceActivityState::Speaking
    }

    pub fn state(&self) -> VoiceActivityState {
        self.state
    }

    pub fn role(&self) -> AudioChannelRole {
        self.role
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Back to SILENT with both debounce anchors cleared
    pub fn reset(&mut self) {
        self.enter(VoiceActivityState::Silent);
    }

    fn enter(&mut self, state: VoiceActivityState) {
        self.state = state;
        self.activation_started_ms = None;
        self.silence_started_ms = None;
    }
}
