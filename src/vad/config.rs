use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Debounce and threshold settings for a voice activity gate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadConfig {
    /// Minimum normalized volume (0.0 to 1.0) counted as active
    pub volume_threshold: f32,

    /// Continuous active time before SILENT -> SPEAKING
    pub activation_delay_ms: u64,

    /// Continuous inactive time before SPEAKING -> SILENT
    pub silence_duration_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            volume_threshold: 0.06,
            activation_delay_ms: 150,
            silence_duration_ms: 1200,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum VadConfigError {
    #[error("volume threshold {0} is outside [0.0, 1.0]")]
    ThresholdOutOfRange(f32),
}

impl VadConfig {
    /// Reject settings the gate cannot run with
    pub fn validate(&self) -> Result<(), VadConfigError> {
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.volume_threshold) {
            return Err(VadConfigError::ThresholdOutOfRange(self.volume_threshold));
        }
        Ok(())
    }
}
