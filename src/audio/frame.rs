use crate::tracks::AudioChannelRole;

/// Audio sample data (16-bit PCM, interleaved) for one channel role
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
    /// Which participant this audio belongs to
    pub role: AudioChannelRole,
}

impl AudioFrame {
    /// Root-mean-square level normalized to 0.0..=1.0
    pub fn rms_level(&self) -> f32 {
        rms_level(&self.samples)
    }

    /// Little-endian PCM bytes
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }
}

/// RMS of i16 samples, normalized so full-scale square wave is 1.0
pub fn rms_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let mean_sq: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum::<f64>()
        / samples.len() as f64;

    (mean_sq.sqrt() as f32).min(1.0)
}
