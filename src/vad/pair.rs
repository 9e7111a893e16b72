use super::config::{VadConfig, VadConfigError};
use super::gate::{GateInput, VoiceActivityGate, VoiceActivityState};
use crate::tracks::AudioChannelRole;
use tracing::debug;

/// The two per-role gates plus each channel's latest volume
///
/// A tick for one role reads the counterpart's latest volume and its state as last
/// written; whatever a gate writes in its tick is what the other gate sees on its next
/// tick.
///
/// A counterpart with no frame for longer than `silence_duration_ms` reads as quiet and
/// not speaking, so a track that stops mid-sentence cannot hold the floor.
#[derive(Debug, Clone)]
pub struct DualChannelGate {
    local: VoiceActivityGate,
    remote: VoiceActivityGate,
    local_volume: f32,
    remote_volume: f32,
    local_updated_ms: Option<u64>,
    remote_updated_ms: Option<u64>,
}

impl DualChannelGate {
    pub fn new(config: VadConfig) -> Result<Self, VadConfigError> {
        Ok(Self {
            local: VoiceActivityGate::new(AudioChannelRole::LocalParticipant, config)?,
            remote: VoiceActivityGate::new(AudioChannelRole::RemoteParticipant, config)?,
            local_volume: 0.0,
            remote_volume: 0.0,
            local_updated_ms: None,
            remote_updated_ms: None,
        })
    }

    /// Record `volume` for `role` and evaluate that role's gate
    pub fn evaluate(&mut self, role: AudioChannelRole, volume: f32, now_ms: u64) -> bool {
        let (gate, counterpart, counterpart_volume, counterpart_updated_ms) = match role {
            AudioChannelRole::LocalParticipant => {
                self.local_volume = volume;
                self.local_updated_ms = Some(now_ms);
                (
                    &mut self.local,
                    &self.remote,
                    self.remote_volume,
                    self.remote_updated_ms,
                )
            }
            AudioChannelRole::RemoteParticipant => {
                self.remote_volume = volume;
                self.remote_updated_ms = Some(now_ms);
                (
                    &mut self.remote,
                    &self.local,
                    self.local_volume,
                    self.local_updated_ms,
                )
            }
        };

        let fresh = counterpart_updated_ms.map_or(false, |updated| {
            now_ms.saturating_sub(updated) <= gate.config().silence_duration_ms
        });

        if !fresh && counterpart.state() == VoiceActivityState::Speaking {
            debug!(
                "{} ignores stale SPEAKING state of {}",
                role,
                counterpart.role()
            );
        }

        gate.detect_activity(GateInput {
            now_ms,
            volume,
            counterpart_volume: if fresh { counterpart_volume } else { 0.0 },
            counterpart_speaking: fresh && counterpart.state() == VoiceActivityState::Speaking,
        })
    }

    pub fn gate(&self, role: AudioChannelRole) -> &VoiceActivityGate {
        match role {
            AudioChannelRole::LocalParticipant => &self.local,
            AudioChannelRole::RemoteParticipant => &self.remote,
        }
    }

    pub fn should_transmit(&self, role: AudioChannelRole) -> bool {
        self.gate(role).should_transmit()
    }

    pub fn volume(&self, role: AudioChannelRole) -> f32 {
        match role {
            AudioChannelRole::LocalParticipant => self.local_volume,
            AudioChannelRole::RemoteParticipant => self.remote_volume,
        }
    }

    /// Both gates SILENT, volumes zeroed
    pub fn reset(&mut self) {
        self.local.reset();
        self.remote.reset();
        self.local_volume = 0.0;
        self.remote_volume = 0.0;
        self.local_updated_ms = None;
        self.remote_updated_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: AudioChannelRole = AudioChannelRole::LocalParticipant;
    const REMOTE: AudioChannelRole = AudioChannelRole::RemoteParticipant;

    fn pair() -> DualChannelGate {
        DualChannelGate::new(VadConfig {
            volume_threshold: 0.06,
            activation_delay_ms: 100,
            silence_duration_ms: 500,
        })
        .unwrap()
    }

    #[test]
    fn test_both_quiet_is_noop() {
        let mut gates = pair();
        for t in (0..1000).step_by(20) {
            assert!(!gates.evaluate(LOCAL, 0.01, t));
            assert!(!gates.evaluate(REMOTE, 0.02, t));
        }
        assert_eq!(gates.gate(LOCAL).state(), VoiceActivityState::Silent);
        assert_eq!(gates.gate(REMOTE).state(), VoiceActivityState::Silent);
    }

    #[test]
    fn test_speaker_keeps_floor_against_crosstalk() {
        let mut gates = pair();
        for t in (0..=100).step_by(20) {
            gates.evaluate(LOCAL, 0.4, t);
            gates.evaluate(REMOTE, 0.1, t);
        }
        assert!(gates.should_transmit(LOCAL));
        assert!(!gates.should_transmit(REMOTE));
    }

    #[test]
    fn test_simultaneous_crossing_goes_to_first_writer() {
        let mut gates = pair();
        // equal volumes: neither is forced silent, both start their timers
        for t in (0..100).step_by(20) {
            gates.evaluate(LOCAL, 0.3, t);
            gates.evaluate(REMOTE, 0.3, t);
        }
        // local ticks first at 100ms and takes SPEAKING; remote reads it in the same tick
        assert!(gates.evaluate(LOCAL, 0.3, 100));
        assert!(!gates.evaluate(REMOTE, 0.3, 100));
        assert!(!gates.evaluate(REMOTE, 0.3, 200));
    }

    #[test]
    fn test_loud_counterpart_silences_while_fresh() {
        let mut gates = pair();
        gates.evaluate(REMOTE, 0.5, 0);
        for t in (20..=500).step_by(20) {
            assert!(!gates.evaluate(LOCAL, 0.3, t), "forwarded at {t}ms");
        }
    }

    #[test]
    fn test_vanished_counterpart_releases_floor() {
        let mut gates = pair();
        // remote's last frame was loud, then its track stops
        gates.evaluate(REMOTE, 0.5, 0);

        let forwarded: Vec<u64> = (20..=60_000)
            .step_by(20)
            .filter(|&t| gates.evaluate(LOCAL, 0.3, t))
            .collect();

        // stale after 500ms, then the 100ms activation delay
        assert_eq!(forwarded.first(), Some(&620));
        assert_eq!(forwarded.last(), Some(&60_000));
    }

    #[test]
    fn test_vanished_speaker_does_not_block_activation() {
        let mut gates = pair();
        for t in (0..=100).step_by(20) {
            gates.evaluate(REMOTE, 0.4, t);
        }
        assert!(gates.should_transmit(REMOTE));

        // remote never sends again; its gate still reads SPEAKING
        for t in (120..=1000).step_by(20) {
            gates.evaluate(LOCAL, 0.3, t);
        }
        assert_eq!(gates.gate(REMOTE).state(), VoiceActivityState::Speaking);
        assert!(gates.should_transmit(LOCAL));
    }

    #[test]
    fn test_reset_zeroes_volumes() {
        let mut gates = pair();
        gates.evaluate(LOCAL, 0.5, 0);
        gates.reset();
        assert_eq!(gates.volume(LOCAL), 0.0);
        assert!(!gates.should_transmit(LOCAL));
    }
}
