use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::connection::{IceCandidate, PeerConnection};

/// Outcome of applying buffered candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub failed: usize,
}

/// Holds remote ICE candidates that arrive before the remote description
///
/// Candidates travel on a different path than the offer/answer and routinely
/// overtake it. They are queued here and applied in arrival order once the remote
/// description is in place.
#[derive(Debug, Default)]
pub struct IceCandidateBuffer {
    pending: VecDeque<IceCandidate>,
    flushed: bool,
}

impl IceCandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, candidate: IceCandidate) {
        debug!("Buffering ICE candidate: {}", candidate.candidate);
        self.pending.push_back(candidate);
    }

    /// Apply every buffered candidate in FIFO order and drain the queue.
    ///
    /// A failing candidate is logged and skipped; the rest are still applied.
    pub async fn flush(&mut self, connection: &mut dyn PeerConnection) -> FlushReport {
        if self.flushed {
            warn!("ICE buffer flushed more than once");
        }
        self.flushed = true;

        let mut report = FlushReport::default();

        while let Some(candidate) = self.pending.pop_front() {
            match connection.add_ice_candidate(&candidate).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!("Failed to add ICE candidate {}: {:#}", candidate.candidate, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Flushed ICE buffer ({} applied, {} failed)",
            report.applied, report.failed
        );

        report
    }

    /// True once the remote description is set and candidates can be applied directly
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Back to the pre-negotiation phase with nothing queued
    pub fn clear(&mut self) {
        self.pending.clear();
        self.flushed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::SessionDescription;
    use crate::tracks::TaggedTrack;
    use anyhow::{bail, Result};

    #[derive(Default)]
    struct RecordingConnection {
        applied: Vec<String>,
        reject: Vec<String>,
    }

    #[async_trait::async_trait]
    impl PeerConnection for RecordingConnection {
        async fn add_track(&mut self, _track: &TaggedTrack) -> Result<()> {
            Ok(())
        }

        async fn create_offer(&mut self) -> Result<SessionDescription> {
            bail!("not used")
        }

        async fn create_answer(&mut self) -> Result<SessionDescription> {
            bail!("not used")
        }

        async fn set_remote_description(&mut self, _description: SessionDescription) -> Result<()> {
            Ok(())
        }

        async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<()> {
            if self.reject.contains(&candidate.candidate) {
                bail!("unreachable candidate");
            }
            self.applied.push(candidate.candidate.clone());
            Ok(())
        }

        async fn send_data(&mut self, _text: String) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_flush_applies_in_arrival_order() {
        let mut buffer = IceCandidateBuffer::new();
        for c in ["A", "B", "C"] {
            buffer.enqueue(IceCandidate::new(c));
        }

        let mut connection = RecordingConnection::default();
        let report = buffer.flush(&mut connection).await;

        assert_eq!(connection.applied, vec!["A", "B", "C"]);
        assert_eq!(report, FlushReport { applied: 3, failed: 0 });
        assert!(buffer.is_empty());
        assert!(buffer.is_flushed());
    }

    #[tokio::test]
    async fn test_failed_candidate_does_not_stop_flush() {
        let mut buffer = IceCandidateBuffer::new();
        for c in ["A", "B", "C"] {
            buffer.enqueue(IceCandidate::new(c));
        }

        let mut connection = RecordingConnection {
            reject: vec!["B".to_string()],
            ..Default::default()
        };
        let report = buffer.flush(&mut connection).await;

        assert_eq!(connection.applied, vec!["A", "C"]);
        assert_eq!(report, FlushReport { applied: 2, failed: 1 });
    }

    #[tokio::test]
    async fn test_clear_resets_phase() {
        let mut buffer = IceCandidateBuffer::new();
        buffer.flush(&mut RecordingConnection::default()).await;
        buffer.enqueue(IceCandidate::new("late"));
        buffer.clear();

        assert!(buffer.is_empty());
        assert!(!buffer.is_flushed());
    }
}
