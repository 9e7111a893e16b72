// In-memory collaborators for pairing session tests
#![allow(dead_code)]

use anyhow::{bail, Result};
use pairlink::audio::{AudioFrame, TranscriptionSink};
use pairlink::negotiation::{
    ConnectionFactory, IceCandidate, PeerConnection, SdpType, SessionDescription,
};
use pairlink::session::{PairingSession, SessionConfig};
use pairlink::signaling::{PeerSide, SignalEnvelope, SignalMessage, Signaling};
use pairlink::tracks::{AudioChannelRole, TaggedTrack};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeSignaling {
    pub sent: Mutex<Vec<SignalEnvelope>>,
    pub fail: AtomicBool,
}

impl FakeSignaling {
    pub fn sent(&self) -> Vec<SignalEnvelope> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<SignalMessage> {
        self.sent.lock().unwrap().last().map(|e| e.message.clone())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.name())
            .collect()
    }
}

#[async_trait::async_trait]
impl Signaling for FakeSignaling {
    async fn send(&self, envelope: SignalEnvelope) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("signaling unavailable");
        }
        self.sent.lock().unwrap().push(envelope);
        Ok(())
    }
}

/// Everything the fake transport was asked to do
#[derive(Debug, Default)]
pub struct ConnectionLog {
    pub tracks: Vec<(String, AudioChannelRole)>,
    pub remote_descriptions: Vec<SessionDescription>,
    pub candidates: Vec<String>,
    pub data: Vec<String>,
    pub closed: usize,
}

pub struct FakeConnection {
    log: Arc<Mutex<ConnectionLog>>,
    fail_offer: bool,
    reject_candidates: Vec<String>,
}

#[async_trait::async_trait]
impl PeerConnection for FakeConnection {
    async fn add_track(&mut self, track: &TaggedTrack) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .tracks
            .push((track.stream_id.clone(), track.role));
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<SessionDescription> {
        if self.fail_offer {
            bail!("no codecs in common");
        }
        Ok(SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: "v=0 offer".to_string(),
        })
    }

    async fn create_answer(&mut self) -> Result<SessionDescription> {
        Ok(SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: "v=0 answer".to_string(),
        })
    }

    async fn set_remote_description(&mut self, description: SessionDescription) -> Result<()> {
        self.log.lock().unwrap().remote_descriptions.push(description);
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> Result<()> {
        if self.reject_candidates.contains(&candidate.candidate) {
            bail!("unreachable candidate");
        }
        self.log
            .lock()
            .unwrap()
            .candidates
            .push(candidate.candidate.clone());
        Ok(())
    }

    async fn send_data(&mut self, text: String) -> Result<()> {
        self.log.lock().unwrap().data.push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub log: Arc<Mutex<ConnectionLog>>,
    pub created: AtomicUsize,
    pub fail_offer: AtomicBool,
    pub reject_candidates: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn candidates(&self) -> Vec<String> {
        self.log.lock().unwrap().candidates.clone()
    }

    pub fn data(&self) -> Vec<String> {
        self.log.lock().unwrap().data.clone()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for FakeFactory {
    async fn create(&self) -> Result<Box<dyn PeerConnection>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            log: Arc::clone(&self.log),
            fail_offer: self.fail_offer.load(Ordering::SeqCst),
            reject_candidates: self.reject_candidates.lock().unwrap().clone(),
        }))
    }
}

#[derive(Default)]
pub struct FakeSink {
    pub forwarded: Mutex<Vec<(AudioChannelRole, u64)>>,
    pub turns: Mutex<Vec<(AudioChannelRole, u64)>>,
}

impl FakeSink {
    pub fn forwarded(&self) -> Vec<(AudioChannelRole, u64)> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn turns(&self) -> Vec<(AudioChannelRole, u64)> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TranscriptionSink for FakeSink {
    async fn forward(&self, frame: &AudioFrame) -> Result<()> {
        self.forwarded
            .lock()
            .unwrap()
            .push((frame.role, frame.timestamp_ms));
        Ok(())
    }

    async fn end_of_turn(&self, frame: &AudioFrame) -> Result<()> {
        self.turns.lock().unwrap().push((frame.role, frame.timestamp_ms));
        Ok(())
    }
}

pub struct Harness {
    pub session: PairingSession,
    pub signaling: Arc<FakeSignaling>,
    pub factory: Arc<FakeFactory>,
    pub sink: Arc<FakeSink>,
}

pub fn harness(side: PeerSide) -> Harness {
    harness_with(SessionConfig {
        side,
        ..SessionConfig::default()
    })
}

pub fn harness_with(config: SessionConfig) -> Harness {
    let signaling = Arc::new(FakeSignaling::default());
    let factory = Arc::new(FakeFactory::default());
    let sink = Arc::new(FakeSink::default());

    let session = PairingSession::new(
        config,
        signaling.clone(),
        factory.clone(),
        sink.clone(),
    )
    .unwrap();

    Harness {
        session,
        signaling,
        factory,
        sink,
    }
}

pub fn envelope(code: &str, from: PeerSide, message: SignalMessage) -> SignalEnvelope {
    SignalEnvelope {
        code: code.to_string(),
        from,
        message,
    }
}

pub fn answer() -> SignalMessage {
    SignalMessage::Answer {
        description: SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: "v=0 remote answer".to_string(),
        },
    }
}

pub fn candidate(name: &str) -> SignalMessage {
    SignalMessage::IceCandidate {
        candidate: IceCandidate::new(name),
    }
}

/// A square wave frame whose normalized RMS is `level`
pub fn tone(role: AudioChannelRole, level: f32, timestamp_ms: u64) -> AudioFrame {
    let amplitude = (level * i16::MAX as f32) as i16;
    let samples = (0..160)
        .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
        .collect();

    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
        role,
    }
}
