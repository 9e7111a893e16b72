use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info};

use super::messages::AudioFrameMessage;
use crate::audio::{AudioFrame, TranscriptionSink};
use crate::signaling::{SignalEnvelope, Signaling};
use crate::tracks::AudioChannelRole;

/// Subject a pairing code's signaling traffic travels on
pub fn signal_subject(prefix: &str, code: &str) -> String {
    format!("{}.signal.{}", prefix, code)
}

/// Subject for one channel's audio frames
pub fn audio_subject(session_id: &str, role: AudioChannelRole) -> String {
    format!("audio.frame.{}.{}", session_id, role)
}

/// NATS-backed signaling and transcription fan-out
pub struct NatsClient {
    client: Client,
    session_id: String,
    prefix: String,
    sequence: AtomicU32,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String, prefix: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            session_id,
            prefix,
            sequence: AtomicU32::new(0),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to signaling traffic for every pairing code
    ///
    /// The session drops envelopes for codes that are not its own.
    pub async fn subscribe_signals(&self) -> Result<async_nats::Subscriber> {
        let subject = format!("{}.signal.*", self.prefix);

        info!("Subscribing to signaling on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to signaling")
    }

    /// Subscribe to transcript messages
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        // Partial and final text arrive on stt.text.partial / stt.text.final,
        // filtered by session_id in the payload
        let subject = "stt.text.>";

        info!("Subscribing to transcripts on {}", subject);

        self.client
            .subscribe(subject.to_string())
            .await
            .context("Failed to subscribe to transcripts")
    }

    async fn publish_frame(&self, frame: &AudioFrame, final_frame: bool) -> Result<()> {
        let subject = audio_subject(&self.session_id, frame.role);
        let pcm = if final_frame {
            Vec::new()
        } else {
            frame.to_pcm_bytes()
        };

        let message = AudioFrameMessage {
            session_id: self.session_id.clone(),
            role: frame.role,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            pcm: base64::engine::general_purpose::STANDARD.encode(&pcm),
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (seq={}, bytes={}, final={})",
            subject,
            message.sequence,
            pcm.len(),
            final_frame
        );

        Ok(())
    }
}

#[async_trait::async_trait]
impl Signaling for NatsClient {
    async fn send(&self, envelope: SignalEnvelope) -> Result<()> {
        let subject = signal_subject(&self.prefix, &envelope.code);
        let payload = serde_json::to_vec(&envelope)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish {}", envelope.message.name()))?;

        debug!("Published {} to {}", envelope.message.name(), subject);

        Ok(())
    }
}

#[async_trait::async_trait]
impl TranscriptionSink for NatsClient {
    async fn forward(&self, frame: &AudioFrame) -> Result<()> {
        self.publish_frame(frame, false).await
    }

    async fn end_of_turn(&self, frame: &AudioFrame) -> Result<()> {
        self.publish_frame(frame, true).await
    }
}
