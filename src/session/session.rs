use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::code::PairingCode;
use super::config::SessionConfig;
use super::error::PairingError;
use super::state::ConnectionState;
use super::stats::{RoleCounts, SessionStats};
use crate::audio::{AudioFrame, TranscriptionSink};
use crate::control::{
    ChannelMessage, ChunkBuffers, ChunkEncoder, CodecError, CommandHandler, CommandKind,
    CommandRegistry, ControlMessage, Dispatch, TranscriptText, VolumeTelemetry,
};
use crate::negotiation::{
    ConnectionFactory, IceCandidate, IceCandidateBuffer, PeerConnection, SessionDescription,
};
use crate::signaling::{PeerSide, SignalEnvelope, SignalMessage, Signaling};
use crate::tracks::{
    AudioChannelRole, ClassifiedTrack, IncomingTrack, LocalTrack, TaggedTrack, TrackBinding,
    TrackRoleAnnouncement, TrackRoleClassifier, TrackRoleTagger,
};
use crate::vad::DualChannelGate;

/// Events reported to the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    StateChanged(ConnectionState),
    CodeIssued {
        code: String,
        expires_at: DateTime<Utc>,
    },
    TrackBound(ClassifiedTrack),
    /// A command nobody registered a handler for
    Command(ControlMessage),
    Transcript(TranscriptText),
    Volume(VolumeTelemetry),
}

/// What happened to one incoming data-channel frame
#[derive(Debug)]
pub enum ControlOutcome {
    /// Atomic or reassembled command routed to the registry
    Delivered { kind: CommandKind, dispatch: Dispatch },
    /// The registered handler returned an error
    HandlerFailed(CommandKind),
    /// Fragment stored, message not complete yet
    Pending,
    Transcript,
    Volume,
    Rejected(CodecError),
}

#[derive(Debug, Default)]
struct Counters {
    frames_forwarded: RoleCounts,
    frames_gated: RoleCounts,
    messages_reassembled: u64,
    messages_rejected: u64,
    candidates_applied: u64,
    candidates_failed: u64,
}

/// One pairing between a desktop capture session and a browser session
///
/// Owns the connection lifecycle and every per-pairing component: ICE buffer, role
/// bindings, voice activity gates, chunk buffers. Teardown resets all of them so a
/// re-pairing starts clean.
pub struct PairingSession {
    config: SessionConfig,

    signaling: Arc<dyn Signaling>,
    connections: Arc<dyn ConnectionFactory>,
    transcription: Arc<dyn TranscriptionSink>,
    notices: Option<mpsc::UnboundedSender<SessionNotice>>,

    state: ConnectionState,
    code: Option<PairingCode>,
    connection: Option<Box<dyn PeerConnection>>,

    ice: IceCandidateBuffer,
    tagger: TrackRoleTagger,
    classifier: TrackRoleClassifier,
    gates: DualChannelGate,
    /// Empty end-of-turn marker per channel, refreshed by each forwarded frame
    open_turns: HashMap<AudioChannelRole, AudioFrame>,
    encoder: ChunkEncoder,
    chunks: ChunkBuffers,
    commands: CommandRegistry,

    counters: Counters,
}

impl PairingSession {
    pub fn new(
        config: SessionConfig,
        signaling: Arc<dyn Signaling>,
        connections: Arc<dyn ConnectionFactory>,
        transcription: Arc<dyn TranscriptionSink>,
    ) -> Result<Self, PairingError> {
        info!(
            "Creating pairing session {} ({} side)",
            config.session_id, config.side
        );

        let gates = DualChannelGate::new(config.vad)?;

        Ok(Self {
            encoder: ChunkEncoder::new(config.chunk_size),
            chunks: ChunkBuffers::new(
                config.max_chunks,
                config.max_pending_messages,
                config.chunk_timeout,
            ),
            config,
            signaling,
            connections,
            transcription,
            notices: None,
            state: ConnectionState::Disconnected,
            code: None,
            connection: None,
            ice: IceCandidateBuffer::new(),
            tagger: TrackRoleTagger::new(),
            classifier: TrackRoleClassifier::new(),
            gates,
            commands: CommandRegistry::new(),
            open_turns: HashMap::new(),
            counters: Counters::default(),
        })
    }

    /// Start receiving notices; replaces any earlier subscriber
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notices = Some(tx);
        rx
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn side(&self) -> PeerSide {
        self.config.side
    }

    /// Effective state; a pairing attempt whose code has expired reads as disconnected
    pub fn state(&self, now: DateTime<Utc>) -> ConnectionState {
        if self.state == ConnectionState::Connecting && self.code_expired(now) {
            return ConnectionState::Disconnected;
        }
        self.state
    }

    pub fn code(&self) -> Option<&PairingCode> {
        self.code.as_ref()
    }

    /// Tag a local capture track; attached on the next offer
    pub fn tag_track(
        &mut self,
        track: LocalTrack,
        role: AudioChannelRole,
    ) -> Result<TaggedTrack, PairingError> {
        let tagged = self.tagger.tag(track, role)?;
        if self.connection.is_some() {
            info!(
                "Track {} tagged mid-session, attached from the next pairing",
                tagged.track.id
            );
        }
        Ok(tagged)
    }

    pub fn register_command(
        &mut self,
        kind: CommandKind,
        handler: Box<dyn CommandHandler>,
    ) -> Option<Box<dyn CommandHandler>> {
        self.commands.register_boxed(kind, handler)
    }

    pub fn remove_command(&mut self, kind: CommandKind) -> Option<Box<dyn CommandHandler>> {
        self.commands.remove(kind)
    }

    pub fn binding(&self, role: AudioChannelRole) -> Option<&ClassifiedTrack> {
        self.classifier.binding(role)
    }

    /// Host side: issue a fresh code and register it with the signaling service
    pub async fn generate_code(&mut self, now: DateTime<Utc>) -> Result<PairingCode> {
        self.require_side(PeerSide::Host)?;
        self.expire(now).await;

        if !self.state.is_idle() {
            return Err(PairingError::Busy(self.state).into());
        }

        let code = PairingCode::generate(now, self.config.code_ttl);
        self.code = Some(code.clone());

        let registered = self
            .send_signal(SignalMessage::RegisterPairingCode {
                code: code.as_str().to_string(),
                expires_at: code.expires_at(),
            })
            .await;

        if let Err(e) = registered {
            self.code = None;
            return Err(e);
        }

        info!(
            "Issued pairing code {} (expires {})",
            code.as_str(),
            code.expires_at().to_rfc3339()
        );

        self.notify(SessionNotice::CodeIssued {
            code: code.as_str().to_string(),
            expires_at: code.expires_at(),
        });
        self.set_state(ConnectionState::Connecting);

        Ok(code)
    }

    /// Guest side: join the host that issued `code`
    pub async fn connect_with_code(&mut self, code: &str, now: DateTime<Utc>) -> Result<()> {
        self.require_side(PeerSide::Guest)?;
        self.expire(now).await;

        if !self.state.is_idle() {
            return Err(PairingError::Busy(self.state).into());
        }

        let code = PairingCode::parse(code, now, self.config.code_ttl)?;
        self.code = Some(code.clone());

        let sent = self
            .send_signal(SignalMessage::ConnectWithCode {
                code: code.as_str().to_string(),
            })
            .await;

        if let Err(e) = sent {
            self.code = None;
            return Err(e);
        }

        info!("Connecting with pairing code {}", code.as_str());
        self.set_state(ConnectionState::Connecting);

        Ok(())
    }

    /// Route one signaling message addressed to this pairing
    pub async fn handle_signal(&mut self, envelope: SignalEnvelope, now: DateTime<Utc>) {
        if envelope.from == self.config.side {
            return;
        }

        self.expire(now).await;

        match &self.code {
            Some(code) if code.as_str() == envelope.code => {}
            _ => {
                debug!(
                    "Ignoring {} for code {} (not ours)",
                    envelope.message.name(),
                    envelope.code
                );
                return;
            }
        }

        debug!(
            "Signal {} from {} in state {}",
            envelope.message.name(),
            envelope.from,
            self.state
        );

        match envelope.message {
            SignalMessage::ConnectWithCode { .. } => self.start_offer().await,
            SignalMessage::Offer {
                description,
                track_roles,
            } => self.accept_offer(description, track_roles).await,
            SignalMessage::Answer { description } => self.accept_answer(description).await,
            SignalMessage::IceCandidate { candidate } => {
                self.add_remote_candidate(candidate).await
            }
            SignalMessage::Disconnect { reason } => {
                info!(
                    "Peer disconnected ({})",
                    reason.as_deref().unwrap_or("no reason given")
                );
                self.teardown().await;
            }
            SignalMessage::RegisterPairingCode { .. } => {
                debug!("Ignoring register-pairing-code relayed back to the session");
            }
        }
    }

    async fn start_offer(&mut self) {
        if self.config.side != PeerSide::Host || self.state != ConnectionState::Connecting {
            warn!("Ignoring connect-with-code in state {}", self.state);
            return;
        }
        if self.connection.is_some() {
            warn!("Ignoring connect-with-code, a guest is already negotiating");
            return;
        }

        info!("Guest joined, creating offer");

        if let Err(e) = self.negotiate_offer().await {
            self.fail(e).await;
        }
    }

    async fn negotiate_offer(&mut self) -> Result<()> {
        let connection = self
            .connections
            .create()
            .await
            .context("Failed to create peer connection")?;
        let connection = self.connection.insert(connection);

        for track in self.tagger.tracks() {
            connection
                .add_track(track)
                .await
                .with_context(|| format!("Failed to attach {} track", track.role))?;
        }

        let description = connection
            .create_offer()
            .await
            .context("Failed to create offer")?;

        let track_roles = self.tagger.announcements();
        self.send_signal(SignalMessage::Offer {
            description,
            track_roles,
        })
        .await
    }

    async fn accept_offer(
        &mut self,
        description: SessionDescription,
        track_roles: Vec<TrackRoleAnnouncement>,
    ) {
        if self.config.side != PeerSide::Guest || self.state != ConnectionState::Connecting {
            warn!("Ignoring offer in state {}", self.state);
            return;
        }

        info!(
            "Received offer with {} announced track roles",
            track_roles.len()
        );
        self.classifier.announce(&track_roles);

        if let Err(e) = self.negotiate_answer(description).await {
            self.fail(e).await;
            return;
        }

        self.set_state(ConnectionState::Connected);
    }

    async fn negotiate_answer(&mut self, description: SessionDescription) -> Result<()> {
        let connection = self
            .connections
            .create()
            .await
            .context("Failed to create peer connection")?;
        let connection = self.connection.insert(connection);

        for track in self.tagger.tracks() {
            connection
                .add_track(track)
                .await
                .with_context(|| format!("Failed to attach {} track", track.role))?;
        }

        connection
            .set_remote_description(description)
            .await
            .context("Failed to apply remote offer")?;

        let report = self.ice.flush(&mut **connection).await;
        self.counters.candidates_applied += report.applied as u64;
        self.counters.candidates_failed += report.failed as u64;

        let answer = connection
            .create_answer()
            .await
            .context("Failed to create answer")?;

        self.send_signal(SignalMessage::Answer {
            description: answer,
        })
        .await
    }

    async fn accept_answer(&mut self, description: SessionDescription) {
        if self.config.side != PeerSide::Host || self.state != ConnectionState::Connecting {
            warn!("Ignoring answer in state {}", self.state);
            return;
        }

        let Some(connection) = self.connection.as_mut() else {
            warn!("Ignoring answer, no offer was sent");
            return;
        };

        if let Err(e) = connection.set_remote_description(description).await {
            self.fail(e.context("Failed to apply remote answer")).await;
            return;
        }

        let report = self.ice.flush(&mut **connection).await;
        self.counters.candidates_applied += report.applied as u64;
        self.counters.candidates_failed += report.failed as u64;

        self.set_state(ConnectionState::Connected);
    }

    /// Apply a remote candidate now, or hold it until the remote description is set
    pub async fn add_remote_candidate(&mut self, candidate: IceCandidate) {
        match self.connection.as_mut() {
            Some(connection) if self.ice.is_flushed() => {
                match connection.add_ice_candidate(&candidate).await {
                    Ok(()) => self.counters.candidates_applied += 1,
                    Err(e) => {
                        warn!("Failed to add ICE candidate {}: {:#}", candidate.candidate, e);
                        self.counters.candidates_failed += 1;
                    }
                }
            }
            _ => self.ice.enqueue(candidate),
        }
    }

    /// Trickle a locally gathered candidate to the peer
    pub async fn send_local_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        if self.connection.is_none() {
            return Err(PairingError::NotConnected.into());
        }
        self.send_signal(SignalMessage::IceCandidate { candidate })
            .await
    }

    /// Local teardown; the peer is told when a pairing was in progress
    pub async fn disconnect(&mut self) {
        if self.code.is_some() {
            let sent = self
                .send_signal(SignalMessage::Disconnect {
                    reason: Some("local disconnect".to_string()),
                })
                .await;
            if let Err(e) = sent {
                warn!("Failed to notify peer of disconnect: {:#}", e);
            }
        }

        self.teardown().await;
    }

    /// Housekeeping: expire the pairing code and stale chunk buffers
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        self.expire(now).await;

        let evicted = self.chunks.evict_expired(now);
        if evicted > 0 {
            info!("Evicted {} stale chunked messages", evicted);
        }
    }

    /// Bind a remote track to its role slot
    pub fn on_track(&mut self, track: IncomingTrack) -> TrackBinding {
        let binding = self.classifier.on_track(track);
        self.notify(SessionNotice::TrackBound(binding.classified.clone()));
        binding
    }

    /// Handle one text frame from the control data channel
    pub fn on_control_text(&mut self, text: &str, now: DateTime<Utc>) -> ControlOutcome {
        let message = match ChannelMessage::decode(text) {
            Ok(message) => message,
            Err(e) => return self.reject(e),
        };

        match message {
            ChannelMessage::Command(command) => self.deliver(command),
            ChannelMessage::Fragment(fragment) => match self.chunks.accept(fragment, now) {
                Ok(Some(command)) => {
                    self.counters.messages_reassembled += 1;
                    self.deliver(command)
                }
                Ok(None) => ControlOutcome::Pending,
                Err(e) => self.reject(e),
            },
            ChannelMessage::Transcript(text) => {
                self.notify(SessionNotice::Transcript(text));
                ControlOutcome::Transcript
            }
            ChannelMessage::Volume(telemetry) => {
                self.notify(SessionNotice::Volume(telemetry));
                ControlOutcome::Volume
            }
        }
    }

    fn deliver(&mut self, command: ControlMessage) -> ControlOutcome {
        let kind = command.kind;

        if !self.commands.is_registered(kind) {
            debug!("No handler for {}, passing it to the UI", kind);
            self.notify(SessionNotice::Command(command));
            return ControlOutcome::Delivered {
                kind,
                dispatch: Dispatch::Unhandled,
            };
        }

        match self.commands.dispatch(command) {
            Ok(dispatch) => ControlOutcome::Delivered { kind, dispatch },
            Err(e) => {
                error!("Handler for {} failed: {:#}", kind, e);
                ControlOutcome::HandlerFailed(kind)
            }
        }
    }

    fn reject(&mut self, e: CodecError) -> ControlOutcome {
        warn!("Rejected control message: {}", e);
        self.counters.messages_rejected += 1;
        ControlOutcome::Rejected(e)
    }

    /// Run one frame through its channel gate; open frames go to transcription
    pub async fn on_audio_frame(&mut self, frame: &AudioFrame) -> Result<bool> {
        let role = frame.role;
        let was_open = self.gates.should_transmit(role);
        let open = self
            .gates
            .evaluate(role, frame.rms_level(), frame.timestamp_ms);

        if open != was_open {
            debug!(
                "{} gate {} at {}ms",
                role,
                if open { "opened" } else { "closed" },
                frame.timestamp_ms
            );
        }

        if open {
            self.counters.frames_forwarded.increment(role);
            self.open_turns.insert(
                role,
                AudioFrame {
                    samples: Vec::new(),
                    sample_rate: frame.sample_rate,
                    channels: frame.channels,
                    timestamp_ms: frame.timestamp_ms,
                    role,
                },
            );
            self.transcription
                .forward(frame)
                .await
                .with_context(|| format!("Failed to forward {} frame", role))?;
        } else {
            self.counters.frames_gated.increment(role);
            if was_open {
                self.open_turns.remove(&role);
                self.transcription
                    .end_of_turn(frame)
                    .await
                    .with_context(|| format!("Failed to end {} turn", role))?;
            }
        }

        Ok(open)
    }

    /// Send a command to the peer, chunked when the payload is large; returns the frame count
    pub async fn send_command(
        &mut self,
        kind: CommandKind,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let frames = self.encoder.encode(kind, payload, now.timestamp_millis());
        let count = frames.len();

        for frame in frames {
            self.send_channel(&frame).await?;
        }

        if count > 1 {
            info!("Sent {} as {} chunks", kind, count);
        }

        Ok(count)
    }

    /// Send both channels' latest volume to the peer; no-op unless connected
    pub async fn send_volume_telemetry(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Ok(());
        }

        for role in AudioChannelRole::ALL {
            let telemetry =
                VolumeTelemetry::from_level(role, self.gates.volume(role), now.timestamp_millis());
            self.send_channel(&ChannelMessage::Volume(telemetry)).await?;
        }

        Ok(())
    }

    /// Show transcription text locally and relay it to the peer when connected
    pub async fn send_transcript(&mut self, text: TranscriptText) -> Result<()> {
        self.notify(SessionNotice::Transcript(text.clone()));

        if self.state != ConnectionState::Connected {
            return Ok(());
        }

        self.send_channel(&ChannelMessage::Transcript(text)).await
    }

    pub fn stats(&self, now: DateTime<Utc>) -> SessionStats {
        SessionStats {
            session_id: self.config.session_id.clone(),
            side: self.config.side,
            state: self.state(now),
            code: self.code.as_ref().map(|c| c.as_str().to_string()),
            code_expires_at: self.code.as_ref().map(PairingCode::expires_at),
            frames_forwarded: self.counters.frames_forwarded,
            frames_gated: self.counters.frames_gated,
            messages_reassembled: self.counters.messages_reassembled,
            messages_rejected: self.counters.messages_rejected,
            pending_chunk_messages: self.chunks.pending(),
            candidates_applied: self.counters.candidates_applied,
            candidates_failed: self.counters.candidates_failed,
            pending_candidates: self.ice.len(),
            bound_roles: self.classifier.bound_roles(),
        }
    }

    async fn send_channel(&mut self, message: &ChannelMessage) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(PairingError::NotConnected.into());
        }
        let connection = self.connection.as_mut().ok_or(PairingError::NotConnected)?;

        let text = message.encode()?;
        connection
            .send_data(text)
            .await
            .context("Failed to send on control channel")
    }

    async fn send_signal(&mut self, message: SignalMessage) -> Result<()> {
        let code = self
            .code
            .as_ref()
            .map(|c| c.as_str().to_string())
            .ok_or(PairingError::NotConnected)?;
        let name = message.name();

        self.signaling
            .send(SignalEnvelope {
                code,
                from: self.config.side,
                message,
            })
            .await
            .with_context(|| format!("Failed to send {}", name))
    }

    fn code_expired(&self, now: DateTime<Utc>) -> bool {
        self.code.as_ref().map_or(false, |code| !code.is_valid(now))
    }

    /// Tear down a pairing attempt whose code ran out before it connected
    async fn expire(&mut self, now: DateTime<Utc>) {
        if self.state == ConnectionState::Connecting && self.code_expired(now) {
            info!("Pairing code expired before a peer connected");
            self.teardown().await;
        }
    }

    fn require_side(&self, expected: PeerSide) -> Result<(), PairingError> {
        if self.config.side != expected {
            return Err(PairingError::WrongSide { expected });
        }
        Ok(())
    }

    async fn fail(&mut self, e: anyhow::Error) {
        error!("Negotiation failed: {:#}", e);
        self.code = None;
        self.reset().await;
        self.set_state(ConnectionState::Failed);
    }

    /// Back to DISCONNECTED with every per-pairing component reset
    async fn teardown(&mut self) {
        if self.state == ConnectionState::Disconnected && self.code.is_none() {
            return;
        }

        info!("Tearing down pairing session {}", self.config.session_id);
        self.code = None;
        self.reset().await;
        self.set_state(ConnectionState::Disconnected);
    }

    async fn reset(&mut self) {
        // A turn cut short by teardown still has to be closed downstream
        for role in [
            AudioChannelRole::LocalParticipant,
            AudioChannelRole::RemoteParticipant,
        ] {
            if !self.gates.should_transmit(role) {
                continue;
            }
            if let Some(marker) = self.open_turns.remove(&role) {
                debug!("Closing open {} turn on teardown", role);
                if let Err(e) = self.transcription.end_of_turn(&marker).await {
                    warn!("Failed to end {} turn on teardown: {:#}", role, e);
                }
            }
        }
        self.open_turns.clear();

        self.gates.reset();
        self.chunks.clear();
        self.ice.clear();
        self.classifier.clear();

        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close peer connection: {:#}", e);
            }
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            warn!("Refusing state change {} -> {}", self.state, next);
            return;
        }

        info!("Connection state {} -> {}", self.state, next);
        self.state = next;
        self.notify(SessionNotice::StateChanged(next));
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(tx) = &self.notices {
            if tx.send(notice).is_err() {
                debug!("Notice receiver dropped");
            }
        }
    }
}
