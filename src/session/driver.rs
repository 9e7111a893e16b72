use anyhow::{anyhow, Result};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::code::PairingCode;
use super::session::PairingSession;
use super::stats::SessionStats;
use crate::audio::AudioFrame;
use crate::control::{CommandHandler, CommandKind, TranscriptText};
use crate::negotiation::IceCandidate;
use crate::signaling::SignalEnvelope;
use crate::tracks::IncomingTrack;

const EVENT_BUFFER: usize = 256;

/// Everything the session task reacts to
pub enum SessionEvent {
    GenerateCode {
        reply: oneshot::Sender<Result<PairingCode>>,
    },
    ConnectWithCode {
        code: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    SendCommand {
        kind: CommandKind,
        payload: String,
        reply: oneshot::Sender<Result<usize>>,
    },
    RegisterCommand {
        kind: CommandKind,
        handler: Box<dyn CommandHandler>,
    },
    Stats {
        reply: oneshot::Sender<SessionStats>,
    },
    Signal(SignalEnvelope),
    LocalCandidate(IceCandidate),
    RemoteTrack(IncomingTrack),
    ControlText(String),
    AudioFrame(AudioFrame),
    Transcript(TranscriptText),
    Shutdown,
}

/// Cloneable front for a session owned by its driver task
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| anyhow!("session driver has stopped"))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionEvent,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await
            .map_err(|_| anyhow!("session driver dropped the request"))
    }

    pub async fn generate_code(&self) -> Result<PairingCode> {
        self.request(|reply| SessionEvent::GenerateCode { reply })
            .await?
    }

    pub async fn connect_with_code(&self, code: impl Into<String>) -> Result<()> {
        let code = code.into();
        self.request(|reply| SessionEvent::ConnectWithCode { code, reply })
            .await?
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.request(|reply| SessionEvent::Disconnect { reply })
            .await
    }

    pub async fn send_command(&self, kind: CommandKind, payload: impl Into<String>) -> Result<usize> {
        let payload = payload.into();
        self.request(|reply| SessionEvent::SendCommand {
            kind,
            payload,
            reply,
        })
        .await?
    }

    pub async fn register_command(
        &self,
        kind: CommandKind,
        handler: impl CommandHandler + 'static,
    ) -> Result<()> {
        self.send(SessionEvent::RegisterCommand {
            kind,
            handler: Box::new(handler),
        })
        .await
    }

    pub async fn stats(&self) -> Result<SessionStats> {
        self.request(|reply| SessionEvent::Stats { reply }).await
    }

    pub async fn signal(&self, envelope: SignalEnvelope) -> Result<()> {
        self.send(SessionEvent::Signal(envelope)).await
    }

    pub async fn local_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.send(SessionEvent::LocalCandidate(candidate)).await
    }

    pub async fn remote_track(&self, track: IncomingTrack) -> Result<()> {
        self.send(SessionEvent::RemoteTrack(track)).await
    }

    pub async fn control_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(SessionEvent::ControlText(text.into())).await
    }

    pub async fn audio_frame(&self, frame: AudioFrame) -> Result<()> {
        self.send(SessionEvent::AudioFrame(frame)).await
    }

    pub async fn transcript(&self, text: TranscriptText) -> Result<()> {
        self.send(SessionEvent::Transcript(text)).await
    }

    /// Ask the driver to tear down and exit
    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionEvent::Shutdown).await
    }
}

/// Runs a `PairingSession` on its own task, one event at a time
pub struct SessionDriver {
    session: PairingSession,
    rx: mpsc::Receiver<SessionEvent>,
}

impl SessionDriver {
    pub fn spawn(session: PairingSession) -> (SessionHandle, JoinHandle<PairingSession>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let driver = Self { session, rx };
        let handle = tokio::spawn(driver.run());
        (SessionHandle { tx }, handle)
    }

    async fn run(mut self) -> PairingSession {
        let config = self.session.config().clone();
        info!("Session driver started for {}", config.session_id);

        let mut housekeeping = tokio::time::interval(non_zero(config.housekeeping_interval));
        let mut telemetry = tokio::time::interval(non_zero(config.volume_interval));

        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(SessionEvent::Shutdown) | None => break,
                    Some(event) => self.handle(event).await,
                },
                _ = housekeeping.tick() => self.session.tick(Utc::now()).await,
                _ = telemetry.tick() => {
                    if let Err(e) = self.session.send_volume_telemetry(Utc::now()).await {
                        debug!("Volume telemetry not sent: {:#}", e);
                    }
                }
            }
        }

        self.session.disconnect().await;
        info!("Session driver stopped for {}", config.session_id);

        self.session
    }

    async fn handle(&mut self, event: SessionEvent) {
        let session = &mut self.session;

        match event {
            SessionEvent::GenerateCode { reply } => {
                let _ = reply.send(session.generate_code(Utc::now()).await);
            }
            SessionEvent::ConnectWithCode { code, reply } => {
                let _ = reply.send(session.connect_with_code(&code, Utc::now()).await);
            }
            SessionEvent::Disconnect { reply } => {
                session.disconnect().await;
                let _ = reply.send(());
            }
            SessionEvent::SendCommand {
                kind,
                payload,
                reply,
            } => {
                let _ = reply.send(session.send_command(kind, &payload, Utc::now()).await);
            }
            SessionEvent::RegisterCommand { kind, handler } => {
                session.register_command(kind, handler);
            }
            SessionEvent::Stats { reply } => {
                let _ = reply.send(session.stats(Utc::now()));
            }
            SessionEvent::Signal(envelope) => session.handle_signal(envelope, Utc::now()).await,
            SessionEvent::LocalCandidate(candidate) => {
                if let Err(e) = session.send_local_candidate(candidate).await {
                    warn!("Failed to send local ICE candidate: {:#}", e);
                }
            }
            SessionEvent::RemoteTrack(track) => {
                session.on_track(track);
            }
            SessionEvent::ControlText(text) => {
                session.on_control_text(&text, Utc::now());
            }
            SessionEvent::AudioFrame(frame) => {
                if let Err(e) = session.on_audio_frame(&frame).await {
                    warn!("{:#}", e);
                }
            }
            SessionEvent::Transcript(text) => {
                if let Err(e) = session.send_transcript(text).await {
                    warn!("Failed to relay transcript: {:#}", e);
                }
            }
            SessionEvent::Shutdown => {}
        }
    }
}

fn non_zero(interval: Duration) -> Duration {
    interval.max(Duration::from_millis(1))
}
