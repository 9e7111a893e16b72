use anyhow::Result;
use chrono::Utc;
use futures::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::client::NatsClient;
use super::messages::TranscriptMessage;
use crate::session::SessionHandle;
use crate::signaling::SignalEnvelope;

/// Feed signaling and transcript traffic from NATS into a running session
pub async fn spawn_listeners(
    client: &NatsClient,
    session: SessionHandle,
) -> Result<Vec<JoinHandle<()>>> {
    let mut signals = client.subscribe_signals().await?;
    let mut transcripts = client.subscribe_transcripts().await?;
    let session_id = client.session_id().to_string();

    let signal_session = session.clone();
    let signal_task = tokio::spawn(async move {
        info!("Signal listener started");

        while let Some(msg) = signals.next().await {
            let envelope = match serde_json::from_slice::<SignalEnvelope>(&msg.payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("Dropping malformed signaling message: {}", e);
                    continue;
                }
            };

            if signal_session.signal(envelope).await.is_err() {
                break;
            }
        }

        info!("Signal listener stopped");
    });

    let transcript_task = tokio::spawn(async move {
        info!("Transcript listener started");

        while let Some(msg) = transcripts.next().await {
            let transcript = match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                Ok(transcript) => transcript,
                Err(e) => {
                    warn!("Failed to parse transcript message: {}", e);
                    continue;
                }
            };

            if transcript.session_id != session_id {
                continue;
            }

            let text = transcript.to_transcript_text(Utc::now().timestamp_millis());
            if session.transcript(text).await.is_err() {
                break;
            }
        }

        info!("Transcript listener stopped");
    });

    Ok(vec![signal_task, transcript_task])
}
