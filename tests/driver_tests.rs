// Tests for the session driver task and its handle

mod common;

use anyhow::Result;
use common::{answer, envelope, harness};
use pairlink::control::{CommandKind, ControlMessage};
use pairlink::session::{ConnectionState, PairingError, SessionDriver};
use pairlink::signaling::{PeerSide, SignalMessage};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_handle_drives_host_session() {
    let h = harness(PeerSide::Host);
    let signaling = h.signaling.clone();
    let factory = h.factory.clone();
    let (handle, task) = SessionDriver::spawn(h.session);

    let code = handle.generate_code().await.unwrap();
    assert_eq!(handle.stats().await.unwrap().state, ConnectionState::Connecting);

    let code = code.as_str().to_string();
    handle
        .signal(envelope(
            &code,
            PeerSide::Guest,
            SignalMessage::ConnectWithCode { code: code.clone() },
        ))
        .await
        .unwrap();
    handle
        .signal(envelope(&code, PeerSide::Guest, answer()))
        .await
        .unwrap();

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.state, ConnectionState::Connected);
    assert_eq!(stats.code.as_deref(), Some(code.as_str()));

    let frames = handle
        .send_command(CommandKind::Text, "next question")
        .await
        .unwrap();
    assert_eq!(frames, 1);
    // Volume telemetry may share the channel once connected
    let commands: Vec<String> = factory
        .data()
        .into_iter()
        .filter(|text| !text.contains(r#""type":"volume""#))
        .collect();
    assert_eq!(commands.len(), 1);

    handle.shutdown().await.unwrap();
    let session = task.await.unwrap();

    assert_eq!(
        session.state(chrono::Utc::now()),
        ConnectionState::Disconnected
    );
    assert_eq!(signaling.names().last(), Some(&"disconnect"));
    assert_eq!(factory.closed(), 1);
}

#[tokio::test]
async fn test_handle_reports_pairing_errors() {
    let h = harness(PeerSide::Host);
    let (handle, _task) = SessionDriver::spawn(h.session);

    handle.generate_code().await.unwrap();
    let err = handle.generate_code().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PairingError>(),
        Some(PairingError::Busy(_))
    ));

    handle.disconnect().await.unwrap();
    assert_eq!(
        handle.stats().await.unwrap().state,
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_registered_handler_receives_control_text() {
    let h = harness(PeerSide::Guest);
    let (handle, _task) = SessionDriver::spawn(h.session);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    handle
        .register_command(
            CommandKind::ScrollUp,
            move |message: ControlMessage| -> Result<()> {
                sink.lock().unwrap().push(message.data);
                Ok(())
            },
        )
        .await
        .unwrap();

    handle
        .control_text(r#"{"type":"scroll-up","data":"3","timestamp":1}"#)
        .await
        .unwrap();

    // Events are handled in order, so the stats reply comes after the command
    handle.stats().await.unwrap();
    assert_eq!(*received.lock().unwrap(), vec!["3".to_string()]);
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let h = harness(PeerSide::Guest);
    let (handle, task) = SessionDriver::spawn(h.session);

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    assert!(handle.stats().await.is_err());
}
