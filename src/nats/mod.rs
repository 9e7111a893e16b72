pub mod bridge;
pub mod client;
pub mod messages;

pub use bridge::spawn_listeners;
pub use client::{audio_subject, signal_subject, NatsClient};
pub use messages::{AudioFrameMessage, TranscriptMessage};
