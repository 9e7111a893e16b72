use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use super::codec::CodecError;
use crate::tracks::AudioChannelRole;

/// Suffix that marks a fragment of a chunked command
pub const CHUNK_SUFFIX: &str = "-chunk";

/// Command types understood on the control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Screenshot,
    Text,
    QuickAnswer,
    ScrollUp,
    ScrollDown,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::Screenshot,
        CommandKind::Text,
        CommandKind::QuickAnswer,
        CommandKind::ScrollUp,
        CommandKind::ScrollDown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Screenshot => "screenshot",
            CommandKind::Text => "text",
            CommandKind::QuickAnswer => "quick-answer",
            CommandKind::ScrollUp => "scroll-up",
            CommandKind::ScrollDown => "scroll-down",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An atomic command, or a fully reassembled chunked one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub data: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Body of a chunk fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFragment {
    pub id: String,
    pub index: usize,
    pub total: usize,
    pub chunk: String,
}

/// One fragment of a chunked command of type `kind`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentMessage {
    pub kind: CommandKind,
    pub fragment: ChunkFragment,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptPhase {
    Recognizing,
    Recognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Pending,
    Received,
}

/// Live transcription text for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptText {
    pub role: AudioChannelRole,
    pub text: String,
    #[serde(rename = "type")]
    pub phase: TranscriptPhase,
    pub status: TranscriptStatus,
    pub timestamp: i64,
}

/// Volume telemetry, `volume` scaled to 0-100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTelemetry {
    pub role: AudioChannelRole,
    pub volume: u8,
    pub timestamp: i64,
}

impl VolumeTelemetry {
    /// Build from a normalized 0.0-1.0 level
    pub fn from_level(role: AudioChannelRole, level: f32, timestamp: i64) -> Self {
        let volume = (level.clamp(0.0, 1.0) * 100.0).round() as u8;
        Self {
            role,
            volume,
            timestamp,
        }
    }
}

/// Everything that travels over the control data channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    Command(ControlMessage),
    Fragment(FragmentMessage),
    Transcript(TranscriptText),
    Volume(VolumeTelemetry),
}

impl ChannelMessage {
    /// Parse one data-channel text frame
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CodecError::MissingType)?
            .to_string();

        match kind.as_str() {
            "volume" => Ok(ChannelMessage::Volume(serde_json::from_value(value)?)),
            "recognizing" | "recognized" => {
                Ok(ChannelMessage::Transcript(serde_json::from_value(value)?))
            }
            other => {
                if let Some(base) = other.strip_suffix(CHUNK_SUFFIX) {
                    let kind = CommandKind::from_wire(base)
                        .ok_or_else(|| CodecError::UnknownType(other.to_string()))?;
                    let fragment: ChunkFragment = serde_json::from_value(
                        value.get("data").cloned().unwrap_or(Value::Null),
                    )?;
                    Ok(ChannelMessage::Fragment(FragmentMessage {
                        kind,
                        fragment,
                        timestamp: timestamp_of(&value),
                    }))
                } else if let Some(kind) = CommandKind::from_wire(other) {
                    let data: String = serde_json::from_value(
                        value.get("data").cloned().unwrap_or(Value::Null),
                    )?;
                    Ok(ChannelMessage::Command(ControlMessage {
                        kind,
                        data,
                        timestamp: timestamp_of(&value),
                    }))
                } else {
                    Err(CodecError::UnknownType(other.to_string()))
                }
            }
        }
    }

    /// Serialize to one data-channel text frame
    pub fn encode(&self) -> Result<String, CodecError> {
        let value = match self {
            ChannelMessage::Command(message) => serde_json::to_value(message)?,
            ChannelMessage::Transcript(text) => serde_json::to_value(text)?,
            ChannelMessage::Fragment(message) => json!({
                "type": format!("{}{}", message.kind, CHUNK_SUFFIX),
                "data": message.fragment,
                "timestamp": message.timestamp,
            }),
            ChannelMessage::Volume(telemetry) => json!({
                "type": "volume",
                "role": telemetry.role,
                "volume": telemetry.volume,
                "timestamp": telemetry.timestamp,
            }),
        };
        Ok(value.to_string())
    }
}

fn timestamp_of(value: &Value) -> i64 {
    value
        .get("timestamp")
        .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_atomic_command() {
        let msg = ChannelMessage::decode(
            r#"{"type":"quick-answer","data":"","timestamp":1700000000000}"#,
        )
        .unwrap();

        assert_eq!(
            msg,
            ChannelMessage::Command(ControlMessage {
                kind: CommandKind::QuickAnswer,
                data: String::new(),
                timestamp: 1_700_000_000_000,
            })
        );
    }

    #[test]
    fn test_command_timestamp_tolerance_matches_fragments() {
        let float =
            ChannelMessage::decode(r#"{"type":"text","data":"hi","timestamp":1700000000000.5}"#)
                .unwrap();
        let missing = ChannelMessage::decode(r#"{"type":"scroll-up","data":"3"}"#).unwrap();
        let fragment = ChannelMessage::decode(
            r#"{"type":"text-chunk","data":{"id":"m","index":0,"total":1,"chunk":"hi"},"timestamp":1700000000000.5}"#,
        )
        .unwrap();

        match (float, missing, fragment) {
            (
                ChannelMessage::Command(f),
                ChannelMessage::Command(m),
                ChannelMessage::Fragment(c),
            ) => {
                assert_eq!(f.timestamp, 1_700_000_000_000);
                assert_eq!(f.timestamp, c.timestamp);
                assert_eq!(m.timestamp, 0);
                assert_eq!(m.data, "3");
            }
            other => panic!("unexpected decode {other:?}"),
        }

        // data is still required
        assert!(matches!(
            ChannelMessage::decode(r#"{"type":"text","timestamp":1}"#),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_fragment() {
        let msg = ChannelMessage::decode(
            r#"{"type":"screenshot-chunk","data":{"id":"m1","index":2,"total":5,"chunk":"abc"},"timestamp":5}"#,
        )
        .unwrap();

        match msg {
            ChannelMessage::Fragment(f) => {
                assert_eq!(f.kind, CommandKind::Screenshot);
                assert_eq!(f.fragment.index, 2);
                assert_eq!(f.fragment.total, 5);
                assert_eq!(f.fragment.chunk, "abc");
                assert_eq!(f.timestamp, 5);
            }
            other => panic!("expected fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_types() {
        assert!(matches!(
            ChannelMessage::decode(r#"{"type":"reboot","data":"","timestamp":0}"#),
            Err(CodecError::UnknownType(_))
        ));
        assert!(matches!(
            ChannelMessage::decode(r#"{"type":"reboot-chunk","data":{},"timestamp":0}"#),
            Err(CodecError::UnknownType(_))
        ));
        assert!(matches!(
            ChannelMessage::decode(r#"{"data":"x"}"#),
            Err(CodecError::MissingType)
        ));
        assert!(matches!(
            ChannelMessage::decode("not json"),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_negative_index_is_malformed() {
        let result = ChannelMessage::decode(
            r#"{"type":"text-chunk","data":{"id":"m","index":-1,"total":2,"chunk":"a"},"timestamp":0}"#,
        );
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_volume_wire_shape() {
        let telemetry =
            VolumeTelemetry::from_level(AudioChannelRole::RemoteParticipant, 0.426, 99);
        let text = ChannelMessage::Volume(telemetry.clone()).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["type"], "volume");
        assert_eq!(value["role"], "remoteParticipant");
        assert_eq!(value["volume"], 43);
        assert_eq!(
            ChannelMessage::decode(&text).unwrap(),
            ChannelMessage::Volume(telemetry)
        );
    }

    #[test]
    fn test_transcript_wire_shape() {
        let text = r#"{"role":"localParticipant","text":"hello","type":"recognized","status":"received","timestamp":12}"#;
        match ChannelMessage::decode(text).unwrap() {
            ChannelMessage::Transcript(t) => {
                assert_eq!(t.role, AudioChannelRole::LocalParticipant);
                assert_eq!(t.phase, TranscriptPhase::Recognized);
                assert_eq!(t.status, TranscriptStatus::Received);
            }
            other => panic!("expected transcript, got {other:?}"),
        }
    }

    #[test]
    fn test_fragment_type_suffix() {
        let text = ChannelMessage::Fragment(FragmentMessage {
            kind: CommandKind::ScrollDown,
            fragment: ChunkFragment {
                id: "x".to_string(),
                index: 0,
                total: 1,
                chunk: "y".to_string(),
            },
            timestamp: 0,
        })
        .encode()
        .unwrap();

        assert!(text.contains("\"type\":\"scroll-down-chunk\""));
    }
}
