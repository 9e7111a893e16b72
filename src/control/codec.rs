use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::message::{ChannelMessage, ChunkFragment, CommandKind, ControlMessage, FragmentMessage};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("control message has no type")]
    MissingType,

    #[error("unknown control message type {0:?}")]
    UnknownType(String),

    #[error("message {id} announces zero chunks")]
    EmptyMessage { id: String },

    #[error("message {id} announces {total} chunks, limit is {max}")]
    TooManyChunks { id: String, total: usize, max: usize },

    #[error("chunk {index} of message {id} is outside 0..{total}")]
    IndexOutOfRange {
        id: String,
        index: usize,
        total: usize,
    },

    #[error("message {id} was started with {expected} chunks, fragment says {got}")]
    TotalMismatch {
        id: String,
        expected: usize,
        got: usize,
    },

    #[error("message {id} would exceed {max} incomplete messages")]
    TooManyPending { id: String, max: usize },

    #[error("message {id} was started as {expected}, fragment says {got}")]
    KindMismatch {
        id: String,
        expected: CommandKind,
        got: CommandKind,
    },
}

/// Splits outgoing payloads into chunk fragments when they exceed `chunk_size` characters
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    chunk_size: usize,
}

impl ChunkEncoder {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encode `payload` as one atomic command or a run of fragments sharing a fresh id
    pub fn encode(&self, kind: CommandKind, payload: &str, timestamp: i64) -> Vec<ChannelMessage> {
        let chars: Vec<char> = payload.chars().collect();

        if chars.len() <= self.chunk_size {
            return vec![ChannelMessage::Command(ControlMessage {
                kind,
                data: payload.to_string(),
                timestamp,
            })];
        }

        let id = uuid::Uuid::new_v4().to_string();
        let pieces: Vec<String> = chars
            .chunks(self.chunk_size)
            .map(|piece| piece.iter().collect())
            .collect();
        let total = pieces.len();

        debug!("Encoding {} as {} chunks (id={})", kind, total, id);

        pieces
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                ChannelMessage::Fragment(FragmentMessage {
                    kind,
                    fragment: ChunkFragment {
                        id: id.clone(),
                        index,
                        total,
                        chunk,
                    },
                    timestamp,
                })
            })
            .collect()
    }
}

/// Partially received chunked message
#[derive(Debug)]
struct ChunkBuffer {
    kind: CommandKind,
    slots: Vec<Option<String>>,
    filled: usize,
    last_fragment_at: DateTime<Utc>,
}

impl ChunkBuffer {
    fn new(kind: CommandKind, total: usize, now: DateTime<Utc>) -> Self {
        Self {
            kind,
            slots: vec![None; total],
            filled: 0,
            last_fragment_at: now,
        }
    }

    fn total(&self) -> usize {
        self.slots.len()
    }

    fn write(&mut self, index: usize, chunk: String, now: DateTime<Utc>) {
        if self.slots[index].replace(chunk).is_none() {
            self.filled += 1;
        }
        self.last_fragment_at = now;
    }

    fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    fn assemble(self) -> String {
        self.slots.into_iter().flatten().collect()
    }
}

/// Reassembly buffers for one pairing session, keyed by message id
///
/// A message completes exactly when every slot has been written, in any order.
/// Duplicate fragments overwrite their slot. Buffers that see no fragment for
/// `timeout` are dropped by [`ChunkBuffers::evict_expired`].
#[derive(Debug)]
pub struct ChunkBuffers {
    buffers: HashMap<String, ChunkBuffer>,
    max_chunks: usize,
    max_pending: usize,
    timeout: std::time::Duration,
}

impl ChunkBuffers {
    pub fn new(max_chunks: usize, max_pending: usize, timeout: std::time::Duration) -> Self {
        Self {
            buffers: HashMap::new(),
            max_chunks,
            max_pending,
            timeout,
        }
    }

    /// Store one fragment; returns the reassembled command when it completes a message
    pub fn accept(
        &mut self,
        message: FragmentMessage,
        now: DateTime<Utc>,
    ) -> Result<Option<ControlMessage>, CodecError> {
        let FragmentMessage {
            kind,
            fragment,
            timestamp,
        } = message;
        let ChunkFragment {
            id,
            index,
            total,
            chunk,
        } = fragment;

        if total == 0 {
            return Err(CodecError::EmptyMessage { id });
        }
        if total > self.max_chunks {
            return Err(CodecError::TooManyChunks {
                id,
                total,
                max: self.max_chunks,
            });
        }
        if index >= total {
            return Err(CodecError::IndexOutOfRange { id, index, total });
        }

        match self.buffers.get(&id) {
            None if self.buffers.len() >= self.max_pending => {
                return Err(CodecError::TooManyPending {
                    id,
                    max: self.max_pending,
                });
            }
            None => {}
            Some(existing) => {
                if existing.total() != total {
                    return Err(CodecError::TotalMismatch {
                        expected: existing.total(),
                        got: total,
                        id,
                    });
                }
                if existing.kind != kind {
                    return Err(CodecError::KindMismatch {
                        expected: existing.kind,
                        got: kind,
                        id,
                    });
                }
            }
        }

        let buffer = self
            .buffers
            .entry(id.clone())
            .or_insert_with(|| ChunkBuffer::new(kind, total, now));
        buffer.write(index, chunk, now);

        debug!(
            "Chunk {}/{} of {} message {} ({} filled)",
            index + 1,
            total,
            kind,
            id,
            buffer.filled
        );

        if !buffer.is_complete() {
            return Ok(None);
        }

        let data = match self.buffers.remove(&id) {
            Some(buffer) => buffer.assemble(),
            None => return Ok(None),
        };

        info!(
            "Reassembled {} message {} ({} chunks, {} bytes)",
            kind,
            id,
            total,
            data.len()
        );

        Ok(Some(ControlMessage {
            kind,
            data,
            timestamp,
        }))
    }

    /// Drop buffers whose last fragment is older than the timeout; returns how many
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let timeout = self.timeout;
        let before = self.buffers.len();

        self.buffers.retain(|id, buffer| {
            let idle = now.signed_duration_since(buffer.last_fragment_at);
            // a fragment stamped after `now` counts as fresh
            let keep = idle.to_std().map_or(true, |idle| idle < timeout);
            if !keep {
                warn!(
                    "Dropping incomplete {} message {} ({}/{} chunks, idle {}ms)",
                    buffer.kind,
                    id,
                    buffer.filled,
                    buffer.total(),
                    idle.num_milliseconds()
                );
            }
            keep
        });

        before - self.buffers.len()
    }

    /// Number of messages still waiting for fragments
    pub fn pending(&self) -> usize {
        self.buffers.len()
    }

    pub fn clear(&mut self) {
        if !self.buffers.is_empty() {
            info!("Discarding {} incomplete chunked messages", self.buffers.len());
        }
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fragment(id: &str, index: usize, total: usize, chunk: &str) -> FragmentMessage {
        FragmentMessage {
            kind: CommandKind::Screenshot,
            fragment: ChunkFragment {
                id: id.to_string(),
                index,
                total,
                chunk: chunk.to_string(),
            },
            timestamp: 0,
        }
    }

    fn buffers() -> ChunkBuffers {
        ChunkBuffers::new(64, 4, std::time::Duration::from_secs(30))
    }

    #[test]
    fn test_small_payload_is_atomic() {
        let encoder = ChunkEncoder::new(10);
        let out = encoder.encode(CommandKind::Text, "short", 1);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], ChannelMessage::Command(_)));
    }

    #[test]
    fn test_encoder_splits_on_char_boundaries() {
        let encoder = ChunkEncoder::new(2);
        let out = encoder.encode(CommandKind::Text, "héllo", 0);
        let chunks: Vec<String> = out
            .iter()
            .map(|m| match m {
                ChannelMessage::Fragment(f) => f.fragment.chunk.clone(),
                other => panic!("expected fragment, got {other:?}"),
            })
            .collect();
        assert_eq!(chunks, vec!["hé", "ll", "o"]);
    }

    #[test]
    fn test_duplicate_overwrites_slot() {
        let mut b = buffers();
        let now = Utc::now();
        assert!(b.accept(fragment("m", 0, 2, "old"), now).unwrap().is_none());
        assert!(b.accept(fragment("m", 0, 2, "new"), now).unwrap().is_none());
        let done = b.accept(fragment("m", 1, 2, "!"), now).unwrap().unwrap();
        assert_eq!(done.data, "new!");
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn test_rejects_index_out_of_range() {
        let mut b = buffers();
        let err = b.accept(fragment("m", 3, 3, "x"), Utc::now()).unwrap_err();
        assert!(matches!(err, CodecError::IndexOutOfRange { index: 3, total: 3, .. }));
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn test_rejects_total_mismatch_and_keeps_buffer() {
        let mut b = buffers();
        let now = Utc::now();
        b.accept(fragment("m", 0, 3, "a"), now).unwrap();
        let err = b.accept(fragment("m", 1, 4, "b"), now).unwrap_err();
        assert!(matches!(err, CodecError::TotalMismatch { expected: 3, got: 4, .. }));

        b.accept(fragment("m", 1, 3, "b"), now).unwrap();
        let done = b.accept(fragment("m", 2, 3, "c"), now).unwrap().unwrap();
        assert_eq!(done.data, "abc");
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        let mut b = buffers();
        let now = Utc::now();
        b.accept(fragment("m", 0, 2, "a"), now).unwrap();
        let mut other = fragment("m", 1, 2, "b");
        other.kind = CommandKind::Text;
        assert!(matches!(
            b.accept(other, now),
            Err(CodecError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let mut b = buffers();
        assert!(matches!(
            b.accept(fragment("m", 0, 0, ""), Utc::now()),
            Err(CodecError::EmptyMessage { .. })
        ));
        assert!(matches!(
            b.accept(fragment("m", 0, 65, ""), Utc::now()),
            Err(CodecError::TooManyChunks { .. })
        ));
    }

    #[test]
    fn test_caps_incomplete_messages() {
        let mut b = buffers();
        let now = Utc::now();
        for id in ["a", "b", "c", "d"] {
            b.accept(fragment(id, 0, 2, "x"), now).unwrap();
        }

        let err = b.accept(fragment("e", 0, 2, "x"), now).unwrap_err();
        assert!(matches!(err, CodecError::TooManyPending { max: 4, .. }));
        assert_eq!(b.pending(), 4);

        // open messages still progress, and completing one frees a slot
        assert!(b.accept(fragment("a", 1, 2, "y"), now).unwrap().is_some());
        assert!(b.accept(fragment("e", 0, 2, "x"), now).unwrap().is_none());
    }

    #[test]
    fn test_evicts_idle_buffers_only() {
        let mut b = buffers();
        let start = Utc::now();
        b.accept(fragment("stale", 0, 2, "a"), start).unwrap();
        b.accept(fragment("fresh", 0, 2, "a"), start + Duration::seconds(20))
            .unwrap();

        assert_eq!(b.evict_expired(start + Duration::seconds(29)), 0);
        assert_eq!(b.evict_expired(start + Duration::seconds(30)), 1);
        assert_eq!(b.pending(), 1);
    }

    #[test]
    fn test_late_fragment_extends_deadline() {
        let mut b = buffers();
        let start = Utc::now();
        b.accept(fragment("m", 0, 3, "a"), start).unwrap();
        b.accept(fragment("m", 1, 3, "b"), start + Duration::seconds(25))
            .unwrap();
        assert_eq!(b.evict_expired(start + Duration::seconds(40)), 0);
    }
}
