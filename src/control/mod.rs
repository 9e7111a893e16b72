//! Control data channel protocol
//!
//! Small commands travel as single JSON messages. Large payloads (screen captures)
//! are split into `<type>-chunk` fragments and reassembled by index on the far side,
//! then handed to the registered handler as if they had arrived whole.

mod codec;
mod message;
mod registry;

pub use codec::{ChunkBuffers, ChunkEncoder, CodecError};
pub use message::{
    ChannelMessage, ChunkFragment, CommandKind, ControlMessage, FragmentMessage, TranscriptPhase,
    TranscriptStatus, TranscriptText, VolumeTelemetry, CHUNK_SUFFIX,
};
pub use registry::{CommandHandler, CommandRegistry, Dispatch};
