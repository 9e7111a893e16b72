pub mod file;
pub mod frame;
pub mod sink;

pub use file::AudioFile;
pub use frame::{rms_level, AudioFrame};
pub use sink::TranscriptionSink;
