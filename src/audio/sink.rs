use anyhow::Result;

use super::frame::AudioFrame;

/// Downstream transcription service
///
/// Only frames whose channel gate is open reach `forward`.
#[async_trait::async_trait]
pub trait TranscriptionSink: Send + Sync {
    async fn forward(&self, frame: &AudioFrame) -> Result<()>;

    /// Mark the end of a speaking turn for `frame.role`
    async fn end_of_turn(&self, frame: &AudioFrame) -> Result<()>;
}
