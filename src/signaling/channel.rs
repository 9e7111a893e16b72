use anyhow::Result;

use super::messages::SignalEnvelope;

/// Outbound half of the signaling service
///
/// Inbound envelopes are fed to the session as events; implementations only need to
/// deliver what the session sends.
#[async_trait::async_trait]
pub trait Signaling: Send + Sync {
    async fn send(&self, envelope: SignalEnvelope) -> Result<()>;
}
