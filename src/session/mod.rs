//! Pairing session management
//!
//! This module provides the `PairingSession` that manages:
//! - Pairing codes and the connection lifecycle
//! - Offer/answer negotiation through the signaling service
//! - Per-pairing state (ICE buffer, role bindings, VAD gates, chunk buffers)
//! - Teardown back to a clean DISCONNECTED state
//!
//! `SessionDriver` runs a session on its own task and `SessionHandle` talks to it.

mod code;
mod config;
mod driver;
mod error;
mod session;
mod state;
mod stats;

pub use code::{PairingCode, DEFAULT_CODE_TTL};
pub use config::SessionConfig;
pub use driver::{SessionDriver, SessionEvent, SessionHandle};
pub use error::PairingError;
pub use session::{ControlOutcome, PairingSession, SessionNotice};
pub use state::ConnectionState;
pub use stats::{RoleCounts, SessionStats};
