//! HTTP API for local control of the pairing session
//!
//! - GET /health - Health check
//! - GET /pairing/status - Session statistics
//! - POST /pairing/code - Issue a pairing code (host)
//! - POST /pairing/connect - Join with a pairing code (guest)
//! - POST /pairing/disconnect - Tear down the pairing
//! - POST /pairing/commands - Send a command over the control channel

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
