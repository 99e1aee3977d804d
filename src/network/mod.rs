//! Network Layer
//!
//! Session loop and replicated messages. Everything here is wall-clock
//! driven; match rules live in `game/`.

pub mod replication;
pub mod session;

pub use replication::{InteractableSnapshot, Replicated};
pub use session::{
    MatchSession, SessionCommand, SessionConfig, SessionError, SessionHandle, SessionId,
    SessionManager, SessionState, SessionSummary,
};
