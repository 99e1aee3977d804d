//! Core primitives.
//!
//! Identifiers, world placement, countdown timers and the seeded RNG used for
//! match setup. Nothing in here knows about match rules.

pub mod ids;
pub mod pose;
pub mod rng;
pub mod timer;

// Re-export core types
pub use ids::{ActorId, AgentId, EntityId, PlayerId};
pub use pose::{Pose, Rotation};
pub use rng::DeterministicRng;
pub use timer::{Countdown, Firing, Tick, TimerKey, TimerOwner, TimerScheduler, TimerSlot};
