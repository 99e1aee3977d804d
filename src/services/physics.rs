//! Physics collaborator.

use glam::Vec3;
use tracing::debug;

use crate::core::ids::EntityId;

/// Engine physics as seen from the match core.
pub trait Physics: Send {
    /// Apply an impulse to a prop.
    fn apply_impulse(&mut self, target: EntityId, impulse: Vec3);
}

/// Physics stand-in that only logs.
#[derive(Debug, Default)]
pub struct LoggingPhysics;

impl Physics for LoggingPhysics {
    fn apply_impulse(&mut self, target: EntityId, impulse: Vec3) {
        debug!("Impulse {:?} on {}", impulse, target);
    }
}
