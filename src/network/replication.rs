//! Replication Messages
//!
//! What observers receive after each second. JSON for now; the transport
//! that carries it lives outside this crate.

use serde::{Deserialize, Serialize};

use crate::core::ids::EntityId;
use crate::game::events::GameEvent;
use crate::game::facts::{MatchFacts, MatchOutcome};
use crate::game::interactable::{Interactable, InteractableState};

/// Interactable state as seen by observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractableSnapshot {
    /// Entity.
    pub id: EntityId,
    /// Behavior name ("item", "pushable", ...).
    pub kind: String,
    /// Engagement and cooldown.
    pub state: InteractableState,
}

impl From<&Interactable> for InteractableSnapshot {
    fn from(entity: &Interactable) -> Self {
        Self {
            id: entity.id(),
            kind: entity.behavior.kind().to_string(),
            state: *entity.state(),
        }
    }
}

/// One replicated update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Replicated {
    /// Match facts changed (new revision).
    Facts(MatchFacts),

    /// An interactable's state changed.
    Interactable(InteractableSnapshot),

    /// Events of one second.
    Events {
        /// Second the events were drained at.
        second: u32,
        /// Events in order.
        events: Vec<GameEvent>,
    },

    /// Final outcome.
    Outcome(MatchOutcome),
}

impl Replicated {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
