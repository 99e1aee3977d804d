//! Game Events
//!
//! Everything observable that happened during a second, for replication and
//! logs. Events are shipped in the order the controller recorded them; a
//! consequence never precedes its cause.

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::core::ids::{ActorId, AgentId, EntityId, PlayerId};
use crate::game::facts::{MatchOutcome, MatchPhase};

/// Event category, for observers that filter or bucket events.
///
/// Lower value = more fundamental. Never used to reorder a tick's events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Match end and phase changes first
    Phase = 0,
    /// Then deaths and body swaps
    PlayerLife = 1,
    /// Then objective progress
    Progress = 2,
    /// Then interactions
    Interaction = 3,
    /// Then AI tasking
    AiTask = 4,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GameEventData {
    /// Match phase changed
    PhaseChanged {
        from: MatchPhase,
        to: MatchPhase,
    },

    /// A phase countdown stepped
    CountdownTick {
        phase: MatchPhase,
        remaining: u32,
    },

    /// Cat progression moved
    CatProgressChanged {
        current: f32,
        total: f32,
    },

    /// Caught cat count moved
    HumanProgressChanged {
        caught: u32,
        total: u32,
    },

    /// Engagement accepted
    InteractionStarted {
        entity: EntityId,
        actor: ActorId,
        player_id: Option<PlayerId>,
    },

    /// Engagement finished and the entity resolved
    InteractionResolved {
        entity: EntityId,
    },

    /// Entity is eligible again
    CooldownEnded {
        entity: EntityId,
    },

    /// Entity removed from the world
    EntityDestroyed {
        entity: EntityId,
    },

    /// AI task queued
    UrgentTaskSubmitted {
        source: EntityId,
        location: Vec3,
    },

    /// AI agent sent to a task
    AiTaskAssigned {
        agent: AgentId,
        source: EntityId,
    },

    /// Cat caught in a cage
    CatCaught {
        human: ActorId,
        cat: ActorId,
        by_player: bool,
    },

    /// Player's body died
    PlayerDied {
        player_id: PlayerId,
        actor: Option<ActorId>,
    },

    /// Player now controls a new body
    BodyReplaced {
        player_id: PlayerId,
        actor: ActorId,
    },

    /// Match ended
    MatchEnded {
        outcome: MatchOutcome,
        elapsed_seconds: u32,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Second when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Player involved (for tie-breaking)
    pub player_id: Option<PlayerId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        let priority = match &data {
            GameEventData::PhaseChanged { .. }
            | GameEventData::CountdownTick { .. }
            | GameEventData::MatchEnded { .. } => EventPriority::Phase,
            GameEventData::PlayerDied { .. }
            | GameEventData::BodyReplaced { .. } => EventPriority::PlayerLife,
            GameEventData::CatProgressChanged { .. }
            | GameEventData::HumanProgressChanged { .. }
            | GameEventData::CatCaught { .. } => EventPriority::Progress,
            GameEventData::InteractionStarted { .. }
            | GameEventData::InteractionResolved { .. }
            | GameEventData::CooldownEnded { .. }
            | GameEventData::EntityDestroyed { .. } => EventPriority::Interaction,
            GameEventData::UrgentTaskSubmitted { .. }
            | GameEventData::AiTaskAssigned { .. } => EventPriority::AiTask,
        };

        let player_id = match &data {
            GameEventData::InteractionStarted { player_id, .. } => *player_id,
            GameEventData::PlayerDied { player_id, .. } => Some(*player_id),
            GameEventData::BodyReplaced { player_id, .. } => Some(*player_id),
            _ => None,
        };

        Self {
            tick,
            priority,
            player_id,
            data,
        }
    }

    /// Create phase changed event.
    pub fn phase_changed(tick: u32, from: MatchPhase, to: MatchPhase) -> Self {
        Self::new(tick, GameEventData::PhaseChanged { from, to })
    }

    /// Create match ended event.
    pub fn match_ended(tick: u32, outcome: MatchOutcome) -> Self {
        Self::new(tick, GameEventData::MatchEnded { outcome, elapsed_seconds: tick })
    }

    /// Create player died event.
    pub fn player_died(tick: u32, player_id: PlayerId, actor: Option<ActorId>) -> Self {
        Self::new(tick, GameEventData::PlayerDied { player_id, actor })
    }

    /// Create body replaced event.
    pub fn body_replaced(tick: u32, player_id: PlayerId, actor: ActorId) -> Self {
        Self::new(tick, GameEventData::BodyReplaced { player_id, actor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::facts::WinReason;
    use crate::game::roles::Team;

    #[test]
    fn test_event_priority_mapping() {
        let id1 = PlayerId::new([1; 16]);

        let ended = GameEvent::match_ended(10, MatchOutcome {
            winner: Team::Cat,
            reason: WinReason::CatObjective,
        });
        let died = GameEvent::player_died(10, id1, None);
        let progress = GameEvent::new(10, GameEventData::CatProgressChanged {
            current: 1.0,
            total: 2.0,
        });
        let started = GameEvent::new(10, GameEventData::InteractionStarted {
            entity: EntityId(3),
            actor: ActorId(4),
            player_id: None,
        });

        assert_eq!(ended.priority, EventPriority::Phase);
        assert_eq!(died.priority, EventPriority::PlayerLife);
        assert_eq!(died.player_id, Some(id1));
        assert_eq!(progress.priority, EventPriority::Progress);
        assert_eq!(started.priority, EventPriority::Interaction);
        assert_eq!(started.player_id, None);
        assert!(EventPriority::Phase < EventPriority::Other);
    }
}
