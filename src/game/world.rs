//! World Model
//!
//! The server's view of character bodies (actors) and interactable objects.
//! Positions come from the engine; the core only tracks what the rules need:
//! team, controller, life, health and who is carrying whom.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::ids::{ActorId, AgentId, EntityId, PlayerId};
use crate::game::interactable::Interactable;
use crate::game::roles::Team;

/// Starting health for a body.
pub const DEFAULT_HEALTH: u32 = 3;

/// Who drives an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorController {
    /// A human player.
    Player(PlayerId),
    /// An AI agent.
    Ai(AgentId),
}

/// A character body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Handle.
    pub id: ActorId,
    /// Team of the body.
    pub team: Team,
    /// Player or AI driving it.
    pub controller: ActorController,
    /// Last known position.
    pub position: Vec3,
    /// Dead bodies cannot act.
    pub dead: bool,
    /// Remaining health.
    pub health: u32,
    /// Cat carried by this human.
    pub holding: Option<ActorId>,
    /// Human carrying this cat.
    pub held_by: Option<ActorId>,
}

impl Actor {
    /// Living body at `position`.
    pub fn new(id: ActorId, team: Team, controller: ActorController, position: Vec3) -> Self {
        Self {
            id,
            team,
            controller,
            position,
            dead: false,
            health: DEFAULT_HEALTH,
            holding: None,
            held_by: None,
        }
    }

    /// Driven by a player (not AI)?
    pub fn is_player(&self) -> bool {
        matches!(self.controller, ActorController::Player(_))
    }

    /// Human currently carrying a cat?
    pub fn is_holding_cat(&self) -> bool {
        self.team == Team::Human && self.holding.is_some()
    }
}

/// Actors and interactables, keyed for deterministic iteration.
#[derive(Debug, Default)]
pub struct World {
    actors: BTreeMap<ActorId, Actor>,
    entities: BTreeMap<EntityId, Interactable>,
}

impl World {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // ===== ACTORS =====

    /// Insert a new actor. An id already in use is refused and the existing
    /// actor is kept.
    pub fn insert_actor(&mut self, actor: Actor) -> bool {
        if self.actors.contains_key(&actor.id) {
            warn!("Actor id {} already in use, ignoring new {:?} body", actor.id, actor.team);
            return false;
        }
        self.actors.insert(actor.id, actor);
        true
    }

    /// Look up an actor.
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Look up an actor mutably.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Remove an actor, releasing any carry link it was part of.
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        let actor = self.actors.remove(&id)?;
        if let Some(carrier) = actor.held_by.and_then(|h| self.actors.get_mut(&h)) {
            carrier.holding = None;
        }
        if let Some(carried) = actor.holding.and_then(|c| self.actors.get_mut(&c)) {
            carried.held_by = None;
        }
        Some(actor)
    }

    /// All actors in id order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Human `human` picks up cat `cat`.
    pub fn hold(&mut self, human: ActorId, cat: ActorId) -> bool {
        let human_ok = self.actors.get(&human).is_some_and(|a| {
            a.team == Team::Human && !a.dead && a.holding.is_none()
        });
        let cat_ok = self.actors.get(&cat).is_some_and(|a| {
            a.team == Team::Cat && a.held_by.is_none()
        });
        if !human_ok || !cat_ok {
            warn!("Cannot hold {} with {}", cat, human);
            return false;
        }

        if let Some(h) = self.actors.get_mut(&human) {
            h.holding = Some(cat);
        }
        if let Some(c) = self.actors.get_mut(&cat) {
            c.held_by = Some(human);
        }
        true
    }

    /// Release whatever `human` carries and return it.
    pub fn release(&mut self, human: ActorId) -> Option<ActorId> {
        let cat = self.actors.get_mut(&human)?.holding.take()?;
        if let Some(c) = self.actors.get_mut(&cat) {
            c.held_by = None;
        }
        Some(cat)
    }

    // ===== INTERACTABLES =====

    /// Insert or replace an interactable.
    pub fn insert_entity(&mut self, entity: Interactable) {
        self.entities.insert(entity.id(), entity);
    }

    /// Look up an interactable.
    pub fn entity(&self, id: EntityId) -> Option<&Interactable> {
        self.entities.get(&id)
    }

    /// Look up an interactable mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Interactable> {
        self.entities.get_mut(&id)
    }

    /// Destroy an interactable.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Interactable> {
        self.entities.remove(&id)
    }

    /// All interactables in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Interactable> {
        self.entities.values()
    }

    /// Interactable ids in order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }
}
