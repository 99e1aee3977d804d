//! Interactable Behaviors
//!
//! What an interactable actually does when engaged. The lifecycle (modes,
//! cooldown, single-use) lives in `interactable`; a behavior only supplies
//! eligibility, the direct effect and the per-tick duration effect.
//!
//! Effects are returned as [`Effect`] values and applied by the controller,
//! which owns the match facts, the world and the physics collaborator.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::ids::{ActorId, EntityId};
use crate::core::pose::Pose;
use crate::game::interactable::{EffectMode, UsageCardinality};
use crate::game::world::Actor;

/// Default impulse magnitude for a push.
pub const DEFAULT_PUSH_FORCE: f32 = 500.0;

/// A consequence of an interaction, applied by the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Add progression weight to the cat objective.
    CatProgress(f32),
    /// Add caught cats to the human objective.
    HumanProgress(i32),
    /// Push a prop through the physics collaborator.
    Impulse {
        /// Pushed prop.
        target: EntityId,
        /// Impulse vector.
        impulse: Vec3,
    },
    /// A prop made noise AI agents should investigate.
    Noise {
        /// Noisy prop.
        source: EntityId,
        /// Where it happened.
        location: Vec3,
    },
    /// Human put the cat they carry into a cage.
    CatchCat {
        /// Carrying human.
        human: ActorId,
        /// Carried cat.
        cat: ActorId,
    },
}

// =============================================================================
// BEHAVIORS
// =============================================================================

/// Pickable item. The MeowPhone adds cat progress on use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemBehavior {
    /// Actor carrying the item.
    pub held_by: Option<ActorId>,
    /// Progression weight added per use.
    pub progress_on_use: f32,
    /// Completed uses (direct applications plus duration ticks).
    pub uses: u32,
}

impl ItemBehavior {
    /// Item that adds `progress_on_use` when used.
    pub fn new(progress_on_use: f32) -> Self {
        Self { held_by: None, progress_on_use, uses: 0 }
    }

    /// Attach to a carrier. Fails if already carried.
    pub fn pick_up(&mut self, actor: ActorId) -> bool {
        if self.held_by.is_some() {
            return false;
        }
        self.held_by = Some(actor);
        true
    }

    /// Put down.
    pub fn drop(&mut self) -> Option<ActorId> {
        self.held_by.take()
    }

    fn used(&mut self) -> Vec<Effect> {
        self.uses += 1;
        if self.progress_on_use > 0.0 {
            vec![Effect::CatProgress(self.progress_on_use)]
        } else {
            Vec::new()
        }
    }
}

/// Prop a cat can knock over. Counts toward cat progress once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushableBehavior {
    /// Cat progress added by the first push.
    pub progression_weight: f32,
    /// Impulse magnitude.
    pub push_force: f32,
    /// Set after the first push.
    pub already_pushed: bool,
}

impl PushableBehavior {
    /// Pushable worth `progression_weight`.
    pub fn new(progression_weight: f32) -> Self {
        Self {
            progression_weight,
            push_force: DEFAULT_PUSH_FORCE,
            already_pushed: false,
        }
    }
}

/// Window, machine or anything else operated over time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBehavior {
    /// Number of effect applications so far.
    pub applications: u32,
}

/// Character ability. Same engagement and cooldown rules as a prop, but only
/// its owner can trigger it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityBehavior {
    /// Body the ability belongs to.
    pub owner: ActorId,
    /// Activations so far (direct uses plus duration ticks).
    pub activations: u32,
}

impl AbilityBehavior {
    /// Ability owned by `owner`.
    pub fn new(owner: ActorId) -> Self {
        Self { owner, activations: 0 }
    }
}

/// Behavior attached to an interactable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    /// Pickable item.
    Item(ItemBehavior),
    /// Pushable prop.
    Pushable(PushableBehavior),
    /// Duration prop.
    Custom(CustomBehavior),
    /// Cage for caught cats.
    Cage,
    /// Owner-only character ability.
    Ability(AbilityBehavior),
}

impl Behavior {
    /// Short name for logs and snapshots.
    pub fn kind(&self) -> &'static str {
        match self {
            Behavior::Item(_) => "item",
            Behavior::Pushable(_) => "pushable",
            Behavior::Custom(_) => "custom",
            Behavior::Cage => "cage",
            Behavior::Ability(_) => "ability",
        }
    }

    /// Lifecycle a freshly placed entity gets: (mode, usage, duration, cooldown).
    pub fn default_profile(&self) -> (EffectMode, UsageCardinality, u32, u32) {
        match self {
            Behavior::Item(_) => (EffectMode::Direct, UsageCardinality::SingleUse, 0, 0),
            Behavior::Pushable(_) => (EffectMode::Direct, UsageCardinality::Reusable, 0, 3),
            Behavior::Custom(_) => (EffectMode::Duration, UsageCardinality::Reusable, 3, 5),
            Behavior::Cage => (EffectMode::Direct, UsageCardinality::Reusable, 0, 1),
            Behavior::Ability(_) => (EffectMode::Direct, UsageCardinality::Reusable, 0, 5),
        }
    }

    /// May `actor` engage right now?
    pub fn is_eligible(&self, actor: &Actor) -> bool {
        match self {
            // Free items can be used by anyone, held ones only by the holder.
            Behavior::Item(item) => item.held_by.map_or(true, |holder| holder == actor.id),
            Behavior::Cage => actor.is_holding_cat(),
            Behavior::Ability(ability) => ability.owner == actor.id,
            Behavior::Pushable(_) | Behavior::Custom(_) => true,
        }
    }

    /// Instant effect for a direct-mode engagement.
    pub fn apply_direct(&mut self, entity: EntityId, pose: &Pose, actor: &Actor) -> Vec<Effect> {
        match self {
            Behavior::Item(item) => item.used(),
            Behavior::Pushable(push) => {
                if push.already_pushed {
                    debug!("{} already pushed, no progress", entity);
                    return Vec::new();
                }
                push.already_pushed = true;

                let direction = Pose::at(actor.position).direction_to(pose.position);
                vec![
                    Effect::Impulse { target: entity, impulse: direction * push.push_force },
                    Effect::CatProgress(push.progression_weight),
                    Effect::Noise { source: entity, location: pose.position },
                ]
            }
            Behavior::Custom(custom) => {
                custom.applications += 1;
                Vec::new()
            }
            Behavior::Ability(ability) => {
                ability.activations += 1;
                debug!("{} used ability {}", actor.id, entity);
                Vec::new()
            }
            Behavior::Cage => match actor.holding {
                Some(cat) => vec![Effect::CatchCat { human: actor.id, cat }],
                None => {
                    warn!("{} engaged {} without carrying a cat", actor.id, entity);
                    Vec::new()
                }
            },
        }
    }

    /// Per-second effect for a duration-mode engagement.
    pub fn apply_tick(&mut self, entity: EntityId) -> Vec<Effect> {
        match self {
            Behavior::Item(item) => item.used(),
            Behavior::Custom(custom) => {
                custom.applications += 1;
                Vec::new()
            }
            Behavior::Ability(ability) => {
                ability.activations += 1;
                Vec::new()
            }
            Behavior::Pushable(_) | Behavior::Cage => {
                debug!("{} has no duration effect", entity);
                Vec::new()
            }
        }
    }
}
