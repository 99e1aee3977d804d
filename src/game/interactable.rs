//! Interactable Entity
//!
//! The lifecycle shared by items, props and cages:
//!
//! ```text
//!            engage (Direct)                 resolve
//!  Idle ─────────────────────────────────────────┬──► Exhausted (SingleUse)
//!    │       engage (Duration)                   │
//!    └──► Engaged ── Interaction timer 0 ────────┴──► CoolingDown (Reusable)
//!                                                          │
//!  Idle ◄──────────────── Cooldown timer 0 ────────────────┘
//! ```
//!
//! Engagement and cooldown are never active together; with both clear the
//! entity accepts a new engagement.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ids::{ActorId, EntityId};
use crate::core::pose::{Pose, Rotation};
use crate::core::rng::DeterministicRng;
use crate::core::timer::{Countdown, Tick, TimerKey, TimerScheduler, TimerSlot};
use crate::game::behavior::{Behavior, Effect};
use crate::game::broker::AiTaskBroker;
use crate::game::world::Actor;

// =============================================================================
// STATE
// =============================================================================

/// How the effect is delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectMode {
    /// One input, instant effect.
    Direct,
    /// Effect applied over a countdown.
    Duration,
}

/// How many times the entity can be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageCardinality {
    /// Destroyed after the first resolution.
    SingleUse,
    /// Cools down, then accepts engagements again.
    Reusable,
}

/// Current duration engagement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// An engagement is running.
    pub active: bool,
    /// Who started it.
    pub engaging_actor: Option<ActorId>,
    /// Seconds left.
    pub remaining_seconds: u32,
}

/// Reuse cooldown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    /// Cooling down.
    pub active: bool,
    /// Seconds left.
    pub remaining_seconds: u32,
    /// Configured length.
    pub total_seconds: u32,
}

/// Replicated lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractableState {
    /// Delivery mode.
    pub mode: EffectMode,
    /// Use cardinality.
    pub usage: UsageCardinality,
    /// Length of a duration engagement.
    pub duration_seconds: u32,
    /// Running engagement.
    pub engagement: Engagement,
    /// Running cooldown.
    pub cooldown: Cooldown,
}

/// Outcome of an engagement or timer step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Entity stays in the world.
    Alive,
    /// Single-use entity resolved and must be destroyed.
    Exhausted,
}

/// Why an engagement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngageRejection {
    /// Behavior predicate said no.
    #[error("actor is not eligible")]
    Ineligible,

    /// A duration engagement is already running.
    #[error("already engaged")]
    Engaged,

    /// Cooldown still running.
    #[error("cooling down")]
    CoolingDown,

    /// Actor is dead.
    #[error("actor is dead")]
    ActorDead,

    /// No such actor.
    #[error("unknown actor")]
    UnknownActor,

    /// No such entity (never placed, or destroyed).
    #[error("unknown entity")]
    UnknownEntity,

    /// Match is over.
    #[error("match has ended")]
    MatchEnded,
}

/// Collaborators an engagement may touch.
pub struct InteractionContext<'a> {
    /// Timer slots for the entity.
    pub scheduler: &'a mut TimerScheduler,
    /// Urgent task sink.
    pub broker: &'a mut AiTaskBroker,
    /// Effects for the controller to apply.
    pub effects: &'a mut Vec<Effect>,
}

// =============================================================================
// ENTITY
// =============================================================================

/// A world object players can engage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interactable {
    id: EntityId,
    /// Placement.
    pub pose: Pose,
    state: InteractableState,
    /// What engaging does.
    pub behavior: Behavior,
    /// Every successful engage posts an urgent AI task.
    pub raises_urgent: bool,
    /// Setup may randomize this prop.
    pub randomizable: bool,
    /// Setup randomized this prop.
    pub randomized: bool,
}

impl Interactable {
    /// Entity with the behavior's default lifecycle profile.
    pub fn new(id: EntityId, pose: Pose, behavior: Behavior) -> Self {
        let (mode, usage, duration_seconds, cooldown_seconds) = behavior.default_profile();
        Self {
            id,
            pose,
            state: InteractableState {
                mode,
                usage,
                duration_seconds,
                engagement: Engagement::default(),
                cooldown: Cooldown {
                    active: false,
                    remaining_seconds: 0,
                    total_seconds: cooldown_seconds,
                },
            },
            behavior,
            raises_urgent: false,
            randomizable: false,
            randomized: false,
        }
    }

    /// Override the delivery mode.
    pub fn with_mode(mut self, mode: EffectMode) -> Self {
        self.state.mode = mode;
        self
    }

    /// Override use cardinality.
    pub fn with_usage(mut self, usage: UsageCardinality) -> Self {
        self.state.usage = usage;
        self
    }

    /// Override duration length.
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.state.duration_seconds = seconds;
        self
    }

    /// Override cooldown length.
    pub fn with_cooldown(mut self, seconds: u32) -> Self {
        self.state.cooldown.total_seconds = seconds;
        self
    }

    /// Post an urgent AI task on every successful engage.
    pub fn raising_urgent(mut self) -> Self {
        self.raises_urgent = true;
        self
    }

    /// Let setup randomize this prop.
    pub fn randomizable(mut self) -> Self {
        self.randomizable = true;
        self
    }

    /// Handle.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Lifecycle state.
    pub fn state(&self) -> &InteractableState {
        &self.state
    }

    /// Behavior predicate only.
    pub fn is_eligible(&self, actor: &Actor) -> bool {
        self.behavior.is_eligible(actor)
    }

    /// Free to accept an engagement from anyone?
    pub fn is_idle(&self) -> bool {
        !self.state.engagement.active && !self.state.cooldown.active
    }

    /// Start an interaction.
    pub fn engage(
        &mut self,
        actor: &Actor,
        ctx: &mut InteractionContext<'_>,
    ) -> Result<Lifecycle, EngageRejection> {
        if self.state.engagement.active {
            return Err(EngageRejection::Engaged);
        }
        if self.state.cooldown.active {
            return Err(EngageRejection::CoolingDown);
        }
        if !self.behavior.is_eligible(actor) {
            return Err(EngageRejection::Ineligible);
        }

        if self.raises_urgent {
            ctx.broker.submit_urgent_task(self.id, self.pose.position);
        }

        match self.state.mode {
            EffectMode::Direct => {
                let effects = self.behavior.apply_direct(self.id, &self.pose, actor);
                ctx.effects.extend(effects);
                Ok(self.resolve(ctx))
            }
            EffectMode::Duration => {
                self.state.engagement = Engagement {
                    active: true,
                    engaging_actor: Some(actor.id),
                    remaining_seconds: self.state.duration_seconds,
                };
                ctx.effects.extend(self.behavior.apply_tick(self.id));
                ctx.scheduler.start(
                    TimerKey::entity(self.id, TimerSlot::Interaction),
                    self.state.duration_seconds,
                );
                Ok(Lifecycle::Alive)
            }
        }
    }

    /// Engage, reporting refusals only as `false`.
    pub fn try_engage(&mut self, actor: &Actor, ctx: &mut InteractionContext<'_>) -> (bool, Lifecycle) {
        match self.engage(actor, ctx) {
            Ok(lifecycle) => (true, lifecycle),
            Err(reason) => {
                debug!("{} rejected {}: {}", self.id, actor.id, reason);
                (false, Lifecycle::Alive)
            }
        }
    }

    /// Handle a firing of one of this entity's timer slots.
    pub fn on_timer(&mut self, slot: TimerSlot, ctx: &mut InteractionContext<'_>) -> Lifecycle {
        match slot {
            TimerSlot::Interaction => {
                let key = TimerKey::entity(self.id, TimerSlot::Interaction);
                if !self.state.engagement.active {
                    ctx.scheduler.cancel(key);
                    return Lifecycle::Alive;
                }
                // The final second still gets its tick effect; a zero-length
                // engagement only had the one applied at engage.
                let counted = self.state.engagement.remaining_seconds > 0;
                match Countdown::step(&mut self.state.engagement.remaining_seconds) {
                    Tick::Continue { .. } => {
                        ctx.effects.extend(self.behavior.apply_tick(self.id));
                        Lifecycle::Alive
                    }
                    Tick::Expired => {
                        if counted {
                            ctx.effects.extend(self.behavior.apply_tick(self.id));
                        }
                        ctx.scheduler.cancel(key);
                        self.state.engagement = Engagement::default();
                        self.resolve(ctx)
                    }
                }
            }
            TimerSlot::Cooldown => {
                let key = TimerKey::entity(self.id, TimerSlot::Cooldown);
                if !self.state.cooldown.active {
                    ctx.scheduler.cancel(key);
                    return Lifecycle::Alive;
                }
                if Countdown::step(&mut self.state.cooldown.remaining_seconds) == Tick::Expired {
                    ctx.scheduler.cancel(key);
                    self.state.cooldown.active = false;
                }
                Lifecycle::Alive
            }
            other => {
                debug!("{} ignores {:?} timer", self.id, other);
                Lifecycle::Alive
            }
        }
    }

    /// Finish one use.
    fn resolve(&mut self, ctx: &mut InteractionContext<'_>) -> Lifecycle {
        match self.state.usage {
            UsageCardinality::SingleUse => Lifecycle::Exhausted,
            UsageCardinality::Reusable => {
                let total = self.state.cooldown.total_seconds;
                self.state.cooldown.active = true;
                self.state.cooldown.remaining_seconds = total;
                ctx.scheduler.start(TimerKey::entity(self.id, TimerSlot::Cooldown), total);
                Lifecycle::Alive
            }
        }
    }

    /// Setup randomization: face a random direction.
    pub fn randomize(&mut self, rng: &mut DeterministicRng) {
        let yaw = rng.next_int(360) as f32;
        self.pose.rotation = Rotation::yaw(yaw);
        self.randomized = true;
    }

    /// Progression weight if this is a pushable prop.
    pub fn progression_weight(&self) -> Option<f32> {
        match &self.behavior {
            Behavior::Pushable(push) => Some(push.progression_weight),
            _ => None,
        }
    }

    /// Is this an item?
    pub fn is_item(&self) -> bool {
        matches!(self.behavior, Behavior::Item(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::PlayerId;
    use crate::game::behavior::{AbilityBehavior, CustomBehavior, ItemBehavior, PushableBehavior};
    use crate::game::roles::Team;
    use crate::game::world::ActorController;
    use glam::Vec3;
    use proptest::prelude::*;

    struct Harness {
        scheduler: TimerScheduler,
        broker: AiTaskBroker,
        effects: Vec<Effect>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scheduler: TimerScheduler::new(),
                broker: AiTaskBroker::new(),
                effects: Vec::new(),
            }
        }

        fn ctx(&mut self) -> InteractionContext<'_> {
            InteractionContext {
                scheduler: &mut self.scheduler,
                broker: &mut self.broker,
                effects: &mut self.effects,
            }
        }

        /// Advance one second and deliver firings to `entity`.
        fn second(&mut self, entity: &mut Interactable) -> Lifecycle {
            let mut lifecycle = Lifecycle::Alive;
            for firing in self.scheduler.advance_second() {
                if !self.scheduler.is_current(&firing) {
                    continue;
                }
                if entity.on_timer(firing.key.slot, &mut self.ctx()) == Lifecycle::Exhausted {
                    lifecycle = Lifecycle::Exhausted;
                }
            }
            lifecycle
        }
    }

    fn cat() -> Actor {
        Actor::new(ActorId(1), Team::Cat, ActorController::Player(PlayerId::new([1; 16])), Vec3::ZERO)
    }

    fn pushable(cooldown: u32) -> Interactable {
        Interactable::new(
            EntityId(1),
            Pose::at(Vec3::X),
            Behavior::Pushable(PushableBehavior::new(1.0)),
        )
        .with_cooldown(cooldown)
    }

    #[test]
    fn test_direct_reusable_cycles_through_cooldown() {
        let mut h = Harness::new();
        let mut entity = pushable(2);

        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Ok(Lifecycle::Alive));
        assert!(entity.state().cooldown.active);
        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Err(EngageRejection::CoolingDown));

        h.second(&mut entity);
        assert!(entity.state().cooldown.active);
        h.second(&mut entity);
        assert!(entity.is_idle());

        assert!(entity.try_engage(&cat(), &mut h.ctx()).0);
    }

    #[test]
    fn test_single_use_exhausts() {
        let mut h = Harness::new();
        let mut entity = Interactable::new(
            EntityId(2),
            Pose::default(),
            Behavior::Item(ItemBehavior::new(0.0)),
        );
        assert_eq!(entity.state().usage, UsageCardinality::SingleUse);
        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Ok(Lifecycle::Exhausted));
    }

    #[test]
    fn test_duration_engagement() {
        let mut h = Harness::new();
        let mut entity = Interactable::new(
            EntityId(3),
            Pose::default(),
            Behavior::Custom(CustomBehavior::default()),
        )
        .with_duration(3)
        .with_cooldown(1);

        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Ok(Lifecycle::Alive));
        assert!(entity.state().engagement.active);
        assert_eq!(entity.state().engagement.engaging_actor, Some(ActorId(1)));
        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Err(EngageRejection::Engaged));

        h.second(&mut entity);
        h.second(&mut entity);
        assert!(entity.state().engagement.active);
        h.second(&mut entity);
        assert!(!entity.state().engagement.active);
        assert!(entity.state().cooldown.active);

        // Once at engage, then once per second including the last.
        assert_eq!(entity.behavior, Behavior::Custom(CustomBehavior { applications: 4 }));

        h.second(&mut entity);
        assert!(entity.is_idle());
    }

    #[test]
    fn test_zero_duration_resolves_on_first_tick() {
        let mut h = Harness::new();
        let mut entity = Interactable::new(
            EntityId(4),
            Pose::default(),
            Behavior::Custom(CustomBehavior::default()),
        )
        .with_duration(0)
        .with_usage(UsageCardinality::SingleUse);

        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Ok(Lifecycle::Alive));
        assert_eq!(h.second(&mut entity), Lifecycle::Exhausted);
        assert_eq!(entity.behavior, Behavior::Custom(CustomBehavior { applications: 1 }));
    }

    #[test]
    fn test_duration_item_progress_per_second() {
        let mut h = Harness::new();
        let mut entity = Interactable::new(
            EntityId(6),
            Pose::default(),
            Behavior::Item(ItemBehavior::new(0.5)),
        )
        .with_mode(EffectMode::Duration)
        .with_duration(2)
        .with_usage(UsageCardinality::SingleUse);

        assert_eq!(entity.engage(&cat(), &mut h.ctx()), Ok(Lifecycle::Alive));
        assert_eq!(h.effects.len(), 1);
        assert_eq!(h.second(&mut entity), Lifecycle::Alive);
        assert_eq!(h.effects.len(), 2);
        assert_eq!(h.second(&mut entity), Lifecycle::Exhausted);
        assert_eq!(h.effects, vec![Effect::CatProgress(0.5); 3]);
    }

    #[test]
    fn test_ability_shares_lifecycle() {
        let mut h = Harness::new();
        let mut ability = Interactable::new(
            EntityId(7),
            Pose::default(),
            Behavior::Ability(AbilityBehavior::new(ActorId(1))),
        )
        .with_mode(EffectMode::Duration)
        .with_duration(1)
        .with_cooldown(2);
        let stranger = Actor::new(ActorId(2), Team::Cat, ActorController::Player(PlayerId::new([2; 16])), Vec3::ZERO);

        assert_eq!(ability.engage(&stranger, &mut h.ctx()), Err(EngageRejection::Ineligible));
        assert_eq!(ability.engage(&cat(), &mut h.ctx()), Ok(Lifecycle::Alive));
        assert_eq!(ability.engage(&cat(), &mut h.ctx()), Err(EngageRejection::Engaged));

        h.second(&mut ability);
        assert!(ability.state().cooldown.active);
        assert_eq!(ability.engage(&cat(), &mut h.ctx()), Err(EngageRejection::CoolingDown));
        assert_eq!(ability.behavior, Behavior::Ability(AbilityBehavior { owner: ActorId(1), activations: 2 }));

        h.second(&mut ability);
        h.second(&mut ability);
        assert!(ability.is_idle());
        assert!(ability.try_engage(&cat(), &mut h.ctx()).0);
    }

    #[test]
    fn test_ineligible_leaves_state_untouched() {
        let mut h = Harness::new();
        let mut cage = Interactable::new(EntityId(5), Pose::default(), Behavior::Cage);
        let before = cage.clone();

        assert_eq!(cage.try_engage(&cat(), &mut h.ctx()), (false, Lifecycle::Alive));
        assert_eq!(cage, before);
        assert_eq!(h.scheduler.armed_count(), 0);
    }

    #[test]
    fn test_urgent_on_every_engage() {
        let mut h = Harness::new();
        let mut entity = pushable(0).raising_urgent();

        entity.engage(&cat(), &mut h.ctx()).unwrap();
        assert_eq!(h.broker.pending_count(), 1);
    }

    #[derive(Clone, Debug)]
    enum Step {
        Engage,
        Second,
    }

    proptest! {
        #[test]
        fn prop_never_eligible_during_cooldown(
            cooldown in 0u32..5,
            steps in proptest::collection::vec(
                prop_oneof![Just(Step::Engage), Just(Step::Second)],
                1..64,
            ),
        ) {
            let mut h = Harness::new();
            let mut entity = pushable(cooldown);

            for step in steps {
                match step {
                    Step::Engage => {
                        let cooling = entity.state().cooldown.active;
                        let (accepted, _) = entity.try_engage(&cat(), &mut h.ctx());
                        prop_assert_eq!(accepted, !cooling);
                        prop_assert!(entity.state().cooldown.active);
                    }
                    Step::Second => {
                        h.second(&mut entity);
                    }
                }
                let state = entity.state();
                prop_assert!(!(state.engagement.active && state.cooldown.active));
                if state.cooldown.remaining_seconds > 0 {
                    prop_assert!(state.cooldown.active);
                }
            }
        }
    }
}
