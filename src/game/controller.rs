//! Match Phase Controller
//!
//! Owns the match facts and drives the phase machine one second at a time.
//!
//! ## Phases
//!
//! ```text
//! CustomizingCharacters ──timer 0──► Preparing ──timer 0──► Playing ──win / timer 0──► Ended
//! ```
//!
//! ## Second order
//!
//! 1. Fire armed timers in key order (match slots before entity slots)
//! 2. Apply effects produced by interactables
//! 3. Dispatch pending AI tasks
//! 4. Drain events into the [`TickResult`]
//!
//! Interactions and progress updates arriving between seconds are applied
//! immediately; their events ride along with the next `TickResult`.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::ids::{ActorId, AgentId, EntityId, PlayerId};
use crate::core::pose::Pose;
use crate::core::rng::{derive_match_seed, DeterministicRng};
use crate::core::timer::{Countdown, Tick, TimerKey, TimerOwner, TimerScheduler, TimerSlot};
use crate::game::behavior::{Behavior, Effect};
use crate::game::broker::AiTaskBroker;
use crate::game::config::MatchConfig;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::facts::{evaluate_outcome, MatchFacts, MatchOutcome, MatchPhase, PhaseTimers, PlayerResult};
use crate::game::interactable::{EngageRejection, EffectMode, Interactable, InteractionContext, Lifecycle};
use crate::game::roles::{RoleRegistry, Team};
use crate::game::setup::{setup_map, setup_players};
use crate::game::world::{Actor, ActorController, World};
use crate::services::localization::{KEY_LOSE, KEY_WIN};
use crate::services::presenter::ResultScreen;
use crate::services::spawner::SpawnKind;
use crate::services::MatchServices;

/// Result of one second.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated since the previous second, in the order they happened
    pub events: Vec<GameEvent>,
    /// Whether the match has ended
    pub match_ended: bool,
    /// Outcome once ended
    pub outcome: Option<MatchOutcome>,
}

/// Snapshot of both objectives for logs and HUDs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressionStatus {
    /// Cat weight accumulated.
    pub cat_current: f32,
    /// Cat weight available.
    pub cat_total: f32,
    /// `cat_current / cat_total` as a percentage.
    pub cat_percentage: f32,
    /// Threshold as a percentage.
    pub cat_required_percentage: f32,
    /// Cats caught.
    pub human_caught: u32,
    /// Cat players.
    pub human_total: u32,
    /// Caught ratio as a percentage.
    pub human_percentage: f32,
    /// Gameplay seconds left.
    pub seconds_remaining: u32,
}

/// Authoritative match state machine.
#[derive(Debug)]
pub struct MatchController {
    match_id: [u8; 16],
    config: MatchConfig,
    facts: MatchFacts,
    roles: RoleRegistry,
    world: World,
    scheduler: TimerScheduler,
    broker: AiTaskBroker,
    services: MatchServices,
    rng: DeterministicRng,
    events: Vec<GameEvent>,
    outcome: Option<MatchOutcome>,
    elapsed: u32,
    started: bool,
}

impl MatchController {
    /// Create a controller for a lobby that is ready to start.
    pub fn new(
        match_id: [u8; 16],
        config: MatchConfig,
        roles: RoleRegistry,
        services: MatchServices,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("Match {} config inconsistency: {}", hex::encode(&match_id[..4]), e);
        }

        let seed = config.rng_seed.unwrap_or_else(|| {
            let players: Vec<[u8; 16]> = roles.player_ids().iter().map(|p| *p.as_bytes()).collect();
            derive_match_seed(&match_id, &players)
        });

        let timers = PhaseTimers {
            customization: config.customization_seconds,
            customization_total: config.customization_seconds,
            prepare: config.prepare_seconds,
            prepare_total: config.prepare_seconds,
            gameplay: config.gameplay_seconds,
            gameplay_total: config.gameplay_seconds,
        };
        let facts = MatchFacts::new(timers, config.cat_win_threshold);

        Self {
            match_id,
            config,
            facts,
            roles,
            world: World::new(),
            scheduler: TimerScheduler::new(),
            broker: AiTaskBroker::new(),
            services,
            rng: DeterministicRng::new(seed),
            events: Vec::new(),
            outcome: None,
            elapsed: 0,
            started: false,
        }
    }

    // =========================================================================
    // WORLD POPULATION
    // =========================================================================

    /// Place an interactable before or during the match.
    pub fn place_interactable(&mut self, entity: Interactable) {
        debug!("Placed {} {}", entity.behavior.kind(), entity.id());
        self.world.insert_entity(entity);
    }

    /// Add an AI-driven body and make its agent available to the broker.
    ///
    /// Refused when `actor` already names a body.
    pub fn register_ai_agent(&mut self, agent: AgentId, actor: ActorId, team: Team, pose: Pose) -> bool {
        if !self.world.insert_actor(Actor::new(actor, team, ActorController::Ai(agent), pose.position)) {
            return false;
        }
        self.broker.register(agent);
        true
    }

    /// Remove an AI agent from the task pool.
    pub fn unregister_ai_agent(&mut self, agent: AgentId) {
        self.broker.unregister(agent);
    }

    /// Free an AI agent after it finished investigating.
    pub fn clear_ai_task(&mut self, agent: AgentId) {
        self.broker.clear_task(agent);
    }

    /// Update where an actor is.
    pub fn move_actor(&mut self, actor: ActorId, position: glam::Vec3) -> bool {
        match self.world.actor_mut(actor) {
            Some(a) => {
                a.position = position;
                true
            }
            None => false,
        }
    }

    /// Human picks up a cat.
    pub fn hold_cat(&mut self, human: ActorId, cat: ActorId) -> bool {
        if self.facts.phase == MatchPhase::Ended {
            return false;
        }
        self.world.hold(human, cat)
    }

    /// Actor picks up an item.
    pub fn pick_up_item(&mut self, actor: ActorId, entity: EntityId) -> bool {
        if self.world.actor(actor).is_none() {
            warn!("Unknown actor {} picking up {}", actor, entity);
            return false;
        }
        match self.world.entity_mut(entity).map(|e| &mut e.behavior) {
            Some(Behavior::Item(item)) => item.pick_up(actor),
            _ => false,
        }
    }

    /// Drop an item where it is.
    pub fn drop_item(&mut self, entity: EntityId) -> Option<ActorId> {
        match self.world.entity_mut(entity).map(|e| &mut e.behavior) {
            Some(Behavior::Item(item)) => item.drop(),
            _ => None,
        }
    }

    // =========================================================================
    // PHASES
    // =========================================================================

    /// Enter character customization and arm its countdown.
    pub fn begin(&mut self) {
        if self.started {
            warn!("Match {} already started", hex::encode(&self.match_id[..4]));
            return;
        }
        self.started = true;

        info!(
            "Match {} customizing ({} players, {}s)",
            hex::encode(&self.match_id[..4]),
            self.roles.len(),
            self.config.customization_seconds
        );

        for (player, binding) in self.roles.iter() {
            self.services.presenter.show_customization(*player, binding.team);
        }
        self.facts.timers_mut().customization = self.config.customization_seconds;
        self.scheduler.start(
            TimerKey::matched(TimerSlot::Customization),
            self.config.customization_seconds,
        );
    }

    /// Advance the match by one second.
    pub fn advance_second(&mut self) -> TickResult {
        self.elapsed += 1;

        for firing in self.scheduler.advance_second() {
            if !self.scheduler.is_current(&firing) {
                continue;
            }
            match firing.key.owner {
                TimerOwner::Match => self.on_match_timer(firing.key.slot),
                TimerOwner::Entity(id) => self.on_entity_timer(id, firing.key.slot),
            }
        }

        for assignment in self.broker.dispatch_pending() {
            self.push_event(GameEventData::AiTaskAssigned {
                agent: assignment.agent,
                source: assignment.source,
            });
        }

        // Recorded order is causal order.
        TickResult {
            events: std::mem::take(&mut self.events),
            match_ended: self.outcome.is_some(),
            outcome: self.outcome,
        }
    }

    fn on_match_timer(&mut self, slot: TimerSlot) {
        let key = TimerKey::matched(slot);
        let expected = match slot {
            TimerSlot::Customization => MatchPhase::CustomizingCharacters,
            TimerSlot::Prepare => MatchPhase::Preparing,
            TimerSlot::Gameplay => MatchPhase::Playing,
            TimerSlot::Interaction | TimerSlot::Cooldown => {
                warn!("Entity slot {:?} armed on the match, cancelling", slot);
                self.scheduler.cancel(key);
                return;
            }
        };
        if self.facts.phase != expected {
            self.scheduler.cancel(key);
            return;
        }

        let timers = self.facts.timers_mut();
        let counter = match slot {
            TimerSlot::Customization => &mut timers.customization,
            TimerSlot::Prepare => &mut timers.prepare,
            _ => &mut timers.gameplay,
        };
        let tick = Countdown::step(counter);
        let remaining = match tick {
            Tick::Continue { remaining } => remaining,
            Tick::Expired => 0,
        };
        self.push_event(GameEventData::CountdownTick { phase: expected, remaining });

        match slot {
            TimerSlot::Customization => {
                self.services.presenter.customization_countdown(remaining);
                if tick == Tick::Expired {
                    self.scheduler.cancel(key);
                    self.enter_preparing();
                }
            }
            TimerSlot::Prepare => {
                if tick == Tick::Expired {
                    self.scheduler.cancel(key);
                    self.enter_playing();
                }
            }
            _ => {
                if tick == Tick::Expired {
                    self.scheduler.cancel(key);
                }
                self.check_win_condition();
            }
        }
    }

    fn enter_phase(&mut self, next: MatchPhase) -> bool {
        let from = self.facts.phase;
        if !self.facts.advance_phase(next) {
            return false;
        }
        info!("Match {} {:?} -> {:?}", hex::encode(&self.match_id[..4]), from, next);
        self.push_event(GameEventData::PhaseChanged { from, to: next });
        true
    }

    fn enter_preparing(&mut self) {
        if !self.enter_phase(MatchPhase::Preparing) {
            return;
        }
        self.facts.timers_mut().prepare = self.config.prepare_seconds;

        let map = setup_map(&mut self.world, &self.config, &mut self.rng);
        for id in map.removed_items {
            self.scheduler.cancel_owner(TimerOwner::Entity(id));
            self.push_event(GameEventData::EntityDestroyed { entity: id });
        }
        self.facts.set_cat_total(map.progression_total);

        let players = setup_players(
            &mut self.world,
            &mut self.roles,
            self.services.spawner.as_mut(),
            &self.config,
        );
        self.facts.set_total_cat_players(players.cat_players);
        for (player, actor) in players.bodies {
            self.events.push(GameEvent::body_replaced(self.elapsed, player, actor));
        }

        for player in self.roles.player_ids() {
            self.services.presenter.prepare_started(player);
        }
        self.scheduler.start(TimerKey::matched(TimerSlot::Prepare), self.config.prepare_seconds);
    }

    fn enter_playing(&mut self) {
        if !self.enter_phase(MatchPhase::Playing) {
            return;
        }
        self.facts.timers_mut().gameplay = self.config.gameplay_seconds;

        let cat_possible = self.facts.cat_progress.is_possible();
        let human_possible = self.facts.human_progress.is_possible();
        if !cat_possible && !human_possible {
            error!("Critical inconsistency: both team objectives are impossible, match resolves on timeout");
        } else if !cat_possible {
            warn!("Cat objective impossible, cats can only win by forfeit or timeout");
        } else if !human_possible {
            warn!("Human objective impossible, humans can only win on timeout");
        }

        for player in self.roles.player_ids() {
            self.services.presenter.gameplay_started(player);
        }
        self.progression_status();
        self.scheduler.start(TimerKey::matched(TimerSlot::Gameplay), self.config.gameplay_seconds);
    }

    fn end_match(&mut self, outcome: MatchOutcome) {
        self.outcome = Some(outcome);
        self.enter_phase(MatchPhase::Ended);
        self.scheduler.cancel_owner(TimerOwner::Match);

        info!(
            "Match {} ended: {:?} win ({:?}) after {}s",
            hex::encode(&self.match_id[..4]),
            outcome.winner,
            outcome.reason,
            self.elapsed
        );
        self.events.push(GameEvent::match_ended(self.elapsed, outcome));

        for (player, binding) in self.roles.iter() {
            self.services.presenter.remove_gameplay_ui(*player, binding.team);

            let result = outcome.result_for(binding.team);
            let key = match result {
                PlayerResult::Win => KEY_WIN,
                PlayerResult::Lose => KEY_LOSE,
            };
            let screen = ResultScreen {
                result,
                label: self.services.localizer.lookup(key),
                outcome,
            };
            self.services.presenter.show_result(
                *player,
                &screen,
                &self.facts.cat_progress,
                &self.facts.human_progress,
            );
        }
        self.progression_status();
    }

    /// Evaluate the win conditions; returns whether the match is over.
    ///
    /// Only evaluated during gameplay. Once ended, the stored outcome stands.
    pub fn check_win_condition(&mut self) -> bool {
        if self.outcome.is_some() {
            return true;
        }
        if self.facts.phase != MatchPhase::Playing {
            return false;
        }

        match evaluate_outcome(&self.facts, self.humans_forfeit()) {
            Some(outcome) => {
                self.end_match(outcome);
                true
            }
            None => false,
        }
    }

    /// At least one human player, and every human player's body is dead.
    fn humans_forfeit(&self) -> bool {
        let mut any = false;
        for (_, binding) in self.roles.human_bindings() {
            any = true;
            let dead = binding
                .controlled
                .and_then(|id| self.world.actor(id))
                .is_some_and(|actor| actor.dead);
            if !dead {
                return false;
            }
        }
        any
    }

    // =========================================================================
    // INTERACTIONS
    // =========================================================================

    /// Engage `entity` with `actor`. Refusals only show up as `false`.
    pub fn engage(&mut self, actor: ActorId, entity: EntityId) -> bool {
        match self.try_engage(actor, entity) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Engage {} by {} rejected: {}", entity, actor, reason);
                false
            }
        }
    }

    fn try_engage(&mut self, actor_id: ActorId, entity_id: EntityId) -> Result<(), EngageRejection> {
        if self.facts.phase == MatchPhase::Ended {
            return Err(EngageRejection::MatchEnded);
        }
        let actor = self.world.actor(actor_id).cloned().ok_or(EngageRejection::UnknownActor)?;
        if actor.dead {
            return Err(EngageRejection::ActorDead);
        }

        let pending_before = self.broker.pending_count();
        let mut effects = Vec::new();
        let entity = self.world.entity_mut(entity_id).ok_or(EngageRejection::UnknownEntity)?;
        let mut ctx = InteractionContext {
            scheduler: &mut self.scheduler,
            broker: &mut self.broker,
            effects: &mut effects,
        };
        let lifecycle = entity.engage(&actor, &mut ctx)?;
        let direct = entity.state().mode == EffectMode::Direct;
        let location = entity.pose.position;

        let player_id = match actor.controller {
            ActorController::Player(player) => Some(player),
            ActorController::Ai(_) => None,
        };
        self.push_event(GameEventData::InteractionStarted {
            entity: entity_id,
            actor: actor_id,
            player_id,
        });
        if self.broker.pending_count() > pending_before {
            self.push_event(GameEventData::UrgentTaskSubmitted { source: entity_id, location });
        }
        if direct {
            self.push_event(GameEventData::InteractionResolved { entity: entity_id });
        }

        self.finish_lifecycle(entity_id, lifecycle);
        self.apply_effects(effects);
        Ok(())
    }

    fn on_entity_timer(&mut self, id: EntityId, slot: TimerSlot) {
        let mut effects = Vec::new();
        let Some(entity) = self.world.entity_mut(id) else {
            warn!("Timer {:?} fired for missing {}", slot, id);
            self.scheduler.cancel_owner(TimerOwner::Entity(id));
            return;
        };

        let was_engaged = entity.state().engagement.active;
        let was_cooling = entity.state().cooldown.active;
        let mut ctx = InteractionContext {
            scheduler: &mut self.scheduler,
            broker: &mut self.broker,
            effects: &mut effects,
        };
        let lifecycle = entity.on_timer(slot, &mut ctx);
        let resolved = was_engaged && !entity.state().engagement.active;
        let cooled = was_cooling && !entity.state().cooldown.active;

        if resolved {
            self.push_event(GameEventData::InteractionResolved { entity: id });
        }
        if cooled {
            self.push_event(GameEventData::CooldownEnded { entity: id });
        }
        self.finish_lifecycle(id, lifecycle);
        self.apply_effects(effects);
    }

    fn finish_lifecycle(&mut self, id: EntityId, lifecycle: Lifecycle) {
        if lifecycle == Lifecycle::Exhausted {
            self.world.remove_entity(id);
            self.scheduler.cancel_owner(TimerOwner::Entity(id));
            self.push_event(GameEventData::EntityDestroyed { entity: id });
            debug!("{} exhausted", id);
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CatProgress(delta) => self.update_cat_progress(delta),
                Effect::HumanProgress(delta) => self.update_human_progress(delta),
                Effect::Impulse { target, impulse } => {
                    self.services.physics.apply_impulse(target, impulse);
                }
                Effect::Noise { source, location } => {
                    if self.broker.submit_noise(source, location) {
                        self.push_event(GameEventData::UrgentTaskSubmitted { source, location });
                    }
                }
                Effect::CatchCat { human, cat } => self.catch_cat(human, cat),
            }
        }
    }

    fn catch_cat(&mut self, human: ActorId, cat: ActorId) {
        let Some(cat_actor) = self.world.actor(cat).cloned() else {
            warn!("Trying to catch missing or destroyed cat {}", cat);
            return;
        };
        if self.world.actor(human).and_then(|h| h.holding) != Some(cat) {
            warn!("{} tried to cage {} without holding it", human, cat);
            return;
        }

        let by_player = cat_actor.is_player();
        if by_player {
            self.update_human_progress(1);
            info!("Player cat {} caught by {}", cat, human);
        } else if let Some(h) = self.world.actor_mut(human) {
            h.health = h.health.saturating_sub(1);
            info!("AI cat {} caught, {} penalized to {} health", cat, human, h.health);
        }

        self.world.release(human);
        self.world.remove_actor(cat);
        if let ActorController::Player(player) = cat_actor.controller {
            self.roles.unbind_actor(player);
        }
        self.push_event(GameEventData::CatCaught { human, cat, by_player });
    }

    // =========================================================================
    // PROGRESS
    // =========================================================================

    /// Add cat progression weight.
    pub fn update_cat_progress(&mut self, delta: f32) {
        if self.facts.phase == MatchPhase::Ended {
            debug!("Cat progress after match end ignored");
            return;
        }
        let current = self.facts.add_cat_progress(delta);
        self.push_event(GameEventData::CatProgressChanged {
            current,
            total: self.facts.cat_progress.total,
        });
    }

    /// Add (or remove) caught cats.
    pub fn update_human_progress(&mut self, delta: i32) {
        if self.facts.phase == MatchPhase::Ended {
            debug!("Human progress after match end ignored");
            return;
        }
        let caught = self.facts.add_human_progress(delta);
        self.push_event(GameEventData::HumanProgressChanged {
            caught,
            total: self.facts.human_progress.total_cat_players,
        });
    }

    /// Report and log both objectives.
    pub fn progression_status(&self) -> ProgressionStatus {
        let cat = &self.facts.cat_progress;
        let human = &self.facts.human_progress;
        let status = ProgressionStatus {
            cat_current: cat.current,
            cat_total: cat.total,
            cat_percentage: cat.ratio() * 100.0,
            cat_required_percentage: cat.win_threshold * 100.0,
            human_caught: human.caught_count,
            human_total: human.total_cat_players,
            human_percentage: human.ratio() * 100.0,
            seconds_remaining: self.facts.timers.gameplay,
        };

        info!(
            "Progression | cats {:.1}/{:.1} ({:.1}%, need {:.1}%) | humans {}/{} ({:.1}%) | {}s left",
            status.cat_current,
            status.cat_total,
            status.cat_percentage,
            status.cat_required_percentage,
            status.human_caught,
            status.human_total,
            status.human_percentage,
            status.seconds_remaining
        );
        status
    }

    // =========================================================================
    // DEATH
    // =========================================================================

    /// A player's body died at `pose`.
    ///
    /// Re-checks the win first; if the match is over nothing else happens.
    /// Otherwise a defeated body of the player's team replaces the old one.
    /// Deaths before Preparing are ignored: no body exists yet and setup
    /// spawns one anyway.
    pub fn register_player_death(&mut self, player: PlayerId, pose: Pose) {
        if self.facts.phase == MatchPhase::CustomizingCharacters {
            warn!("Death reported for {} during customization, ignoring", player);
            return;
        }
        let Some(binding) = self.roles.get(&player) else {
            warn!("Death reported for unknown player {}", player);
            return;
        };
        let team = binding.team;
        let previous = binding.controlled;

        if self.outcome.is_none() {
            if let Some(actor) = previous.and_then(|id| self.world.actor_mut(id)) {
                actor.dead = true;
            }
            self.events.push(GameEvent::player_died(self.elapsed, player, previous));
        }

        if self.check_win_condition() {
            debug!("Death of {} after match end, no replacement", player);
            return;
        }

        let Some(team) = team else {
            warn!("Player {} died without a team", player);
            return;
        };

        let kind = SpawnKind::defeated(team);
        let Some(body) = self.services.spawner.spawn(kind, pose) else {
            warn!("Failed to spawn {:?} for {}, keeping the dead body", kind, player);
            return;
        };

        if self.world.actor(body).is_some() {
            warn!("Defeated body {} for {} collides with an existing actor, keeping the dead body", body, player);
            return;
        }
        if let Some(old) = previous {
            self.world.remove_actor(old);
        }
        let mut actor = Actor::new(body, team, ActorController::Player(player), pose.position);
        actor.dead = true;
        if !self.world.insert_actor(actor) {
            return;
        }
        self.roles.bind_actor(player, body);
        self.events.push(GameEvent::body_replaced(self.elapsed, player, body));
        info!("Player {} now controls defeated body {}", player, body);
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    fn push_event(&mut self, data: GameEventData) {
        self.events.push(GameEvent::new(self.elapsed, data));
    }

    /// Replicated facts.
    pub fn facts(&self) -> &MatchFacts {
        &self.facts
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.facts.phase
    }

    /// Outcome once ended.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Lobby roster and bodies.
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Actors and interactables.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// AI task pool.
    pub fn broker(&self) -> &AiTaskBroker {
        &self.broker
    }

    /// Localization, e.g. to switch language.
    pub fn localizer_mut(&mut self) -> &mut crate::services::localization::Localizer {
        &mut self.services.localizer
    }

    /// Seconds advanced.
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed
    }

    /// Match identifier.
    pub fn match_id(&self) -> [u8; 16] {
        self.match_id
    }

    /// Stop all timers; later starts are ignored.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        info!("Match {} shut down", hex::encode(&self.match_id[..4]));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::behavior::{ItemBehavior, PushableBehavior};
    use crate::game::facts::WinReason;
    use crate::game::interactable::UsageCardinality;
    use crate::services::testing::{recording_services, PresenterCall, Recorders};
    use glam::Vec3;

    const CAT: PlayerId = PlayerId::new([1; 16]);
    const HUMAN: PlayerId = PlayerId::new([2; 16]);

    fn roles() -> RoleRegistry {
        let mut roles = RoleRegistry::new();
        roles.join(CAT);
        roles.join(HUMAN);
        roles.assign(CAT, Team::Cat).unwrap();
        roles.assign(HUMAN, Team::Human).unwrap();
        roles
    }

    fn config() -> MatchConfig {
        MatchConfig {
            customization_seconds: 5,
            prepare_seconds: 5,
            gameplay_seconds: 10,
            cat_win_threshold: 0.8,
            item_remain_percentage: 100,
            env_actor_randomness_percentage: 100,
            rng_seed: Some(7),
            ..Default::default()
        }
    }

    fn controller_with(config: MatchConfig) -> (MatchController, Recorders) {
        let (services, recorders) = recording_services();
        let mut controller = MatchController::new([9; 16], config, roles(), services);
        for n in 0..10 {
            controller.place_interactable(Interactable::new(
                EntityId(n),
                Pose::at(Vec3::new(n as f32, 0.0, 0.0)),
                Behavior::Pushable(PushableBehavior::new(1.0)),
            ));
        }
        (controller, recorders)
    }

    fn run_until_playing(controller: &mut MatchController) {
        controller.begin();
        for _ in 0..10 {
            controller.advance_second();
        }
        assert_eq!(controller.phase(), MatchPhase::Playing);
    }

    fn body_of(controller: &MatchController, player: PlayerId) -> ActorId {
        controller.roles().get(&player).and_then(|b| b.controlled).unwrap()
    }

    #[test]
    fn test_phase_timing() {
        let (mut controller, recorders) = controller_with(config());
        controller.begin();

        for _ in 0..4 {
            controller.advance_second();
        }
        assert_eq!(controller.phase(), MatchPhase::CustomizingCharacters);
        controller.advance_second();
        assert_eq!(controller.phase(), MatchPhase::Preparing);
        assert_eq!(controller.facts().cat_progress.total, 10.0);
        assert_eq!(controller.facts().human_progress.total_cat_players, 1);

        for _ in 0..5 {
            controller.advance_second();
        }
        assert_eq!(controller.phase(), MatchPhase::Playing);
        assert_eq!(controller.facts().timers.gameplay, 10);

        let countdowns: Vec<u32> = recorders.presenter.calls()
            .into_iter()
            .filter_map(|c| match c {
                PresenterCall::CustomizationCountdown(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(countdowns, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_end_to_end_cat_win_at_tick_six() {
        let (mut controller, recorders) = controller_with(config());
        run_until_playing(&mut controller);

        for _ in 0..5 {
            assert!(!controller.advance_second().match_ended);
        }
        assert_eq!(controller.facts().timers.gameplay, 5);

        controller.update_cat_progress(8.0);
        let result = controller.advance_second();

        assert!(result.match_ended);
        assert_eq!(
            result.outcome,
            Some(MatchOutcome { winner: Team::Cat, reason: WinReason::CatObjective })
        );
        assert_eq!(controller.phase(), MatchPhase::Ended);
        assert_eq!(controller.facts().timers.gameplay, 4);
        assert_eq!(controller.elapsed_seconds(), 16);

        let results = recorders.presenter.results();
        assert_eq!(results.len(), 2);
        for (player, screen) in results {
            let expected = if player == CAT { PlayerResult::Win } else { PlayerResult::Lose };
            assert_eq!(screen.result, expected);
            assert_eq!(screen.outcome.winner, Team::Cat);
        }
        assert!(recorders.presenter.calls().contains(&PresenterCall::RemoveGameplayUi(HUMAN, Some(Team::Human))));

        // Later evaluations return the stored outcome.
        assert!(controller.check_win_condition());
        assert!(controller.advance_second().match_ended);
        assert_eq!(controller.elapsed_seconds(), 17);
    }

    #[test]
    fn test_timeout_tie_goes_to_cats() {
        let (mut controller, _) = controller_with(config());
        run_until_playing(&mut controller);

        for _ in 0..10 {
            controller.advance_second();
        }
        assert_eq!(
            controller.outcome(),
            Some(MatchOutcome { winner: Team::Cat, reason: WinReason::TimeoutTie })
        );
    }

    #[test]
    fn test_engage_pushes_progress_and_physics() {
        let (mut controller, recorders) = controller_with(config());
        run_until_playing(&mut controller);

        let cat = body_of(&controller, CAT);
        assert!(controller.engage(cat, EntityId(3)));
        assert_eq!(controller.facts().cat_progress.current, 1.0);
        assert_eq!(recorders.physics.impulses().len(), 1);

        // Cooling down.
        assert!(!controller.engage(cat, EntityId(3)));
        assert!(!controller.engage(cat, EntityId(99)));
    }

    #[test]
    fn test_single_use_item_destroyed() {
        let (mut controller, _) = controller_with(config());
        controller.place_interactable(Interactable::new(
            EntityId(50),
            Pose::default(),
            Behavior::Item(ItemBehavior::new(0.5)),
        ));
        run_until_playing(&mut controller);
        assert_eq!(controller.world().entity(EntityId(50)).unwrap().state().usage, UsageCardinality::SingleUse);

        let cat = body_of(&controller, CAT);
        assert!(controller.engage(cat, EntityId(50)));
        assert!(controller.world().entity(EntityId(50)).is_none());
        assert!(!controller.engage(cat, EntityId(50)));
    }

    #[test]
    fn test_cage_player_cat_counts_for_humans() {
        let (mut controller, _) = controller_with(config());
        controller.place_interactable(Interactable::new(EntityId(60), Pose::default(), Behavior::Cage));
        run_until_playing(&mut controller);

        let human = body_of(&controller, HUMAN);
        let cat = body_of(&controller, CAT);
        assert!(!controller.engage(human, EntityId(60)));

        assert!(controller.hold_cat(human, cat));
        assert!(controller.engage(human, EntityId(60)));
        assert!(controller.world().actor(cat).is_none());
        assert_eq!(controller.facts().human_progress.caught_count, 1);

        // One cat player caught: humans win on the next gameplay tick.
        controller.advance_second();
        assert_eq!(controller.outcome().map(|o| o.winner), Some(Team::Human));
    }

    #[test]
    fn test_cage_ai_cat_penalizes_human() {
        let (mut controller, _) = controller_with(config());
        controller.place_interactable(Interactable::new(EntityId(60), Pose::default(), Behavior::Cage));
        controller.register_ai_agent(AgentId(1), ActorId(500), Team::Cat, Pose::default());
        run_until_playing(&mut controller);

        let human = body_of(&controller, HUMAN);
        assert!(controller.hold_cat(human, ActorId(500)));
        assert!(controller.engage(human, EntityId(60)));

        assert_eq!(controller.facts().human_progress.caught_count, 0);
        assert_eq!(controller.world().actor(human).unwrap().health, crate::game::world::DEFAULT_HEALTH - 1);
        assert!(controller.world().actor(ActorId(500)).is_none());
    }

    #[test]
    fn test_urgent_entity_feeds_broker() {
        let (mut controller, _) = controller_with(config());
        controller.place_interactable(
            Interactable::new(EntityId(70), Pose::default(), Behavior::Item(ItemBehavior::new(0.0)))
                .with_usage(UsageCardinality::Reusable)
                .raising_urgent(),
        );
        controller.register_ai_agent(AgentId(1), ActorId(500), Team::Cat, Pose::default());
        run_until_playing(&mut controller);

        let cat = body_of(&controller, CAT);
        assert!(controller.engage(cat, EntityId(70)));
        let result = controller.advance_second();
        assert!(result.events.iter().any(|e| matches!(
            e.data,
            GameEventData::AiTaskAssigned { agent: AgentId(1), source: EntityId(70) }
        )));
    }

    #[test]
    fn test_death_spawns_defeated_body() {
        let (mut controller, recorders) = controller_with(MatchConfig {
            gameplay_seconds: 100,
            ..config()
        });
        run_until_playing(&mut controller);
        let cat_body = body_of(&controller, CAT);

        controller.register_player_death(CAT, Pose::at(Vec3::ONE));

        let new_body = body_of(&controller, CAT);
        assert_ne!(new_body, cat_body);
        assert!(controller.world().actor(new_body).unwrap().dead);
        assert!(controller.world().actor(cat_body).is_none());
        assert_eq!(recorders.spawner.spawned().last().map(|s| s.0), Some(SpawnKind::DefeatedCat));
        assert_eq!(controller.roles().team_of(&CAT), Some(Team::Cat));
    }

    #[test]
    fn test_human_death_forfeits() {
        let (mut controller, recorders) = controller_with(config());
        run_until_playing(&mut controller);
        let spawned_before = recorders.spawner.spawned().len();

        controller.register_player_death(HUMAN, Pose::default());

        assert_eq!(
            controller.outcome(),
            Some(MatchOutcome { winner: Team::Cat, reason: WinReason::HumansForfeit })
        );
        // The forfeit ended the match, so no replacement body.
        assert_eq!(recorders.spawner.spawned().len(), spawned_before);
    }

    #[test]
    fn test_death_after_end_spawns_nothing() {
        let (mut controller, recorders) = controller_with(config());
        run_until_playing(&mut controller);
        controller.update_cat_progress(10.0);
        controller.advance_second();
        assert_eq!(controller.phase(), MatchPhase::Ended);

        let spawned_before = recorders.spawner.spawned().len();
        controller.register_player_death(CAT, Pose::default());
        assert_eq!(recorders.spawner.spawned().len(), spawned_before);
    }

    #[test]
    fn test_spawn_failure_keeps_dead_body() {
        let (mut controller, recorders) = controller_with(MatchConfig {
            gameplay_seconds: 100,
            ..config()
        });
        run_until_playing(&mut controller);
        let cat_body = body_of(&controller, CAT);

        recorders.spawner.set_failing(true);
        controller.register_player_death(CAT, Pose::default());

        assert_eq!(body_of(&controller, CAT), cat_body);
        assert!(controller.world().actor(cat_body).unwrap().dead);
    }

    #[test]
    fn test_spawned_body_never_replaces_ai_body() {
        let (mut controller, _) = controller_with(config());
        // The recording spawner hands out ids from 100.
        assert!(controller.register_ai_agent(AgentId(7), ActorId(100), Team::Cat, Pose::default()));
        assert!(!controller.register_ai_agent(AgentId(8), ActorId(100), Team::Human, Pose::default()));

        controller.begin();
        for _ in 0..5 {
            controller.advance_second();
        }
        assert_eq!(controller.phase(), MatchPhase::Preparing);

        let ai_body = controller.world().actor(ActorId(100)).unwrap();
        assert_eq!(ai_body.controller, ActorController::Ai(AgentId(7)));
        assert_eq!(ai_body.team, Team::Cat);
        assert_eq!(controller.roles().get(&CAT).and_then(|b| b.controlled), None);
        assert_eq!(body_of(&controller, HUMAN), ActorId(101));
        assert!(controller.broker().is_registered(AgentId(7)));
        assert!(!controller.broker().is_registered(AgentId(8)));
    }

    #[test]
    fn test_defeated_body_collision_keeps_dead_body() {
        let (mut controller, _) = controller_with(MatchConfig {
            gameplay_seconds: 100,
            ..config()
        });
        run_until_playing(&mut controller);
        let cat_body = body_of(&controller, CAT);
        // Next spawner id after the two player bodies.
        assert!(controller.register_ai_agent(AgentId(1), ActorId(102), Team::Human, Pose::default()));

        controller.register_player_death(CAT, Pose::default());

        assert_eq!(body_of(&controller, CAT), cat_body);
        assert!(controller.world().actor(cat_body).unwrap().dead);
        assert_eq!(
            controller.world().actor(ActorId(102)).unwrap().controller,
            ActorController::Ai(AgentId(1))
        );
    }

    #[test]
    fn test_death_during_customization_ignored() {
        let (mut controller, recorders) = controller_with(config());
        controller.begin();

        controller.register_player_death(HUMAN, Pose::default());
        assert!(recorders.spawner.spawned().is_empty());
        assert_eq!(controller.roles().get(&HUMAN).and_then(|b| b.controlled), None);

        for _ in 0..5 {
            controller.advance_second();
        }
        assert_eq!(controller.phase(), MatchPhase::Preparing);

        let human_body = body_of(&controller, HUMAN);
        let humans: Vec<ActorId> = controller
            .world()
            .actors()
            .filter(|a| a.team == Team::Human)
            .map(|a| a.id)
            .collect();
        assert_eq!(humans, vec![human_body]);
        assert!(!controller.world().actor(human_body).unwrap().dead);
    }

    #[test]
    fn test_tick_events_keep_causal_order() {
        let (mut controller, _) = controller_with(config());
        controller.place_interactable(Interactable::new(
            EntityId(50),
            Pose::default(),
            Behavior::Item(ItemBehavior::new(0.5)),
        ));
        run_until_playing(&mut controller);

        let cat = body_of(&controller, CAT);
        assert!(controller.engage(cat, EntityId(50)));
        let events = controller.advance_second().events;

        let position = |wanted: fn(&GameEventData) -> bool| {
            events.iter().position(|e| wanted(&e.data)).unwrap()
        };
        let started = position(|d| matches!(d, GameEventData::InteractionStarted { .. }));
        let resolved = position(|d| matches!(d, GameEventData::InteractionResolved { .. }));
        let destroyed = position(|d| matches!(d, GameEventData::EntityDestroyed { .. }));
        let countdown = position(|d| matches!(d, GameEventData::CountdownTick { .. }));

        assert!(started < resolved);
        assert!(resolved < destroyed);
        // Engaged between seconds, so before this second's countdown.
        assert!(destroyed < countdown);
    }

    #[test]
    fn test_forfeit_events_follow_death() {
        let (mut controller, _) = controller_with(config());
        run_until_playing(&mut controller);

        controller.register_player_death(HUMAN, Pose::default());
        let events = controller.advance_second().events;

        let died = events
            .iter()
            .position(|e| matches!(e.data, GameEventData::PlayerDied { player_id: HUMAN, .. }))
            .unwrap();
        let ended = events
            .iter()
            .position(|e| matches!(e.data, GameEventData::MatchEnded { .. }))
            .unwrap();
        assert!(died < ended);
    }

    #[test]
    fn test_holder_uses_picked_up_item() {
        let (mut controller, _) = controller_with(config());
        controller.place_interactable(
            Interactable::new(EntityId(80), Pose::default(), Behavior::Item(ItemBehavior::new(0.5)))
                .with_usage(UsageCardinality::Reusable)
                .with_cooldown(0),
        );
        run_until_playing(&mut controller);

        let cat = body_of(&controller, CAT);
        let human = body_of(&controller, HUMAN);
        assert!(controller.pick_up_item(cat, EntityId(80)));

        assert!(!controller.engage(human, EntityId(80)));
        assert!(controller.engage(cat, EntityId(80)));
        assert_eq!(controller.facts().cat_progress.current, 0.5);

        assert_eq!(controller.drop_item(EntityId(80)), Some(cat));
        controller.advance_second();
        assert!(controller.engage(human, EntityId(80)));
    }

    #[test]
    fn test_engage_rejected_after_end() {
        let (mut controller, _) = controller_with(config());
        run_until_playing(&mut controller);
        let cat = body_of(&controller, CAT);
        controller.update_cat_progress(10.0);
        controller.advance_second();

        assert!(!controller.engage(cat, EntityId(1)));
    }

    #[test]
    fn test_both_objectives_impossible_resolve_on_timeout() {
        let mut roles = RoleRegistry::new();
        roles.join(HUMAN);
        roles.assign(HUMAN, Team::Human).unwrap();
        let (services, _) = recording_services();
        let mut controller = MatchController::new([1; 16], config(), roles, services);

        run_until_playing(&mut controller);
        assert!(!controller.facts().cat_progress.is_possible());
        assert!(!controller.facts().human_progress.is_possible());

        for _ in 0..9 {
            controller.advance_second();
        }
        assert_eq!(controller.outcome(), None);
        controller.advance_second();
        assert_eq!(controller.outcome().map(|o| o.reason), Some(WinReason::TimeoutTie));
    }

    #[test]
    fn test_progression_status() {
        let (mut controller, _) = controller_with(config());
        run_until_playing(&mut controller);
        controller.update_cat_progress(5.0);

        let status = controller.progression_status();
        assert_eq!(status.cat_percentage, 50.0);
        assert!((status.cat_required_percentage - 80.0).abs() < 1e-3);
        assert_eq!(status.human_total, 1);
        assert_eq!(status.seconds_remaining, 10);
    }

    #[test]
    fn test_localized_result_labels() {
        let (mut controller, recorders) = controller_with(config());
        controller.localizer_mut().set_language(crate::services::localization::Language::Spanish);
        run_until_playing(&mut controller);
        controller.update_cat_progress(10.0);
        controller.advance_second();

        let labels: Vec<String> = recorders.presenter.results().into_iter().map(|(_, s)| s.label).collect();
        assert!(labels.contains(&"Victoria".to_string()));
        assert!(labels.contains(&"Derrota".to_string()));
    }
}
