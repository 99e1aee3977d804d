//! Match Session
//!
//! Runs one match on a tokio task. The session is the only mutator of its
//! controller: the one-second interval and incoming commands are serialized
//! through a single `select!` loop, and observers get [`Replicated`] updates
//! over a broadcast channel after every second.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::ids::{ActorId, AgentId, EntityId, PlayerId};
use crate::core::pose::Pose;
use crate::game::config::MatchConfig;
use crate::game::controller::{MatchController, TickResult};
use crate::game::facts::MatchOutcome;
use crate::game::interactable::InteractableState;
use crate::game::roles::RoleRegistry;
use crate::network::replication::{InteractableSnapshot, Replicated};
use crate::services::localization::Language;
use crate::services::MatchServices;

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, loop not running yet.
    Idle,
    /// Loop running.
    Running,
    /// Match reached an outcome.
    Ended,
    /// Loop stopped, timers torn down.
    Closed,
}

/// Configuration for a match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wall-clock length of one match second.
    pub tick_interval: Duration,
    /// Replicated updates buffered per observer.
    pub broadcast_capacity: usize,
    /// Commands buffered before senders wait.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            broadcast_capacity: 256,
            command_capacity: 64,
        }
    }
}

/// Requests into a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Engage an interactable.
    Engage {
        /// Engaging actor.
        actor: ActorId,
        /// Target entity.
        entity: EntityId,
        /// Whether the engagement was accepted.
        reply: oneshot::Sender<bool>,
    },
    /// Human picks up a cat.
    HoldCat {
        /// Holding human.
        human: ActorId,
        /// Held cat.
        cat: ActorId,
        /// Whether the hold succeeded.
        reply: oneshot::Sender<bool>,
    },
    /// Move an actor.
    MoveActor {
        /// Actor.
        actor: ActorId,
        /// New position.
        position: glam::Vec3,
    },
    /// Add cat progression weight.
    UpdateCatProgress(f32),
    /// Add caught cats.
    UpdateHumanProgress(i32),
    /// A player's body died.
    PlayerDied {
        /// Player.
        player: PlayerId,
        /// Where the body was.
        pose: Pose,
    },
    /// An AI agent finished its task.
    ClearAiTask(AgentId),
    /// Switch result text language.
    SetLanguage(Language),
    /// Stop the loop.
    Shutdown,
}

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Lobby cannot start.
    #[error("Players not ready")]
    PlayersNotReady,

    /// Session loop is gone.
    #[error("Session closed")]
    Closed,

    /// Session already started.
    #[error("Session already running")]
    AlreadyRunning,
}

/// Summary returned when the loop exits.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Match identifier (hex).
    pub match_id: String,
    /// Outcome, if the match got that far.
    pub outcome: Option<MatchOutcome>,
    /// Match seconds simulated.
    pub seconds: u32,
    /// Loop start.
    pub started_at: DateTime<Utc>,
    /// Loop end.
    pub ended_at: DateTime<Utc>,
}

/// Cheap cloneable handle to a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    updates: broadcast::Sender<Replicated>,
}

impl SessionHandle {
    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Receive replicated updates from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Replicated> {
        self.updates.subscribe()
    }

    /// Send a raw command.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| SessionError::Closed)
    }

    /// Engage `entity` with `actor`.
    pub async fn engage(&self, actor: ActorId, entity: EntityId) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Engage { actor, entity, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Human picks up a cat.
    pub async fn hold_cat(&self, human: ActorId, cat: ActorId) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::HoldCat { human, cat, reply }).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Add cat progression weight.
    pub async fn update_cat_progress(&self, delta: f32) -> Result<(), SessionError> {
        self.send(SessionCommand::UpdateCatProgress(delta)).await
    }

    /// Add caught cats.
    pub async fn update_human_progress(&self, delta: i32) -> Result<(), SessionError> {
        self.send(SessionCommand::UpdateHumanProgress(delta)).await
    }

    /// Report a player's death.
    pub async fn player_died(&self, player: PlayerId, pose: Pose) -> Result<(), SessionError> {
        self.send(SessionCommand::PlayerDied { player, pose }).await
    }

    /// Stop the session.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }
}

/// A match session.
pub struct MatchSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Current state.
    pub state: SessionState,
    config: SessionConfig,
    controller: MatchController,
    commands: mpsc::Receiver<SessionCommand>,
    updates: broadcast::Sender<Replicated>,
    published_revision: Option<u64>,
    published_entities: BTreeMap<EntityId, InteractableState>,
}

impl MatchSession {
    /// Wrap a prepared controller.
    pub fn new(controller: MatchController, config: SessionConfig) -> (Self, SessionHandle) {
        let id = controller.match_id();
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (updates, _) = broadcast::channel(config.broadcast_capacity.max(1));

        let handle = SessionHandle {
            id,
            commands: command_tx,
            updates: updates.clone(),
        };
        let session = Self {
            id,
            state: SessionState::Idle,
            config,
            controller,
            commands: command_rx,
            updates,
            published_revision: None,
            published_entities: BTreeMap::new(),
        };
        (session, handle)
    }

    /// Build a session from a lobby; refuses lobbies that are not ready.
    pub fn from_lobby(
        id: SessionId,
        match_config: MatchConfig,
        roles: RoleRegistry,
        services: MatchServices,
        config: SessionConfig,
    ) -> Result<(Self, SessionHandle), SessionError> {
        if !roles.ready_to_start() {
            return Err(SessionError::PlayersNotReady);
        }
        let controller = MatchController::new(id, match_config, roles, services);
        Ok(Self::new(controller, config))
    }

    /// Controller, for inspection.
    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    /// Controller, for world population before the loop starts.
    pub fn controller_mut(&mut self) -> &mut MatchController {
        &mut self.controller
    }

    /// Enter customization and publish the initial snapshot.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRunning);
        }
        self.state = SessionState::Running;
        self.controller.begin();
        self.publish_snapshots();
        Ok(())
    }

    /// Advance one match second and publish what changed.
    pub fn step(&mut self) -> TickResult {
        let result = self.controller.advance_second();

        if !result.events.is_empty() {
            self.publish(Replicated::Events {
                second: self.controller.elapsed_seconds(),
                events: result.events.clone(),
            });
        }
        self.publish_snapshots();

        if let Some(outcome) = result.outcome {
            if self.state != SessionState::Ended {
                self.state = SessionState::Ended;
                self.publish(Replicated::Outcome(outcome));
            }
        }
        result
    }

    /// Apply one command. Returns `false` when the loop should stop.
    pub fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Engage { actor, entity, reply } => {
                let accepted = self.controller.engage(actor, entity);
                // Caller may have stopped waiting.
                let _ = reply.send(accepted);
            }
            SessionCommand::HoldCat { human, cat, reply } => {
                let held = self.controller.hold_cat(human, cat);
                let _ = reply.send(held);
            }
            SessionCommand::MoveActor { actor, position } => {
                if !self.controller.move_actor(actor, position) {
                    debug!("Move for unknown {}", actor);
                }
            }
            SessionCommand::UpdateCatProgress(delta) => self.controller.update_cat_progress(delta),
            SessionCommand::UpdateHumanProgress(delta) => self.controller.update_human_progress(delta),
            SessionCommand::PlayerDied { player, pose } => {
                self.controller.register_player_death(player, pose);
            }
            SessionCommand::ClearAiTask(agent) => self.controller.clear_ai_task(agent),
            SessionCommand::SetLanguage(language) => {
                self.controller.localizer_mut().set_language(language);
            }
            SessionCommand::Shutdown => return false,
        }
        true
    }

    /// Run until the match ends, a shutdown arrives or every handle is dropped.
    pub async fn run(mut self) -> SessionSummary {
        let started_at = Utc::now();
        if let Err(e) = self.begin() {
            warn!("Session {} not started: {}", hex::encode(&self.id[..4]), e);
        }

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.step().match_ended {
                        break;
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                info!("Session {} shutdown requested", hex::encode(&self.id[..4]));
                                break;
                            }
                        }
                        None => {
                            info!("Session {} has no handles left", hex::encode(&self.id[..4]));
                            break;
                        }
                    }
                }
            }
        }

        self.controller.shutdown();
        self.state = SessionState::Closed;

        let summary = SessionSummary {
            match_id: hex::encode(self.id),
            outcome: self.controller.outcome(),
            seconds: self.controller.elapsed_seconds(),
            started_at,
            ended_at: Utc::now(),
        };
        info!(
            "Session {} closed after {}s: {:?}",
            hex::encode(&self.id[..4]),
            summary.seconds,
            summary.outcome
        );
        summary
    }

    fn publish_snapshots(&mut self) {
        let facts = self.controller.facts();
        if self.published_revision != Some(facts.revision) {
            self.published_revision = Some(facts.revision);
            let facts = facts.clone();
            self.publish(Replicated::Facts(facts));
        }

        let changed: Vec<InteractableSnapshot> = self.controller
            .world()
            .entities()
            .filter(|e| self.published_entities.get(&e.id()) != Some(e.state()))
            .map(InteractableSnapshot::from)
            .collect();
        for snapshot in changed {
            self.published_entities.insert(snapshot.id, snapshot.state);
            self.publish(Replicated::Interactable(snapshot));
        }
    }

    fn publish(&self, update: Replicated) {
        // No observers is fine.
        let _ = self.updates.send(update);
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Tracks running sessions.
pub struct SessionManager {
    sessions: RwLock<BTreeMap<SessionId, SessionHandle>>,
}

impl SessionManager {
    /// Create new session manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Track `handle` and spawn the session's loop; the entry is dropped when it exits.
    pub async fn start(self: &Arc<Self>, session: MatchSession, handle: SessionHandle) -> JoinHandle<SessionSummary> {
        let id = session.id;
        self.sessions.write().await.insert(id, handle);
        info!("Session {} started ({} active)", hex::encode(&id[..4]), self.session_count().await);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let summary = session.run().await;
            manager.remove(&id).await;
            summary
        })
    }

    /// Get a session by ID.
    pub async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Forget a session.
    pub async fn remove(&self, id: &SessionId) {
        self.sessions.write().await.remove(id);
    }

    /// Active session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
