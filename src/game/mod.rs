//! Match Logic Module
//!
//! Everything that decides who wins. Driven one second at a time by the
//! controller; no wall-clock access.
//!
//! ## Module Structure
//!
//! - `config`: Tunables loaded from JSON
//! - `facts`: Replicated phase, timers and progress; win evaluation
//! - `roles`: Lobby teams, subtypes and body bindings
//! - `world`: Actors and interactables in play
//! - `behavior`: Per-kind interaction effects (item, pushable, cage, ability)
//! - `interactable`: Engagement, duration and cooldown lifecycle
//! - `broker`: Urgent/noise tasks handed to AI agents
//! - `setup`: Map thinning and player spawning on entering Preparing
//! - `controller`: Phase machine tying the above together
//! - `events`: Events in recorded order for replication and logs

pub mod behavior;
pub mod broker;
pub mod config;
pub mod controller;
pub mod events;
pub mod facts;
pub mod interactable;
pub mod roles;
pub mod setup;
pub mod world;

// Re-export key types
pub use behavior::{AbilityBehavior, Behavior, Effect, ItemBehavior, PushableBehavior};
pub use broker::{AiTaskBroker, Assignment};
pub use config::{ConfigError, MatchConfig};
pub use controller::{MatchController, ProgressionStatus, TickResult};
pub use events::{GameEvent, GameEventData};
pub use facts::{MatchFacts, MatchOutcome, MatchPhase, PlayerResult, WinReason};
pub use interactable::{EngageRejection, Interactable};
pub use roles::{RoleRegistry, Subtype, Team};
pub use world::{Actor, ActorController, World};
