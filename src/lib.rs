//! # MeowPhone Match Server
//!
//! Server-authoritative match flow for MeowPhone: cats push props around the
//! house while humans try to cage them before the clock runs out.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    MEOWPHONE SERVER                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/              - Match-agnostic primitives               │
//! │  ├── ids.rs         - Player / actor / entity / agent ids     │
//! │  ├── pose.rs        - World position and rotation             │
//! │  ├── rng.rs         - Seeded Xorshift128+ for setup rolls     │
//! │  └── timer.rs       - One-second countdown scheduler          │
//! │                                                               │
//! │  game/              - Match rules (driven per second)         │
//! │  ├── facts.rs       - Phase, timers, progress, win check      │
//! │  ├── roles.rs       - Teams, subtypes, body bindings          │
//! │  ├── interactable.rs- Engagement / cooldown lifecycle         │
//! │  ├── behavior.rs    - Item, prop, cage and ability effects    │
//! │  ├── broker.rs      - AI task dispatch                        │
//! │  ├── setup.rs       - Map thinning and player spawning        │
//! │  └── controller.rs  - Phase machine                           │
//! │                                                               │
//! │  services/          - Presenter, spawner, physics, text       │
//! │                                                               │
//! │  network/           - Session loop and replication (tokio)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Given the same seed, lobby and inputs, `game/` makes the same decisions:
//! - Entity and player maps are `BTreeMap`s
//! - Setup randomness comes from the seeded Xorshift128+
//! - Match time is counted in seconds by the scheduler, never read from a clock

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod services;

// Re-export commonly used types
pub use core::ids::{ActorId, AgentId, EntityId, PlayerId};
pub use core::pose::Pose;
pub use core::rng::DeterministicRng;
pub use game::config::MatchConfig;
pub use game::controller::{MatchController, TickResult};
pub use game::facts::{MatchOutcome, MatchPhase};
pub use game::roles::{RoleRegistry, Team};
pub use network::session::{MatchSession, SessionConfig, SessionHandle};
pub use services::MatchServices;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
