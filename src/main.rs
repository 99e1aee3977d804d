//! MeowPhone Match Server
//!
//! Runs one headless match: a random lobby, a small house map and a scripted
//! cat that pushes whatever it can reach. Replicated updates are logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use meowphone::{
    game::{
        behavior::{Behavior, CustomBehavior, ItemBehavior, PushableBehavior},
        events::GameEventData,
        interactable::Interactable,
    },
    network::{Replicated, SessionManager},
    services::Localizer,
    ActorId, EntityId, MatchConfig, MatchSession, MatchServices, PlayerId, Pose, RoleRegistry,
    SessionConfig, Team, VERSION,
};

/// Headless MeowPhone match server.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Match config JSON (defaults apply to missing fields).
    #[arg(long, env = "MEOWPHONE_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for setup rolls; derived from the lobby when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter, e.g. `info` or `meowphone=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Localization table JSON.
    #[arg(long)]
    localization: Option<PathBuf>,

    /// Players in the lobby.
    #[arg(long, default_value_t = 4)]
    players: u8,

    /// Milliseconds per match second.
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("MeowPhone Server v{}", VERSION);

    let mut config = match &args.config {
        Some(path) => MatchConfig::from_json_file(path)
            .with_context(|| format!("loading match config {}", path.display()))?,
        None => MatchConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }
    if let Err(e) = config.validate() {
        warn!("Config inconsistency: {}", e);
    }

    let mut services = MatchServices::headless();
    if let Some(path) = &args.localization {
        services.localizer = Localizer::from_json_file(path)
            .with_context(|| format!("loading localization {}", path.display()))?;
    }

    let roles = demo_lobby(args.players.max(2));
    let match_id = uuid::Uuid::new_v4().into_bytes();
    info!("Match ID: {}", hex::encode(match_id));

    let session_config = SessionConfig {
        tick_interval: Duration::from_millis(args.tick_ms.max(1)),
        ..Default::default()
    };
    let (mut session, handle) = MatchSession::from_lobby(match_id, config, roles, services, session_config)
        .context("starting session")?;
    populate_house(&mut session);

    let cat_players: Vec<PlayerId> = session
        .controller()
        .roles()
        .iter()
        .filter(|(_, b)| b.team == Some(Team::Cat))
        .map(|(id, _)| *id)
        .collect();
    let pushables: Vec<EntityId> = session
        .controller()
        .world()
        .entities()
        .filter(|e| e.progression_weight().is_some())
        .map(|e| e.id())
        .collect();

    let manager = Arc::new(SessionManager::new());
    let mut updates = handle.subscribe();
    let task = manager.start(session, handle.clone()).await;

    // Scripted cat: once bodies exist, push one prop per second.
    let driver = tokio::spawn(async move {
        let mut cat_bodies: Vec<ActorId> = Vec::new();
        let mut targets = pushables.into_iter();

        while let Ok(update) = updates.recv().await {
            match update {
                Replicated::Events { second, events } => {
                    for event in &events {
                        debug!("[{}] {:?}", second, event.data);
                        if let GameEventData::BodyReplaced { player_id, actor } = event.data {
                            if cat_players.contains(&player_id) {
                                cat_bodies.push(actor);
                            }
                        }
                    }
                }
                Replicated::Outcome(outcome) => {
                    info!("Outcome: {:?} ({:?})", outcome.winner, outcome.reason);
                    break;
                }
                _ => continue,
            }

            let (Some(cat), Some(target)) = (cat_bodies.first().copied(), targets.next()) else {
                continue;
            };
            match handle.engage(cat, target).await {
                Ok(accepted) => debug!("{} pushes {}: {}", cat, target, accepted),
                Err(e) => {
                    warn!("Driver stopped: {}", e);
                    break;
                }
            }
        }
    });

    let summary = task.await.context("session task")?;
    driver.abort();

    info!("=== Match Summary ===");
    info!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Random players split evenly and readied.
fn demo_lobby(players: u8) -> RoleRegistry {
    let mut roles = RoleRegistry::new();
    for _ in 0..players {
        roles.join(PlayerId::random());
    }
    roles.auto_assign();
    for id in roles.player_ids() {
        if let Err(e) = roles.set_ready(id, true) {
            warn!("Could not ready {}: {}", id, e);
        }
    }
    roles
}

/// Props, items, a cage and a radio around the house.
fn populate_house(session: &mut MatchSession) {
    let controller = session.controller_mut();
    let mut next = 1u32;
    let mut id = || {
        let id = EntityId(next);
        next += 1;
        id
    };

    for n in 0..8 {
        let position = Vec3::new(2.0 * n as f32, 0.0, 4.0);
        controller.place_interactable(
            Interactable::new(id(), Pose::at(position), Behavior::Pushable(PushableBehavior::new(1.0 + (n % 3) as f32)))
                .randomizable(),
        );
    }
    for n in 0..4 {
        let position = Vec3::new(2.0 * n as f32, 0.0, -4.0);
        controller.place_interactable(Interactable::new(id(), Pose::at(position), Behavior::Item(ItemBehavior::new(0.5))));
    }
    controller.place_interactable(Interactable::new(id(), Pose::at(Vec3::new(0.0, 0.0, 10.0)), Behavior::Cage));
    controller.place_interactable(
        Interactable::new(id(), Pose::at(Vec3::new(-5.0, 0.0, 0.0)), Behavior::Custom(CustomBehavior::default()))
            .raising_urgent(),
    );
}
