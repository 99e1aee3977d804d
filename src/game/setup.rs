//! Match Setup
//!
//! Runs once on entering Preparing: thins out items, randomizes props, sums
//! the cat objective and spawns a body for every player with a team.

use tracing::{debug, info, warn};

use crate::core::ids::{ActorId, EntityId, PlayerId};
use crate::core::pose::Pose;
use crate::core::rng::DeterministicRng;
use crate::game::config::MatchConfig;
use crate::game::roles::{RoleRegistry, Subtype, Team};
use crate::game::world::{Actor, ActorController, World};
use crate::services::spawner::{SpawnKind, Spawner};

/// What map setup changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapSetup {
    /// Items removed by the survival roll.
    pub removed_items: Vec<EntityId>,
    /// Props whose randomization fired.
    pub randomized_props: Vec<EntityId>,
    /// Sum of pushable progression weights left on the map.
    pub progression_total: f32,
}

/// What player setup spawned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerSetup {
    /// Player and the body now bound to them.
    pub bodies: Vec<(PlayerId, ActorId)>,
    /// Players on the cat team.
    pub cat_players: u32,
}

/// Roll item survival and prop randomization, then total the cat objective.
pub fn setup_map(world: &mut World, config: &MatchConfig, rng: &mut DeterministicRng) -> MapSetup {
    let mut report = MapSetup::default();

    for id in world.entity_ids() {
        let Some(entity) = world.entity_mut(id) else {
            continue;
        };

        if entity.is_item() {
            if rng.roll_d100() > config.item_remain_percentage {
                report.removed_items.push(id);
            }
            continue;
        }

        if entity.randomizable && rng.roll_d100() > config.env_actor_randomness_percentage {
            entity.randomize(rng);
            report.randomized_props.push(id);
        }
    }

    for id in &report.removed_items {
        world.remove_entity(*id);
    }

    report.progression_total = world
        .entities()
        .filter_map(|e| e.progression_weight())
        .sum();

    info!(
        "Map setup: {} item(s) removed, {} prop(s) randomized",
        report.removed_items.len(),
        report.randomized_props.len()
    );
    if report.progression_total <= 0.0 {
        warn!("No pushable objects remain after randomization, cat objective is impossible");
    } else {
        info!(
            "Cat objective: total weight {:.1}, required {:.1} ({:.0}%)",
            report.progression_total,
            report.progression_total * config.cat_win_threshold,
            config.cat_win_threshold * 100.0
        );
    }

    report
}

/// Spawn a body for each player with a team and bind it.
pub fn setup_players(
    world: &mut World,
    roles: &mut RoleRegistry,
    spawner: &mut dyn Spawner,
    config: &MatchConfig,
) -> PlayerSetup {
    let mut report = PlayerSetup::default();
    let mut cat_index = 0usize;
    let mut human_index = 0usize;

    let players: Vec<(PlayerId, Team, Subtype)> = roles
        .iter()
        .filter_map(|(id, binding)| {
            let team = binding.team?;
            let subtype = binding
                .subtype
                .filter(|s| s.team() == team)
                .unwrap_or_else(|| Subtype::default_for(team));
            Some((*id, team, subtype))
        })
        .collect();

    for (player, team, subtype) in players {
        let (kind, pose) = match (team, subtype) {
            (Team::Cat, Subtype::Cat(race)) => {
                report.cat_players += 1;
                let pose = spawn_point(&config.cat_spawn_points, cat_index, team);
                cat_index += 1;
                (SpawnKind::Cat(race), pose)
            }
            (Team::Human, Subtype::Human(profession)) => {
                let pose = spawn_point(&config.human_spawn_points, human_index, team);
                human_index += 1;
                (SpawnKind::Human(profession), pose)
            }
            _ => {
                debug!("Skipping {}: subtype does not match team", player);
                continue;
            }
        };

        match spawner.spawn(kind, pose) {
            Some(actor) => {
                if !world.insert_actor(Actor::new(actor, team, ActorController::Player(player), pose.position)) {
                    warn!("Spawned body {} for player {} collides with an existing actor", actor, player);
                    continue;
                }
                roles.bind_actor(player, actor);
                report.bodies.push((player, actor));
                info!("Player {} spawned as {:?} ({})", player, kind, actor);
            }
            None => warn!("Failed to spawn {:?} for player {}", kind, player),
        }
    }

    if report.cat_players == 0 {
        warn!("No cat players found, human objective is impossible");
    } else {
        info!("Human objective: catch {} cat player(s)", report.cat_players);
    }

    report
}

/// `index`-th spawn point, wrapping when players outnumber points.
fn spawn_point(points: &[Pose], index: usize, team: Team) -> Pose {
    if points.is_empty() {
        warn!("No {:?} spawn points configured, using origin", team);
        return Pose::default();
    }
    points[index % points.len()]
}
