//! Spawning collaborator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ids::ActorId;
use crate::core::pose::Pose;
use crate::game::roles::{CatRace, HumanProfession, Team};

/// Body to spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnKind {
    /// Living cat of a race.
    Cat(CatRace),
    /// Living human of a profession.
    Human(HumanProfession),
    /// Dead cat body.
    DefeatedCat,
    /// Dead human body.
    DefeatedHuman,
}

impl SpawnKind {
    /// Defeated body for a team.
    pub fn defeated(team: Team) -> Self {
        match team {
            Team::Cat => SpawnKind::DefeatedCat,
            Team::Human => SpawnKind::DefeatedHuman,
        }
    }

    /// Team of the body.
    pub fn team(&self) -> Team {
        match self {
            SpawnKind::Cat(_) | SpawnKind::DefeatedCat => Team::Cat,
            SpawnKind::Human(_) | SpawnKind::DefeatedHuman => Team::Human,
        }
    }

    /// Spawns a dead body?
    pub fn is_defeated(&self) -> bool {
        matches!(self, SpawnKind::DefeatedCat | SpawnKind::DefeatedHuman)
    }
}

/// Creates bodies in the engine. `None` means the spawn failed.
pub trait Spawner: Send {
    /// Spawn `kind` at `pose`.
    fn spawn(&mut self, kind: SpawnKind, pose: Pose) -> Option<ActorId>;
}

/// Hands out sequential actor ids without an engine behind it.
#[derive(Debug)]
pub struct LocalSpawner {
    next_id: u32,
}

impl LocalSpawner {
    /// Ids start at `first_id`.
    pub fn new(first_id: u32) -> Self {
        Self { next_id: first_id }
    }
}

impl Default for LocalSpawner {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Spawner for LocalSpawner {
    fn spawn(&mut self, kind: SpawnKind, pose: Pose) -> Option<ActorId> {
        let id = ActorId(self.next_id);
        self.next_id = self.next_id.checked_add(1)?;
        debug!("Spawned {:?} as {} at {:?}", kind, id, pose.position);
        Some(id)
    }
}
