//! Lobby & Role Binding
//!
//! Which team each player is on, which cat race or human profession they
//! picked, and which world actor they currently control.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::ids::{ActorId, PlayerId};

/// Team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Cats push props to fill the progression bar.
    Cat,
    /// Humans catch cats and cage them.
    Human,
}

impl Team {
    /// The other team.
    pub fn opponent(self) -> Self {
        match self {
            Team::Cat => Team::Human,
            Team::Human => Team::Cat,
        }
    }
}

/// Cat body variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CatRace {
    /// Starter cat.
    #[default]
    Explorer,
    /// Race 1.
    Tabby,
    /// Race 2.
    Siamese,
    /// Race 3.
    Persian,
}

/// Human body variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HumanProfession {
    /// Starter human.
    #[default]
    Explorer,
    /// Profession 1.
    Chef,
    /// Profession 2.
    Janitor,
    /// Profession 3.
    Scientist,
}

/// Customization choice. Must agree with the team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subtype {
    /// Cat race.
    Cat(CatRace),
    /// Human profession.
    Human(HumanProfession),
}

impl Subtype {
    /// Default subtype for a team.
    pub fn default_for(team: Team) -> Self {
        match team {
            Team::Cat => Subtype::Cat(CatRace::default()),
            Team::Human => Subtype::Human(HumanProfession::default()),
        }
    }

    /// Team this subtype belongs to.
    pub fn team(&self) -> Team {
        match self {
            Subtype::Cat(_) => Team::Cat,
            Subtype::Human(_) => Team::Human,
        }
    }
}

/// A player's lobby choice and current body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRoleBinding {
    /// Chosen team, `None` until assigned.
    pub team: Option<Team>,
    /// Chosen race or profession.
    pub subtype: Option<Subtype>,
    /// Actor currently controlled.
    pub controlled: Option<ActorId>,
    /// Ready flag from the lobby.
    pub ready: bool,
}

/// Lobby errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    /// Player never joined.
    #[error("Player {0} is not in the lobby")]
    UnknownPlayer(PlayerId),

    /// Team would outnumber the other by more than one.
    #[error("Team {0:?} is full")]
    TeamFull(Team),

    /// Subtype does not belong to the player's team.
    #[error("Subtype does not match team")]
    SubtypeMismatch,
}

/// Lobby roster, ordered by player id.
#[derive(Clone, Debug, Default)]
pub struct RoleRegistry {
    bindings: BTreeMap<PlayerId, PlayerRoleBinding>,
}

impl RoleRegistry {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player with no team. Joining twice keeps the existing entry.
    pub fn join(&mut self, player: PlayerId) {
        self.bindings.entry(player).or_insert(PlayerRoleBinding {
            team: None,
            subtype: None,
            controlled: None,
            ready: false,
        });
    }

    /// Remove a player.
    pub fn leave(&mut self, player: &PlayerId) -> Option<PlayerRoleBinding> {
        self.bindings.remove(player)
    }

    /// Number of players on a team.
    pub fn team_size(&self, team: Team) -> usize {
        self.bindings.values().filter(|b| b.team == Some(team)).count()
    }

    /// Put a player on a team, keeping the teams within one of each other.
    pub fn assign(&mut self, player: PlayerId, team: Team) -> Result<(), RoleError> {
        let current = self.bindings
            .get(&player)
            .ok_or(RoleError::UnknownPlayer(player))?
            .team;
        if current == Some(team) {
            return Ok(());
        }

        let after = self.team_size(team) + 1;
        let mut other = self.team_size(team.opponent());
        if current == Some(team.opponent()) {
            other -= 1;
        }
        if after > other + 1 {
            debug!("Refusing {} on {:?}: {} vs {}", player, team, after, other);
            return Err(RoleError::TeamFull(team));
        }

        if let Some(binding) = self.bindings.get_mut(&player) {
            binding.team = Some(team);
            binding.subtype = Some(Subtype::default_for(team));
            info!("Player {} joined {:?} ({} vs {})", player, team, after, other);
        }
        Ok(())
    }

    /// Place every unassigned player on the smaller team (humans on a tie).
    pub fn auto_assign(&mut self) {
        let unassigned: Vec<PlayerId> = self.bindings
            .iter()
            .filter(|(_, b)| b.team.is_none())
            .map(|(id, _)| *id)
            .collect();

        for player in unassigned {
            let team = if self.team_size(Team::Cat) < self.team_size(Team::Human) {
                Team::Cat
            } else {
                Team::Human
            };
            // Smaller team never violates the balance rule.
            let _ = self.assign(player, team);
        }
    }

    /// Pick a race or profession for the player's current team.
    pub fn set_subtype(&mut self, player: PlayerId, subtype: Subtype) -> Result<(), RoleError> {
        let binding = self.bindings
            .get_mut(&player)
            .ok_or(RoleError::UnknownPlayer(player))?;
        if binding.team != Some(subtype.team()) {
            return Err(RoleError::SubtypeMismatch);
        }
        binding.subtype = Some(subtype);
        Ok(())
    }

    /// Toggle ready.
    pub fn set_ready(&mut self, player: PlayerId, ready: bool) -> Result<(), RoleError> {
        let binding = self.bindings
            .get_mut(&player)
            .ok_or(RoleError::UnknownPlayer(player))?;
        binding.ready = ready;
        Ok(())
    }

    /// Both teams populated and at least half the lobby (minimum one) ready.
    pub fn ready_to_start(&self) -> bool {
        if self.team_size(Team::Cat) == 0 || self.team_size(Team::Human) == 0 {
            return false;
        }
        let ready = self.bindings.values().filter(|b| b.ready).count();
        ready >= (self.bindings.len() / 2).max(1)
    }

    /// Bind the actor a player now controls.
    pub fn bind_actor(&mut self, player: PlayerId, actor: ActorId) -> bool {
        match self.bindings.get_mut(&player) {
            Some(binding) => {
                binding.controlled = Some(actor);
                true
            }
            None => false,
        }
    }

    /// Drop the body binding, e.g. after a cat player is caged.
    pub fn unbind_actor(&mut self, player: PlayerId) -> Option<ActorId> {
        self.bindings.get_mut(&player).and_then(|b| b.controlled.take())
    }

    /// Look up one player.
    pub fn get(&self, player: &PlayerId) -> Option<&PlayerRoleBinding> {
        self.bindings.get(player)
    }

    /// Team of a player, if assigned.
    pub fn team_of(&self, player: &PlayerId) -> Option<Team> {
        self.bindings.get(player).and_then(|b| b.team)
    }

    /// Number of cat players.
    pub fn cat_player_count(&self) -> u32 {
        self.team_size(Team::Cat) as u32
    }

    /// Human-team bindings in id order.
    pub fn human_bindings(&self) -> impl Iterator<Item = (&PlayerId, &PlayerRoleBinding)> {
        self.bindings.iter().filter(|(_, b)| b.team == Some(Team::Human))
    }

    /// Every binding in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PlayerRoleBinding)> {
        self.bindings.iter()
    }

    /// Sorted player ids.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.bindings.keys().copied().collect()
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Empty lobby?
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
