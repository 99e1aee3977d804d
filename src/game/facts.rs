//! Match Facts
//!
//! The authoritative, replicated match record: phase, countdowns and both
//! teams' progress. Only the controller mutates it; everything else reads
//! `&MatchFacts` or a serialized snapshot.
//!
//! Win evaluation is a pure function over the facts so the ordering of the
//! branches can be tested without a running match.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::game::roles::Team;

/// Human progress ratio treated as a full catch.
pub const HUMAN_WIN_RATIO: f32 = 0.999;

// =============================================================================
// PHASE & TIMERS
// =============================================================================

/// Match phase. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Players pick their cat race or human profession.
    CustomizingCharacters,
    /// Map and bodies are set up.
    Preparing,
    /// Match in progress.
    Playing,
    /// Result shown. Terminal.
    Ended,
}

/// Remaining and configured seconds per phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimers {
    /// Customization seconds remaining.
    pub customization: u32,
    /// Customization length.
    pub customization_total: u32,
    /// Preparation seconds remaining.
    pub prepare: u32,
    /// Preparation length.
    pub prepare_total: u32,
    /// Gameplay seconds remaining.
    pub gameplay: u32,
    /// Gameplay length.
    pub gameplay_total: u32,
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Cat team objective: push enough progression weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatProgress {
    /// Accumulated weight, in `[0, total]`, never decreases.
    pub current: f32,
    /// Sum of weights available on the map.
    pub total: f32,
    /// Required `current / total`, in (0, 1].
    pub win_threshold: f32,
}

impl CatProgress {
    /// `current / total`, or 0 when nothing is available.
    pub fn ratio(&self) -> f32 {
        if self.total > 0.0 {
            self.current / self.total
        } else {
            0.0
        }
    }

    /// Weight the cats must reach.
    pub fn required(&self) -> f32 {
        self.total * self.win_threshold
    }

    /// Can the objective be met at all?
    pub fn is_possible(&self) -> bool {
        self.total > 0.0
    }
}

/// Human team objective: catch every cat player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanProgress {
    /// Cats caught, in `[0, total_cat_players]`.
    pub caught_count: u32,
    /// Cat players in the match.
    pub total_cat_players: u32,
}

impl HumanProgress {
    /// `caught / total`, or 0 with no cat players.
    pub fn ratio(&self) -> f32 {
        if self.total_cat_players > 0 {
            self.caught_count as f32 / self.total_cat_players as f32
        } else {
            0.0
        }
    }

    /// Can the objective be met at all?
    pub fn is_possible(&self) -> bool {
        self.total_cat_players > 0
    }
}

// =============================================================================
// FACTS
// =============================================================================

/// Replicated match record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchFacts {
    /// Current phase.
    pub phase: MatchPhase,
    /// Phase countdowns.
    pub timers: PhaseTimers,
    /// Cat objective.
    pub cat_progress: CatProgress,
    /// Human objective.
    pub human_progress: HumanProgress,
    /// Bumped on every mutation.
    pub revision: u64,
}

impl MatchFacts {
    /// Fresh facts for a match about to start customization.
    pub fn new(timers: PhaseTimers, win_threshold: f32) -> Self {
        Self {
            phase: MatchPhase::CustomizingCharacters,
            timers,
            cat_progress: CatProgress {
                current: 0.0,
                total: 0.0,
                win_threshold,
            },
            human_progress: HumanProgress::default(),
            revision: 0,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Move to `next`. Backward or repeated transitions are refused.
    pub(crate) fn advance_phase(&mut self, next: MatchPhase) -> bool {
        if next <= self.phase {
            warn!("Refusing phase transition {:?} -> {:?}", self.phase, next);
            return false;
        }
        self.phase = next;
        self.touch();
        true
    }

    /// Mutable countdowns. Bumps the revision.
    pub(crate) fn timers_mut(&mut self) -> &mut PhaseTimers {
        self.touch();
        &mut self.timers
    }

    /// Reset cat progress against a new total.
    pub(crate) fn set_cat_total(&mut self, total: f32) {
        self.cat_progress.total = total.max(0.0);
        self.cat_progress.current = 0.0;
        self.touch();
    }

    /// Reset human progress against a new cat count.
    pub(crate) fn set_total_cat_players(&mut self, total: u32) {
        self.human_progress.total_cat_players = total;
        self.human_progress.caught_count = 0;
        self.touch();
    }

    /// Add progression weight. Negative deltas are ignored.
    pub(crate) fn add_cat_progress(&mut self, delta: f32) -> f32 {
        if delta < 0.0 {
            warn!("Ignoring negative cat progress delta {}", delta);
            return self.cat_progress.current;
        }
        if delta == 0.0 || delta.is_nan() {
            return self.cat_progress.current;
        }
        let progress = &mut self.cat_progress;
        progress.current = (progress.current + delta).clamp(0.0, progress.total);
        self.touch();
        self.cat_progress.current
    }

    /// Add (or remove) caught cats, clamped to the cat count.
    pub(crate) fn add_human_progress(&mut self, delta: i32) -> u32 {
        let progress = &mut self.human_progress;
        let next = (progress.caught_count as i64 + delta as i64)
            .clamp(0, progress.total_cat_players as i64);
        progress.caught_count = next as u32;
        self.touch();
        self.human_progress.caught_count
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Why the match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    /// Cats reached the progression threshold.
    CatObjective,
    /// Humans caught every cat player.
    HumanObjective,
    /// Every human player's body is dead.
    HumansForfeit,
    /// Gameplay timer ran out with one team ahead.
    Timeout,
    /// Gameplay timer ran out with equal ratios.
    TimeoutTie,
}

/// Final result of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Winning team.
    pub winner: Team,
    /// Deciding branch.
    pub reason: WinReason,
}

/// Per-player result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerResult {
    /// Player's team won.
    Win,
    /// Player's team lost, or the player had no team.
    Lose,
}

impl MatchOutcome {
    /// Result for a player on `team`.
    pub fn result_for(&self, team: Option<Team>) -> PlayerResult {
        match team {
            Some(team) if team == self.winner => PlayerResult::Win,
            _ => PlayerResult::Lose,
        }
    }
}

/// Evaluate the win branches in order; the first that holds decides.
///
/// 1. Cat objective reached (inclusive threshold).
/// 2. Human objective reached.
/// 3. Every human player dead (`humans_forfeit`).
/// 4. Gameplay timer at zero: higher ratio wins, a tie goes to the cats.
pub fn evaluate_outcome(facts: &MatchFacts, humans_forfeit: bool) -> Option<MatchOutcome> {
    let cat = &facts.cat_progress;
    let human = &facts.human_progress;

    if cat.is_possible() && cat.ratio() >= cat.win_threshold {
        return Some(MatchOutcome { winner: Team::Cat, reason: WinReason::CatObjective });
    }

    if human.is_possible()
        && (human.caught_count >= human.total_cat_players || human.ratio() >= HUMAN_WIN_RATIO)
    {
        return Some(MatchOutcome { winner: Team::Human, reason: WinReason::HumanObjective });
    }

    if humans_forfeit {
        return Some(MatchOutcome { winner: Team::Cat, reason: WinReason::HumansForfeit });
    }

    if facts.timers.gameplay == 0 {
        let (cat_ratio, human_ratio) = (cat.ratio(), human.ratio());
        let outcome = if cat_ratio > human_ratio {
            MatchOutcome { winner: Team::Cat, reason: WinReason::Timeout }
        } else if human_ratio > cat_ratio {
            MatchOutcome { winner: Team::Human, reason: WinReason::Timeout }
        } else {
            MatchOutcome { winner: Team::Cat, reason: WinReason::TimeoutTie }
        };
        return Some(outcome);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_facts(current: f32, total: f32, caught: u32, cats: u32) -> MatchFacts {
        let mut facts = MatchFacts::new(
            PhaseTimers { gameplay: 10, gameplay_total: 10, ..Default::default() },
            0.8,
        );
        facts.set_cat_total(total);
        facts.add_cat_progress(current);
        facts.set_total_cat_players(cats);
        facts.add_human_progress(caught as i32);
        facts
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let facts = playing_facts(8.0, 10.0, 0, 2);
        assert_eq!(
            evaluate_outcome(&facts, false),
            Some(MatchOutcome { winner: Team::Cat, reason: WinReason::CatObjective })
        );

        let facts = playing_facts(7.9, 10.0, 0, 2);
        assert_eq!(evaluate_outcome(&facts, false), None);
    }

    #[test]
    fn test_human_objective() {
        let facts = playing_facts(0.0, 10.0, 2, 2);
        assert_eq!(
            evaluate_outcome(&facts, false).map(|o| o.winner),
            Some(Team::Human)
        );
    }

    #[test]
    fn test_cat_objective_checked_first() {
        let facts = playing_facts(10.0, 10.0, 2, 2);
        assert_eq!(
            evaluate_outcome(&facts, true).map(|o| o.reason),
            Some(WinReason::CatObjective)
        );
    }

    #[test]
    fn test_forfeit() {
        let facts = playing_facts(1.0, 10.0, 0, 2);
        assert_eq!(
            evaluate_outcome(&facts, true),
            Some(MatchOutcome { winner: Team::Cat, reason: WinReason::HumansForfeit })
        );
    }

    #[test]
    fn test_timeout_tie_goes_to_cats() {
        let mut facts = playing_facts(5.0, 10.0, 1, 2);
        facts.timers_mut().gameplay = 0;

        assert_eq!(
            evaluate_outcome(&facts, false),
            Some(MatchOutcome { winner: Team::Cat, reason: WinReason::TimeoutTie })
        );
    }

    #[test]
    fn test_timeout_higher_ratio_wins() {
        let mut facts = playing_facts(2.0, 10.0, 1, 2);
        facts.timers_mut().gameplay = 0;
        assert_eq!(
            evaluate_outcome(&facts, false),
            Some(MatchOutcome { winner: Team::Human, reason: WinReason::Timeout })
        );
    }

    #[test]
    fn test_impossible_objectives_fall_through_to_timeout() {
        let mut facts = playing_facts(0.0, 0.0, 0, 0);
        assert_eq!(evaluate_outcome(&facts, false), None);

        facts.timers_mut().gameplay = 0;
        assert_eq!(
            evaluate_outcome(&facts, false).map(|o| o.reason),
            Some(WinReason::TimeoutTie)
        );
    }

    #[test]
    fn test_progress_clamping() {
        let mut facts = playing_facts(0.0, 10.0, 0, 2);

        assert_eq!(facts.add_cat_progress(25.0), 10.0);
        assert_eq!(facts.add_cat_progress(-3.0), 10.0);
        assert_eq!(facts.add_human_progress(5), 2);
        assert_eq!(facts.add_human_progress(-7), 0);
    }

    #[test]
    fn test_phase_only_moves_forward() {
        let mut facts = MatchFacts::new(PhaseTimers::default(), 0.8);
        let revision = facts.revision;

        assert!(facts.advance_phase(MatchPhase::Preparing));
        assert!(!facts.advance_phase(MatchPhase::CustomizingCharacters));
        assert!(!facts.advance_phase(MatchPhase::Preparing));
        assert_eq!(facts.phase, MatchPhase::Preparing);
        assert_eq!(facts.revision, revision + 1);
    }

    #[test]
    fn test_unassigned_player_loses() {
        let outcome = MatchOutcome { winner: Team::Cat, reason: WinReason::Timeout };
        assert_eq!(outcome.result_for(Some(Team::Cat)), PlayerResult::Win);
        assert_eq!(outcome.result_for(Some(Team::Human)), PlayerResult::Lose);
        assert_eq!(outcome.result_for(None), PlayerResult::Lose);
    }
}
