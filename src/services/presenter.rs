//! Presentation collaborator.
//!
//! The match core never builds UI. It tells a [`Presenter`] which screen each
//! player should see and hands it read-only progress values.

use tracing::info;

use crate::core::ids::PlayerId;
use crate::game::facts::{CatProgress, HumanProgress, MatchOutcome, PlayerResult};
use crate::game::roles::Team;

/// What the result screen shows one player.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultScreen {
    /// Win or lose for this player.
    pub result: PlayerResult,
    /// Localized result label.
    pub label: String,
    /// Match outcome.
    pub outcome: MatchOutcome,
}

/// Per-player UI driver.
pub trait Presenter: Send {
    /// Open the customization screen for the player's team.
    fn show_customization(&mut self, player: PlayerId, team: Option<Team>);

    /// Customization seconds left, broadcast to everyone.
    fn customization_countdown(&mut self, remaining: u32);

    /// Preparation began.
    fn prepare_started(&mut self, player: PlayerId);

    /// Gameplay began.
    fn gameplay_started(&mut self, player: PlayerId);

    /// Tear down the in-game HUD.
    fn remove_gameplay_ui(&mut self, player: PlayerId, team: Option<Team>);

    /// Show the end screen.
    fn show_result(
        &mut self,
        player: PlayerId,
        screen: &ResultScreen,
        cat_progress: &CatProgress,
        human_progress: &HumanProgress,
    );
}

/// Presenter that only logs. Used by the headless server.
#[derive(Debug, Default)]
pub struct LoggingPresenter;

impl Presenter for LoggingPresenter {
    fn show_customization(&mut self, player: PlayerId, team: Option<Team>) {
        info!("[ui] {} customizing as {:?}", player, team);
    }

    fn customization_countdown(&mut self, remaining: u32) {
        info!("[ui] customization ends in {}s", remaining);
    }

    fn prepare_started(&mut self, player: PlayerId) {
        info!("[ui] {} preparing", player);
    }

    fn gameplay_started(&mut self, player: PlayerId) {
        info!("[ui] {} playing", player);
    }

    fn remove_gameplay_ui(&mut self, player: PlayerId, team: Option<Team>) {
        info!("[ui] {} ({:?}) leaves gameplay HUD", player, team);
    }

    fn show_result(
        &mut self,
        player: PlayerId,
        screen: &ResultScreen,
        cat_progress: &CatProgress,
        human_progress: &HumanProgress,
    ) {
        info!(
            "[ui] {} sees {} ({:?}) | cats {:.1}/{:.1} | humans {}/{}",
            player,
            screen.label,
            screen.outcome.reason,
            cat_progress.current,
            cat_progress.total,
            human_progress.caught_count,
            human_progress.total_cat_players,
        );
    }
}
