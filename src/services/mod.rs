//! External Collaborators
//!
//! Presentation, spawning, physics and localization, consumed through traits
//! and constructed once per match. The headless implementations here only log;
//! an engine integration supplies real ones.

pub mod localization;
pub mod physics;
pub mod presenter;
pub mod spawner;

#[cfg(test)]
pub(crate) mod testing;

pub use localization::{Language, LanguageChanged, LocalizationError, Localizer};
pub use physics::{LoggingPhysics, Physics};
pub use presenter::{LoggingPresenter, Presenter, ResultScreen};
pub use spawner::{LocalSpawner, SpawnKind, Spawner};

/// Everything the controller talks to outside the match core.
pub struct MatchServices {
    /// UI driver.
    pub presenter: Box<dyn Presenter>,
    /// Body spawner.
    pub spawner: Box<dyn Spawner>,
    /// Prop physics.
    pub physics: Box<dyn Physics>,
    /// Text lookup.
    pub localizer: Localizer,
}

impl MatchServices {
    /// Log-only collaborators for a headless server.
    pub fn headless() -> Self {
        Self {
            presenter: Box::new(LoggingPresenter),
            spawner: Box::new(LocalSpawner::default()),
            physics: Box::new(LoggingPhysics),
            localizer: Localizer::with_defaults(),
        }
    }
}

impl std::fmt::Debug for MatchServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchServices")
            .field("localizer", &self.localizer)
            .finish_non_exhaustive()
    }
}
