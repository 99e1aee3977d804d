//! Recording fakes for tests.

use std::sync::{Arc, Mutex};

use glam::Vec3;

use crate::core::ids::{ActorId, EntityId, PlayerId};
use crate::core::pose::Pose;
use crate::game::facts::{CatProgress, HumanProgress};
use crate::game::roles::Team;
use crate::services::localization::Localizer;
use crate::services::physics::Physics;
use crate::services::presenter::{Presenter, ResultScreen};
use crate::services::spawner::{SpawnKind, Spawner};
use crate::services::MatchServices;

/// One presenter call.
#[derive(Clone, Debug, PartialEq)]
pub enum PresenterCall {
    ShowCustomization(PlayerId, Option<Team>),
    CustomizationCountdown(u32),
    PrepareStarted(PlayerId),
    GameplayStarted(PlayerId),
    RemoveGameplayUi(PlayerId, Option<Team>),
    ShowResult(PlayerId, ResultScreen),
}

/// Presenter that records every call.
#[derive(Clone, Debug, Default)]
pub struct RecordingPresenter {
    calls: Arc<Mutex<Vec<PresenterCall>>>,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<(PlayerId, ResultScreen)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PresenterCall::ShowResult(player, screen) => Some((player, screen)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: PresenterCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Presenter for RecordingPresenter {
    fn show_customization(&mut self, player: PlayerId, team: Option<Team>) {
        self.push(PresenterCall::ShowCustomization(player, team));
    }

    fn customization_countdown(&mut self, remaining: u32) {
        self.push(PresenterCall::CustomizationCountdown(remaining));
    }

    fn prepare_started(&mut self, player: PlayerId) {
        self.push(PresenterCall::PrepareStarted(player));
    }

    fn gameplay_started(&mut self, player: PlayerId) {
        self.push(PresenterCall::GameplayStarted(player));
    }

    fn remove_gameplay_ui(&mut self, player: PlayerId, team: Option<Team>) {
        self.push(PresenterCall::RemoveGameplayUi(player, team));
    }

    fn show_result(
        &mut self,
        player: PlayerId,
        screen: &ResultScreen,
        _cat_progress: &CatProgress,
        _human_progress: &HumanProgress,
    ) {
        self.push(PresenterCall::ShowResult(player, screen.clone()));
    }
}

/// Spawner that records requests and can be told to fail.
#[derive(Clone, Debug)]
pub struct RecordingSpawner {
    next_id: Arc<Mutex<u32>>,
    fail: Arc<Mutex<bool>>,
    spawned: Arc<Mutex<Vec<(SpawnKind, Pose)>>>,
}

impl Default for RecordingSpawner {
    fn default() -> Self {
        Self {
            next_id: Arc::new(Mutex::new(100)),
            fail: Arc::new(Mutex::new(false)),
            spawned: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl RecordingSpawner {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn spawned(&self) -> Vec<(SpawnKind, Pose)> {
        self.spawned.lock().unwrap().clone()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&mut self, kind: SpawnKind, pose: Pose) -> Option<ActorId> {
        self.spawned.lock().unwrap().push((kind, pose));
        if *self.fail.lock().unwrap() {
            return None;
        }
        let mut next = self.next_id.lock().unwrap();
        let id = ActorId(*next);
        *next += 1;
        Some(id)
    }
}

/// Physics that records impulses.
#[derive(Clone, Debug, Default)]
pub struct RecordingPhysics {
    impulses: Arc<Mutex<Vec<(EntityId, Vec3)>>>,
}

impl RecordingPhysics {
    pub fn impulses(&self) -> Vec<(EntityId, Vec3)> {
        self.impulses.lock().unwrap().clone()
    }
}

impl Physics for RecordingPhysics {
    fn apply_impulse(&mut self, target: EntityId, impulse: Vec3) {
        self.impulses.lock().unwrap().push((target, impulse));
    }
}

/// Services wired to recording fakes, plus handles to inspect them.
pub struct Recorders {
    pub presenter: RecordingPresenter,
    pub spawner: RecordingSpawner,
    pub physics: RecordingPhysics,
}

pub fn recording_services() -> (MatchServices, Recorders) {
    let recorders = Recorders {
        presenter: RecordingPresenter::default(),
        spawner: RecordingSpawner::default(),
        physics: RecordingPhysics::default(),
    };
    let services = MatchServices {
        presenter: Box::new(recorders.presenter.clone()),
        spawner: Box::new(recorders.spawner.clone()),
        physics: Box::new(recorders.physics.clone()),
        localizer: Localizer::with_defaults(),
    };
    (services, recorders)
}
