//! Countdown Timers
//!
//! Cooperative one-second timers keyed by `(owner, slot)`. The scheduler never
//! owns the countdown value: each owner keeps its own counter and calls
//! [`Countdown::step`] when its key fires, so the counter stays the single
//! source of truth.
//!
//! ## Firing model
//!
//! ```text
//! advance_second() ──► snapshot of armed keys ──► owner checks is_current()
//!                                               └► Countdown::step(&mut counter)
//! ```
//!
//! A key started while a snapshot is being dispatched fires on the next
//! second. Restarting a key bumps its generation, so a stale firing from the
//! same snapshot is discarded instead of decrementing twice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::ids::EntityId;

// =============================================================================
// KEYS
// =============================================================================

/// Named timer slot. At most one live timer per slot per owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimerSlot {
    /// Character customization phase.
    Customization,
    /// Preparation phase.
    Prepare,
    /// Gameplay phase.
    Gameplay,
    /// Duration-mode engagement on an interactable.
    Interaction,
    /// Reuse cooldown on an interactable.
    Cooldown,
}

/// Who a timer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimerOwner {
    /// The match controller.
    Match,
    /// An interactable entity.
    Entity(EntityId),
}

/// Scheduler key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerKey {
    /// Owner of the timer.
    pub owner: TimerOwner,
    /// Slot within the owner.
    pub slot: TimerSlot,
}

impl TimerKey {
    /// Match-owned key.
    pub const fn matched(slot: TimerSlot) -> Self {
        Self { owner: TimerOwner::Match, slot }
    }

    /// Entity-owned key.
    pub const fn entity(id: EntityId, slot: TimerSlot) -> Self {
        Self { owner: TimerOwner::Entity(id), slot }
    }
}

/// One pending firing handed out by [`TimerScheduler::advance_second`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Firing {
    /// Key that fired.
    pub key: TimerKey,
    generation: u64,
}

// =============================================================================
// SCHEDULER
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct ArmedTimer {
    generation: u64,
    duration_seconds: u32,
}

/// Repeating one-second timers.
#[derive(Debug)]
pub struct TimerScheduler {
    timers: BTreeMap<TimerKey, ArmedTimer>,
    next_generation: u64,
    elapsed_seconds: u64,
    live: bool,
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerScheduler {
    /// Create a live scheduler with nothing armed.
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
            next_generation: 0,
            elapsed_seconds: 0,
            live: true,
        }
    }

    /// Arm a repeating one-second timer, replacing any run on the same key.
    ///
    /// Returns `false` (and logs) when the scheduler has been shut down.
    pub fn start(&mut self, key: TimerKey, duration_seconds: u32) -> bool {
        if !self.live {
            warn!("Timer {:?} started without a live scheduler, ignoring", key);
            return false;
        }

        self.next_generation += 1;
        let replaced = self.timers.insert(key, ArmedTimer {
            generation: self.next_generation,
            duration_seconds,
        });

        if replaced.is_some() {
            debug!("Timer {:?} restarted ({}s)", key, duration_seconds);
        }
        true
    }

    /// Disarm a key. Cancelling an unarmed key is a no-op.
    pub fn cancel(&mut self, key: TimerKey) {
        self.timers.remove(&key);
    }

    /// Disarm every key owned by `owner`.
    pub fn cancel_owner(&mut self, owner: TimerOwner) {
        self.timers.retain(|key, _| key.owner != owner);
    }

    /// Is a timer armed on this key?
    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.timers.contains_key(&key)
    }

    /// Is this firing still the run that was armed when it was handed out?
    pub fn is_current(&self, firing: &Firing) -> bool {
        self.timers
            .get(&firing.key)
            .is_some_and(|armed| armed.generation == firing.generation)
    }

    /// Configured duration of the run armed on `key`.
    pub fn duration_of(&self, key: TimerKey) -> Option<u32> {
        self.timers.get(&key).map(|armed| armed.duration_seconds)
    }

    /// Advance one second and return every key that fires, in key order.
    pub fn advance_second(&mut self) -> Vec<Firing> {
        if !self.live {
            return Vec::new();
        }
        self.elapsed_seconds += 1;

        let firings: Vec<Firing> = self.timers
            .iter()
            .map(|(key, armed)| Firing { key: *key, generation: armed.generation })
            .collect();

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            "Second {} fires {} timer(s)",
            self.elapsed_seconds,
            firings.len()
        );

        firings
    }

    /// Seconds advanced since creation.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Number of armed keys.
    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }

    /// Tear down: disarm everything and refuse later starts.
    pub fn shutdown(&mut self) {
        self.live = false;
        self.timers.clear();
    }

    /// Can timers still be started?
    pub fn is_live(&self) -> bool {
        self.live
    }
}

// =============================================================================
// COUNTDOWN
// =============================================================================

/// Result of one countdown step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Still counting.
    Continue {
        /// Seconds left after this step.
        remaining: u32,
    },
    /// Counter reached zero.
    Expired,
}

/// Counter stepping shared by every timer owner.
pub struct Countdown;

impl Countdown {
    /// Decrement `counter` by one and report whether it expired.
    ///
    /// A counter already at zero expires without underflow.
    pub fn step(counter: &mut u32) -> Tick {
        if *counter == 0 {
            return Tick::Expired;
        }
        *counter -= 1;
        if *counter == 0 {
            Tick::Expired
        } else {
            Tick::Continue { remaining: *counter }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
