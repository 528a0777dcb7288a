//! Per-agent phase state machine with generation-guarded timers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use tether_core::constants::{
    PHASE_AT_DESK_MS, PHASE_DONE_CENTER_MS, PHASE_DONE_WALK_MS, PHASE_HUB_PICKUP_MS,
    PHASE_STOP_CENTER_MS, PHASE_WALK_TO_DESK_MS,
};

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Where an agent currently is in its desk-walk animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentPhase {
    /// Resting at the center position.
    AtCenter,
    /// Heading to the hub to pick up work.
    WalkingToHub,
    /// Pausing at the hub.
    AtHubPickup,
    /// Carrying work from the hub to the desk.
    WalkingToDesk,
    /// Seated and working.
    AtDeskWorking,
    /// Celebrating a finished run.
    Celebrating,
    /// Returning to the center.
    WalkingToCenter,
}

/// Coarse execution status driving the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarseStatus {
    /// No execution attached.
    Idle,
    /// An execution is in flight.
    Working,
    /// The last execution completed successfully.
    Done,
    /// The last execution failed.
    Error,
}

/// A scheduled phase change, offset in milliseconds from the status change.
type Step = (u64, AgentPhase);

const WORKING_STEPS: &[Step] = &[
    (PHASE_HUB_PICKUP_MS, AgentPhase::AtHubPickup),
    (PHASE_WALK_TO_DESK_MS, AgentPhase::WalkingToDesk),
    (PHASE_AT_DESK_MS, AgentPhase::AtDeskWorking),
];

const DONE_STEPS: &[Step] = &[
    (PHASE_DONE_WALK_MS, AgentPhase::WalkingToCenter),
    (PHASE_DONE_CENTER_MS, AgentPhase::AtCenter),
];

const STOP_STEPS: &[Step] = &[(PHASE_STOP_CENTER_MS, AgentPhase::AtCenter)];

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Inner {
    phase: AgentPhase,
    status: CoarseStatus,
    generation: u64,
}

/// Drives one agent's [`AgentPhase`] from its [`CoarseStatus`].
///
/// Every status change bumps a generation counter and schedules its
/// delayed steps as tokio sleep tasks. A step only lands if the
/// generation it was scheduled under is still current, so a newer
/// status change implicitly cancels everything pending.
#[derive(Debug, Clone)]
pub struct PhaseScheduler {
    inner: Arc<Mutex<Inner>>,
}

impl PhaseScheduler {
    /// Creates a scheduler for an agent first seen in `status`.
    ///
    /// A mid-run mount lands directly at the desk rather than
    /// replaying the walk; a just-finished mount still plays the
    /// celebration wind-down. Must be called within a tokio runtime.
    #[must_use]
    pub fn new(status: CoarseStatus) -> Self {
        let phase = match status {
            CoarseStatus::Working => AgentPhase::AtDeskWorking,
            CoarseStatus::Done => AgentPhase::Celebrating,
            CoarseStatus::Idle | CoarseStatus::Error => AgentPhase::AtCenter,
        };
        let scheduler = Self {
            inner: Arc::new(Mutex::new(Inner {
                phase,
                status,
                generation: 0,
            })),
        };
        if status == CoarseStatus::Done {
            scheduler.schedule(0, DONE_STEPS);
        }
        scheduler
    }

    /// Applies a new coarse status.
    ///
    /// Re-applying the current status is a strict no-op: no phase
    /// change, no generation bump, pending timers left untouched.
    pub fn set_status(&self, status: CoarseStatus) {
        let (generation, steps) = {
            let mut inner = self.inner.lock();
            if inner.status == status {
                return;
            }
            let was_working = inner.status == CoarseStatus::Working;
            inner.status = status;
            inner.generation += 1;
            let steps: &[Step] = match status {
                CoarseStatus::Working => {
                    inner.phase = AgentPhase::WalkingToHub;
                    WORKING_STEPS
                }
                CoarseStatus::Done => {
                    inner.phase = AgentPhase::Celebrating;
                    DONE_STEPS
                }
                CoarseStatus::Idle | CoarseStatus::Error => {
                    if was_working {
                        inner.phase = AgentPhase::WalkingToCenter;
                        STOP_STEPS
                    } else {
                        inner.phase = AgentPhase::AtCenter;
                        &[]
                    }
                }
            };
            trace!(?status, phase = ?inner.phase, generation = inner.generation, "phase status change");
            (inner.generation, steps)
        };
        if !steps.is_empty() {
            self.schedule(generation, steps);
        }
    }

    /// Current animation phase.
    #[must_use]
    pub fn phase(&self) -> AgentPhase {
        self.inner.lock().phase
    }

    /// Current coarse status.
    #[must_use]
    pub fn status(&self) -> CoarseStatus {
        self.inner.lock().status
    }

    /// Generation of the most recent status change.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Spawns one sleep task per step. Each re-checks the generation
    /// under the lock before landing, so stale steps fall on the floor.
    fn schedule(&self, generation: u64, steps: &'static [Step]) {
        for &(delay_ms, phase) in steps {
            let inner = Arc::clone(&self.inner);
            let _ = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let mut inner = inner.lock();
                if inner.generation == generation {
                    inner.phase = phase;
                }
            });
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
