//! Worker record and its free/busy state machine.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Escalation level of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Cheapest, consulted first.
    FirstLine,
    /// Consulted when every first-line worker is taken.
    SecondLine,
    /// Last resort.
    ThirdLine,
}

impl Tier {
    /// Tiers in the order the dispatcher consults them.
    pub const ESCALATION: [Tier; 3] = [Tier::FirstLine, Tier::SecondLine, Tier::ThirdLine];

    /// Next tier up, if any.
    pub fn escalate(&self) -> Option<Tier> {
        match self {
            Self::FirstLine => Some(Self::SecondLine),
            Self::SecondLine => Some(Self::ThirdLine),
            Self::ThirdLine => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FirstLine => "first_line",
            Self::SecondLine => "second_line",
            Self::ThirdLine => "third_line",
        };
        write!(f, "{s}")
    }
}

/// Availability of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Eligible for assignment.
    Free,
    /// Servicing a call.
    Busy,
}

impl WorkerState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: WorkerState) -> bool {
        use WorkerState::*;

        matches!((self, target), (Free, Busy) | (Busy, Free))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl From<bool> for WorkerState {
    fn from(busy: bool) -> Self {
        if busy { Self::Busy } else { Self::Free }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Free => "free",
            Self::Busy => "busy",
        };
        write!(f, "{s}")
    }
}

/// An employee that can take calls.
///
/// Plain data: the busy flag is the only mutable part and is shared through
/// `Arc<Worker>` between the tier that owns it and any in-flight call.
#[derive(Debug)]
pub struct Worker {
    id: u32,
    busy: AtomicBool,
}

impl Worker {
    /// Create a free worker.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            busy: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        self.is_busy().into()
    }

    /// Force the busy flag.
    ///
    /// No validation. Setting a worker busy from outside its tier selector
    /// takes it out of rotation until someone clears it again.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    /// Atomically move to `target`.
    ///
    /// Fails with the current state when the transition is not allowed
    /// (e.g. claiming a worker that is already busy).
    pub(crate) fn transition_to(&self, target: WorkerState) -> Result<(), WorkerState> {
        let current = self.state();
        if !current.can_transition_to(target) {
            return Err(current);
        }
        self.busy
            .compare_exchange(
                current.is_busy(),
                target.is_busy(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(WorkerState::from)
    }

    /// FREE → BUSY. Returns `false` if already busy.
    pub(crate) fn try_claim(&self) -> bool {
        self.transition_to(WorkerState::Busy).is_ok()
    }

    /// BUSY → FREE. A worker already freed by `set_busy(false)` stays free.
    pub(crate) fn release(&self) {
        let _ = self.transition_to(WorkerState::Free);
    }
}
