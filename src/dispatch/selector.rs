//! Per-tier worker selection.
//!
//! Each tier owns its roster and a single-permit gate. Scan-and-claim runs
//! while the gate is held, so two callers on the same tier can never walk
//! away with the same worker.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::debug;

use crate::config::ContentionPolicy;
use crate::worker::{Tier, Worker, WorkerClaim};

/// Picks free workers out of one tier.
#[derive(Debug)]
pub struct TierSelector {
    tier: Tier,
    workers: Option<Vec<Arc<Worker>>>,
    gate: Mutex<()>,
    contention: ContentionPolicy,
}

impl TierSelector {
    /// Create a selector. `workers` may be absent or empty.
    pub fn new(tier: Tier, workers: Option<Vec<Arc<Worker>>>, contention: ContentionPolicy) -> Self {
        Self {
            tier,
            workers,
            gate: Mutex::new(()),
            contention,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Workers in roster order (empty when the roster is absent).
    pub fn workers(&self) -> &[Arc<Worker>] {
        self.workers.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.workers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers().is_empty()
    }

    /// Number of workers currently busy. A racy snapshot.
    pub fn busy_count(&self) -> usize {
        self.workers().iter().filter(|w| w.is_busy()).count()
    }

    pub fn free_count(&self) -> usize {
        self.len() - self.busy_count()
    }

    /// Claim the first free worker in roster order.
    ///
    /// Returns `None` when the tier has no free worker, when its roster is
    /// absent, or (under [`ContentionPolicy::Yield`]) when another caller is
    /// scanning this tier right now.
    pub fn acquire_free_worker(&self) -> Option<WorkerClaim> {
        let Some(_gate) = self.enter_gate() else {
            debug!(tier = %self.tier, "Tier gate contended, yielding");
            return None;
        };

        let claimed = self
            .workers()
            .iter()
            .find(|worker| !worker.is_busy() && worker.try_claim());

        match claimed {
            Some(worker) => Some(WorkerClaim::new(Arc::clone(worker), self.tier)),
            None => {
                debug!(tier = %self.tier, workers = self.len(), "No free worker in tier");
                None
            }
        }
    }

    fn enter_gate(&self) -> Option<MutexGuard<'_, ()>> {
        match self.contention {
            ContentionPolicy::Yield => match self.gate.try_lock() {
                Ok(guard) => Some(guard),
                Err(TryLockError::WouldBlock) => None,
                // Nothing inside the gate can be left half-updated.
                Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            },
            ContentionPolicy::Wait => {
                Some(self.gate.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }
}
