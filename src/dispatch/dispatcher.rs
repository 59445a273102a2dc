//! The dispatcher: tiered worker selection plus hand-off to the pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DispatcherConfig;
use crate::dispatch::notify::{LogNotifier, REJECTION_MESSAGE, RejectionNotifier};
use crate::dispatch::pool::WorkerPool;
use crate::dispatch::selector::TierSelector;
use crate::error::{DispatchError, Result};
use crate::roster::Roster;
use crate::worker::{Tier, WorkerClaim, handle_call, sample_call_duration};

/// A call that was accepted and handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub call_id: Uuid,
    pub tier: Tier,
    pub worker_id: u32,
    pub assigned_at: DateTime<Utc>,
    /// Simulated service time the worker will spend on the call.
    pub duration: Duration,
}

/// Busy/total counts for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLoad {
    pub tier: Tier,
    pub total: usize,
    pub busy: usize,
}

/// Routes calls to the cheapest free worker and runs them on a bounded pool.
pub struct Dispatcher {
    config: DispatcherConfig,
    /// Indexed in escalation order.
    selectors: [TierSelector; 3],
    pool: WorkerPool,
    notifier: Arc<dyn RejectionNotifier>,
}

impl Dispatcher {
    /// Build a dispatcher. Must be called from inside a tokio runtime.
    pub fn new(roster: Roster, config: DispatcherConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.pool_capacity)?;

        let Roster {
            first_line,
            second_line,
            third_line,
        } = roster;
        let selectors = [
            TierSelector::new(Tier::FirstLine, first_line, config.contention),
            TierSelector::new(Tier::SecondLine, second_line, config.contention),
            TierSelector::new(Tier::ThirdLine, third_line, config.contention),
        ];

        info!(
            first_line = selectors[0].len(),
            second_line = selectors[1].len(),
            third_line = selectors[2].len(),
            pool_capacity = config.pool_capacity,
            contention = %config.contention,
            "Dispatcher ready"
        );

        Ok(Self {
            config,
            selectors,
            pool,
            notifier: Arc::new(LogNotifier::new()),
        })
    }

    /// Replace the rejection sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn RejectionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Try to place one incoming call. `true` means a worker took it.
    pub fn dispatch_call(&self) -> bool {
        self.dispatch().is_ok()
    }

    /// Place one incoming call, returning who took it.
    ///
    /// Returns as soon as the call is queued on the pool; completion is not
    /// reported back.
    pub fn dispatch(&self) -> std::result::Result<Assignment, DispatchError> {
        let call_id = Uuid::new_v4();

        let Some(claim) = self.acquire(call_id) else {
            warn!(call_id = %call_id, "Call rejected: no free worker in any tier");
            self.notifier.call_rejected(call_id, REJECTION_MESSAGE);
            return Err(DispatchError::NoFreeWorker);
        };

        let duration =
            sample_call_duration(self.config.min_call_duration, self.config.max_call_duration);
        let assignment = Assignment {
            call_id,
            tier: claim.tier(),
            worker_id: claim.worker_id(),
            assigned_at: Utc::now(),
            duration,
        };

        // On failure the task, and with it the claim, is dropped unexecuted,
        // which frees the worker again.
        if let Err(e) = self.pool.submit(handle_call(call_id, claim, duration)) {
            warn!(call_id = %call_id, error = %e, "Call rejected: pool unavailable");
            self.notifier.call_rejected(call_id, REJECTION_MESSAGE);
            return Err(DispatchError::PoolClosed);
        }

        info!(
            call_id = %call_id,
            tier = %assignment.tier,
            worker_id = assignment.worker_id,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "Call assigned"
        );
        Ok(assignment)
    }

    /// Walk the tiers in order until one hands out a worker.
    fn acquire(&self, call_id: Uuid) -> Option<WorkerClaim> {
        for selector in &self.selectors {
            if let Some(claim) = selector.acquire_free_worker() {
                return Some(claim);
            }
            if let Some(next) = selector.tier().escalate() {
                debug!(call_id = %call_id, from = %selector.tier(), to = %next, "Escalating call");
            }
        }
        None
    }

    pub fn selector(&self, tier: Tier) -> &TierSelector {
        match tier {
            Tier::FirstLine => &self.selectors[0],
            Tier::SecondLine => &self.selectors[1],
            Tier::ThirdLine => &self.selectors[2],
        }
    }

    /// Current load of every tier, in escalation order.
    pub fn load(&self) -> Vec<TierLoad> {
        self.selectors
            .iter()
            .map(|s| TierLoad {
                tier: s.tier(),
                total: s.len(),
                busy: s.busy_count(),
            })
            .collect()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Stop taking calls and wait for every call in service or in queue.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
        info!("Dispatcher shut down");
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("load", &self.load())
            .field("pool", &self.pool)
            .field("notifier", &self.notifier.name())
            .finish()
    }
}
