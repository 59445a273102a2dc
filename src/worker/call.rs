//! Call handling — the unit of work the pool runs for a claimed worker.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::worker::state::{Tier, Worker};

/// Exclusive hold on a worker for the lifetime of one call.
///
/// Only a tier selector creates claims, and only after flipping the worker
/// to busy. Dropping the claim flips it back, whether the call finished,
/// panicked, or never ran.
#[derive(Debug)]
pub struct WorkerClaim {
    worker: Arc<Worker>,
    tier: Tier,
}

impl WorkerClaim {
    /// Wrap a worker that the caller has already marked busy.
    pub(crate) fn new(worker: Arc<Worker>, tier: Tier) -> Self {
        Self { worker, tier }
    }

    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    pub fn worker_id(&self) -> u32 {
        self.worker.id()
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

impl Drop for WorkerClaim {
    fn drop(&mut self) {
        self.worker.release();
    }
}

/// Pick a service time uniformly from `[min, max]` at millisecond granularity.
pub fn sample_call_duration(min: Duration, max: Duration) -> Duration {
    let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Service one call: hold the worker for `duration`, then free it.
pub async fn handle_call(call_id: Uuid, claim: WorkerClaim, duration: Duration) {
    debug!(
        call_id = %call_id,
        tier = %claim.tier(),
        worker_id = claim.worker_id(),
        duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        "Call started"
    );

    tokio::time::sleep(duration).await;

    debug!(
        call_id = %call_id,
        tier = %claim.tier(),
        worker_id = claim.worker_id(),
        "Call finished"
    );
    drop(claim);
}
