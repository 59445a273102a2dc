//! Bounded execution pool for call tasks.
//!
//! Every submission becomes a tokio task, but at most `capacity` of them run
//! their body at once; the rest wait on the pool's semaphore. Nothing
//! submitted is ever dropped for lack of capacity, and dropping the pool
//! does not cancel calls already submitted.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::error::PoolError;

/// Decrements the running counter even if the task body panics.
struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Fixed-capacity pool that runs submitted futures.
pub struct WorkerPool {
    capacity: usize,
    handle: Handle,
    permits: Arc<Semaphore>,
    /// `None` once the pool has been shut down.
    tasks: Mutex<Option<JoinSet<()>>>,
    submitted: AtomicUsize,
    running: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Create a pool bound to the current tokio runtime.
    pub fn new(capacity: usize) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity { capacity });
        }
        let handle = Handle::try_current().map_err(|_| PoolError::NoRuntime)?;

        Ok(Self {
            capacity,
            handle,
            permits: Arc::new(Semaphore::new(capacity)),
            tasks: Mutex::new(Some(JoinSet::new())),
            submitted: AtomicUsize::new(0),
            running: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Queue a task. Never waits: if every slot is busy the task is parked
    /// until one frees up.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(set) = tasks.as_mut() else {
            return Err(PoolError::Closed);
        };

        while let Some(result) = set.try_join_next() {
            log_join_result(result);
        }

        let permits = Arc::clone(&self.permits);
        let running = Arc::clone(&self.running);
        let completed = Arc::clone(&self.completed);

        set.spawn_on(
            async move {
                // The semaphore is never closed, so acquisition only fails if
                // the pool itself is gone.
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                running.fetch_add(1, Ordering::AcqRel);
                let _running = RunningGuard(running);

                task.await;
                completed.fetch_add(1, Ordering::AcqRel);
            },
            &self.handle,
        );

        let submitted = self.submitted.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(submitted, queued = set.len(), "Task submitted to pool");
        Ok(())
    }

    /// Stop accepting work and wait for every submitted task, queued ones
    /// included. Idempotent.
    pub async fn shutdown(&self) {
        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut set) = tasks else {
            return;
        };

        info!(pending = set.len(), "Draining worker pool");
        while let Some(result) = set.join_next().await {
            log_join_result(result);
        }
        info!(completed = self.completed_count(), "Worker pool drained");
    }

    pub fn is_closed(&self) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total tasks accepted since creation.
    pub fn submitted_count(&self) -> usize {
        self.submitted.load(Ordering::Acquire)
    }

    /// Tasks whose body is executing right now.
    pub fn running_count(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Tasks whose body ran to completion.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let tasks = self
            .tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut set) = tasks {
            if !set.is_empty() {
                debug!(pending = set.len(), "Pool dropped, detaching submitted tasks");
            }
            set.detach_all();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .field("submitted", &self.submitted_count())
            .field("running", &self.running_count())
            .field("completed", &self.completed_count())
            .finish()
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_panic() => error!("Pool task panicked: {}", e),
        Err(e) => debug!("Pool task cancelled: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn requires_runtime() {
        assert!(matches!(WorkerPool::new(2), Err(PoolError::NoRuntime)));
    }

    #[tokio::test]
    async fn zero_capacity_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(PoolError::ZeroCapacity { capacity: 0 })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn excess_tasks_queue_and_all_complete() {
        let pool = WorkerPool::new(3).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..12 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let ran = Arc::clone(&ran);
            pool.submit(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        assert_eq!(pool.submitted_count(), 12);
        pool.shutdown().await;

        assert_eq!(ran.load(Ordering::SeqCst), 12);
        assert_eq!(pool.completed_count(), 12);
        assert_eq!(pool.running_count(), 0);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails() {
        let pool = WorkerPool::new(1).unwrap();
        pool.shutdown().await;
        assert!(pool.is_closed());
        assert!(matches!(pool.submit(async {}), Err(PoolError::Closed)));
        assert_eq!(pool.submitted_count(), 0);

        // Second shutdown is a no-op.
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_pool_lets_submitted_tasks_finish() {
        let pool = WorkerPool::new(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let ran = Arc::clone(&ran);
            pool.submit(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        drop(pool);

        tokio::time::timeout(Duration::from_secs(5), async {
            while ran.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("detached tasks never finished");
    }

    #[tokio::test]
    async fn panicking_task_does_not_poison_pool() {
        let pool = WorkerPool::new(1).unwrap();
        pool.submit(async { panic!("call dropped"); }).unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        pool.submit(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        pool.shutdown().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(pool.completed_count(), 1);
        assert_eq!(pool.running_count(), 0);
    }
}
