//! Shared I/O worker pool.
//!
//! Every network call issued by the executor runs as one job on this pool.
//! Jobs are executed FIFO by a fixed set of named worker threads. Callers
//! never block on the pool itself; they block on the `Deferred` a job
//! resolves.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::error;

use quiver_core::{Error, Result};

type Job = Box<dyn FnOnce() + Send>;

/// Pool metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs waiting in the queue.
    pub queue_depth: usize,
    /// Jobs currently executing.
    pub active_jobs: usize,
    /// Jobs finished since the pool was created.
    pub jobs_completed: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

struct PoolInner {
    queue: Mutex<VecDeque<Job>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    active_jobs: AtomicUsize,
    jobs_completed: AtomicU64,
}

/// Fixed-size FIFO thread pool for blocking I/O.
pub struct IoPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl IoPool {
    /// Create a pool with `num_threads` workers named `quiver-io-0`, `quiver-io-1`, ...
    ///
    /// # Errors
    ///
    /// `InvalidInput` for zero threads, `Internal` if the OS refuses to spawn.
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::invalid_input("I/O pool needs at least one thread"));
        }
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            active_jobs: AtomicUsize::new(0),
            jobs_completed: AtomicU64::new(0),
        });

        let pool = Self {
            inner,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            num_threads,
        };
        for i in 0..num_threads {
            let inner = Arc::clone(&pool.inner);
            let handle = std::thread::Builder::new()
                .name(format!("quiver-io-{}", i))
                .spawn(move || worker_loop(&inner))
                .map_err(|e| Error::internal(format!("failed to spawn I/O worker: {}", e)))?;
            pool.workers.lock().push(handle);
        }
        Ok(pool)
    }

    /// Queue a job.
    ///
    /// # Errors
    ///
    /// `Internal` once the pool has been shut down.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::internal("I/O pool is shut down"));
        }
        self.inner.queue.lock().push_back(Box::new(job));
        self.inner.work_ready.notify_one();
        Ok(())
    }

    /// Block until the queue is empty and no job is running.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while !queue.is_empty() || self.inner.active_jobs.load(Ordering::Acquire) > 0 {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Signal workers to exit once the queue is empty and join them.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);

        // Holding the lock while notifying avoids a lost wake-up for a
        // worker between its shutdown check and its wait.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let current = std::thread::current().id();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            // A job holding the last reference may drop the pool on a worker.
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue.lock().len(),
            active_jobs: self.inner.active_jobs.load(Ordering::Relaxed),
            jobs_completed: self.inner.jobs_completed.load(Ordering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for IoPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements `active_jobs` and wakes drain waiters even if a job panics.
struct ActiveJobGuard<'a> {
    inner: &'a PoolInner,
}

impl<'a> Drop for ActiveJobGuard<'a> {
    fn drop(&mut self) {
        self.inner.jobs_completed.fetch_add(1, Ordering::Relaxed);
        let prev_active = self.inner.active_jobs.fetch_sub(1, Ordering::Release);

        if prev_active == 1 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    inner.active_jobs.fetch_add(1, Ordering::Release);
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveJobGuard { inner };

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
            error!(
                target: "quiver::pool",
                "I/O job panicked: {}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}
