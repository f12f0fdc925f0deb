//! Bounded-concurrency batch ingestion.
//!
//! [`ingest`] splits a record vector into contiguous batches of at most
//! `batch_size` and drives exactly `parallelism` worker threads over them.
//! Workers share one atomic claim cursor over the immutable partition list,
//! so every batch is claimed by exactly one worker and claims happen in
//! partition order. Completion order across workers is unspecified.
//!
//! Failure semantics: the first failed submission is the error the
//! returned deferred reports. After a failure no new batches are claimed,
//! batches already in flight are allowed to finish, and nothing is retried
//! or rolled back. Batches submitted before the failure stay ingested.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use quiver_core::{Error, Result};
use tracing::{debug, warn};

use crate::deferred::{Deferred, Resolvable, Resolver};

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Batches submitted and acknowledged
    pub batches: usize,
    /// Records in those batches
    pub records: usize,
}

/// Split `len` items into `ceil(len / batch_size)` contiguous ranges.
///
/// Every range holds `batch_size` items except possibly the last. Returns
/// no ranges when `len` or `batch_size` is 0.
pub fn partition(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    if batch_size == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

struct IngestState<R, F> {
    records: Vec<R>,
    batches: Vec<Range<usize>>,
    cursor: AtomicUsize,
    aborted: AtomicBool,
    first_error: Mutex<Option<Error>>,
    acked_batches: AtomicUsize,
    acked_records: AtomicUsize,
    live_workers: AtomicUsize,
    resolver: Mutex<Option<Resolver<IngestReport>>>,
    submit: F,
}

impl<R, F> IngestState<R, F> {
    /// Take-and-advance on the shared cursor.
    fn claim(&self) -> Option<(usize, Range<usize>)> {
        if self.aborted.load(Ordering::Acquire) {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        self.batches.get(index).map(|range| (index, range.clone()))
    }

    fn record_failure(&self, error: Error) {
        self.aborted.store(true, Ordering::Release);
        let mut first = self.first_error.lock();
        if first.is_none() {
            *first = Some(error);
        }
    }

    fn worker_exited(&self) {
        if self.live_workers.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let outcome = match self.first_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(IngestReport {
                batches: self.acked_batches.load(Ordering::Acquire),
                records: self.acked_records.load(Ordering::Acquire),
            }),
        };
        if let Some(resolver) = self.resolver.lock().take() {
            resolver.resolve(outcome);
        }
    }
}

/// Marks a worker as exited on drop, including when `submit` panics.
struct WorkerGuard<'a, R, F> {
    state: &'a IngestState<R, F>,
}

impl<'a, R, F> Drop for WorkerGuard<'a, R, F> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.state
                .record_failure(Error::internal("ingest worker panicked during submit"));
        }
        self.state.worker_exited();
    }
}

fn run_worker<R, A, F>(state: &IngestState<R, F>, worker: usize)
where
    A: Resolvable,
    F: Fn(&[R]) -> Deferred<A>,
{
    let _guard = WorkerGuard { state };
    while let Some((index, range)) = state.claim() {
        let len = range.len();
        match (state.submit)(&state.records[range]).wait() {
            Ok(_) => {
                state.acked_batches.fetch_add(1, Ordering::AcqRel);
                state.acked_records.fetch_add(len, Ordering::AcqRel);
                debug!(target: "quiver::ingest", worker, batch = index, len, "Batch acknowledged");
            }
            Err(e) => {
                warn!(
                    target: "quiver::ingest",
                    worker,
                    batch = index,
                    error = %e,
                    "Batch failed, worker stopping"
                );
                state.record_failure(e);
                return;
            }
        }
    }
}

/// Submit `records` in batches through `parallelism` concurrent workers.
///
/// `submit` is called once per batch with that batch's records; each
/// worker waits for its submission to resolve before claiming the next
/// batch. The returned deferred resolves after every worker has exited.
///
/// # Errors
///
/// - `InvalidInput` if `batch_size` or `parallelism` is 0 (no batch is submitted)
/// - the first error returned by `submit`; other batches may or may not
///   have been ingested
/// - `Internal` if a worker thread cannot be spawned or `submit` panics
pub fn ingest<R, A, F>(
    records: Vec<R>,
    batch_size: usize,
    parallelism: usize,
    submit: F,
) -> Deferred<IngestReport>
where
    R: Send + Sync + 'static,
    A: Resolvable,
    F: Fn(&[R]) -> Deferred<A> + Send + Sync + 'static,
{
    if batch_size == 0 {
        return Deferred::failed(Error::invalid_input("batch_size must be at least 1"));
    }
    if parallelism == 0 {
        return Deferred::failed(Error::invalid_input("parallelism must be at least 1"));
    }
    if records.is_empty() {
        return Deferred::ok(IngestReport::default());
    }

    let batches = partition(records.len(), batch_size);
    debug!(
        target: "quiver::ingest",
        records = records.len(),
        batches = batches.len(),
        batch_size,
        parallelism,
        "Starting ingestion"
    );

    let (deferred, resolver) = Deferred::pending();
    let state = Arc::new(IngestState {
        records,
        batches,
        cursor: AtomicUsize::new(0),
        aborted: AtomicBool::new(false),
        first_error: Mutex::new(None),
        acked_batches: AtomicUsize::new(0),
        acked_records: AtomicUsize::new(0),
        live_workers: AtomicUsize::new(parallelism),
        resolver: Mutex::new(Some(resolver)),
        submit,
    });

    for worker in 0..parallelism {
        let shared = Arc::clone(&state);
        let spawned = std::thread::Builder::new()
            .name(format!("quiver-ingest-{}", worker))
            .spawn(move || run_worker(&shared, worker));
        if let Err(e) = spawned {
            state.record_failure(Error::internal(format!(
                "failed to spawn ingest worker: {}",
                e
            )));
            state.worker_exited();
        }
    }

    deferred
}
