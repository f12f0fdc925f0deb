//! Deferred results.
//!
//! A [`Deferred<T>`] is a handle to a value that becomes available later,
//! typically when a network call running on the [`IoPool`] completes.
//! It is pending until its producer resolves it, then holds either a value
//! or an [`Error`] forever. Every consumer (and every clone of the handle)
//! observes the same outcome; the producer runs exactly once.
//!
//! Transformations are chained with [`Deferred::map`] and
//! [`Deferred::and_then`]. The transform runs lazily, on the first wait
//! that finds the source resolved, and its outcome is memoised in the
//! derived deferred. A failed source propagates its error unchanged and
//! the transform is never invoked.
//!
//! ```text
//! let raw: Deferred<serde_json::Value> = executor.execute(...);
//! let names: Deferred<Vec<String>> = raw.and_then(parse_names);
//! match names.wait_timeout(Duration::from_secs(1)) {
//!     Some(Ok(v)) => ...,
//!     Some(Err(e)) => ...,
//!     None => { /* still running; the call is not cancelled */ }
//! }
//! ```

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use quiver_core::{Error, Result};

use crate::pool::IoPool;

/// Bound shared by every value carried through a deferred.
pub trait Resolvable: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Resolvable for T {}

trait Source<T>: Send + Sync {
    /// Wait until resolved or until `deadline` passes (`None` = forever).
    fn wait_until(&self, deadline: Option<Instant>) -> Option<Result<T>>;

    fn is_resolved(&self) -> bool;
}

/// Write-once cell filled by a [`Resolver`].
struct Slot<T> {
    state: Mutex<Option<Result<T>>>,
    ready: Condvar,
}

impl<T: Resolvable> Slot<T> {
    fn fill(&self, result: Result<T>) -> bool {
        let mut state = self.state.lock();
        if state.is_some() {
            return false;
        }
        *state = Some(result);
        self.ready.notify_all();
        true
    }
}

impl<T: Resolvable> Source<T> for Slot<T> {
    fn wait_until(&self, deadline: Option<Instant>) -> Option<Result<T>> {
        let mut state = self.state.lock();
        loop {
            if let Some(result) = state.as_ref() {
                return Some(result.clone());
            }
            match deadline {
                None => self.ready.wait(&mut state),
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        return state.as_ref().cloned();
                    }
                }
            }
        }
    }

    fn is_resolved(&self) -> bool {
        self.state.lock().is_some()
    }
}

/// Source derived from another deferred through a fallible transform.
struct Mapped<S, T, F> {
    parent: Deferred<S>,
    transform: F,
    memo: OnceLock<Result<T>>,
}

impl<S, T, F> Source<T> for Mapped<S, T, F>
where
    S: Resolvable,
    T: Resolvable,
    F: Fn(S) -> Result<T> + Send + Sync,
{
    fn wait_until(&self, deadline: Option<Instant>) -> Option<Result<T>> {
        if let Some(result) = self.memo.get() {
            return Some(result.clone());
        }
        let parent = self.parent.source.wait_until(deadline)?;
        let result = self
            .memo
            .get_or_init(|| parent.and_then(|value| (self.transform)(value)));
        Some(result.clone())
    }

    fn is_resolved(&self) -> bool {
        self.memo.get().is_some() || self.parent.is_resolved()
    }
}

/// Handle to an eventually-available `Result<T>`.
pub struct Deferred<T> {
    source: Arc<dyn Source<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: Resolvable> Deferred<T> {
    /// Create an unresolved deferred and the resolver that completes it.
    pub fn pending() -> (Deferred<T>, Resolver<T>) {
        let slot = Arc::new(Slot {
            state: Mutex::new(None),
            ready: Condvar::new(),
        });
        let deferred = Deferred {
            source: slot.clone(),
        };
        (deferred, Resolver { slot: Some(slot) })
    }

    /// Create an already-resolved deferred.
    pub fn resolved(result: Result<T>) -> Self {
        let (deferred, resolver) = Self::pending();
        resolver.resolve(result);
        deferred
    }

    /// Create a deferred that resolved with a value.
    pub fn ok(value: T) -> Self {
        Self::resolved(Ok(value))
    }

    /// Create a deferred that resolved with an error.
    pub fn failed(error: Error) -> Self {
        Self::resolved(Err(error))
    }

    /// Run `producer` on the pool; the returned deferred resolves with its result.
    ///
    /// If the producer panics the deferred resolves with `Error::Internal`.
    pub fn spawn<F>(pool: &IoPool, producer: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (deferred, resolver) = Self::pending();
        match pool.execute(move || resolver.resolve(producer())) {
            Ok(()) => deferred,
            Err(e) => Self::failed(e),
        }
    }

    /// Block until resolved.
    pub fn wait(&self) -> Result<T> {
        self.source
            .wait_until(None)
            .unwrap_or_else(|| Err(Error::internal("deferred woke without a result")))
    }

    /// Block for at most `timeout`.
    ///
    /// Returns `None` if still pending when the timeout elapses. The
    /// underlying work is not cancelled; a later wait can still observe it.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.source.wait_until(Some(deadline)),
            None => Some(self.wait()),
        }
    }

    /// Non-blocking poll.
    ///
    /// For derived deferreds this reports whether the source is resolved;
    /// the transform itself may still be pending its first run.
    pub fn is_resolved(&self) -> bool {
        self.source.is_resolved()
    }

    /// Derive a deferred that applies `f` to the resolved value.
    pub fn map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Resolvable,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.and_then(move |value| Ok(f(value)))
    }

    /// Derive a deferred that applies the fallible `f` to the resolved value.
    pub fn and_then<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Resolvable,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        Deferred {
            source: Arc::new(Mapped {
                parent: self.clone(),
                transform: f,
                memo: OnceLock::new(),
            }),
        }
    }
}

impl<T: Resolvable> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Completes a pending [`Deferred`].
///
/// Dropping a resolver without calling [`Resolver::resolve`] (including by
/// unwinding out of a panicking producer) resolves the deferred with
/// `Error::Internal` so waiters never hang.
pub struct Resolver<T: Resolvable> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T: Resolvable> Resolver<T> {
    /// Resolve with a result. The first resolution wins.
    pub fn resolve(mut self, result: Result<T>) {
        if let Some(slot) = self.slot.take() {
            slot.fill(result);
        }
    }
}

impl<T: Resolvable> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(Error::internal("producer dropped without resolving")));
        }
    }
}
