/*!
 * Initialization Barrier
 *
 * One-time gate that parks any number of threads until a setup step
 * completes, then releases them all and never blocks again.
 *
 * The barrier carries the setup outcome: either the value produced by setup
 * (immutable from then on) or the reason setup failed. It uses its own
 * lock/condvar pair, independent of the task queue, so waiters never contend
 * with operation submission.
 *
 * # Performance
 *
 * - Post-signal `wait()` is a single atomic load (OnceLock fast path)
 * - The lock is only taken by threads arriving before the signal
 */

use crate::core::errors::{DispatchError, DispatchResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use tracing::debug;

/// One-shot barrier publishing a setup outcome
pub struct InitBarrier<T> {
    outcome: OnceLock<Result<T, String>>,
    lock: Mutex<()>,
    released: Condvar,
    waiters: AtomicUsize,
}

impl<T> InitBarrier<T> {
    /// Create an unsignaled barrier
    pub fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
            lock: Mutex::new(()),
            released: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Publish the setup outcome and release every waiter
    ///
    /// # Panics
    ///
    /// Signaling twice is a programming error and panics.
    pub fn signal(&self, outcome: Result<T, String>) {
        let _guard = self.lock.lock();
        if self.outcome.set(outcome).is_err() {
            panic!("InitBarrier signaled twice");
        }
        debug!(waiters = self.waiter_count(), "Init barrier released");
        self.released.notify_all();
    }

    /// Block until the barrier is signaled, then return the outcome
    pub fn wait(&self) -> DispatchResult<&T> {
        if let Some(outcome) = self.outcome.get() {
            return Self::resolve(outcome);
        }

        let mut guard = self.lock.lock();
        self.waiters.fetch_add(1, Ordering::Relaxed);
        let outcome = loop {
            if let Some(outcome) = self.outcome.get() {
                break outcome;
            }
            self.released.wait(&mut guard);
        };
        self.waiters.fetch_sub(1, Ordering::Relaxed);

        Self::resolve(outcome)
    }

    /// Whether the outcome has been published
    #[inline]
    pub fn is_signaled(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Approximate number of parked waiters (for diagnostics)
    #[inline]
    pub fn waiter_count(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    fn resolve(outcome: &Result<T, String>) -> DispatchResult<&T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(reason) => Err(DispatchError::InitFailed(reason.clone())),
        }
    }
}

impl<T> Default for InitBarrier<T> {
    fn default() -> Self {
        Self::new()
    }
}
