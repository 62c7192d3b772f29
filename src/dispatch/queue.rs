/*!
 * Task Queue
 *
 * FIFO of pending operations shared by every producer and the one worker.
 *
 * # Design: One Lock For Ordering And Execution
 *
 * A single `parking_lot::Mutex` guards the pending operations and the
 * `running` flag; one `Condvar` signals "work available or shutdown".
 * The order in which producers acquire the lock is the execution order.
 * The worker also executes operations while holding this lock, so a push
 * never overlaps a running operation: submission latency is bounded by the
 * operation currently executing.
 *
 * Counters are mirrored into atomics on every change made under the lock.
 * Diagnostic reads (`len`, `is_running`, `stats`) only load those atomics and
 * never wait for the lock, so they are safe to call from inside an operation.
 */

use super::operation::Operation;
use crate::core::errors::{DispatchError, DispatchResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Operation tagged with its submission sequence number
pub(crate) struct Queued<E> {
    pub seq: u64,
    pub op: Operation<E>,
}

/// Queue counters (for diagnostics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Operations accepted by the queue
    pub submitted: u64,
    /// Operations the worker has run
    pub executed: u64,
    /// Operations dropped by the Abandon shutdown policy or a failed startup
    pub abandoned: u64,
}

/// State guarded by the queue lock
pub(crate) struct QueueState<E> {
    pending: VecDeque<Queued<E>>,
    running: bool,
}

impl<E> QueueState<E> {
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Lock-free mirror of the guarded state
struct Counters {
    running: AtomicBool,
    pending: AtomicUsize,
    submitted: AtomicU64,
    executed: AtomicU64,
    abandoned: AtomicU64,
}

/// Shared FIFO of pending operations
pub(crate) struct TaskQueue<E> {
    state: Mutex<QueueState<E>>,
    available: Condvar,
    counters: Counters,
}

pub(crate) type QueueGuard<'a, E> = MutexGuard<'a, QueueState<E>>;

impl<E> TaskQueue<E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                running: true,
            }),
            available: Condvar::new(),
            counters: Counters {
                running: AtomicBool::new(true),
                pending: AtomicUsize::new(0),
                submitted: AtomicU64::new(0),
                executed: AtomicU64::new(0),
                abandoned: AtomicU64::new(0),
            },
        }
    }

    /// Append an operation and wake the worker
    ///
    /// Blocks while the worker is executing. Returns the operation's sequence
    /// number, or `Terminated` once the queue is closed.
    pub fn push(&self, op: Operation<E>) -> DispatchResult<u64> {
        let seq = {
            let mut state = self.state.lock();
            if !state.running {
                return Err(DispatchError::Terminated);
            }
            // Sequence assignment is serialized by the lock
            let seq = self.counters.submitted.fetch_add(1, Ordering::Relaxed);
            state.pending.push_back(Queued { seq, op });
            self.counters
                .pending
                .store(state.pending.len(), Ordering::Release);
            seq
        };
        self.available.notify_one();
        Ok(seq)
    }

    /// Stop accepting operations and wake the worker
    ///
    /// Takes the lock: never call it from inside an operation, use `stop`
    /// with the worker's guard instead. Returns `false` if the queue was
    /// already closed.
    pub fn close(&self) -> bool {
        let was_running = {
            let mut state = self.state.lock();
            self.stop(&mut state)
        };
        self.available.notify_all();
        was_running
    }

    /// Stop accepting operations through an already held guard
    pub fn stop(&self, state: &mut QueueGuard<'_, E>) -> bool {
        self.counters.running.store(false, Ordering::Release);
        std::mem::replace(&mut state.running, false)
    }

    /// Take the queue lock (worker side)
    #[inline]
    pub fn lock(&self) -> QueueGuard<'_, E> {
        self.state.lock()
    }

    /// Sleep until an operation is pushed or the queue is closed
    #[inline]
    pub fn wait(&self, state: &mut QueueGuard<'_, E>) {
        self.available.wait(state);
    }

    /// Pop the front operation and count it as executed
    pub fn pop(&self, state: &mut QueueGuard<'_, E>) -> Option<Queued<E>> {
        let next = state.pending.pop_front();
        if next.is_some() {
            self.counters.executed.fetch_add(1, Ordering::Release);
            self.counters
                .pending
                .store(state.pending.len(), Ordering::Release);
        }
        next
    }

    /// Remove every pending operation and count it as abandoned
    pub fn take_pending(&self, state: &mut QueueGuard<'_, E>) -> VecDeque<Queued<E>> {
        let pending = std::mem::take(&mut state.pending);
        self.counters
            .abandoned
            .fetch_add(pending.len() as u64, Ordering::Release);
        self.counters.pending.store(0, Ordering::Release);
        pending
    }

    /// Operations queued but not yet started
    pub fn len(&self) -> usize {
        self.counters.pending.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.counters.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.counters.submitted.load(Ordering::Acquire),
            executed: self.counters.executed.load(Ordering::Acquire),
            abandoned: self.counters.abandoned.load(Ordering::Acquire),
        }
    }
}
