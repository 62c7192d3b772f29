/*!
 * Result Channel
 *
 * One-shot handoff of a single value from the worker to the thread that
 * submitted a blocking operation.
 *
 * # Design: Ownership-Enforced Single Use
 *
 * Both halves are consumed by their only operation: `ResultSender::set`
 * takes `self`, and so does `ResultReceiver::get`. Writing twice or reading
 * twice does not compile. A sender dropped without writing (operation
 * abandoned at shutdown, worker gone) disconnects the channel and the
 * receiver observes `DispatchError::Terminated` instead of parking forever.
 */

use crate::core::errors::{DispatchError, DispatchResult};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

/// Create a connected sender/receiver pair
pub fn result_channel<T>() -> (ResultSender<T>, ResultReceiver<T>) {
    // Capacity one: the single send never blocks the worker
    let (tx, rx) = flume::bounded(1);
    (ResultSender { tx }, ResultReceiver { rx })
}

/// Write half, owned by the queued operation and consumed by the worker
pub struct ResultSender<T> {
    tx: flume::Sender<DispatchResult<T>>,
}

impl<T> ResultSender<T> {
    /// Publish the operation's value
    pub fn set(self, value: T) {
        self.send(Ok(value));
    }

    /// Publish a failure instead of a value
    pub fn fail(self, error: DispatchError) {
        self.send(Err(error));
    }

    /// Run `f` and publish its value
    ///
    /// A panic inside `f` is contained and reported to the waiting caller as
    /// `OperationPanicked`.
    pub fn complete<F>(self, op: &'static str, f: F)
    where
        F: FnOnce() -> T,
    {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => self.set(value),
            Err(_) => {
                error!(op, "blocking operation panicked");
                self.fail(DispatchError::OperationPanicked { op });
            }
        }
    }

    fn send(self, result: DispatchResult<T>) {
        // The receiver only disappears if the caller unwound while waiting
        if self.tx.send(result).is_err() {
            debug!("result receiver dropped before completion");
        }
    }
}

/// Read half, kept on the caller's stack for the duration of the call
pub struct ResultReceiver<T> {
    rx: flume::Receiver<DispatchResult<T>>,
}

impl<T> ResultReceiver<T> {
    /// Block until the worker publishes the result
    pub fn get(self) -> DispatchResult<T> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(DispatchError::Terminated))
    }
}
