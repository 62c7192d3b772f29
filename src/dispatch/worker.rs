/*!
 * Worker Thread
 *
 * Owns the render engine and runs every operation.
 *
 * # Lifecycle
 *
 * `Starting → Running → Draining → Stopped`
 *
 * - **Starting**: apply the latency class, build the engine through the
 *   factory, publish its capabilities through the init barrier
 * - **Running**: pop and execute operations in FIFO order under the queue lock
 * - **Draining**: resolve whatever is still queued per `ShutdownPolicy`
 * - **Stopped**: the engine has been dropped on this thread
 */

use super::config::{DispatcherConfig, LatencyClass, ShutdownPolicy};
use super::queue::{Queued, TaskQueue};
use super::scheduling::apply_latency_class;
use crate::core::errors::DispatchResult;
use crate::core::sync::InitBarrier;
use crate::engine::{EngineCapabilities, RenderEngine};
use crate::monitoring::OperationSpan;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

/// Engine factory, invoked exactly once on the worker thread
pub type Factory<E> = Box<dyn FnOnce() -> anyhow::Result<E> + Send + 'static>;

/// Worker lifecycle state
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Building the engine
    Starting = 0,
    /// Serving operations
    Running = 1,
    /// Resolving operations still queued at shutdown
    Draining = 2,
    /// Engine destroyed, thread exiting or gone
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// State shared between the dispatcher handle and its worker
pub(crate) struct Shared<E> {
    pub queue: TaskQueue<E>,
    pub init: InitBarrier<EngineCapabilities>,
    state: AtomicU8,
    worker_id: OnceLock<ThreadId>,
    close_requested: AtomicBool,
}

impl<E> Shared<E> {
    pub fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
            init: InitBarrier::new(),
            state: AtomicU8::new(WorkerState::Starting as u8),
            worker_id: OnceLock::new(),
            close_requested: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Ask the worker to stop once the running operation returns
    ///
    /// For use on the worker thread, where the queue lock is already held.
    pub fn request_close(&self) {
        self.close_requested.store(true, Ordering::Release);
    }

    fn take_close_request(&self) -> bool {
        self.close_requested.swap(false, Ordering::AcqRel)
    }

    /// Whether the calling thread is this dispatcher's worker
    #[inline]
    pub fn is_worker_thread(&self) -> bool {
        self.worker_id
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }
}

/// Spawn the named worker thread
pub(crate) fn spawn<E>(
    shared: Arc<Shared<E>>,
    factory: Factory<E>,
    config: &DispatcherConfig,
) -> DispatchResult<JoinHandle<()>>
where
    E: RenderEngine + 'static,
{
    let latency = config.latency_class;
    let policy = config.shutdown_policy;

    let handle = thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || run(&shared, factory, latency, policy))?;

    Ok(handle)
}

fn run<E: RenderEngine>(
    shared: &Shared<E>,
    factory: Factory<E>,
    latency: LatencyClass,
    policy: ShutdownPolicy,
) {
    let _ = shared.worker_id.set(thread::current().id());
    debug!(?latency, ?policy, "Render worker starting");

    if let Err(e) = apply_latency_class(latency) {
        warn!(error = %e, ?latency, "Couldn't apply latency class, keeping default scheduling");
    }

    let mut engine = match construct(factory) {
        Ok(engine) => engine,
        Err(reason) => {
            error!(reason = %reason, "Render engine construction failed");
            // Closed before waiters wake, so nothing is accepted after they see the failure
            shared.queue.close();
            shared.init.signal(Err(reason));
            let pending = shared.queue.take_pending(&mut shared.queue.lock());
            report_abandoned(&pending);
            drop(pending);
            shared.set_state(WorkerState::Stopped);
            return;
        }
    };

    let capabilities = engine.capabilities();
    shared.init.signal(Ok(capabilities));
    shared.set_state(WorkerState::Running);
    info!(?capabilities, "Render engine initialized");

    let mut state = shared.queue.lock();
    loop {
        if !state.is_running() {
            break;
        }
        if let Some(queued) = shared.queue.pop(&mut state) {
            // Lock stays held: producers wait until this operation returns
            execute(queued, &mut engine);
            if shared.take_close_request() {
                debug!("Close requested from inside an operation");
                shared.queue.stop(&mut state);
            }
            continue;
        }
        shared.queue.wait(&mut state);
    }

    if !state.is_empty() {
        shared.set_state(WorkerState::Draining);
    }
    let abandoned = match policy {
        ShutdownPolicy::Drain => {
            let mut drained = 0usize;
            while let Some(queued) = shared.queue.pop(&mut state) {
                execute(queued, &mut engine);
                drained += 1;
            }
            if drained > 0 {
                info!(drained, "Drained pending operations before shutdown");
            }
            VecDeque::new()
        }
        ShutdownPolicy::Abandon => shared.queue.take_pending(&mut state),
    };
    drop(state);

    // Dropping a blocking operation disconnects its sender; the caller sees Terminated
    report_abandoned(&abandoned);
    drop(abandoned);

    // The engine must be released on the thread that created it
    drop(engine);
    shared.set_state(WorkerState::Stopped);
    info!("Render worker stopped");
}

/// Run the factory, folding errors and panics into a failure reason
fn construct<E>(factory: Factory<E>) -> Result<E, String> {
    match panic::catch_unwind(AssertUnwindSafe(factory)) {
        Ok(Ok(engine)) => Ok(engine),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("factory panicked: {}", panic_message(&*payload))),
    }
}

fn execute<E: RenderEngine>(queued: Queued<E>, engine: &mut E) {
    let span = OperationSpan::new(queued.op.name(), queued.seq, queued.op.is_blocking());
    let _entered = span.enter();
    queued.op.execute(engine);
}

fn report_abandoned<E>(abandoned: &VecDeque<Queued<E>>) {
    if abandoned.is_empty() {
        return;
    }
    let blocking = abandoned.iter().filter(|q| q.op.is_blocking()).count();
    warn!(
        blocking,
        fire_and_forget = abandoned.len() - blocking,
        "Abandoning operations queued at shutdown"
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
