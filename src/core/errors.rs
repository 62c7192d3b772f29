/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use thiserror::Error;

/// Result type for dispatcher operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for engine-side operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the dispatcher to its callers
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum DispatchError {
    #[error("Dispatcher terminated")]
    #[diagnostic(
        code(dispatch::terminated),
        help("The worker was shut down before this operation could run. Submit work before calling shutdown().")
    )]
    Terminated,

    #[error("Engine initialization failed: {0}")]
    #[diagnostic(
        code(dispatch::init_failed),
        help("The engine factory returned an error or panicked. View logs for details.")
    )]
    InitFailed(String),

    #[error("Operation {op} submitted from the worker thread")]
    #[diagnostic(
        code(dispatch::worker_reentry),
        help("Operations already run on the worker; call the engine directly instead of going through the dispatcher.")
    )]
    WorkerReentry { op: &'static str },

    #[error("Dispatcher already shut down")]
    #[diagnostic(
        code(dispatch::already_shut_down),
        help("shutdown() is one-shot and cannot be restarted. Create a new dispatcher.")
    )]
    AlreadyShutDown,

    #[error("Worker thread panicked")]
    #[diagnostic(
        code(dispatch::worker_panicked),
        help("The worker thread terminated abnormally. Please report this issue.")
    )]
    WorkerPanicked,

    #[error("Operation {op} panicked")]
    #[diagnostic(
        code(dispatch::operation_panicked),
        help("The engine panicked while executing this operation. The worker keeps serving later operations.")
    )]
    OperationPanicked { op: &'static str },

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(dispatch::spawn_failed),
        help("Check system thread limits and available memory.")
    )]
    SpawnFailed(String),
}

impl DispatchError {
    /// Whether the error means the dispatcher no longer accepts work
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DispatchError::Terminated
                | DispatchError::AlreadyShutDown
                | DispatchError::InitFailed(_)
                | DispatchError::WorkerPanicked
        )
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::SpawnFailed(err.to_string())
    }
}

/// Failures reported by an engine for fire-and-forget operations
///
/// These never reach the submitting thread; the worker logs them.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum EngineError {
    #[error("Invalid buffer {0}")]
    #[diagnostic(code(engine::invalid_buffer))]
    InvalidBuffer(u64),

    #[error("Out of memory: {0}")]
    #[diagnostic(
        code(engine::out_of_memory),
        help("The engine could not allocate resources. Consider freeing cached buffers.")
    )]
    OutOfMemory(String),

    #[error("Context lost")]
    #[diagnostic(
        code(engine::context_lost),
        help("The hardware context was reset. The engine must be recreated.")
    )]
    ContextLost,

    #[error("Backend error: {0}")]
    #[diagnostic(code(engine::backend))]
    Backend(String),
}

/// Failures applying a latency class to the worker thread
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SchedulingError {
    #[cfg(target_os = "linux")]
    #[error("sched_setscheduler failed: {0}")]
    #[diagnostic(
        code(scheduling::denied),
        help("Real-time scheduling usually needs CAP_SYS_NICE or an RLIMIT_RTPRIO allowance.")
    )]
    Denied(nix::errno::Errno),

    #[error("Priority {priority} outside the supported range {min}..={max}")]
    #[diagnostic(code(scheduling::invalid_priority))]
    InvalidPriority { priority: i32, min: i32, max: i32 },
}
