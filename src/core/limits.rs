/*!
 * Dispatcher Limits and Constants
 *
 * Centralized location for dispatcher-wide defaults and thresholds.
 */

use std::time::Duration;

// =============================================================================
// WORKER THREAD
// =============================================================================

/// Default name given to the worker thread
/// Matches the name render tooling expects to find in thread dumps
pub const DEFAULT_WORKER_THREAD_NAME: &str = "RenderEngine";

/// Default SCHED_FIFO priority for the worker thread
/// Low enough to stay below audio and input threads, high enough to
/// preempt time-shared load
pub const DEFAULT_REALTIME_PRIORITY: i32 = 2;

/// Lowest SCHED_FIFO priority accepted by the kernel [LINUX-COMPAT]
pub const MIN_REALTIME_PRIORITY: i32 = 1;

/// Highest SCHED_FIFO priority accepted by the kernel [LINUX-COMPAT]
pub const MAX_REALTIME_PRIORITY: i32 = 99;

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Operations running longer than this are logged as slow
/// [PERF] Roughly one frame at 90Hz
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(10);

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides the worker thread name
pub const ENV_THREAD_NAME: &str = "RENDER_DISPATCH_THREAD_NAME";

/// SCHED_FIFO priority, or `0`/`normal` to keep the default scheduling class
pub const ENV_RT_PRIORITY: &str = "RENDER_DISPATCH_RT_PRIORITY";

/// Shutdown policy: `abandon` or `drain`
pub const ENV_SHUTDOWN_POLICY: &str = "RENDER_DISPATCH_SHUTDOWN";

/// Enables JSON log output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "RENDER_DISPATCH_TRACE_JSON";
