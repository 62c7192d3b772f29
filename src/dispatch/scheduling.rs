/*!
 * Worker Latency Class
 *
 * Maps `LatencyClass` onto the host scheduler:
 * - Linux: `sched_setscheduler(SCHED_FIFO)` on the calling thread
 * - Elsewhere: no-op
 */

use super::config::LatencyClass;
use crate::core::errors::SchedulingError;
use tracing::debug;

/// Apply `class` to the calling thread
pub fn apply_latency_class(class: LatencyClass) -> Result<(), SchedulingError> {
    match class {
        LatencyClass::Normal => {
            debug!("Keeping default scheduling class");
            Ok(())
        }
        LatencyClass::Realtime { priority } => set_fifo_priority(priority),
    }
}

#[cfg(target_os = "linux")]
fn set_fifo_priority(priority: i32) -> Result<(), SchedulingError> {
    use crate::core::limits::{MAX_REALTIME_PRIORITY, MIN_REALTIME_PRIORITY};
    use nix::errno::Errno;

    if !(MIN_REALTIME_PRIORITY..=MAX_REALTIME_PRIORITY).contains(&priority) {
        return Err(SchedulingError::InvalidPriority {
            priority,
            min: MIN_REALTIME_PRIORITY,
            max: MAX_REALTIME_PRIORITY,
        });
    }

    // SAFETY: sched_param is plain data; zeroing covers libc-specific padding fields
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = priority;

    // SAFETY: pid 0 targets the calling thread and `param` outlives the call
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(SchedulingError::Denied(Errno::last()));
    }

    debug!(priority, "Worker running under SCHED_FIFO");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_fifo_priority(priority: i32) -> Result<(), SchedulingError> {
    debug!(priority, "Real-time scheduling unavailable on this platform, ignoring");
    Ok(())
}
