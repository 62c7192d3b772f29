/*!
 * Dispatch Module
 *
 * Active-object dispatcher: a FIFO of operations served by one worker
 * thread that owns the render engine.
 */

pub mod config;
mod dispatcher;
mod operation;
mod queue;
mod scheduling;
mod worker;

// Re-export public API
pub use config::{DispatcherConfig, LatencyClass, ShutdownPolicy};
pub use dispatcher::Dispatcher;
pub use operation::{DrawRequest, Operation, Task};
pub use queue::QueueStats;
pub use scheduling::apply_latency_class;
pub use worker::{Factory, WorkerState};
