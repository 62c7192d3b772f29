/*!
 * Render Dispatch Library
 *
 * Serializes every call to a thread-affine rendering engine onto one
 * dedicated worker thread, with fire-and-forget and blocking call kinds.
 */

pub mod core;
pub mod dispatch;
pub mod engine;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{
    DispatchError, DispatchResult, EngineError, EngineResult, SchedulingError,
};
pub use dispatch::{
    Dispatcher, DispatcherConfig, DrawRequest, LatencyClass, Operation, QueueStats,
    ShutdownPolicy, WorkerState,
};
pub use engine::{
    CleanupMode, DisplaySettings, DrawOutcome, EngineCapabilities, Fence, GraphicBuffer,
    LayerSettings, Rect, RenderEngine, Size, Status, TextureName,
};
pub use monitoring::init_tracing;
