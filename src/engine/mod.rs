/*!
 * Engine Module
 * The thread-affine collaborator and the values it exchanges
 */

pub mod traits;
pub mod types;

// Re-export public API
pub use traits::RenderEngine;
pub use types::{
    CleanupMode, DisplaySettings, DrawOutcome, EngineCapabilities, Fence, GraphicBuffer,
    LayerSettings, Rect, Size, Status, TextureName,
};
