/*!
 * Engine Value Types
 * Arguments and results exchanged with a render engine
 */

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of an engine-owned texture
pub type TextureName = u32;

/// Axis-aligned rectangle in pixels (right/bottom exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Display or surface dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Scope of a post-render cleanup pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// Release resources tied to the last output buffer only
    CleanOutputResources,
    /// Release every cached resource
    CleanAll,
}

/// Move-only completion fence handle
///
/// Ownership of the underlying descriptor travels with the value; a fence is
/// consumed by the operation that waits on it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Fence {
    fd: i32,
}

impl Fence {
    const NO_FENCE_FD: i32 = -1;

    pub const fn new(fd: i32) -> Self {
        Self { fd }
    }

    /// Fence that is already signaled
    pub const fn no_fence() -> Self {
        Self::new(Self::NO_FENCE_FD)
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.fd >= 0
    }

    #[inline]
    pub const fn raw(&self) -> i32 {
        self.fd
    }

    /// Give up ownership of the descriptor
    pub fn into_raw(self) -> i32 {
        self.fd
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::no_fence()
    }
}

/// Externally allocated pixel buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphicBuffer {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub usage: u64,
}

impl GraphicBuffer {
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            format: 1, // RGBA_8888
            usage: 0,
        }
    }
}

/// Output-wide parameters for a composition pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplaySettings {
    pub physical_display: Rect,
    pub clip: Rect,
    pub max_luminance: f32,
    pub output_dataspace: u32,
    pub orientation: u32,
}

/// One input layer of a composition pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerSettings {
    pub geometry: Rect,
    pub alpha: f32,
    pub source: Option<Arc<GraphicBuffer>>,
    pub disable_blending: bool,
    pub background_blur_radius: u32,
}

/// Engine status code, passed through to callers unmodified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub i32);

impl Status {
    pub const OK: Status = Status(0);
    pub const NO_MEMORY: Status = Status(-12);
    pub const BAD_VALUE: Status = Status(-22);
    pub const INVALID_OPERATION: Status = Status(-38);

    #[inline]
    pub const fn is_ok(&self) -> bool {
        self.0 == Self::OK.0
    }
}

/// Result of a composition pass
#[derive(Debug, PartialEq, Eq, Default)]
pub struct DrawOutcome {
    pub status: Status,
    /// Signals when the GPU finished writing the output buffer
    pub draw_fence: Fence,
}

/// Properties fixed at engine construction and immutable afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EngineCapabilities {
    pub max_texture_size: usize,
    pub max_viewport_dims: usize,
    pub supports_protected_content: bool,
    pub supports_background_blur: bool,
}
