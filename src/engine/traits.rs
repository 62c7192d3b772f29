/*!
 * Render Engine Trait
 * Interface of the thread-affine resource driven by the dispatcher
 */

use super::types::{
    CleanupMode, DisplaySettings, DrawOutcome, EngineCapabilities, Fence, GraphicBuffer,
    LayerSettings, Rect, Size, TextureName,
};
use crate::core::errors::EngineResult;

/// Render engine bound to the thread that created it
///
/// Implementations may assume exclusive, unsynchronized access: the
/// dispatcher constructs, uses and drops the engine on one worker thread and
/// never shares it, so the trait has no `Send`/`Sync` bound.
///
/// Fire-and-forget operations return `EngineResult<()>`; their failures are
/// logged by the worker since no caller is waiting. Blocking operations
/// return their own result encoding, which reaches the caller unmodified.
pub trait RenderEngine {
    /// Properties fixed at construction, snapshotted once by the worker
    fn capabilities(&self) -> EngineCapabilities;

    // ------------------------------------------------------------------------
    // Fire-and-forget
    // ------------------------------------------------------------------------

    /// Compile shaders and warm internal caches
    fn prime_cache(&mut self) -> EngineResult<()>;

    /// Import an external buffer so later draws can sample or render to it
    fn map_external_texture_buffer(
        &mut self,
        buffer: &GraphicBuffer,
        is_renderable: bool,
    ) -> EngineResult<()>;

    /// Release the import created by `map_external_texture_buffer`
    fn unmap_external_texture_buffer(&mut self, buffer: &GraphicBuffer) -> EngineResult<()>;

    /// Drop cached framebuffers
    fn clean_framebuffer_cache(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Resize caches sized after the primary display
    fn on_primary_display_size_changed(&mut self, size: Size) -> EngineResult<()> {
        let _ = size;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Blocking
    // ------------------------------------------------------------------------

    /// Allocate `count` texture names
    fn gen_textures(&mut self, count: usize) -> Vec<TextureName>;

    /// Free texture names returned by `gen_textures`
    fn delete_textures(&mut self, names: &[TextureName]);

    fn set_viewport_and_projection(&mut self, viewport: Rect, source_crop: Rect);

    /// Switch protected-content mode, returning the mode actually in effect
    fn use_protected_context(&mut self, enable: bool) -> bool;

    /// Whether protected-content mode is currently active
    fn is_protected(&self) -> bool;

    /// Returns whether any resources were released
    fn cleanup_post_render(&mut self, mode: CleanupMode) -> bool;

    /// Compose `layers` into `buffer` once `buffer_fence` signals
    fn draw_layers(
        &mut self,
        display: &DisplaySettings,
        layers: &[LayerSettings],
        buffer: &GraphicBuffer,
        use_framebuffer_cache: bool,
        buffer_fence: Fence,
    ) -> DrawOutcome;

    fn context_priority(&mut self) -> i32;

    /// Append diagnostic state to `result`
    fn dump(&mut self, result: &mut String);
}
