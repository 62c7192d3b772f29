/*!
 * Dispatched Operations
 *
 * One variant per engine call. Fire-and-forget variants own every argument
 * because the submitting frame may be gone before they run. Blocking
 * variants take their arguments by move as well and carry the
 * `ResultSender` that releases the parked caller; anything the caller needs
 * back (dump text, draw fence) travels home through that sender.
 */

use crate::core::errors::EngineResult;
use crate::core::sync::ResultSender;
use crate::engine::{
    CleanupMode, DisplaySettings, DrawOutcome, Fence, GraphicBuffer, LayerSettings, Rect,
    RenderEngine, Size, TextureName,
};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Ad-hoc work on the engine, executed on the worker
pub type Task<E> = Box<dyn FnOnce(&mut E) + Send + 'static>;

/// Arguments of a composition pass
#[derive(Debug)]
pub struct DrawRequest {
    pub display: DisplaySettings,
    pub layers: Vec<LayerSettings>,
    pub buffer: Arc<GraphicBuffer>,
    pub use_framebuffer_cache: bool,
    /// Consumed by the engine; signals when `buffer` may be written
    pub buffer_fence: Fence,
}

/// Queued engine call
pub enum Operation<E> {
    // Fire-and-forget
    PrimeCache,
    MapExternalTextureBuffer {
        buffer: Arc<GraphicBuffer>,
        is_renderable: bool,
    },
    UnmapExternalTextureBuffer {
        buffer: Arc<GraphicBuffer>,
    },
    CleanFramebufferCache,
    PrimaryDisplaySizeChanged {
        size: Size,
    },
    Task(Task<E>),

    // Blocking
    GenTextures {
        count: usize,
        reply: ResultSender<Vec<TextureName>>,
    },
    DeleteTextures {
        names: Vec<TextureName>,
        reply: ResultSender<()>,
    },
    SetViewportAndProjection {
        viewport: Rect,
        source_crop: Rect,
        reply: ResultSender<()>,
    },
    UseProtectedContext {
        enable: bool,
        reply: ResultSender<bool>,
    },
    IsProtected {
        reply: ResultSender<bool>,
    },
    CleanupPostRender {
        mode: CleanupMode,
        reply: ResultSender<bool>,
    },
    DrawLayers {
        request: DrawRequest,
        reply: ResultSender<DrawOutcome>,
    },
    ContextPriority {
        reply: ResultSender<i32>,
    },
    Dump {
        text: String,
        reply: ResultSender<String>,
    },
    /// Closure that publishes its own result
    SyncTask(Task<E>),
}

impl<E> Operation<E> {
    /// Stable name used in spans and logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::PrimeCache => "prime_cache",
            Operation::MapExternalTextureBuffer { .. } => "map_external_texture_buffer",
            Operation::UnmapExternalTextureBuffer { .. } => "unmap_external_texture_buffer",
            Operation::CleanFramebufferCache => "clean_framebuffer_cache",
            Operation::PrimaryDisplaySizeChanged { .. } => "on_primary_display_size_changed",
            Operation::Task(_) => "task",
            Operation::GenTextures { .. } => "gen_textures",
            Operation::DeleteTextures { .. } => "delete_textures",
            Operation::SetViewportAndProjection { .. } => "set_viewport_and_projection",
            Operation::UseProtectedContext { .. } => "use_protected_context",
            Operation::IsProtected { .. } => "is_protected",
            Operation::CleanupPostRender { .. } => "cleanup_post_render",
            Operation::DrawLayers { .. } => "draw_layers",
            Operation::ContextPriority { .. } => "context_priority",
            Operation::Dump { .. } => "dump",
            Operation::SyncTask(_) => "sync_task",
        }
    }

    /// Whether a caller is parked waiting for this operation
    pub fn is_blocking(&self) -> bool {
        !matches!(
            self,
            Operation::PrimeCache
                | Operation::MapExternalTextureBuffer { .. }
                | Operation::UnmapExternalTextureBuffer { .. }
                | Operation::CleanFramebufferCache
                | Operation::PrimaryDisplaySizeChanged { .. }
                | Operation::Task(_)
        )
    }
}

impl<E: RenderEngine> Operation<E> {
    /// Run the operation against the engine (worker thread only)
    pub(crate) fn execute(self, engine: &mut E) {
        let op = self.name();
        match self {
            Operation::PrimeCache => detached(op, || engine.prime_cache()),
            Operation::MapExternalTextureBuffer {
                buffer,
                is_renderable,
            } => detached(op, || {
                engine.map_external_texture_buffer(&buffer, is_renderable)
            }),
            Operation::UnmapExternalTextureBuffer { buffer } => {
                detached(op, || engine.unmap_external_texture_buffer(&buffer))
            }
            Operation::CleanFramebufferCache => detached(op, || engine.clean_framebuffer_cache()),
            Operation::PrimaryDisplaySizeChanged { size } => {
                detached(op, || engine.on_primary_display_size_changed(size))
            }
            Operation::Task(task) | Operation::SyncTask(task) => detached(op, || {
                task(engine);
                Ok(())
            }),

            Operation::GenTextures { count, reply } => {
                reply.complete(op, || engine.gen_textures(count))
            }
            Operation::DeleteTextures { names, reply } => {
                reply.complete(op, || engine.delete_textures(&names))
            }
            Operation::SetViewportAndProjection {
                viewport,
                source_crop,
                reply,
            } => reply.complete(op, || {
                engine.set_viewport_and_projection(viewport, source_crop)
            }),
            Operation::UseProtectedContext { enable, reply } => {
                reply.complete(op, || engine.use_protected_context(enable))
            }
            Operation::IsProtected { reply } => reply.complete(op, || engine.is_protected()),
            Operation::CleanupPostRender { mode, reply } => {
                reply.complete(op, || engine.cleanup_post_render(mode))
            }
            Operation::DrawLayers { request, reply } => reply.complete(op, || {
                let DrawRequest {
                    display,
                    layers,
                    buffer,
                    use_framebuffer_cache,
                    buffer_fence,
                } = request;
                engine.draw_layers(
                    &display,
                    &layers,
                    &buffer,
                    use_framebuffer_cache,
                    buffer_fence,
                )
            }),
            Operation::ContextPriority { reply } => {
                reply.complete(op, || engine.context_priority())
            }
            Operation::Dump { text, reply } => reply.complete(op, || {
                let mut text = text;
                engine.dump(&mut text);
                text
            }),
        }
    }
}

impl<E> fmt::Debug for Operation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .field("blocking", &self.is_blocking())
            .finish()
    }
}

/// Run a fire-and-forget call; nobody is waiting, so failures go to the log
fn detached<F>(op: &'static str, f: F)
where
    F: FnOnce() -> EngineResult<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(op, error = %e, "Fire-and-forget operation failed"),
        Err(_) => error!(op, "Fire-and-forget operation panicked"),
    }
}
