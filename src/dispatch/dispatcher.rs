/*!
 * Render Dispatcher
 *
 * Public façade of the active object. Callers on any thread submit engine
 * calls; one worker thread executes them in submission order against an
 * engine it alone constructs, uses and destroys.
 *
 * ## Call Kinds
 *
 * - **Fire-and-forget**: enqueue and return; failures are logged by the worker
 * - **Blocking**: enqueue and park until the worker publishes the result
 * - **Direct reads**: wait for construction, then read the immutable
 *   capability snapshot without touching the queue
 */

use super::config::DispatcherConfig;
use super::operation::{DrawRequest, Operation};
use super::queue::QueueStats;
use super::worker::{self, Factory, Shared, WorkerState};
use crate::core::errors::{DispatchError, DispatchResult};
use crate::core::sync::{result_channel, ResultSender};
use crate::engine::{
    CleanupMode, DrawOutcome, EngineCapabilities, GraphicBuffer, Rect, RenderEngine, Size,
    TextureName,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Single-worker command dispatcher for a thread-affine render engine
///
/// # Examples
///
/// ```ignore
/// let dispatcher = Dispatcher::new(|| GlesEngine::create(), DispatcherConfig::default())?;
/// dispatcher.prime_cache()?;
/// let textures = dispatcher.gen_textures(4)?;
/// let max = dispatcher.max_texture_size()?;
/// dispatcher.shutdown()?;
/// ```
pub struct Dispatcher<E: RenderEngine + 'static> {
    shared: Arc<Shared<E>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl<E: RenderEngine + 'static> Dispatcher<E> {
    /// Spawn the worker, which builds the engine through `factory`
    ///
    /// Returns as soon as the thread exists; construction proceeds in the
    /// background. Operations submitted meanwhile are queued and run once the
    /// engine is ready.
    pub fn new<F>(factory: F, config: DispatcherConfig) -> DispatchResult<Self>
    where
        F: FnOnce() -> anyhow::Result<E> + Send + 'static,
    {
        let shared = Arc::new(Shared::new());
        let factory: Factory<E> = Box::new(factory);
        let handle = worker::spawn(shared.clone(), factory, &config)?;

        info!(thread = %config.thread_name, "Render dispatcher started");
        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            thread_name: config.thread_name,
        })
    }

    /// Spawn with the default configuration
    pub fn with_defaults<F>(factory: F) -> DispatchResult<Self>
    where
        F: FnOnce() -> anyhow::Result<E> + Send + 'static,
    {
        Self::new(factory, DispatcherConfig::default())
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Enqueue an operation and return without waiting
    pub fn submit_async(&self, op: Operation<E>) -> DispatchResult<()> {
        self.reject_worker(op.name())?;
        let name = op.name();
        let seq = self.shared.queue.push(op)?;
        trace!(op = name, seq, "Queued fire-and-forget operation");
        Ok(())
    }

    /// Enqueue the operation built by `build` and park until it has executed
    ///
    /// Must not be called from the worker thread; that is rejected with
    /// `WorkerReentry` rather than deadlocking.
    pub fn submit_sync<T, B>(&self, build: B) -> DispatchResult<T>
    where
        B: FnOnce(ResultSender<T>) -> Operation<E>,
    {
        let (reply, result) = result_channel();
        let op = build(reply);
        self.reject_worker(op.name())?;
        let name = op.name();
        let seq = self.shared.queue.push(op)?;
        trace!(op = name, seq, "Queued blocking operation");
        result.get()
    }

    fn reject_worker(&self, op: &'static str) -> DispatchResult<()> {
        if self.shared.is_worker_thread() {
            warn!(op, "Operation submitted from the worker thread");
            return Err(DispatchError::WorkerReentry { op });
        }
        Ok(())
    }

    // ========================================================================
    // Initialization and direct reads
    // ========================================================================

    /// Block until the engine has been constructed
    pub fn wait_until_initialized(&self) -> DispatchResult<()> {
        self.shared.init.wait().map(|_| ())
    }

    /// Whether construction has finished (successfully or not)
    pub fn is_initialized(&self) -> bool {
        self.shared.init.is_signaled()
    }

    /// Construction-time properties of the engine
    pub fn capabilities(&self) -> DispatchResult<EngineCapabilities> {
        self.shared.init.wait().copied()
    }

    pub fn max_texture_size(&self) -> DispatchResult<usize> {
        Ok(self.capabilities()?.max_texture_size)
    }

    pub fn max_viewport_dims(&self) -> DispatchResult<usize> {
        Ok(self.capabilities()?.max_viewport_dims)
    }

    pub fn supports_protected_content(&self) -> DispatchResult<bool> {
        Ok(self.capabilities()?.supports_protected_content)
    }

    pub fn supports_background_blur(&self) -> DispatchResult<bool> {
        Ok(self.capabilities()?.supports_background_blur)
    }

    // ========================================================================
    // Fire-and-forget operations
    // ========================================================================

    pub fn prime_cache(&self) -> DispatchResult<()> {
        self.submit_async(Operation::PrimeCache)
    }

    pub fn map_external_texture_buffer(
        &self,
        buffer: Arc<GraphicBuffer>,
        is_renderable: bool,
    ) -> DispatchResult<()> {
        self.submit_async(Operation::MapExternalTextureBuffer {
            buffer,
            is_renderable,
        })
    }

    pub fn unmap_external_texture_buffer(&self, buffer: Arc<GraphicBuffer>) -> DispatchResult<()> {
        self.submit_async(Operation::UnmapExternalTextureBuffer { buffer })
    }

    pub fn clean_framebuffer_cache(&self) -> DispatchResult<()> {
        self.submit_async(Operation::CleanFramebufferCache)
    }

    pub fn on_primary_display_size_changed(&self, size: Size) -> DispatchResult<()> {
        self.submit_async(Operation::PrimaryDisplaySizeChanged { size })
    }

    /// Run `f` on the worker without waiting for it
    pub fn run<F>(&self, f: F) -> DispatchResult<()>
    where
        F: FnOnce(&mut E) + Send + 'static,
    {
        self.submit_async(Operation::Task(Box::new(f)))
    }

    // ========================================================================
    // Blocking operations
    // ========================================================================

    pub fn gen_textures(&self, count: usize) -> DispatchResult<Vec<TextureName>> {
        self.submit_sync(|reply| Operation::GenTextures { count, reply })
    }

    pub fn delete_textures(&self, names: Vec<TextureName>) -> DispatchResult<()> {
        self.submit_sync(|reply| Operation::DeleteTextures { names, reply })
    }

    pub fn set_viewport_and_projection(
        &self,
        viewport: Rect,
        source_crop: Rect,
    ) -> DispatchResult<()> {
        self.submit_sync(|reply| Operation::SetViewportAndProjection {
            viewport,
            source_crop,
            reply,
        })
    }

    /// Returns the protected-content mode actually in effect
    pub fn use_protected_context(&self, enable: bool) -> DispatchResult<bool> {
        self.submit_sync(|reply| Operation::UseProtectedContext { enable, reply })
    }

    /// Queued behind any pending `use_protected_context` call
    pub fn is_protected(&self) -> DispatchResult<bool> {
        self.submit_sync(|reply| Operation::IsProtected { reply })
    }

    pub fn cleanup_post_render(&self, mode: CleanupMode) -> DispatchResult<bool> {
        self.submit_sync(|reply| Operation::CleanupPostRender { mode, reply })
    }

    /// Compose a frame; the input fence is consumed, the output fence returned
    pub fn draw_layers(&self, request: DrawRequest) -> DispatchResult<DrawOutcome> {
        self.submit_sync(|reply| Operation::DrawLayers { request, reply })
    }

    pub fn context_priority(&self) -> DispatchResult<i32> {
        self.submit_sync(|reply| Operation::ContextPriority { reply })
    }

    /// Returns `text` with the engine's diagnostic state appended
    pub fn dump(&self, text: String) -> DispatchResult<String> {
        self.submit_sync(|reply| Operation::Dump { text, reply })
    }

    /// Run `f` on the worker and return its value
    pub fn run_sync<R, F>(&self, f: F) -> DispatchResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut E) -> R + Send + 'static,
    {
        self.submit_sync(|reply| {
            Operation::SyncTask(Box::new(move |engine: &mut E| {
                reply.complete("sync_task", || f(engine))
            }))
        })
    }

    // ========================================================================
    // Shutdown and diagnostics
    // ========================================================================

    /// Stop the worker and wait for it to exit
    ///
    /// One-shot: later calls return `AlreadyShutDown`. Operations still
    /// queued are resolved per the configured `ShutdownPolicy`; the engine is
    /// destroyed on the worker before this returns.
    pub fn shutdown(&self) -> DispatchResult<()> {
        if self.shared.is_worker_thread() {
            return Err(DispatchError::WorkerReentry { op: "shutdown" });
        }
        let handle = self
            .worker
            .lock()
            .take()
            .ok_or(DispatchError::AlreadyShutDown)?;

        info!(thread = %self.thread_name, "Shutting down render dispatcher");
        self.shared.queue.close();
        handle.join().map_err(|_| DispatchError::WorkerPanicked)
    }

    pub fn worker_state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Whether new operations are still accepted
    pub fn is_running(&self) -> bool {
        self.shared.queue.is_running()
    }

    /// Number of queued operations not yet started
    ///
    /// Like `is_running` and `stats`, never waits for the queue lock, so it
    /// may be called from inside an operation.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.queue.stats()
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl<E: RenderEngine + 'static> Drop for Dispatcher<E> {
    fn drop(&mut self) {
        if self.worker.get_mut().is_none() {
            return;
        }
        if self.shared.is_worker_thread() {
            // The worker holds the queue lock and cannot join itself
            self.shared.request_close();
            debug!("Dispatcher dropped on its worker thread, detaching");
            return;
        }
        match self.shutdown() {
            Ok(()) => {}
            Err(e) if e.is_terminal() => {
                warn!(error = %e, "Render dispatcher did not shut down cleanly")
            }
            Err(e) => debug!(error = %e, "Render dispatcher shutdown skipped"),
        }
    }
}

impl<E: RenderEngine + 'static> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("thread_name", &self.thread_name)
            .field("state", &self.worker_state())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
