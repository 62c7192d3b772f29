/*!
 * Mock render engine shared by the dispatcher tests
 *
 * Records which threads touch it and whether two calls ever overlap.
 */

use parking_lot::Mutex;
use render_dispatch::{
    CleanupMode, DisplaySettings, DrawOutcome, EngineCapabilities, EngineError, EngineResult,
    Fence, GraphicBuffer, LayerSettings, Rect, RenderEngine, Size, Status, TextureName,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

pub const MAX_TEXTURE_SIZE: usize = 4096;

/// Observations visible to the test after the engine is gone
#[derive(Default)]
pub struct Probe {
    active: AtomicUsize,
    pub overlaps: AtomicUsize,
    pub calls: AtomicUsize,
    pub threads: Mutex<Vec<ThreadId>>,
    pub dropped_on: Mutex<Option<ThreadId>>,
    pub final_counter: AtomicU64,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(self: &Arc<Self>) -> ActiveCall {
        if self.active.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = thread::current().id();
        let mut threads = self.threads.lock();
        if !threads.contains(&id) {
            threads.push(id);
        }
        ActiveCall(self.clone())
    }

    /// Distinct threads that ever called into the engine
    pub fn distinct_threads(&self) -> Vec<ThreadId> {
        self.threads.lock().clone()
    }
}

struct ActiveCall(Arc<Probe>);

impl Drop for ActiveCall {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockEngine {
    probe: Arc<Probe>,
    pub counter: u64,
    pub log: Vec<u64>,
    pub mapped: Vec<u64>,
    next_texture: TextureName,
    protected: bool,
    viewport: Rect,
}

impl MockEngine {
    pub fn new(probe: Arc<Probe>) -> Self {
        Self {
            probe,
            counter: 0,
            log: Vec::new(),
            mapped: Vec::new(),
            next_texture: 1,
            protected: false,
            viewport: Rect::default(),
        }
    }

    /// Mark the engine busy for `duration`
    pub fn busy(&mut self, duration: Duration) {
        let _call = self.probe.enter();
        let start = Instant::now();
        while start.elapsed() < duration {
            std::hint::spin_loop();
        }
    }

    pub fn increment(&mut self) {
        let _call = self.probe.enter();
        self.counter += 1;
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        *self.probe.dropped_on.lock() = Some(thread::current().id());
        self.probe.final_counter.store(self.counter, Ordering::SeqCst);
    }
}

impl RenderEngine for MockEngine {
    fn capabilities(&self) -> EngineCapabilities {
        let _call = self.probe.enter();
        EngineCapabilities {
            max_texture_size: MAX_TEXTURE_SIZE,
            max_viewport_dims: 8192,
            supports_protected_content: true,
            supports_background_blur: false,
        }
    }

    fn prime_cache(&mut self) -> EngineResult<()> {
        let _call = self.probe.enter();
        Ok(())
    }

    fn map_external_texture_buffer(
        &mut self,
        buffer: &GraphicBuffer,
        _is_renderable: bool,
    ) -> EngineResult<()> {
        let _call = self.probe.enter();
        if buffer.width == 0 || buffer.height == 0 {
            return Err(EngineError::InvalidBuffer(buffer.id));
        }
        self.mapped.push(buffer.id);
        Ok(())
    }

    fn unmap_external_texture_buffer(&mut self, buffer: &GraphicBuffer) -> EngineResult<()> {
        let _call = self.probe.enter();
        self.mapped.retain(|id| *id != buffer.id);
        Ok(())
    }

    fn on_primary_display_size_changed(&mut self, _size: Size) -> EngineResult<()> {
        let _call = self.probe.enter();
        Ok(())
    }

    fn gen_textures(&mut self, count: usize) -> Vec<TextureName> {
        let _call = self.probe.enter();
        let first = self.next_texture;
        self.next_texture += count as TextureName;
        (first..self.next_texture).collect()
    }

    fn delete_textures(&mut self, _names: &[TextureName]) {
        let _call = self.probe.enter();
    }

    fn set_viewport_and_projection(&mut self, viewport: Rect, _source_crop: Rect) {
        let _call = self.probe.enter();
        self.viewport = viewport;
    }

    fn use_protected_context(&mut self, enable: bool) -> bool {
        let _call = self.probe.enter();
        self.protected = enable;
        self.protected
    }

    fn is_protected(&self) -> bool {
        let _call = self.probe.enter();
        self.protected
    }

    fn cleanup_post_render(&mut self, mode: CleanupMode) -> bool {
        let _call = self.probe.enter();
        if mode == CleanupMode::CleanAll {
            self.mapped.clear();
        }
        true
    }

    fn draw_layers(
        &mut self,
        _display: &DisplaySettings,
        layers: &[LayerSettings],
        _buffer: &GraphicBuffer,
        _use_framebuffer_cache: bool,
        buffer_fence: Fence,
    ) -> DrawOutcome {
        let _call = self.probe.enter();
        if layers.is_empty() {
            return DrawOutcome {
                status: Status::BAD_VALUE,
                draw_fence: Fence::no_fence(),
            };
        }
        DrawOutcome {
            status: Status::OK,
            draw_fence: Fence::new(buffer_fence.raw() + 1),
        }
    }

    fn context_priority(&mut self) -> i32 {
        let _call = self.probe.enter();
        3
    }

    fn dump(&mut self, result: &mut String) {
        let _call = self.probe.enter();
        result.push_str(&format!("MockEngine counter={}", self.counter));
    }
}

/// Factory building a `MockEngine` bound to `probe`
pub fn factory(probe: Arc<Probe>) -> impl FnOnce() -> anyhow::Result<MockEngine> + Send + 'static {
    move || Ok(MockEngine::new(probe))
}

/// Factory that blocks until `gate` receives (or disconnects)
pub fn gated_factory(
    probe: Arc<Probe>,
    gate: flume::Receiver<()>,
) -> impl FnOnce() -> anyhow::Result<MockEngine> + Send + 'static {
    move || {
        let _ = gate.recv();
        Ok(MockEngine::new(probe))
    }
}

/// Poll `condition` until it holds or the deadline passes
pub fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
