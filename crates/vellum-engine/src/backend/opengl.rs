//! OpenGL backend manager.
//!
//! The host has no rendering device on OpenGL; the target is the GL texture
//! name behind the server texture. The library issues its commands directly
//! on the current context, so frames are paced with fence sync objects.

use std::sync::Arc;

use crate::coords::Mat2D;
use crate::core::BridgeConfig;
use crate::host::native::GlApi;
use crate::host::{GraphicsApi, NativeHandle, RenderingServer, Rid};
use crate::registry::{Drawable, RenderRegistry};
use crate::vector::{
    ExternalCommands, FlushResources, FrameCounter, FrameDescriptor, RenderContext, RenderContextProvider,
    RenderSurface, RenderTarget,
};

use super::{precheck, BackendError, BackendManager, FrameOutcome, FrameRing, SkipReason};

struct GlSync {
    gl: Arc<dyn GlApi>,
    raw: NativeHandle,
}

impl Drop for GlSync {
    fn drop(&mut self) {
        self.gl.delete_sync(self.raw);
    }
}

struct GlState {
    context: Option<Box<dyn RenderContext>>,
    ring: FrameRing<Option<GlSync>>,
    counter: FrameCounter,
}

impl Drop for GlState {
    fn drop(&mut self) {
        for sync in self.ring.iter_mut().filter_map(Option::take) {
            if let Err(e) = sync.gl.client_wait_sync(sync.raw) {
                log::warn!("opengl teardown: {e}");
            }
        }
        self.context.take();
    }
}

/// OpenGL implementation of [`BackendManager`].
pub struct GlBackend {
    gl: Arc<dyn GlApi>,
    provider: Arc<dyn RenderContextProvider>,
    state: Option<GlState>,
}

impl GlBackend {
    pub fn new(gl: Arc<dyn GlApi>, provider: Arc<dyn RenderContextProvider>) -> Self {
        Self { gl, provider, state: None }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.counter.last())
    }

    fn render(&mut self, drawable: &dyn Drawable, target: RenderTarget) -> Result<FrameOutcome, BackendError> {
        let gl = &self.gl;
        let Some(GlState { context: Some(context), ring, counter }) = self.state.as_mut() else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoBackend));
        };

        let slot = ring.advance();
        if let Some(previous) = slot.take() {
            gl.client_wait_sync(previous.raw)?;
        }

        // The host may have touched GL state since the last frame.
        context.invalidate_gl_state();
        let frame = counter.advance();
        context.begin_frame(&FrameDescriptor::cleared(target.width, target.height));
        {
            // Host GL textures are stored bottom-up.
            let renderer = context.renderer();
            renderer.save();
            renderer.transform(&Mat2D::flip_y(target.height as f32));
            drawable.draw(renderer);
            renderer.restore();
        }
        let flushed = context.flush(FlushResources {
            render_target: &target,
            commands: ExternalCommands::None,
            frame,
        });
        context.unbind_gl_internal_resources();
        flushed?;

        let raw = gl.fence_sync()?;
        *slot = Some(GlSync { gl: gl.clone(), raw });
        gl.flush();

        Ok(FrameOutcome::Rendered { frame: frame.current })
    }
}

impl BackendManager for GlBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn initialize(
        &mut self,
        _host: &dyn RenderingServer,
        registry: &RenderRegistry,
        config: &BridgeConfig,
    ) -> Result<(), BackendError> {
        if self.state.is_some() {
            return Err(BackendError::AlreadyActive(GraphicsApi::OpenGl));
        }

        let context = self
            .provider
            .make_gl(&self.gl)
            .ok_or(BackendError::ContextConstruction(GraphicsApi::OpenGl))?;
        let slots = (0..config.ring_size()).map(|_| None).collect();
        let ring = FrameRing::new(slots).ok_or(BackendError::ContextConstruction(GraphicsApi::OpenGl))?;

        registry.set_factory(&context.factory());
        self.state = Some(GlState {
            context: Some(context),
            ring,
            counter: FrameCounter::default(),
        });
        log::info!("opengl backend initialized");
        Ok(())
    }

    fn render_frame(
        &mut self,
        host: &dyn RenderingServer,
        target: Rid,
        drawable: Option<&dyn Drawable>,
        width: u32,
        height: u32,
    ) -> Result<FrameOutcome, BackendError> {
        let drawable = match precheck(target, drawable, width, height) {
            Ok(d) => d,
            Err(reason) => return Ok(FrameOutcome::Skipped(reason)),
        };
        if self.state.is_none() {
            return Ok(FrameOutcome::Skipped(SkipReason::NoBackend));
        }
        let texture = match host.texture_native_handle(target).and_then(|h| u32::try_from(h.raw()).ok()) {
            Some(name) => name,
            None => return Ok(FrameOutcome::Skipped(SkipReason::MissingTexture)),
        };

        self.render(drawable, RenderTarget { width, height, surface: RenderSurface::Gl { texture } })
    }

    fn teardown(&mut self, registry: &RenderRegistry) {
        registry.clear_factory();
        if self.state.take().is_some() {
            log::info!("opengl backend torn down");
        }
    }

    fn gl(&self) -> Option<Arc<dyn GlApi>> {
        self.state.as_ref().map(|_| self.gl.clone())
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::coords::{Rect, Size};
    use crate::headless::{HeadlessHost, ObjectKind};
    use crate::host::native::OwnedGlTexture;
    use crate::paint::Paint;
    use crate::registry::DrawFn;
    use crate::target::TextureTarget;
    use crate::vector::{Path, Renderer};

    fn initialized() -> (HeadlessHost, GlBackend, RenderRegistry) {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let mut backend = GlBackend::new(host.gl(), host.library());
        let registry = RenderRegistry::new();
        backend.initialize(host.server(), &registry, &BridgeConfig::default()).unwrap();
        (host, backend, registry)
    }

    // ── owned texture ─────────────────────────────────────────────────────

    #[test]
    fn owned_texture_deletes_on_drop() {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let gl = host.gl();
        let texture = OwnedGlTexture::generate(&gl).unwrap();
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), 1);
        drop(texture);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), 0);
    }

    #[test]
    fn into_raw_releases_ownership() {
        let host = HeadlessHost::new(GraphicsApi::OpenGl);
        let gl = host.gl();
        let name = OwnedGlTexture::generate(&gl).unwrap().into_raw();
        assert_ne!(name, 0);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), 1);
        gl.delete_texture(name);
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Texture), 0);
    }

    // ── render ────────────────────────────────────────────────────────────

    #[test]
    fn initialize_needs_no_rendering_device() {
        let (host, backend, registry) = initialized();
        assert!(host.server().rendering_device().is_none());
        assert!(backend.is_initialized());
        assert!(registry.has_factory());
        assert!(backend.gl().is_some());
    }

    #[test]
    fn y_flip_keeps_content_upright() {
        let (host, mut backend, _registry) = initialized();
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(8, 8));
        let top_half = DrawFn(|r: &mut dyn Renderer| {
            r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 8.0, 4.0)), &Paint::argb(0xFFFF_0000))
        });

        backend.render_frame(host.server(), target.texture_rid(), Some(&top_half), 8, 8).unwrap();

        let image = host.server().texture_get_image(target.texture_rid()).unwrap();
        assert_eq!(image.pixel(3, 0), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(3, 3), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(3, 4), Some([0, 0, 0, 0]));
        assert_eq!(image.pixel(3, 7), Some([0, 0, 0, 0]));
    }

    #[test]
    fn state_hooks_wrap_every_frame() {
        let (host, mut backend, _registry) = initialized();
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(4, 4));
        let nothing = DrawFn(|_: &mut dyn Renderer| {});
        for _ in 0..3 {
            backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 4, 4).unwrap();
        }
        let hooks = host.library_impl().gl_hook_counts();
        assert_eq!(hooks, (3, 3));
    }

    #[test]
    fn sync_objects_pace_the_ring() {
        let (host, mut backend, _registry) = initialized();
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(4, 4));
        let nothing = DrawFn(|_: &mut dyn Renderer| {});
        for _ in 0..4 {
            backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 4, 4).unwrap();
        }
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Sync), 2);
        assert_eq!(host.gpu().stats().fence_waits, 2);
        assert_eq!(backend.frames_rendered(), 4);
    }

    #[test]
    fn unknown_texture_skips() {
        let (host, mut backend, _registry) = initialized();
        let nothing = DrawFn(|_: &mut dyn Renderer| {});
        let outcome = backend.render_frame(host.server(), Rid::new(77), Some(&nothing), 4, 4).unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::MissingTexture));
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn teardown_deletes_syncs() {
        let (host, mut backend, registry) = initialized();
        {
            let mut target = TextureTarget::new(host.server_arc());
            target.resize(Size::new(4, 4));
            let nothing = DrawFn(|_: &mut dyn Renderer| {});
            backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 4, 4).unwrap();
        }
        backend.teardown(&registry);
        assert_eq!(host.gpu().live_objects(), 0);
        assert!(backend.gl().is_none());
        assert!(!registry.has_factory());
    }
}
