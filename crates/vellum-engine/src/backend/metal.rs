//! Metal backend manager.
//!
//! One command queue on the host's device. Each frame records into a fresh
//! command buffer; the ring keeps a slot's buffer until the slot comes around
//! again, then waits for it and releases it.

use std::sync::Arc;

use crate::core::BridgeConfig;
use crate::host::{DriverResource, GraphicsApi, NativeHandle, RenderingServer, Rid};
use crate::registry::{Drawable, RenderRegistry};
use crate::vector::{
    ExternalCommands, FlushResources, FrameCounter, FrameDescriptor, RenderContext, RenderContextProvider,
    RenderSurface, RenderTarget,
};

use super::{precheck, BackendError, BackendManager, FrameOutcome, FrameRing, NativeError, SkipReason};

/// The Metal calls the manager makes.
pub trait MetalApi: Send + Sync {
    fn new_command_queue(&self, device: NativeHandle) -> Result<NativeHandle, NativeError>;

    fn command_buffer(&self, queue: NativeHandle) -> Result<NativeHandle, NativeError>;

    fn commit(&self, buffer: NativeHandle) -> Result<(), NativeError>;

    /// Blocks until the committed buffer has executed. No timeout.
    fn wait_until_completed(&self, buffer: NativeHandle) -> Result<(), NativeError>;

    fn release(&self, object: NativeHandle);
}

struct MetalObject {
    api: Arc<dyn MetalApi>,
    raw: NativeHandle,
}

impl MetalObject {
    fn new(api: &Arc<dyn MetalApi>, raw: NativeHandle) -> Self {
        Self { api: api.clone(), raw }
    }
}

impl Drop for MetalObject {
    fn drop(&mut self) {
        self.api.release(self.raw);
    }
}

struct MetalState {
    api: Arc<dyn MetalApi>,
    context: Option<Box<dyn RenderContext>>,
    /// Committed buffer of each slot, if any.
    ring: FrameRing<Option<MetalObject>>,
    counter: FrameCounter,
    queue: MetalObject,
}

impl MetalState {
    fn render(&mut self, drawable: &dyn Drawable, target: RenderTarget) -> Result<FrameOutcome, BackendError> {
        let Self { api, context, ring, counter, queue } = self;
        let Some(context) = context.as_deref_mut() else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoBackend));
        };

        let slot = ring.advance();
        if let Some(previous) = slot.take() {
            api.wait_until_completed(previous.raw)?;
        }

        let buffer = MetalObject::new(api, api.command_buffer(queue.raw)?);
        let frame = counter.advance();
        context.begin_frame(&FrameDescriptor::cleared(target.width, target.height));
        drawable.draw(context.renderer());
        context.flush(FlushResources {
            render_target: &target,
            commands: ExternalCommands::Metal(buffer.raw),
            frame,
        })?;
        api.commit(buffer.raw)?;
        *slot = Some(buffer);

        Ok(FrameOutcome::Rendered { frame: frame.current })
    }
}

impl Drop for MetalState {
    fn drop(&mut self) {
        for buffer in self.ring.iter_mut().filter_map(Option::take) {
            if let Err(e) = self.api.wait_until_completed(buffer.raw) {
                log::warn!("metal teardown: {e}");
            }
        }
        self.context.take();
    }
}

/// Metal implementation of [`BackendManager`].
pub struct MetalBackend {
    api: Arc<dyn MetalApi>,
    provider: Arc<dyn RenderContextProvider>,
    state: Option<MetalState>,
}

impl MetalBackend {
    pub fn new(api: Arc<dyn MetalApi>, provider: Arc<dyn RenderContextProvider>) -> Self {
        Self { api, provider, state: None }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.counter.last())
    }
}

impl BackendManager for MetalBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Metal
    }

    fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn initialize(
        &mut self,
        host: &dyn RenderingServer,
        registry: &RenderRegistry,
        config: &BridgeConfig,
    ) -> Result<(), BackendError> {
        if self.state.is_some() {
            return Err(BackendError::AlreadyActive(GraphicsApi::Metal));
        }

        let rd = host.rendering_device().ok_or(BackendError::NoRenderingDevice)?;
        let device = rd
            .driver_resource(DriverResource::LogicalDevice, Rid::INVALID, 0)
            .ok_or(BackendError::MissingHandle("metal device"))?;

        let api = self.api.clone();
        let queue = MetalObject::new(&api, api.new_command_queue(device)?);
        let context = self
            .provider
            .make_metal(device, queue.raw)
            .ok_or(BackendError::ContextConstruction(GraphicsApi::Metal))?;

        let slots = (0..config.ring_size()).map(|_| None).collect();
        let ring = FrameRing::new(slots).ok_or(BackendError::ContextConstruction(GraphicsApi::Metal))?;

        registry.set_factory(&context.factory());
        self.state = Some(MetalState {
            api,
            context: Some(context),
            ring,
            counter: FrameCounter::default(),
            queue,
        });
        log::info!("metal backend initialized");
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
        let Some(state) = self.state.as_mut() else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoBackend));
        };
        let Some(rd) = host.rendering_device() else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoRenderingDevice));
        };
        let Some(texture) = rd.driver_resource(DriverResource::Texture, target, 0) else {
            return Ok(FrameOutcome::Skipped(SkipReason::MissingTexture));
        };

        let target = RenderTarget { width, height, surface: RenderSurface::Metal { texture } };
        state.render(drawable, target)
    }

    fn teardown(&mut self, registry: &RenderRegistry) {
        registry.clear_factory();
        if self.state.take().is_some() {
            log::info!("metal backend torn down");
        }
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::coords::{Rect, Size};
    use crate::headless::{HeadlessHost, ObjectKind};
    use crate::paint::Paint;
    use crate::registry::DrawFn;
    use crate::target::TextureTarget;
    use crate::vector::{Path, Renderer};

    fn initialized() -> (HeadlessHost, MetalBackend, RenderRegistry) {
        let host = HeadlessHost::new(GraphicsApi::Metal);
        let mut backend = MetalBackend::new(host.metal(), host.library());
        let registry = RenderRegistry::new();
        backend.initialize(host.server(), &registry, &BridgeConfig::default()).unwrap();
        (host, backend, registry)
    }

    // ── initialize ────────────────────────────────────────────────────────

    #[test]
    fn initialize_creates_one_queue() {
        let (host, backend, registry) = initialized();
        assert!(backend.is_initialized());
        assert!(registry.has_factory());
        assert_eq!(host.gpu().live_objects_of(ObjectKind::Queue), 1);
    }

    #[test]
    fn refused_context_releases_queue() {
        let host = HeadlessHost::new(GraphicsApi::Metal);
        host.library_impl().refuse(GraphicsApi::Metal);
        let mut backend = MetalBackend::new(host.metal(), host.library());
        let err = backend
            .initialize(host.server(), &RenderRegistry::new(), &BridgeConfig::default())
            .unwrap_err();
        assert!(matches!(err, BackendError::ContextConstruction(GraphicsApi::Metal)));
        assert_eq!(host.gpu().live_objects(), 0);
    }

    // ── render ────────────────────────────────────────────────────────────

    #[test]
    fn renders_into_host_texture() {
        let (host, mut backend, _registry) = initialized();
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(16, 16));
        let green = DrawFn(|r: &mut dyn Renderer| {
            r.draw_path(&Path::rect(Rect::new(0.0, 0.0, 16.0, 16.0)), &Paint::argb(0xFF00_FF00))
        });

        let outcome = backend.render_frame(host.server(), target.texture_rid(), Some(&green), 16, 16).unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered { frame: 1 });
        let image = host.server().texture_get_image(target.texture_rid()).unwrap();
        assert!(image.pixels().iter().all(|p| *p == [0, 255, 0, 255]));
    }

    #[test]
    fn buffers_are_kept_until_slot_reuse() {
        let (host, mut backend, _registry) = initialized();
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(8, 8));
        let nothing = DrawFn(|_: &mut dyn Renderer| {});

        for _ in 0..2 {
            backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 8, 8).unwrap();
        }
        assert_eq!(host.gpu().live_objects_of(ObjectKind::CommandBuffer), 2);
        assert_eq!(host.gpu().stats().fence_waits, 0);

        backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 8, 8).unwrap();
        assert_eq!(host.gpu().live_objects_of(ObjectKind::CommandBuffer), 2);
        assert_eq!(host.gpu().stats().fence_waits, 1);
    }

    #[test]
    fn failed_buffer_creation_is_an_error() {
        let (host, mut backend, _registry) = initialized();
        let mut target = TextureTarget::new(host.server_arc());
        target.resize(Size::new(8, 8));
        host.gpu().fail_after("commandBuffer", 0);
        let nothing = DrawFn(|_: &mut dyn Renderer| {});
        let err = backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 8, 8);
        assert!(err.is_err());
        // The next frame recovers.
        let outcome = backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 8, 8).unwrap();
        assert!(outcome.is_rendered());
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn teardown_waits_and_releases() {
        let (host, mut backend, registry) = initialized();
        {
            let mut target = TextureTarget::new(host.server_arc());
            target.resize(Size::new(8, 8));
            let nothing = DrawFn(|_: &mut dyn Renderer| {});
            backend.render_frame(host.server(), target.texture_rid(), Some(&nothing), 8, 8).unwrap();
        }
        backend.teardown(&registry);
        assert!(!registry.has_factory());
        assert_eq!(host.gpu().live_objects(), 0);
        assert_eq!(host.gpu().stats().fence_waits, 1);
    }
}
