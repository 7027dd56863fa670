//! Vulkan backend manager.
//!
//! Uses the host's instance and device. The manager owns a command pool on the
//! graphics queue family, one primary command buffer and fence per ring slot,
//! and the library context built over the same device.

use std::sync::Arc;

use crate::core::BridgeConfig;
use crate::host::native::VulkanApi;
use crate::host::{DriverResource, GraphicsApi, NativeHandle, RenderingServer, Rid};
use crate::registry::{Drawable, RenderRegistry};
use crate::vector::{
    ExternalCommands, FlushResources, FrameCounter, FrameDescriptor, RenderContext,
    RenderContextProvider, RenderSurface, RenderTarget, VulkanContextHandles, VulkanImageTarget,
};

use super::{precheck, BackendError, BackendManager, FrameOutcome, FrameRing, NativeError, SkipReason};

/// Resolves Vulkan entry points for the host's instance and device.
pub trait VulkanLoader: Send + Sync {
    fn load(
        &self,
        instance: NativeHandle,
        physical_device: NativeHandle,
        device: NativeHandle,
    ) -> Result<Arc<dyn VulkanApi>, BackendError>;
}

/// Pool and fences created so far. Destroys them on drop, so an initialize
/// that fails halfway leaves nothing behind.
struct VulkanObjects {
    api: Arc<dyn VulkanApi>,
    pool: Option<NativeHandle>,
    fences: Vec<NativeHandle>,
}

impl VulkanObjects {
    fn new(api: Arc<dyn VulkanApi>) -> Self {
        Self { api, pool: None, fences: Vec::new() }
    }

    fn create_pool(&mut self, family: u32) -> Result<NativeHandle, NativeError> {
        let pool = self.api.create_command_pool(family)?;
        self.pool = Some(pool);
        Ok(pool)
    }

    fn create_fence(&mut self) -> Result<NativeHandle, NativeError> {
        let fence = self.api.create_fence()?;
        self.fences.push(fence);
        Ok(fence)
    }
}

impl Drop for VulkanObjects {
    fn drop(&mut self) {
        for fence in self.fences.drain(..) {
            self.api.destroy_fence(fence);
        }
        if let Some(pool) = self.pool.take() {
            self.api.destroy_command_pool(pool);
        }
    }
}

struct VulkanSlot {
    command_buffer: NativeHandle,
    fence: NativeHandle,
    in_flight: bool,
}

struct VulkanState {
    api: Arc<dyn VulkanApi>,
    queue: NativeHandle,
    ring: FrameRing<VulkanSlot>,
    counter: FrameCounter,
    context: Option<Box<dyn RenderContext>>,
    // Dropped after `context`; see `Drop`.
    _objects: VulkanObjects,
}

impl VulkanState {
    fn render(&mut self, drawable: &dyn Drawable, target: RenderTarget) -> Result<FrameOutcome, BackendError> {
        let Self { api, queue, ring, counter, context, .. } = self;
        let Some(context) = context.as_deref_mut() else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoBackend));
        };

        let slot = ring.advance();
        if slot.in_flight {
            api.wait_for_fence(slot.fence)?;
            api.reset_fence(slot.fence)?;
            slot.in_flight = false;
        }

        api.begin_command_buffer(slot.command_buffer)?;

        let frame = counter.advance();
        context.begin_frame(&FrameDescriptor::cleared(target.width, target.height));
        drawable.draw(context.renderer());
        let flushed = context.flush(FlushResources {
            render_target: &target,
            commands: ExternalCommands::Vulkan(slot.command_buffer),
            frame,
        });
        // Leave the buffer executable so the slot can begin it again next time round.
        let ended = api.end_command_buffer(slot.command_buffer);
        flushed?;
        ended?;

        api.queue_submit(*queue, slot.command_buffer, slot.fence)?;
        slot.in_flight = true;

        Ok(FrameOutcome::Rendered { frame: frame.current })
    }
}

impl Drop for VulkanState {
    fn drop(&mut self) {
        if let Err(e) = self.api.queue_wait_idle(self.queue) {
            log::warn!("vulkan teardown: {e}");
        }
        // The library context references the device; release it before the pool.
        self.context.take();
    }
}

/// Vulkan implementation of [`BackendManager`].
pub struct VulkanBackend {
    loader: Arc<dyn VulkanLoader>,
    provider: Arc<dyn RenderContextProvider>,
    state: Option<VulkanState>,
}

impl VulkanBackend {
    pub fn new(loader: Arc<dyn VulkanLoader>, provider: Arc<dyn RenderContextProvider>) -> Self {
        Self { loader, provider, state: None }
    }

    /// Frames submitted since initialize.
    pub fn frames_rendered(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.counter.last())
    }
}

impl BackendManager for VulkanBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Vulkan
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
            return Err(BackendError::AlreadyActive(GraphicsApi::Vulkan));
        }

        let device = host.rendering_device().ok_or(BackendError::NoRenderingDevice)?;
        let handle = |kind, name| {
            device
                .driver_resource(kind, Rid::INVALID, 0)
                .ok_or(BackendError::MissingHandle(name))
        };
        let instance = handle(DriverResource::TopmostObject, "vulkan instance")?;
        let physical_device = handle(DriverResource::PhysicalDevice, "vulkan physical device")?;
        let logical_device = handle(DriverResource::LogicalDevice, "vulkan device")?;

        let api = self.loader.load(instance, physical_device, logical_device)?;
        let family = api.graphics_queue_family().ok_or(BackendError::NoGraphicsQueue)?;
        let queue = api
            .device_queue(family)
            .ok_or(BackendError::MissingHandle("vulkan graphics queue"))?;

        let mut objects = VulkanObjects::new(api.clone());
        let pool = objects.create_pool(family)?;
        let ring_size = config.ring_size();
        let buffers = api.allocate_command_buffers(pool, ring_size as u32)?;
        let slots = buffers
            .into_iter()
            .map(|command_buffer| -> Result<VulkanSlot, NativeError> {
                Ok(VulkanSlot {
                    command_buffer,
                    fence: objects.create_fence()?,
                    in_flight: false,
                })
            })
            .collect::<Result<Vec<_>, NativeError>>()?;
        let ring = FrameRing::new(slots)
            .ok_or(NativeError::other("vkAllocateCommandBuffers", 0))?;

        let handles = VulkanContextHandles {
            instance,
            physical_device,
            device: logical_device,
            features: api.physical_device_features(),
            api: api.clone(),
        };
        let context = self
            .provider
            .make_vulkan(&handles)
            .ok_or(BackendError::ContextConstruction(GraphicsApi::Vulkan))?;

        registry.set_factory(&context.factory());
        log::debug!("vulkan: queue family {family}, {} frame slots", ring.len());

        self.state = Some(VulkanState {
            api,
            queue,
            ring,
            counter: FrameCounter::default(),
            context: Some(context),
            _objects: objects,
        });
        log::info!("vulkan backend initialized");
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
        let Some(device) = host.rendering_device() else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoRenderingDevice));
        };

        let image = device.driver_resource(DriverResource::Texture, target, 0);
        let view = device.driver_resource(DriverResource::TextureView, target, 0);
        let (Some(image), Some(view)) = (image, view) else {
            return Ok(FrameOutcome::Skipped(SkipReason::MissingTexture));
        };
        let Some(format) = device.driver_resource(DriverResource::TextureDataFormat, target, 0) else {
            return Ok(FrameOutcome::Skipped(SkipReason::MissingFormat));
        };

        let target = RenderTarget {
            width,
            height,
            surface: RenderSurface::Vulkan(VulkanImageTarget::sampled(image, view, format.raw() as u32)),
        };
        state.render(drawable, target)
    }

    fn teardown(&mut self, registry: &RenderRegistry) {
        registry.clear_factory();
        if self.state.take().is_some() {
            log::info!("vulkan backend torn down");
        }
    }
}
