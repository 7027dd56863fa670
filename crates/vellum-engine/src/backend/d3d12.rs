//! D3D12 backend manager.
//!
//! Owns a direct command queue, one fence with a monotonic value, and a ring
//! of command allocator/list pairs. Host textures created with a typeless
//! format cannot be bound as render targets, so those frames render into a
//! concrete-format intermediate and copy the result back.

use std::sync::Arc;

use crate::core::BridgeConfig;
use crate::host::native::DxgiFormat;
use crate::host::{DriverResource, GraphicsApi, NativeHandle, RenderingServer, Rid};
use crate::registry::{Drawable, RenderRegistry};
use crate::vector::{
    D3DContextOptions, ExternalCommands, FlushResources, FrameCounter, FrameDescriptor, RenderContext,
    RenderContextProvider, RenderSurface, RenderTarget,
};

use super::{precheck, BackendError, BackendManager, FrameOutcome, FrameRing, NativeError, SkipReason};

/// PCI vendor id of Intel adapters.
pub const INTEL_VENDOR_ID: u32 = 0x8086;

/// `D3D12_RESOURCE_STATES` the manager moves resources through.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum ResourceState {
    Common = 0,
    RenderTarget = 0x4,
    PixelShaderResource = 0x80,
    CopyDest = 0x400,
    CopySource = 0x800,
}

/// Subset of `D3D12_RESOURCE_DESC`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResourceDesc {
    pub width: u64,
    pub height: u32,
    pub format: DxgiFormat,
}

/// The D3D12 calls the manager makes.
///
/// Objects returned by the `create_*` methods are owned by the caller and
/// handed back through [`release`](D3D12Api::release).
pub trait D3D12Api: Send + Sync {
    /// Vendor id of the adapter behind `device`, if it can be resolved.
    fn adapter_vendor_id(&self, device: NativeHandle) -> Option<u32>;

    fn create_command_queue(&self, device: NativeHandle) -> Result<NativeHandle, NativeError>;

    fn create_command_allocator(&self, device: NativeHandle) -> Result<NativeHandle, NativeError>;

    /// Direct command list recording into `allocator`, returned open.
    fn create_command_list(&self, device: NativeHandle, allocator: NativeHandle) -> Result<NativeHandle, NativeError>;

    fn close_command_list(&self, list: NativeHandle) -> Result<(), NativeError>;

    /// Only valid once the GPU has finished every list recorded from it.
    fn reset_command_allocator(&self, allocator: NativeHandle) -> Result<(), NativeError>;

    /// Reopens a closed list over `allocator`.
    fn reset_command_list(&self, list: NativeHandle, allocator: NativeHandle) -> Result<(), NativeError>;

    fn execute_command_list(&self, queue: NativeHandle, list: NativeHandle);

    fn create_fence(&self, device: NativeHandle, initial_value: u64) -> Result<NativeHandle, NativeError>;

    fn signal(&self, queue: NativeHandle, fence: NativeHandle, value: u64) -> Result<(), NativeError>;

    fn completed_value(&self, fence: NativeHandle) -> u64;

    /// Blocks until the fence reaches `value`. No timeout.
    fn wait_for_value(&self, fence: NativeHandle, value: u64) -> Result<(), NativeError>;

    fn resource_desc(&self, resource: NativeHandle) -> Option<ResourceDesc>;

    /// Default-heap 2D texture usable as render target.
    fn create_committed_texture(
        &self,
        device: NativeHandle,
        width: u32,
        height: u32,
        format: DxgiFormat,
        initial_state: ResourceState,
    ) -> Result<NativeHandle, NativeError>;

    fn resource_barrier(&self, list: NativeHandle, resource: NativeHandle, before: ResourceState, after: ResourceState);

    fn copy_resource(&self, list: NativeHandle, dst: NativeHandle, src: NativeHandle);

    /// Drops one reference to a COM object.
    fn release(&self, object: NativeHandle);
}

/// Owned reference to a D3D12 object, released on drop.
pub struct D3DObject {
    api: Arc<dyn D3D12Api>,
    raw: NativeHandle,
}

impl D3DObject {
    pub fn new(api: &Arc<dyn D3D12Api>, raw: NativeHandle) -> Self {
        Self { api: api.clone(), raw }
    }

    #[inline]
    pub fn raw(&self) -> NativeHandle {
        self.raw
    }
}

impl Drop for D3DObject {
    fn drop(&mut self) {
        self.api.release(self.raw);
    }
}

impl std::fmt::Debug for D3DObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("D3DObject").field(&self.raw).finish()
    }
}

fn transition(
    api: &dyn D3D12Api,
    list: NativeHandle,
    resource: NativeHandle,
    before: ResourceState,
    after: ResourceState,
) {
    if before != after {
        api.resource_barrier(list, resource, before, after);
    }
}

struct D3D12Slot {
    allocator: D3DObject,
    list: D3DObject,
    /// Fence value signaled after this slot's last submission. 0 if never used.
    fence_value: u64,
}

struct Intermediate {
    texture: D3DObject,
    width: u32,
    height: u32,
    format: DxgiFormat,
}

struct D3D12State {
    api: Arc<dyn D3D12Api>,
    device: NativeHandle,
    context: Option<Box<dyn RenderContext>>,
    ring: FrameRing<D3D12Slot>,
    intermediate: Option<Intermediate>,
    counter: FrameCounter,
    fence_value: u64,
    fence: D3DObject,
    queue: D3DObject,
}

impl D3D12State {
    fn wait_for(&self, value: u64) -> Result<(), NativeError> {
        if value > self.api.completed_value(self.fence.raw()) {
            self.api.wait_for_value(self.fence.raw(), value)?;
        }
        Ok(())
    }

    fn ensure_intermediate(&mut self, width: u32, height: u32, format: DxgiFormat) -> Result<NativeHandle, NativeError> {
        if let Some(i) = &self.intermediate {
            if i.width == width && i.height == height && i.format == format {
                return Ok(i.texture.raw());
            }
        }
        // The old texture may still be referenced by frames in flight.
        self.wait_for(self.fence_value)?;
        self.intermediate = None;

        let raw = self
            .api
            .create_committed_texture(self.device, width, height, format, ResourceState::Common)?;
        let texture = D3DObject::new(&self.api, raw);
        log::debug!("d3d12: intermediate texture {width}x{height} format {}", format.0);
        self.intermediate = Some(Intermediate { texture, width, height, format });
        Ok(raw)
    }

    fn render(
        &mut self,
        drawable: &dyn Drawable,
        image: NativeHandle,
        format: DxgiFormat,
        width: u32,
        height: u32,
    ) -> Result<FrameOutcome, BackendError> {
        if self.context.is_none() {
            return Ok(FrameOutcome::Skipped(SkipReason::NoBackend));
        }

        let (allocator, list, slot_fence) = {
            let slot = self.ring.advance();
            (slot.allocator.raw(), slot.list.raw(), slot.fence_value)
        };
        self.wait_for(slot_fence)?;
        self.api.reset_command_allocator(allocator)?;
        self.api.reset_command_list(list, allocator)?;

        let recorded = self.record(list, drawable, image, format, width, height);
        // A list must be closed before it can be reset, even if recording failed.
        let closed = self.api.close_command_list(list);
        let frame = recorded?;
        closed?;

        self.api.execute_command_list(self.queue.raw(), list);
        self.fence_value += 1;
        self.api.signal(self.queue.raw(), self.fence.raw(), self.fence_value)?;
        self.ring.current_mut().fence_value = self.fence_value;

        Ok(FrameOutcome::Rendered { frame })
    }

    fn record(
        &mut self,
        list: NativeHandle,
        drawable: &dyn Drawable,
        image: NativeHandle,
        format: DxgiFormat,
        width: u32,
        height: u32,
    ) -> Result<u64, BackendError> {
        use ResourceState::{Common, CopyDest, CopySource, PixelShaderResource};

        let intermediate = match format.concrete_alias() {
            Some(concrete) => Some((self.ensure_intermediate(width, height, concrete)?, concrete)),
            None => None,
        };
        let api = self.api.as_ref();

        let surface = match intermediate {
            Some((texture, concrete)) => {
                transition(api, list, image, PixelShaderResource, CopySource);
                transition(api, list, texture, Common, CopyDest);
                api.copy_resource(list, texture, image);
                transition(api, list, texture, CopyDest, Common);
                transition(api, list, image, CopySource, PixelShaderResource);
                RenderSurface::D3D12 { resource: texture, format: concrete }
            }
            None => {
                transition(api, list, image, PixelShaderResource, Common);
                RenderSurface::D3D12 { resource: image, format }
            }
        };

        let Some(context) = self.context.as_deref_mut() else {
            return Err(BackendError::ContextConstruction(GraphicsApi::D3D12));
        };
        let target = RenderTarget { width, height, surface };
        let frame = self.counter.advance();
        context.begin_frame(&FrameDescriptor::cleared(width, height));
        drawable.draw(context.renderer());
        context.flush(FlushResources {
            render_target: &target,
            commands: ExternalCommands::D3D12 { copy: list, direct: list },
            frame,
        })?;

        match intermediate {
            Some((texture, _)) => {
                transition(api, list, texture, Common, CopySource);
                transition(api, list, image, PixelShaderResource, CopyDest);
                api.copy_resource(list, image, texture);
                transition(api, list, image, CopyDest, PixelShaderResource);
                transition(api, list, texture, CopySource, Common);
            }
            None => transition(api, list, image, Common, PixelShaderResource),
        }
        Ok(frame.current)
    }
}

impl Drop for D3D12State {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for(self.fence_value) {
            log::warn!("d3d12 teardown: {e}");
        }
        self.context.take();
    }
}

/// D3D12 implementation of [`BackendManager`].
pub struct D3D12Backend {
    api: Arc<dyn D3D12Api>,
    provider: Arc<dyn RenderContextProvider>,
    state: Option<D3D12State>,
}

impl D3D12Backend {
    pub fn new(api: Arc<dyn D3D12Api>, provider: Arc<dyn RenderContextProvider>) -> Self {
        Self { api, provider, state: None }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.counter.last())
    }

    /// Size of the typeless-format intermediate, if one has been created.
    pub fn intermediate_size(&self) -> Option<(u32, u32)> {
        let i = self.state.as_ref()?.intermediate.as_ref()?;
        Some((i.width, i.height))
    }
}

impl BackendManager for D3D12Backend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::D3D12
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
            return Err(BackendError::AlreadyActive(GraphicsApi::D3D12));
        }

        let rd = host.rendering_device().ok_or(BackendError::NoRenderingDevice)?;
        let device = rd
            .driver_resource(DriverResource::LogicalDevice, Rid::INVALID, 0)
            .ok_or(BackendError::MissingHandle("d3d12 device"))?;
        let api = self.api.clone();

        let options = D3DContextOptions {
            is_intel: api.adapter_vendor_id(device) == Some(INTEL_VENDOR_ID),
        };

        // The library records its start-up uploads into a temporary list.
        let startup_allocator = D3DObject::new(&api, api.create_command_allocator(device)?);
        let startup_list = D3DObject::new(&api, api.create_command_list(device, startup_allocator.raw())?);
        let context = self
            .provider
            .make_d3d12(device, startup_list.raw(), &options)
            .ok_or(BackendError::ContextConstruction(GraphicsApi::D3D12))?;
        api.close_command_list(startup_list.raw())?;

        let queue = D3DObject::new(&api, api.create_command_queue(device)?);
        api.execute_command_list(queue.raw(), startup_list.raw());
        let fence = D3DObject::new(&api, api.create_fence(device, 0)?);
        api.signal(queue.raw(), fence.raw(), 1)?;
        if api.completed_value(fence.raw()) < 1 {
            api.wait_for_value(fence.raw(), 1)?;
        }

        let slots = (0..config.ring_size())
            .map(|_| -> Result<D3D12Slot, NativeError> {
                let allocator = D3DObject::new(&api, api.create_command_allocator(device)?);
                let list = D3DObject::new(&api, api.create_command_list(device, allocator.raw())?);
                api.close_command_list(list.raw())?;
                Ok(D3D12Slot { allocator, list, fence_value: 0 })
            })
            .collect::<Result<Vec<_>, NativeError>>()?;
        let ring = FrameRing::new(slots).ok_or(NativeError::other("CreateCommandList", 0))?;

        registry.set_factory(&context.factory());
        log::debug!("d3d12: intel workarounds {}, {} frame slots", options.is_intel, ring.len());

        self.state = Some(D3D12State {
            api,
            device,
            context: Some(context),
            ring,
            intermediate: None,
            counter: FrameCounter::default(),
            fence_value: 1,
            fence,
            queue,
        });
        log::info!("d3d12 backend initialized");
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
        let Some(image) = rd.driver_resource(DriverResource::Texture, target, 0) else {
            return Ok(FrameOutcome::Skipped(SkipReason::MissingTexture));
        };
        // The resource description carries the typeless format; the driver's
        // format query reports the view format.
        let Some(desc) = state.api.resource_desc(image) else {
            return Ok(FrameOutcome::Skipped(SkipReason::MissingFormat));
        };

        state.render(drawable, image, desc.format, width, height)
    }

    fn teardown(&mut self, registry: &RenderRegistry) {
        registry.clear_factory();
        if self.state.take().is_some() {
            log::info!("d3d12 backend torn down");
        }
    }
}
