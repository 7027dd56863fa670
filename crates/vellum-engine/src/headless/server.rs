use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::d3d12::ResourceState;
use crate::host::native::DxgiFormat;
use crate::host::{
    DriverResource, GraphicsApi, HostImage, HostTextureView, NativeHandle, RenderingDevice, RenderingServer, Rid,
    TextureDescriptor,
};

use super::gpu::{flip_rows, SoftGpu};

/// `VK_FORMAT_R8G8B8A8_UNORM`.
const VK_FORMAT_RGBA8_UNORM: u64 = 37;
/// `MTLPixelFormatRGBA8Unorm`.
const MTL_PIXEL_FORMAT_RGBA8_UNORM: u64 = 70;
/// View handles live above every object handle the software GPU hands out.
const VIEW_HANDLE_BASE: u64 = 1 << 48;

/// Texture allocations per host abstraction.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AllocationCounts {
    pub device_allocs: u32,
    pub device_frees: u32,
    pub server_allocs: u32,
    pub server_frees: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Allocator {
    Device,
    Server,
}

struct HostEntry {
    handle: NativeHandle,
    allocator: Allocator,
    view: NativeHandle,
}

struct ServerState {
    driver_name: String,
    device_available: bool,
    typeless: bool,
    hidden: HashSet<DriverResource>,
    textures: HashMap<Rid, HostEntry>,
    next_rid: u64,
    counts: AllocationCounts,
    violations: Vec<String>,
}

struct ServerInner {
    api: GraphicsApi,
    gpu: Arc<SoftGpu>,
    state: Mutex<ServerState>,
}

impl ServerInner {
    fn register(&self, handle: NativeHandle, allocator: Allocator) -> Rid {
        let mut s = self.state.lock();
        let rid = Rid::new(s.next_rid);
        s.next_rid += 1;
        let view = SoftGpu::handle(VIEW_HANDLE_BASE | rid.raw());
        s.textures.insert(rid, HostEntry { handle, allocator, view });
        match allocator {
            Allocator::Device => s.counts.device_allocs += 1,
            Allocator::Server => s.counts.server_allocs += 1,
        }
        rid
    }

    fn free(&self, rid: Rid, through: Allocator) {
        let handle = {
            let mut s = self.state.lock();
            match s.textures.get(&rid).map(|e| e.allocator) {
                None => {
                    s.violations.push(format!("{through:?} free of unknown rid {}", rid.raw()));
                    return;
                }
                Some(owner) if owner != through => {
                    s.violations.push(format!("{through:?} free of {owner:?} rid {}", rid.raw()));
                    return;
                }
                Some(_) => {}
            }
            match through {
                Allocator::Device => s.counts.device_frees += 1,
                Allocator::Server => s.counts.server_frees += 1,
            }
            s.textures.remove(&rid).map(|e| e.handle)
        };
        if let Some(handle) = handle {
            self.gpu.destroy_object(handle);
        }
    }

    fn entry(&self, rid: Rid) -> Option<(NativeHandle, NativeHandle)> {
        self.state.lock().textures.get(&rid).map(|e| (e.handle, e.view))
    }

    /// GL textures are stored bottom-up.
    fn storage_rows(&self, rgba: &[u8], width: u32) -> Vec<u8> {
        match self.api {
            GraphicsApi::OpenGl => flip_rows(rgba, width),
            _ => rgba.to_vec(),
        }
    }
}

/// Host rendering server over the software GPU.
///
/// Records every allocation and free per abstraction and reports frees of
/// unknown rids or through the wrong abstraction as violations instead of
/// crashing.
#[derive(Clone)]
pub struct SoftRenderingServer {
    inner: Arc<ServerInner>,
}

impl SoftRenderingServer {
    pub fn new(api: GraphicsApi, gpu: Arc<SoftGpu>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                api,
                gpu,
                state: Mutex::new(ServerState {
                    driver_name: api.driver_name().to_owned(),
                    device_available: api.has_rendering_device(),
                    typeless: false,
                    hidden: HashSet::new(),
                    textures: HashMap::new(),
                    next_rid: 1,
                    counts: AllocationCounts::default(),
                    violations: Vec::new(),
                }),
            }),
        }
    }

    pub fn set_driver_name(&self, name: &str) {
        self.inner.state.lock().driver_name = name.to_owned();
    }

    pub fn set_rendering_device_available(&self, available: bool) {
        self.inner.state.lock().device_available = available;
    }

    /// Makes `driver_resource` return `None` for `kind`.
    pub fn hide_driver_resource(&self, kind: DriverResource) {
        self.inner.state.lock().hidden.insert(kind);
    }

    /// Device textures created from now on use a typeless format on D3D12.
    pub fn set_typeless_textures(&self, typeless: bool) {
        self.inner.state.lock().typeless = typeless;
    }

    pub fn native_texture(&self, rid: Rid) -> Option<NativeHandle> {
        self.inner.entry(rid).map(|(handle, _)| handle)
    }

    pub fn counts(&self) -> AllocationCounts {
        self.inner.state.lock().counts
    }

    pub fn violations(&self) -> Vec<String> {
        self.inner.state.lock().violations.clone()
    }
}

impl RenderingServer for SoftRenderingServer {
    fn driver_name(&self) -> String {
        self.inner.state.lock().driver_name.clone()
    }

    fn rendering_device(&self) -> Option<Arc<dyn RenderingDevice>> {
        if !self.inner.api.has_rendering_device() || !self.inner.state.lock().device_available {
            return None;
        }
        Some(Arc::new(SoftRenderingDevice { inner: self.inner.clone() }))
    }

    fn texture_2d_create(&self, image: &HostImage) -> Rid {
        if image.width == 0 || image.height == 0 || !image.is_well_formed() {
            return Rid::INVALID;
        }
        let rgba = self.inner.storage_rows(&image.data, image.width);
        let handle = self.inner.gpu.create_texture(
            image.width,
            image.height,
            DxgiFormat::R8G8B8A8_UNORM,
            ResourceState::Common,
            Some(rgba),
        );
        self.inner.register(handle, Allocator::Server)
    }

    fn free_rid(&self, rid: Rid) {
        self.inner.free(rid, Allocator::Server);
    }

    fn texture_native_handle(&self, rid: Rid) -> Option<NativeHandle> {
        self.native_texture(rid)
    }

    fn texture_get_image(&self, rid: Rid) -> Option<HostImage> {
        let (handle, _) = self.inner.entry(rid)?;
        let texture = self.inner.gpu.texture(handle)?;
        let data = self.inner.storage_rows(&texture.rgba, texture.width);
        Some(HostImage { width: texture.width, height: texture.height, data })
    }

    fn texture_view_create(&self) -> Arc<dyn HostTextureView> {
        Arc::new(SoftTextureView::default())
    }
}

/// Rendering device of a [`SoftRenderingServer`].
pub struct SoftRenderingDevice {
    inner: Arc<ServerInner>,
}

impl RenderingDevice for SoftRenderingDevice {
    fn driver_resource(&self, kind: DriverResource, rid: Rid, _index: u64) -> Option<NativeHandle> {
        if self.inner.state.lock().hidden.contains(&kind) {
            return None;
        }
        let api = self.inner.api;
        match kind {
            DriverResource::LogicalDevice => Some(SoftGpu::handle(SoftGpu::DEVICE)),
            DriverResource::PhysicalDevice => {
                (api == GraphicsApi::Vulkan).then(|| SoftGpu::handle(SoftGpu::PHYSICAL_DEVICE))
            }
            DriverResource::TopmostObject => match api {
                GraphicsApi::Vulkan => Some(SoftGpu::handle(SoftGpu::INSTANCE)),
                _ => Some(SoftGpu::handle(SoftGpu::DEVICE)),
            },
            DriverResource::Texture => self.inner.entry(rid).map(|(handle, _)| handle),
            DriverResource::TextureView => self.inner.entry(rid).map(|(_, view)| view),
            DriverResource::TextureDataFormat => {
                self.inner.entry(rid)?;
                let format = match api {
                    GraphicsApi::Vulkan => VK_FORMAT_RGBA8_UNORM,
                    GraphicsApi::D3D12 => u64::from(DxgiFormat::R8G8B8A8_UNORM.0),
                    GraphicsApi::Metal => MTL_PIXEL_FORMAT_RGBA8_UNORM,
                    GraphicsApi::OpenGl => return None,
                };
                NativeHandle::new(format)
            }
        }
    }

    fn texture_create(&self, desc: &TextureDescriptor) -> Rid {
        if desc.width == 0 || desc.height == 0 {
            return Rid::INVALID;
        }
        let typeless = self.inner.state.lock().typeless;
        let (format, state) = match self.inner.api {
            GraphicsApi::D3D12 if typeless => (DxgiFormat::R8G8B8A8_TYPELESS, ResourceState::PixelShaderResource),
            GraphicsApi::D3D12 => (DxgiFormat::R8G8B8A8_UNORM, ResourceState::PixelShaderResource),
            _ => (DxgiFormat::R8G8B8A8_UNORM, ResourceState::Common),
        };
        let handle = self.inner.gpu.create_texture(desc.width, desc.height, format, state, None);
        self.inner.register(handle, Allocator::Device)
    }

    fn free_rid(&self, rid: Rid) {
        self.inner.free(rid, Allocator::Device);
    }
}

/// Host view that only remembers its bound rid.
#[derive(Default)]
pub struct SoftTextureView {
    rid: Mutex<Rid>,
}

impl HostTextureView for SoftTextureView {
    fn set_texture_rid(&self, rid: Rid) {
        *self.rid.lock() = rid;
    }

    fn texture_rid(&self) -> Rid {
        *self.rid.lock()
    }
}
