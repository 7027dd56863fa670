use std::sync::Arc;

use super::{HostImage, NativeHandle, Rid, TextureDescriptor};

/// Native objects the host can expose from its rendering device.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DriverResource {
    /// `VkDevice`, `ID3D12Device*`, `MTLDevice`.
    LogicalDevice,
    /// `VkPhysicalDevice`.
    PhysicalDevice,
    /// `VkInstance`. The D3D12 and Metal hosts may return the device again.
    TopmostObject,
    /// Native image/resource/texture behind a texture rid.
    Texture,
    /// Native image view behind a texture rid.
    TextureView,
    /// Native pixel format value (`VkFormat`, `DXGI_FORMAT`, `MTLPixelFormat`).
    TextureDataFormat,
}

/// Low-level device abstraction of hosts running Vulkan, D3D12 or Metal.
pub trait RenderingDevice: Send + Sync {
    /// Native handle for `kind`. `rid` is ignored for device-level kinds.
    /// `None` means the resource is unavailable.
    fn driver_resource(&self, kind: DriverResource, rid: Rid, index: u64) -> Option<NativeHandle>;

    /// Allocates a texture. Returns `Rid::INVALID` on failure.
    fn texture_create(&self, desc: &TextureDescriptor) -> Rid;

    /// Frees a rid allocated by this device.
    fn free_rid(&self, rid: Rid);
}

/// Host-side texture wrapper that presents a device texture without a copy.
pub trait HostTextureView: Send + Sync {
    fn set_texture_rid(&self, rid: Rid);
    fn texture_rid(&self) -> Rid;
}

/// High-level rendering service of the host.
pub trait RenderingServer: Send + Sync {
    /// Name of the active driver ("vulkan", "d3d12", "metal", "opengl3").
    fn driver_name(&self) -> String;

    /// The rendering device, absent on the raw OpenGL renderer.
    fn rendering_device(&self) -> Option<Arc<dyn RenderingDevice>>;

    /// Registers a CPU image as a 2D texture. Returns `Rid::INVALID` on failure.
    fn texture_2d_create(&self, image: &HostImage) -> Rid;

    /// Frees a rid allocated by this server.
    fn free_rid(&self, rid: Rid);

    /// Native handle of a server texture (the GL texture name on OpenGL).
    fn texture_native_handle(&self, rid: Rid) -> Option<NativeHandle>;

    /// CPU readback of a texture, rows top to bottom.
    fn texture_get_image(&self, rid: Rid) -> Option<HostImage>;

    /// Creates an unbound host texture view.
    fn texture_view_create(&self) -> Arc<dyn HostTextureView>;
}
