use std::sync::Arc;

use crate::host::native::{DxgiFormat, GlApi, NativeError, OwnedGlTexture, VulkanApi, VulkanFeatures};
use crate::host::NativeHandle;

use super::{FrameDescriptor, FrameNumbers, RenderImage, Renderer};

/// Resource factory of an initialized library context.
///
/// The render registry publishes the active factory; the import bridge uses it
/// to turn host textures into library images.
pub trait Factory: Send + Sync {
    /// Decodes an encoded image (PNG at least).
    fn decode_image(&self, encoded: &[u8]) -> Option<Arc<dyn RenderImage>>;

    /// Takes ownership of a GL texture. The library deletes it when the image
    /// is released; returning `None` drops (and deletes) it immediately.
    fn adopt_gl_texture(&self, texture: OwnedGlTexture, width: u32, height: u32) -> Option<Arc<dyn RenderImage>> {
        let _ = (texture, width, height);
        None
    }

    /// Wraps a native `MTLTexture` without copying.
    fn wrap_metal_texture(&self, texture: NativeHandle, width: u32, height: u32) -> Option<Arc<dyn RenderImage>> {
        let _ = (texture, width, height);
        None
    }
}

/// Last known state of a Vulkan image handed to the library.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VulkanImageTarget {
    pub image: NativeHandle,
    pub view: NativeHandle,
    /// `VkFormat`.
    pub format: u32,
    /// `VkImageUsageFlags`.
    pub usage: u32,
    /// `VkImageLayout`.
    pub last_layout: i32,
    /// `VkAccessFlags`.
    pub last_access: u32,
    /// `VkPipelineStageFlags`.
    pub last_stage: u32,
}

impl VulkanImageTarget {
    /// `TRANSFER_SRC | TRANSFER_DST | SAMPLED | COLOR_ATTACHMENT`.
    pub const HOST_TEXTURE_USAGE: u32 = 0x17;
    /// `SHADER_READ_ONLY_OPTIMAL`.
    pub const SHADER_READ_ONLY_LAYOUT: i32 = 5;
    /// `SHADER_READ`.
    pub const SHADER_READ_ACCESS: u32 = 0x20;
    /// `FRAGMENT_SHADER`.
    pub const FRAGMENT_SHADER_STAGE: u32 = 0x80;

    /// Host textures are sampled by the host between frames, so they are
    /// handed over in shader-read layout.
    pub fn sampled(image: NativeHandle, view: NativeHandle, format: u32) -> Self {
        Self {
            image,
            view,
            format,
            usage: Self::HOST_TEXTURE_USAGE,
            last_layout: Self::SHADER_READ_ONLY_LAYOUT,
            last_access: Self::SHADER_READ_ACCESS,
            last_stage: Self::FRAGMENT_SHADER_STAGE,
        }
    }
}

/// Backend-specific destination of a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderSurface {
    Vulkan(VulkanImageTarget),
    D3D12 { resource: NativeHandle, format: DxgiFormat },
    Metal { texture: NativeHandle },
    Gl { texture: u32 },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub surface: RenderSurface,
}

/// Command stream the library records into at flush. `None` means the library
/// issues its commands immediately (OpenGL).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExternalCommands {
    None,
    Vulkan(NativeHandle),
    D3D12 { copy: NativeHandle, direct: NativeHandle },
    Metal(NativeHandle),
}

/// Arguments of `RenderContext::flush`.
#[derive(Debug, Copy, Clone)]
pub struct FlushResources<'a> {
    pub render_target: &'a RenderTarget,
    pub commands: ExternalCommands,
    pub frame: FrameNumbers,
}

/// A library GPU context bound to one backend.
pub trait RenderContext: Send {
    fn factory(&self) -> Arc<dyn Factory>;

    fn begin_frame(&mut self, frame: &FrameDescriptor);

    /// Renderer for the frame opened by `begin_frame`.
    fn renderer(&mut self) -> &mut dyn Renderer;

    /// Records the frame's GPU work into `resources.commands`.
    fn flush(&mut self, resources: FlushResources<'_>) -> Result<(), NativeError>;

    /// Forgets cached GL bindings; the host may have changed them since the last frame.
    fn invalidate_gl_state(&mut self) {}

    /// Unbinds the library's GL objects so the host finds a clean context.
    fn unbind_gl_internal_resources(&mut self) {}
}

/// Native handles a Vulkan context is built from.
#[derive(Clone)]
pub struct VulkanContextHandles {
    pub instance: NativeHandle,
    pub physical_device: NativeHandle,
    pub device: NativeHandle,
    pub features: VulkanFeatures,
    pub api: Arc<dyn VulkanApi>,
}

/// Options of the D3D12 context.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct D3DContextOptions {
    /// Enables driver workarounds for Intel adapters.
    pub is_intel: bool,
}

/// Backend-specific context constructors of the library.
///
/// Each defaults to `None`, which the backend managers report as a context
/// construction failure.
pub trait RenderContextProvider: Send + Sync {
    fn make_vulkan(&self, handles: &VulkanContextHandles) -> Option<Box<dyn RenderContext>> {
        let _ = handles;
        None
    }

    /// `startup_list` is an open command list for the context's initial uploads.
    fn make_d3d12(
        &self,
        device: NativeHandle,
        startup_list: NativeHandle,
        options: &D3DContextOptions,
    ) -> Option<Box<dyn RenderContext>> {
        let _ = (device, startup_list, options);
        None
    }

    fn make_metal(&self, device: NativeHandle, queue: NativeHandle) -> Option<Box<dyn RenderContext>> {
        let _ = (device, queue);
        None
    }

    fn make_gl(&self, gl: &Arc<dyn GlApi>) -> Option<Box<dyn RenderContext>> {
        let _ = gl;
        None
    }
}
