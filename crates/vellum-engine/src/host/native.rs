//! Native API surfaces shared by the backends and the vector library.
//!
//! The host's device, its GL context and its texture formats are seen through
//! these types by both sides of the bridge, so they live below either.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::NativeHandle;

/// Classification of a failed native API call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum NativeErrorKind {
    DeviceLost,
    OutOfMemory,
    /// Raw API result code (`VkResult`, `HRESULT`, GL error).
    Other(i64),
}

impl fmt::Display for NativeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeErrorKind::DeviceLost => f.write_str("device lost"),
            NativeErrorKind::OutOfMemory => f.write_str("out of memory"),
            NativeErrorKind::Other(code) => write!(f, "error code {code}"),
        }
    }
}

/// Failure of a single native API call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("{call} failed: {kind}")]
pub struct NativeError {
    pub call: &'static str,
    pub kind: NativeErrorKind,
}

impl NativeError {
    #[inline]
    pub const fn new(call: &'static str, kind: NativeErrorKind) -> Self {
        Self { call, kind }
    }

    #[inline]
    pub const fn other(call: &'static str, code: i64) -> Self {
        Self::new(call, NativeErrorKind::Other(code))
    }

    #[inline]
    pub const fn device_lost(call: &'static str) -> Self {
        Self::new(call, NativeErrorKind::DeviceLost)
    }
}

/// `DXGI_FORMAT` value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DxgiFormat(pub u32);

impl DxgiFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R8G8B8A8_TYPELESS: Self = Self(27);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const B8G8R8A8_UNORM: Self = Self(87);
    pub const B8G8R8A8_TYPELESS: Self = Self(90);

    pub fn is_typeless(self) -> bool {
        self.concrete_alias().is_some()
    }

    /// Renderable format with the same memory layout, for the typeless
    /// formats host textures are created with.
    pub fn concrete_alias(self) -> Option<Self> {
        match self {
            Self::R8G8B8A8_TYPELESS => Some(Self::R8G8B8A8_UNORM),
            Self::B8G8R8A8_TYPELESS => Some(Self::B8G8R8A8_UNORM),
            _ => None,
        }
    }
}

/// Physical device features the library adapts its pipelines to.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct VulkanFeatures {
    pub independent_blend: bool,
    pub fill_mode_non_solid: bool,
    pub fragment_stores_and_atomics: bool,
    pub shader_clip_distance: bool,
}

/// The Vulkan calls the manager makes, bound to one device.
pub trait VulkanApi: Send + Sync {
    fn physical_device_features(&self) -> VulkanFeatures;

    /// First queue family with graphics support.
    fn graphics_queue_family(&self) -> Option<u32>;

    fn device_queue(&self, family: u32) -> Option<NativeHandle>;

    /// Pool whose buffers can be reset individually.
    fn create_command_pool(&self, family: u32) -> Result<NativeHandle, NativeError>;

    fn allocate_command_buffers(&self, pool: NativeHandle, count: u32) -> Result<Vec<NativeHandle>, NativeError>;

    fn create_fence(&self) -> Result<NativeHandle, NativeError>;

    /// Blocks until the fence is signaled. No timeout.
    fn wait_for_fence(&self, fence: NativeHandle) -> Result<(), NativeError>;

    fn reset_fence(&self, fence: NativeHandle) -> Result<(), NativeError>;

    /// Begins one-time-submit recording, implicitly resetting the buffer.
    fn begin_command_buffer(&self, buffer: NativeHandle) -> Result<(), NativeError>;

    fn end_command_buffer(&self, buffer: NativeHandle) -> Result<(), NativeError>;

    fn queue_submit(&self, queue: NativeHandle, buffer: NativeHandle, fence: NativeHandle) -> Result<(), NativeError>;

    fn queue_wait_idle(&self, queue: NativeHandle) -> Result<(), NativeError>;

    fn destroy_fence(&self, fence: NativeHandle);

    /// Also frees every buffer allocated from the pool.
    fn destroy_command_pool(&self, pool: NativeHandle);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FramebufferTarget {
    Read,
    Draw,
}

/// The GL calls the manager and the texture import bridge make, on the
/// host's current context.
pub trait GlApi: Send + Sync {
    fn fence_sync(&self) -> Result<NativeHandle, NativeError>;

    /// Blocks until the sync object is signaled. No timeout.
    fn client_wait_sync(&self, sync: NativeHandle) -> Result<(), NativeError>;

    fn delete_sync(&self, sync: NativeHandle);

    fn flush(&self);

    /// New texture name, `None` if the driver returned 0.
    fn gen_texture(&self) -> Option<u32>;

    fn delete_texture(&self, texture: u32);

    /// `GL_TEXTURE_BINDING_2D`.
    fn texture_binding(&self) -> u32;

    fn bind_texture(&self, texture: u32);

    /// Allocates linear-filtered RGBA8 storage for the bound texture.
    fn tex_image_rgba8(&self, width: u32, height: u32);

    fn gen_framebuffer(&self) -> Option<u32>;

    fn delete_framebuffer(&self, framebuffer: u32);

    fn framebuffer_binding(&self, target: FramebufferTarget) -> u32;

    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: u32);

    /// Attaches `texture` as color attachment 0 of the bound framebuffer.
    fn framebuffer_texture(&self, target: FramebufferTarget, texture: u32);

    fn framebuffer_complete(&self, target: FramebufferTarget) -> bool;

    /// Nearest-filtered color blit of the full `width` x `height` rectangle.
    fn blit_framebuffer(&self, width: u32, height: u32);
}

/// A GL texture name with a single owner. Deleted on drop unless released
/// with [`into_raw`](OwnedGlTexture::into_raw).
pub struct OwnedGlTexture {
    gl: Arc<dyn GlApi>,
    name: u32,
}

impl OwnedGlTexture {
    /// Generates a new texture name.
    pub fn generate(gl: &Arc<dyn GlApi>) -> Option<Self> {
        let name = gl.gen_texture()?;
        Some(Self { gl: gl.clone(), name })
    }

    #[inline]
    pub fn name(&self) -> u32 {
        self.name
    }

    /// Gives up ownership. The caller becomes responsible for deleting it.
    pub fn into_raw(mut self) -> u32 {
        std::mem::take(&mut self.name)
    }
}

impl Drop for OwnedGlTexture {
    fn drop(&mut self) {
        if self.name != 0 {
            self.gl.delete_texture(self.name);
        }
    }
}

impl fmt::Debug for OwnedGlTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedGlTexture").field(&self.name).finish()
    }
}
