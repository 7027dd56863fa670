//! Capability set of the embedded vector-graphics library.
//!
//! The library itself (path tessellation, GPU pipelines, animation state) is
//! external. The bridge talks to it through these traits: a [`RenderContext`] per
//! backend, the [`Factory`] it exposes for resource creation, and the
//! [`Renderer`] drawables record into.

mod context;
mod frame;
mod image;
mod path;
mod renderer;

pub use context::{
    D3DContextOptions, ExternalCommands, Factory, FlushResources, RenderContext,
    RenderContextProvider, RenderSurface, RenderTarget, VulkanContextHandles, VulkanImageTarget,
};
pub use frame::{FrameCounter, FrameDescriptor, FrameNumbers, LoadAction};
pub use image::RenderImage;
pub use path::{FillRule, Path, PathVerb};
pub use renderer::Renderer;

// GL textures handed to `Factory::adopt_gl_texture`.
pub use crate::host::native::OwnedGlTexture;
