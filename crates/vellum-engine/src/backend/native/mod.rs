//! Native API bindings for the backend traits, behind cargo features.
//!
//! D3D12, Metal and OpenGL entry points come from the embedder, which already
//! links against them; only the Vulkan loader can be resolved from the host's
//! handles alone.

#[cfg(feature = "vulkan")]
mod ash_vulkan;

#[cfg(feature = "vulkan")]
pub use ash_vulkan::AshVulkanLoader;
