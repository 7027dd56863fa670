//! Backend context managers, one per graphics API.
//!
//! Each manager owns the native queue, the per-frame command/fence ring and the
//! library render context for its API. They share one contract,
//! [`BackendManager`], and are selected once at startup by the
//! [`DispatchRouter`](crate::router::DispatchRouter).
//!
//! Native API calls go through small traits ([`VulkanApi`], [`D3D12Api`],
//! [`MetalApi`], [`GlApi`]) so the managers carry the frame logic while the
//! embedder (or the `headless` software implementation) supplies the bindings.
//! Those the vector library also sees live in [`host::native`](crate::host::native).

pub mod d3d12;
mod error;
mod frame;
pub mod metal;
pub mod native;
pub mod opengl;
pub mod vulkan;

use std::sync::Arc;

use crate::core::BridgeConfig;
use crate::host::{GraphicsApi, RenderingServer, Rid};
use crate::registry::{Drawable, RenderRegistry};

pub use crate::host::native::{GlApi, NativeError, NativeErrorKind, OwnedGlTexture, VulkanApi};
pub use d3d12::{D3D12Api, D3D12Backend};
pub use error::BackendError;
pub use frame::{FrameOutcome, FrameRing, SkipReason};
pub(crate) use frame::precheck;
pub use metal::{MetalApi, MetalBackend};
pub use opengl::GlBackend;
pub use vulkan::{VulkanBackend, VulkanLoader};

/// Frames recorded ahead of GPU completion when not configured otherwise.
pub const DEFAULT_FRAME_RING_SIZE: usize = 2;

/// Upper bound accepted for the frame ring.
pub const MAX_FRAME_RING_SIZE: usize = 8;

/// Contract shared by the four backend context managers.
pub trait BackendManager: Send {
    fn api(&self) -> GraphicsApi;

    fn is_initialized(&self) -> bool;

    /// Builds the native queue, frame ring and library context, then publishes
    /// the context's factory in `registry`. On error every object created so
    /// far has been released.
    fn initialize(
        &mut self,
        host: &dyn RenderingServer,
        registry: &RenderRegistry,
        config: &BridgeConfig,
    ) -> Result<(), BackendError>;

    /// Renders `drawable` into the host texture `target`.
    ///
    /// Missing handles, an empty size or a missing drawable skip the frame.
    /// Errors are reserved for failed native calls.
    fn render_frame(
        &mut self,
        host: &dyn RenderingServer,
        target: Rid,
        drawable: Option<&dyn Drawable>,
        width: u32,
        height: u32,
    ) -> Result<FrameOutcome, BackendError>;

    /// Waits for outstanding GPU work and releases everything `initialize`
    /// created. The registry's factory is cleared.
    fn teardown(&mut self, registry: &RenderRegistry);

    /// GL entry points, for the OpenGL texture import fast path.
    fn gl(&self) -> Option<Arc<dyn GlApi>> {
        None
    }
}
