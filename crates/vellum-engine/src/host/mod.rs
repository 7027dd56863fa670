//! Host renderer interface.
//!
//! The bridge never owns the host's device. Everything it needs (native handles,
//! texture allocation, readback, views for presentation) is requested through the
//! traits in this module, implemented by the embedding application.

mod api;
mod handle;
pub mod native;
mod server;
mod texture;

pub use api::GraphicsApi;
pub use handle::{NativeHandle, Rid};
pub use server::{DriverResource, HostTextureView, RenderingDevice, RenderingServer};
pub use texture::{HostImage, HostTexture, TextureDescriptor, TextureFormat, TextureUsage};
