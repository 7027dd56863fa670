//! Software implementations of everything the bridge talks to: the host's
//! rendering server, the four native APIs and the vector-graphics library.
//!
//! All of them share one [`SoftGpu`], which tracks object lifetimes, executes
//! recorded command lists and reports misuse as validation errors. The bridge
//! runs unmodified on top; tests and the studio harness use [`HeadlessHost`]
//! to get a wired-up set.

mod artboard;
mod d3d12;
mod gl;
mod gpu;
mod library;
mod metal;
mod raster;
mod recording;
mod server;
mod vulkan;

use std::sync::Arc;

use crate::backend::{D3D12Api, D3D12Backend, GlApi, GlBackend, MetalApi, MetalBackend, VulkanBackend, VulkanLoader};
use crate::core::{Bridge, BridgeConfig};
use crate::host::{GraphicsApi, RenderingServer};
use crate::router::DispatchRouter;
use crate::vector::RenderContextProvider;

pub use artboard::ShapeArtboard;
pub use d3d12::SoftD3D12;
pub use gl::SoftGl;
pub use gpu::{GpuOp, GpuOpTrace, GpuStats, ObjectKind, SoftGpu, SoftTexture};
pub use library::{ImageSource, SoftFactory, SoftImage, SoftwareContext, SoftwareLibrary};
pub use metal::SoftMetal;
pub use raster::SoftRenderer;
pub use recording::{RecordingRenderer, RenderOp};
pub use server::{AllocationCounts, SoftRenderingDevice, SoftRenderingServer, SoftTextureView};
pub use vulkan::SoftVulkan;

/// A software host reporting `api` as its driver, with native bindings for
/// every API over one shared GPU.
pub struct HeadlessHost {
    api: GraphicsApi,
    gpu: Arc<SoftGpu>,
    server: Arc<SoftRenderingServer>,
    vulkan: Arc<SoftVulkan>,
    d3d12: Arc<SoftD3D12>,
    metal: Arc<SoftMetal>,
    gl: Arc<SoftGl>,
    library: Arc<SoftwareLibrary>,
}

impl HeadlessHost {
    pub fn new(api: GraphicsApi) -> Self {
        let gpu = Arc::new(SoftGpu::new());
        Self {
            api,
            server: Arc::new(SoftRenderingServer::new(api, gpu.clone())),
            vulkan: Arc::new(SoftVulkan::new(gpu.clone())),
            d3d12: Arc::new(SoftD3D12::new(gpu.clone())),
            metal: Arc::new(SoftMetal::new(gpu.clone())),
            gl: Arc::new(SoftGl::new(gpu.clone())),
            library: Arc::new(SoftwareLibrary::new(gpu.clone())),
            gpu,
        }
    }

    pub fn api(&self) -> GraphicsApi {
        self.api
    }

    pub fn gpu(&self) -> &Arc<SoftGpu> {
        &self.gpu
    }

    pub fn server(&self) -> &dyn RenderingServer {
        self.server.as_ref()
    }

    pub fn server_arc(&self) -> Arc<dyn RenderingServer> {
        self.server.clone()
    }

    pub fn server_impl(&self) -> &SoftRenderingServer {
        &self.server
    }

    pub fn vulkan(&self) -> Arc<dyn VulkanLoader> {
        self.vulkan.clone()
    }

    pub fn d3d12(&self) -> Arc<dyn D3D12Api> {
        self.d3d12.clone()
    }

    pub fn d3d12_impl(&self) -> &SoftD3D12 {
        &self.d3d12
    }

    pub fn metal(&self) -> Arc<dyn MetalApi> {
        self.metal.clone()
    }

    pub fn gl(&self) -> Arc<dyn GlApi> {
        self.gl.clone()
    }

    pub fn gl_impl(&self) -> &SoftGl {
        &self.gl
    }

    pub fn library(&self) -> Arc<dyn RenderContextProvider> {
        self.library.clone()
    }

    pub fn library_impl(&self) -> &SoftwareLibrary {
        &self.library
    }

    /// A router with all four backends registered.
    pub fn router(&self) -> DispatchRouter {
        DispatchRouter::new()
            .with_backend(Box::new(VulkanBackend::new(self.vulkan(), self.library())))
            .with_backend(Box::new(D3D12Backend::new(self.d3d12(), self.library())))
            .with_backend(Box::new(MetalBackend::new(self.metal(), self.library())))
            .with_backend(Box::new(GlBackend::new(self.gl(), self.library())))
    }

    /// An uninitialized bridge over this host.
    pub fn bridge(&self, config: BridgeConfig) -> Bridge {
        Bridge::new(self.server_arc(), self.router(), config)
    }
}
