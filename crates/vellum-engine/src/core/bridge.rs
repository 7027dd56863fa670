use std::sync::Arc;

use crate::backend::FrameOutcome;
use crate::host::{GraphicsApi, HostTexture, RenderingServer, Rid};
use crate::import::TextureImportBridge;
use crate::registry::{Drawable, RenderRegistry};
use crate::router::DispatchRouter;
use crate::target::TextureTarget;
use crate::vector::RenderImage;

use super::BridgeConfig;

/// The embedder-facing context: one host renderer, its render registry and
/// the router selecting the backend.
///
/// Construct one per host renderer and keep it for the renderer's lifetime.
/// Every call is safe before `initialize` and after a failed one; frames are
/// then skipped and imports return `None`. Dropping the bridge tears the
/// active backend down.
pub struct Bridge {
    host: Arc<dyn RenderingServer>,
    registry: Arc<RenderRegistry>,
    router: DispatchRouter,
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(host: Arc<dyn RenderingServer>, router: DispatchRouter, config: BridgeConfig) -> Self {
        Self {
            host,
            registry: Arc::new(RenderRegistry::new()),
            router,
            config,
        }
    }

    /// Registry drawables register with. Shared so scene code can hold
    /// [`Registration`](crate::registry::Registration) guards.
    pub fn registry(&self) -> &Arc<RenderRegistry> {
        &self.registry
    }

    pub fn host(&self) -> &Arc<dyn RenderingServer> {
        &self.host
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Brings up the backend for the host's graphics API. Returns `false`
    /// (already logged) if none could be initialized.
    pub fn initialize(&mut self) -> bool {
        self.router.initialize(self.host.as_ref(), &self.registry, &self.config)
    }

    pub fn is_initialized(&self) -> bool {
        self.router.active_api().is_some()
    }

    pub fn active_api(&self) -> Option<GraphicsApi> {
        self.router.active_api()
    }

    /// Waits for outstanding GPU work and releases the backend. The factory
    /// is unregistered; drawables stay registered.
    pub fn teardown(&mut self) {
        if self.is_initialized() {
            log::debug!("bridge: tearing down");
        }
        self.router.teardown(&self.registry);
    }

    /// Renders `drawable` into the host texture `target`.
    pub fn render_texture(
        &mut self,
        target: Rid,
        drawable: Option<&dyn Drawable>,
        width: u32,
        height: u32,
    ) -> FrameOutcome {
        self.router.render_frame(self.host.as_ref(), target, drawable, width, height)
    }

    /// Renders every registered drawable, in registration order, into `target`.
    pub fn render_registered(&mut self, target: Rid, width: u32, height: u32) -> FrameOutcome {
        let registry: &dyn Drawable = self.registry.as_ref();
        self.router.render_frame(self.host.as_ref(), target, Some(registry), width, height)
    }

    /// Imports a host texture as a library image for the active backend.
    pub fn make_image(&self, texture: Option<&HostTexture>) -> Option<Arc<dyn RenderImage>> {
        TextureImportBridge::new(self.host.as_ref(), &self.registry)
            .with_backend(self.router.active_api(), self.router.gl())
            .make_image(texture)
    }

    /// An empty render target allocated through this bridge's host.
    pub fn new_texture_target(&self) -> TextureTarget {
        TextureTarget::new(self.host.clone())
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.teardown();
    }
}
