//! Selects the backend matching the host's graphics API.

use std::sync::Arc;

use crate::backend::{BackendError, BackendManager, FrameOutcome, GlApi, SkipReason};
use crate::core::BridgeConfig;
use crate::host::{GraphicsApi, RenderingServer, Rid};
use crate::registry::{Drawable, RenderRegistry};

/// Holds the compiled-in backends and dispatches to the active one.
///
/// The host's driver name is resolved once at `initialize`; frames go
/// straight to the cached backend.
#[derive(Default)]
pub struct DispatchRouter {
    backends: Vec<Box<dyn BackendManager>>,
    active: Option<usize>,
}

impl DispatchRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend, replacing any registered for the same API.
    pub fn register(&mut self, backend: Box<dyn BackendManager>) {
        debug_assert!(self.active.is_none(), "backends must be registered before initialize");
        let api = backend.api();
        match self.backends.iter_mut().find(|b| b.api() == api) {
            Some(slot) => *slot = backend,
            None => self.backends.push(backend),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn BackendManager>) -> Self {
        self.register(backend);
        self
    }

    pub fn supports(&self, api: GraphicsApi) -> bool {
        self.backends.iter().any(|b| b.api() == api)
    }

    pub fn active_api(&self) -> Option<GraphicsApi> {
        self.active.map(|i| self.backends[i].api())
    }

    fn active_mut(&mut self) -> Option<&mut Box<dyn BackendManager>> {
        self.active.map(|i| &mut self.backends[i])
    }

    fn try_initialize(
        &mut self,
        host: &dyn RenderingServer,
        registry: &RenderRegistry,
        config: &BridgeConfig,
    ) -> Result<usize, BackendError> {
        let name = host.driver_name();
        let api = GraphicsApi::from_driver_name(&name).ok_or(BackendError::UnsupportedApi(name))?;
        let index = self
            .backends
            .iter()
            .position(|b| b.api() == api)
            .ok_or(BackendError::NotCompiled(api))?;
        self.backends[index].initialize(host, registry, config)?;
        Ok(index)
    }

    /// Initializes the backend for the host's API. Failures are logged here
    /// and reported as `false`.
    pub fn initialize(&mut self, host: &dyn RenderingServer, registry: &RenderRegistry, config: &BridgeConfig) -> bool {
        if let Some(api) = self.active_api() {
            debug_assert!(false, "{api} backend is already initialized");
            log::warn!("ignoring second renderer initialization; {api} backend is active");
            return true;
        }

        match self.try_initialize(host, registry, config) {
            Ok(index) => {
                self.active = Some(index);
                log::info!("renderer initialized on {}", self.backends[index].api());
                true
            }
            Err(e) => {
                log::error!("renderer initialization failed: {e}");
                false
            }
        }
    }

    /// Renders one frame on the active backend. Never fails: native errors
    /// are logged and the frame is skipped.
    pub fn render_frame(
        &mut self,
        host: &dyn RenderingServer,
        target: Rid,
        drawable: Option<&dyn Drawable>,
        width: u32,
        height: u32,
    ) -> FrameOutcome {
        let Some(backend) = self.active_mut() else {
            return FrameOutcome::Skipped(SkipReason::NoBackend);
        };
        match backend.render_frame(host, target, drawable, width, height) {
            Ok(outcome) => outcome,
            Err(e) if e.is_device_lost() => {
                log::warn!("{} frame dropped, device lost: {e}", backend.api());
                FrameOutcome::Skipped(SkipReason::NativeFailure)
            }
            Err(e) => {
                log::error!("{} frame failed: {e}", backend.api());
                FrameOutcome::Skipped(SkipReason::NativeFailure)
            }
        }
    }

    /// Tears the active backend down. The router can be initialized again
    /// afterwards.
    pub fn teardown(&mut self, registry: &RenderRegistry) {
        if let Some(index) = self.active.take() {
            self.backends[index].teardown(registry);
        }
    }

    /// GL entry points of the active backend, if it is OpenGL.
    pub fn gl(&self) -> Option<Arc<dyn GlApi>> {
        self.active.and_then(|i| self.backends[i].gl())
    }
}
