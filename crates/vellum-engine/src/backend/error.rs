use thiserror::Error;

use crate::host::native::{NativeError, NativeErrorKind};
use crate::host::GraphicsApi;

/// Errors surfaced by backend managers and the dispatch router.
///
/// These never cross the [`Bridge`](crate::core::Bridge) boundary: the bridge
/// logs them and reports a boolean or a skipped frame.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("graphics api `{0}` is not supported by this bridge")]
    UnsupportedApi(String),

    #[error("{0} backend was not compiled into this bridge")]
    NotCompiled(GraphicsApi),

    #[error("host has no rendering device")]
    NoRenderingDevice,

    #[error("host did not provide the native {0}")]
    MissingHandle(&'static str),

    #[error("native api loader is unavailable: {0}")]
    LoaderUnavailable(String),

    #[error("no graphics queue family on the physical device")]
    NoGraphicsQueue,

    #[error("failed to construct the {0} render context")]
    ContextConstruction(GraphicsApi),

    #[error("a {0} backend is already active")]
    AlreadyActive(GraphicsApi),

    #[error(transparent)]
    Native(#[from] NativeError),
}

impl BackendError {
    /// Structural failures that should reach the log even from the frame loop.
    pub fn is_device_lost(&self) -> bool {
        matches!(
            self,
            BackendError::Native(NativeError { kind: NativeErrorKind::DeviceLost, .. })
        )
    }
}
