use crate::backend::{DEFAULT_FRAME_RING_SIZE, MAX_FRAME_RING_SIZE};
use crate::logging::LoggingConfig;

/// Bridge construction parameters.
///
/// Kept minimal. Backends read only `frame_ring_size`; `logging` is consumed by
/// embedders that let the bridge install the logger.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Frames that may be recorded before the oldest one must have completed
    /// on the GPU. Applies to every backend. Clamped to `1..=MAX_FRAME_RING_SIZE`.
    pub frame_ring_size: usize,

    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// The ring size backends actually allocate.
    #[inline]
    pub fn ring_size(&self) -> usize {
        self.frame_ring_size.clamp(1, MAX_FRAME_RING_SIZE)
    }

    pub fn with_frame_ring_size(mut self, frames: usize) -> Self {
        self.frame_ring_size = frames;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            frame_ring_size: DEFAULT_FRAME_RING_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ring_is_double_buffered() {
        assert_eq!(BridgeConfig::default().ring_size(), 2);
    }

    #[test]
    fn ring_size_is_clamped() {
        assert_eq!(BridgeConfig::default().with_frame_ring_size(0).ring_size(), 1);
        assert_eq!(BridgeConfig::default().with_frame_ring_size(64).ring_size(), MAX_FRAME_RING_SIZE);
        assert_eq!(BridgeConfig::default().with_frame_ring_size(3).ring_size(), 3);
    }
}
