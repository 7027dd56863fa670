use crate::paint::ColorInt;

/// What happens to the target's previous content when a frame begins.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LoadAction {
    #[default]
    Clear,
    PreserveRenderTarget,
    DontCare,
}

/// Per-frame configuration passed to `RenderContext::begin_frame`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameDescriptor {
    pub width: u32,
    pub height: u32,
    pub load_action: LoadAction,
    pub clear_color: ColorInt,
}

impl FrameDescriptor {
    /// Cleared to transparent black. Every bridge frame starts this way, so no
    /// content leaks from the previous frame.
    pub const fn cleared(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            load_action: LoadAction::Clear,
            clear_color: ColorInt::TRANSPARENT,
        }
    }
}

/// Frame numbers reported to the library at flush.
///
/// `safe` is the newest frame whose GPU-resident temporaries are no longer in
/// flight. It trails `current` by two frames and is never `current` itself.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameNumbers {
    pub current: u64,
    pub safe: u64,
}

impl FrameNumbers {
    /// Frames the library may still have in flight after a flush.
    pub const IN_FLIGHT_LAG: u64 = 2;

    #[inline]
    pub const fn for_frame(current: u64) -> Self {
        Self {
            current,
            safe: current.saturating_sub(Self::IN_FLIGHT_LAG),
        }
    }
}

/// Monotonic frame counter owned by each backend context.
#[derive(Debug, Default, Clone)]
pub struct FrameCounter {
    last: u64,
}

impl FrameCounter {
    /// Starts a new frame and returns its numbers. The first frame is 1.
    pub fn advance(&mut self) -> FrameNumbers {
        self.last += 1;
        FrameNumbers::for_frame(self.last)
    }

    /// Number of the most recently started frame, 0 before the first.
    #[inline]
    pub fn last(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── safe frame number ─────────────────────────────────────────────────

    #[test]
    fn safe_number_trails_by_two_and_saturates() {
        assert_eq!(FrameNumbers::for_frame(0).safe, 0);
        assert_eq!(FrameNumbers::for_frame(1).safe, 0);
        assert_eq!(FrameNumbers::for_frame(2).safe, 0);
        assert_eq!(FrameNumbers::for_frame(3).safe, 1);
        assert_eq!(FrameNumbers::for_frame(u64::MAX).safe, u64::MAX - 2);
    }

    #[test]
    fn safe_number_is_strictly_behind_any_started_frame() {
        for current in (1..10_000u64).chain([u64::MAX / 2, u64::MAX]) {
            let f = FrameNumbers::for_frame(current);
            assert_eq!(f.safe, current.saturating_sub(2));
            assert!(f.safe < f.current);
        }
    }

    #[test]
    fn counter_is_monotonic_from_one() {
        let mut c = FrameCounter::default();
        assert_eq!(c.last(), 0);
        let a = c.advance();
        let b = c.advance();
        let d = c.advance();
        assert_eq!((a.current, b.current, d.current), (1, 2, 3));
        assert_eq!(d.safe, 1);
    }

    // ── descriptor ────────────────────────────────────────────────────────

    #[test]
    fn cleared_descriptor_uses_transparent_black() {
        let d = FrameDescriptor::cleared(256, 128);
        assert_eq!(d.load_action, LoadAction::Clear);
        assert_eq!(d.clear_color.0, 0x0000_0000);
        assert_eq!((d.width, d.height), (256, 128));
    }
}
