use crate::host::Rid;
use crate::registry::Drawable;

/// Result of one render request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// The frame was recorded and submitted.
    Rendered { frame: u64 },
    /// Nothing was submitted; the target keeps its previous content.
    Skipped(SkipReason),
}

impl FrameOutcome {
    #[inline]
    pub fn is_rendered(self) -> bool {
        matches!(self, FrameOutcome::Rendered { .. })
    }
}

/// Why a frame produced no output. Apart from `NativeFailure` these are
/// expected per-frame conditions and are not logged.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SkipReason {
    /// No backend is active.
    NoBackend,
    /// The target rid is invalid.
    InvalidTarget,
    /// Width or height is zero.
    EmptyTarget,
    /// No drawable was supplied.
    NoDrawable,
    /// The host has no rendering device for this frame.
    NoRenderingDevice,
    /// The host has no native texture behind the target.
    MissingTexture,
    /// The host did not report the target's native format.
    MissingFormat,
    /// A native call failed; the router logged the error.
    NativeFailure,
}

/// Validates the arguments shared by every backend's `render_frame`.
pub(crate) fn precheck<'a>(
    target: Rid,
    drawable: Option<&'a dyn Drawable>,
    width: u32,
    height: u32,
) -> Result<&'a dyn Drawable, SkipReason> {
    if !target.is_valid() {
        return Err(SkipReason::InvalidTarget);
    }
    if width == 0 || height == 0 {
        return Err(SkipReason::EmptyTarget);
    }
    drawable.ok_or(SkipReason::NoDrawable)
}

/// Fixed ring of per-frame resources.
///
/// `advance` hands out the slot recorded `len()` frames ago, which the caller
/// waits on before reuse.
#[derive(Debug)]
pub struct FrameRing<T> {
    slots: Vec<T>,
    next: usize,
}

impl<T> FrameRing<T> {
    /// `None` for an empty slot list.
    pub fn new(slots: Vec<T>) -> Option<Self> {
        if slots.is_empty() {
            None
        } else {
            Some(Self { slots, next: 0 })
        }
    }

    /// Rotates to the next slot.
    pub fn advance(&mut self) -> &mut T {
        let i = self.next;
        self.next = (i + 1) % self.slots.len();
        &mut self.slots[i]
    }

    /// The slot most recently returned by `advance`.
    pub fn current_mut(&mut self) -> &mut T {
        let len = self.slots.len();
        &mut self.slots[(self.next + len - 1) % len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}
