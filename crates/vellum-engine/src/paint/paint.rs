use crate::paint::gradient::LinearGradient;
use crate::paint::{Color, ColorInt};

/// Fill source for a path draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    LinearGradient(LinearGradient),
}

impl Paint {
    #[inline]
    pub fn solid(color: Color) -> Self {
        Paint::Solid(color)
    }

    /// Solid paint from a packed ARGB value.
    #[inline]
    pub fn argb(color: u32) -> Self {
        Paint::Solid(ColorInt(color).to_color())
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        match self {
            Paint::Solid(c) => c.is_opaque(),
            Paint::LinearGradient(g) => g.stops.iter().all(|s| s.color.is_opaque()),
        }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Solid(color)
    }
}
