/// Integer pixel size of a host texture.
///
/// Signed on purpose: host size requests may arrive negative or zero, and both
/// mean "no texture".
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const ZERO: Size = Size { width: 0, height: 0 };

    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are strictly positive.
    #[inline]
    pub const fn is_drawable(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Unsigned dimensions, or `None` when the size cannot back a texture.
    #[inline]
    pub fn to_extent(self) -> Option<(u32, u32)> {
        if self.is_drawable() {
            Some((self.width as u32, self.height as u32))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_are_not_drawable() {
        assert!(!Size::ZERO.is_drawable());
        assert!(!Size::new(-4, 10).is_drawable());
        assert!(!Size::new(10, 0).is_drawable());
        assert_eq!(Size::new(10, -1).to_extent(), None);
    }

    #[test]
    fn positive_size_converts_to_extent() {
        assert_eq!(Size::new(256, 128).to_extent(), Some((256, 128)));
    }
}
