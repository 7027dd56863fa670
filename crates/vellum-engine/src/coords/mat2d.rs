use core::ops::Mul;

use super::{Rect, Vec2};

/// 2D affine transform, stored column-major as `[xx, xy, yx, yy, tx, ty]`.
///
/// A point maps as `x' = xx*x + yx*y + tx`, `y' = xy*x + yy*y + ty`.
/// `a * b` applies `b` first.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat2D(pub [f32; 6]);

impl Mat2D {
    pub const IDENTITY: Mat2D = Mat2D([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    #[inline]
    pub const fn new(xx: f32, xy: f32, yx: f32, yy: f32, tx: f32, ty: f32) -> Self {
        Mat2D([xx, xy, yx, yy, tx, ty])
    }

    #[inline]
    pub const fn from_translate(tx: f32, ty: f32) -> Self {
        Mat2D::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    #[inline]
    pub const fn from_scale(sx: f32, sy: f32) -> Self {
        Mat2D::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn from_rotation(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Mat2D::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Flips Y inside a surface of the given height. Used to draw top-down content
    /// into bottom-up textures.
    #[inline]
    pub const fn flip_y(height: f32) -> Self {
        Mat2D::new(1.0, 0.0, 0.0, -1.0, 0.0, height)
    }

    #[inline]
    pub fn translation(self) -> Vec2 {
        Vec2::new(self.0[4], self.0[5])
    }

    #[inline]
    pub fn determinant(self) -> f32 {
        let [a, b, c, d, _, _] = self.0;
        a * d - b * c
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(self) -> Option<Mat2D> {
        let [a, b, c, d, tx, ty] = self.0;
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Mat2D([
            d * inv,
            -b * inv,
            -c * inv,
            a * inv,
            (c * ty - d * tx) * inv,
            (b * tx - a * ty) * inv,
        ]))
    }

    #[inline]
    pub fn map_point(self, p: Vec2) -> Vec2 {
        let [a, b, c, d, tx, ty] = self.0;
        Vec2::new(a * p.x + c * p.y + tx, b * p.x + d * p.y + ty)
    }

    /// Axis-aligned bounds of a transformed rectangle.
    pub fn map_rect(self, rect: Rect) -> Rect {
        let corners = rect.corners().map(|p| self.map_point(p));
        Rect::from_points(corners).unwrap_or_default()
    }
}

impl Default for Mat2D {
    fn default() -> Self {
        Mat2D::IDENTITY
    }
}

impl Mul for Mat2D {
    type Output = Mat2D;

    fn mul(self, rhs: Mat2D) -> Mat2D {
        let [a0, a1, a2, a3, a4, a5] = self.0;
        let [b0, b1, b2, b3, b4, b5] = rhs.0;
        Mat2D([
            a0 * b0 + a2 * b1,
            a1 * b0 + a3 * b1,
            a0 * b2 + a2 * b3,
            a1 * b2 + a3 * b3,
            a0 * b4 + a2 * b5 + a4,
            a1 * b4 + a3 * b5 + a5,
        ])
    }
}
