use crate::coords::Mat2D;
use crate::paint::Paint;

use super::{Path, RenderImage};

/// Per-frame recording surface handed to drawables.
///
/// State (transform and clip) is scoped by `save`/`restore`. Transforms compose
/// onto the current matrix: `transform(m)` makes subsequent draws map through
/// `current * m`.
pub trait Renderer {
    fn save(&mut self);
    fn restore(&mut self);
    fn transform(&mut self, transform: &Mat2D);
    fn draw_path(&mut self, path: &Path, paint: &Paint);
    fn clip_path(&mut self, path: &Path);
    /// Draws `image` with its top-left at the local origin, one unit per pixel.
    fn draw_image(&mut self, image: &dyn RenderImage, opacity: f32);
}
