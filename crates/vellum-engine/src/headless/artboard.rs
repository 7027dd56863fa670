use crate::coords::{Mat2D, Rect, Vec2};
use crate::paint::Paint;
use crate::scene::{ArtboardInstance, PointerEvent};
use crate::vector::{Path, Renderer};

/// Artboard made of filled shapes, optionally spinning about its center.
///
/// Stands in for a library artboard in tests and the studio harness. It keeps
/// a log of everything the scene layer asked of it.
#[derive(Debug, Clone)]
pub struct ShapeArtboard {
    bounds: Rect,
    shapes: Vec<(Path, Paint)>,
    elapsed: f32,
    duration: Option<f32>,
    // radians per second
    spin: f32,
    advance_calls: usize,
    pointer_log: Vec<(PointerEvent, Vec2)>,
}

impl ShapeArtboard {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            shapes: Vec::new(),
            elapsed: 0.0,
            duration: None,
            spin: 0.0,
            advance_calls: 0,
            pointer_log: Vec::new(),
        }
    }

    pub fn with_shape(mut self, path: Path, paint: Paint) -> Self {
        self.shapes.push((path, paint));
        self
    }

    /// Stops playing after `seconds`. Loops forever otherwise.
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_spin(mut self, radians_per_second: f32) -> Self {
        self.spin = radians_per_second;
        self
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn advance_calls(&self) -> usize {
        self.advance_calls
    }

    pub fn pointer_log(&self) -> &[(PointerEvent, Vec2)] {
        &self.pointer_log
    }

    fn rotation(&self) -> Mat2D {
        let c = self.bounds.center();
        Mat2D::from_translate(c.x, c.y) * Mat2D::from_rotation(self.spin * self.elapsed) * Mat2D::from_translate(-c.x, -c.y)
    }
}

impl ArtboardInstance for ShapeArtboard {
    fn advance(&mut self, seconds: f32) -> bool {
        self.advance_calls += 1;
        self.elapsed += seconds;
        self.duration.is_none_or(|d| self.elapsed < d)
    }

    fn draw(&self, renderer: &mut dyn Renderer) {
        let spinning = self.spin != 0.0;
        if spinning {
            renderer.save();
            renderer.transform(&self.rotation());
        }
        for (path, paint) in &self.shapes {
            renderer.draw_path(path, paint);
        }
        if spinning {
            renderer.restore();
        }
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn pointer(&mut self, event: PointerEvent, position: Vec2) -> bool {
        self.pointer_log.push((event, position));
        self.bounds.contains(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{RecordingRenderer, RenderOp};

    fn board() -> ShapeArtboard {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        ShapeArtboard::new(bounds).with_shape(Path::rect(bounds), Paint::argb(0xFF12_3456))
    }

    #[test]
    fn duration_ends_playback() {
        let mut a = board().with_duration(1.0);
        assert!(a.advance(0.5));
        assert!(!a.advance(0.6));
        assert_eq!(a.advance_calls(), 2);
    }

    #[test]
    fn spin_wraps_shapes_in_rotation() {
        let mut a = board().with_spin(1.0);
        a.advance(0.25);
        let mut rec = RecordingRenderer::default();
        a.draw(&mut rec);
        assert_eq!(rec.ops.len(), 4);
        assert!(matches!(rec.ops[1], RenderOp::Transform(_)));
        assert_eq!(rec.depth(), 0);
    }

    #[test]
    fn still_artboard_draws_shapes_only() {
        let mut rec = RecordingRenderer::default();
        board().draw(&mut rec);
        assert_eq!(rec.ops.len(), 1);
    }
}
