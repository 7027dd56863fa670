use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::coords::{Mat2D, Rect};
use crate::registry::Drawable;
use crate::vector::Renderer;

use super::{ArtboardInstance, CanvasNode};

/// One artboard drawn once per transform.
///
/// Every copy shares the artboard's animation state; advancing moves all of
/// them. Useful for particles and tiled decorations.
pub struct MultiInstance<A> {
    artboard: Mutex<A>,
    transforms: RwLock<Vec<Mat2D>>,
    auto_play: AtomicBool,
}

impl<A: ArtboardInstance> MultiInstance<A> {
    pub fn new(artboard: A, transforms: Vec<Mat2D>) -> Self {
        Self {
            artboard: Mutex::new(artboard),
            transforms: RwLock::new(transforms),
            auto_play: AtomicBool::new(true),
        }
    }

    pub fn set_transforms(&self, transforms: Vec<Mat2D>) {
        *self.transforms.write() = transforms;
    }

    pub fn push_transform(&self, transform: Mat2D) {
        self.transforms.write().push(transform);
    }

    pub fn instance_count(&self) -> usize {
        self.transforms.read().len()
    }

    /// Paused instances keep drawing their current frame.
    pub fn set_auto_play(&self, auto_play: bool) {
        self.auto_play.store(auto_play, Ordering::Relaxed);
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play.load(Ordering::Relaxed)
    }

    /// Advances the shared artboard unless paused. Returns whether it is still playing.
    pub fn advance(&self, seconds: f32) -> bool {
        if !self.auto_play() {
            return false;
        }
        self.artboard.lock().advance(seconds)
    }

    /// Union of the artboard bounds under every transform. `None` without instances.
    pub fn bounds(&self) -> Option<Rect> {
        let bounds = self.artboard.lock().bounds();
        self.transforms
            .read()
            .iter()
            .map(|t| t.map_rect(bounds))
            .reduce(Rect::union)
    }

    pub fn with_artboard<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.artboard.lock())
    }
}

impl<A: ArtboardInstance> Drawable for MultiInstance<A> {
    fn draw(&self, renderer: &mut dyn Renderer) {
        let artboard = self.artboard.lock();
        for transform in self.transforms.read().iter() {
            renderer.save();
            renderer.transform(transform);
            artboard.draw(renderer);
            renderer.restore();
        }
    }
}

impl<A: ArtboardInstance> CanvasNode for MultiInstance<A> {
    fn advance(&self, seconds: f32) {
        MultiInstance::advance(self, seconds);
    }

    fn draw(&self, renderer: &mut dyn Renderer) {
        Drawable::draw(self, renderer);
    }

    fn bounds(&self) -> Option<Rect> {
        MultiInstance::bounds(self)
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::headless::{RecordingRenderer, RenderOp, ShapeArtboard};
    use crate::paint::Paint;
    use crate::vector::Path;

    fn square() -> ShapeArtboard {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        ShapeArtboard::new(bounds).with_shape(Path::rect(bounds), Paint::argb(0xFFFF_FFFF))
    }

    #[test]
    fn draws_once_per_transform() {
        let transforms = vec![Mat2D::from_translate(0.0, 0.0), Mat2D::from_translate(20.0, 0.0), Mat2D::from_scale(2.0, 2.0)];
        let multi = MultiInstance::new(square(), transforms.clone());
        let mut rec = RecordingRenderer::default();
        Drawable::draw(&multi, &mut rec);

        let applied: Vec<Mat2D> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Transform(t) => Some(*t),
                _ => None,
            })
            .collect();
        assert_eq!(applied, transforms);
        assert_eq!(rec.count(|op| matches!(op, RenderOp::DrawPath { .. })), 3);
        assert_eq!(rec.depth(), 0);
    }

    #[test]
    fn bounds_are_union_of_instances() {
        let multi = MultiInstance::new(square(), vec![Mat2D::from_translate(-5.0, 0.0), Mat2D::from_translate(30.0, 40.0)]);
        assert_eq!(multi.bounds(), Some(Rect::from_ltrb(-5.0, 0.0, 40.0, 50.0)));
        assert_eq!(CanvasNode::bounds(&multi), multi.bounds());
    }

    #[test]
    fn no_instances_means_no_bounds_and_no_draws() {
        let multi = MultiInstance::new(square(), Vec::new());
        assert_eq!(multi.bounds(), None);
        let mut rec = RecordingRenderer::default();
        Drawable::draw(&multi, &mut rec);
        assert!(rec.ops.is_empty());
    }

    #[test]
    fn paused_instances_do_not_advance() {
        let multi = MultiInstance::new(square(), vec![Mat2D::IDENTITY]);
        multi.set_auto_play(false);
        assert!(!multi.advance(0.5));
        assert_eq!(multi.with_artboard(|a| a.elapsed()), 0.0);

        multi.set_auto_play(true);
        multi.advance(0.5);
        assert_eq!(multi.with_artboard(|a| a.elapsed()), 0.5);
    }

    #[test]
    fn transforms_can_be_replaced() {
        let multi = MultiInstance::new(square(), vec![Mat2D::IDENTITY]);
        multi.push_transform(Mat2D::from_translate(1.0, 1.0));
        assert_eq!(multi.instance_count(), 2);
        multi.set_transforms(Vec::new());
        assert_eq!(multi.instance_count(), 0);
    }
}
