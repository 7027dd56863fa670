use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::coords::{Mat2D, Rect, Vec2};
use crate::registry::Drawable;
use crate::vector::Renderer;

/// Child of a [`Canvas`].
pub trait CanvasNode: Send + Sync {
    /// Called from rayon workers; must not touch the renderer.
    fn advance(&self, seconds: f32);

    fn draw(&self, renderer: &mut dyn Renderer);

    /// Local bounds used for culling. `None` means never culled.
    fn bounds(&self) -> Option<Rect>;

    /// Placement inside the canvas.
    fn transform(&self) -> Mat2D {
        Mat2D::IDENTITY
    }

    fn is_visible(&self) -> bool {
        true
    }
}

/// A fixed-size surface of independent nodes.
///
/// `advance` fans out over the rayon pool and joins before returning, so a
/// following `draw` always sees every node's new state.
pub struct Canvas {
    size: RwLock<Vec2>,
    nodes: RwLock<Vec<Arc<dyn CanvasNode>>>,
}

impl Canvas {
    pub fn new(size: Vec2) -> Self {
        Self {
            size: RwLock::new(size),
            nodes: RwLock::new(Vec::new()),
        }
    }

    pub fn size(&self) -> Vec2 {
        *self.size.read()
    }

    pub fn set_size(&self, size: Vec2) {
        *self.size.write() = size;
    }

    pub fn add(&self, node: Arc<dyn CanvasNode>) {
        self.nodes.write().push(node);
    }

    /// Returns true when the node was a child.
    pub fn remove(&self, node: &Arc<dyn CanvasNode>) -> bool {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|n| !Arc::ptr_eq(n, node));
        nodes.len() != before
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    pub fn advance(&self, seconds: f32) {
        let nodes: Vec<Arc<dyn CanvasNode>> = self.nodes.read().clone();
        nodes.par_iter().for_each(|node| node.advance(seconds));
    }

    fn is_on_canvas(node: &dyn CanvasNode, canvas: Rect) -> bool {
        match node.bounds() {
            Some(bounds) => node.transform().map_rect(bounds).intersect(canvas).is_some(),
            None => true,
        }
    }

    /// Number of nodes a draw would visit right now.
    pub fn visible_count(&self) -> usize {
        let canvas = self.rect();
        self.nodes
            .read()
            .iter()
            .filter(|n| n.is_visible() && Self::is_on_canvas(n.as_ref(), canvas))
            .count()
    }

    fn rect(&self) -> Rect {
        let size = self.size();
        Rect::new(0.0, 0.0, size.x, size.y)
    }
}

impl Drawable for Canvas {
    fn draw(&self, renderer: &mut dyn Renderer) {
        let canvas = self.rect();
        let nodes: Vec<Arc<dyn CanvasNode>> = self.nodes.read().clone();
        for node in nodes.iter().filter(|n| n.is_visible()) {
            if !Self::is_on_canvas(node.as_ref(), canvas) {
                continue;
            }
            renderer.save();
            renderer.transform(&node.transform());
            node.draw(renderer);
            renderer.restore();
        }
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::headless::{RecordingRenderer, RenderOp};
    use crate::paint::Paint;
    use crate::vector::Path;

    struct Node {
        bounds: Rect,
        at: Mat2D,
        visible: bool,
        advanced: AtomicUsize,
    }

    impl Node {
        fn new(bounds: Rect, at: Mat2D) -> Self {
            Self {
                bounds,
                at,
                visible: true,
                advanced: AtomicUsize::new(0),
            }
        }
    }

    impl CanvasNode for Node {
        fn advance(&self, _: f32) {
            self.advanced.fetch_add(1, Ordering::SeqCst);
        }

        fn draw(&self, renderer: &mut dyn Renderer) {
            renderer.draw_path(&Path::rect(self.bounds), &Paint::argb(0xFF00_0000));
        }

        fn bounds(&self) -> Option<Rect> {
            Some(self.bounds)
        }

        fn transform(&self) -> Mat2D {
            self.at
        }

        fn is_visible(&self) -> bool {
            self.visible
        }
    }

    fn unit() -> Rect {
        Rect::new(0.0, 0.0, 10.0, 10.0)
    }

    // ── advance ───────────────────────────────────────────────────────────

    #[test]
    fn advance_reaches_every_node_before_returning() {
        let canvas = Canvas::new(Vec2::new(100.0, 100.0));
        let nodes: Vec<Arc<Node>> = (0..64).map(|_| Arc::new(Node::new(unit(), Mat2D::IDENTITY))).collect();
        for n in &nodes {
            canvas.add(n.clone());
        }
        canvas.advance(1.0 / 60.0);
        canvas.advance(1.0 / 60.0);
        assert!(nodes.iter().all(|n| n.advanced.load(Ordering::SeqCst) == 2));
    }

    // ── draw ──────────────────────────────────────────────────────────────

    #[test]
    fn offscreen_nodes_are_culled() {
        let canvas = Canvas::new(Vec2::new(100.0, 100.0));
        canvas.add(Arc::new(Node::new(unit(), Mat2D::from_translate(50.0, 50.0))));
        canvas.add(Arc::new(Node::new(unit(), Mat2D::from_translate(150.0, 0.0))));
        canvas.add(Arc::new(Node::new(unit(), Mat2D::from_translate(-10.0, 0.0))));

        let mut rec = RecordingRenderer::default();
        canvas.draw(&mut rec);
        assert_eq!(rec.count(|op| matches!(op, RenderOp::DrawPath { .. })), 1);
        assert_eq!(canvas.visible_count(), 1);
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let canvas = Canvas::new(Vec2::new(100.0, 100.0));
        let mut hidden = Node::new(unit(), Mat2D::IDENTITY);
        hidden.visible = false;
        canvas.add(Arc::new(hidden));
        let mut rec = RecordingRenderer::default();
        canvas.draw(&mut rec);
        assert!(rec.ops.is_empty());
    }

    #[test]
    fn each_node_is_wrapped_in_its_transform() {
        let canvas = Canvas::new(Vec2::new(100.0, 100.0));
        let at = Mat2D::from_translate(5.0, 5.0);
        canvas.add(Arc::new(Node::new(unit(), at)));
        let mut rec = RecordingRenderer::default();
        canvas.draw(&mut rec);
        assert_eq!(rec.ops[0], RenderOp::Save);
        assert_eq!(rec.ops[1], RenderOp::Transform(at));
        assert_eq!(rec.ops[3], RenderOp::Restore);
        assert_eq!(rec.depth(), 0);
    }

    #[test]
    fn resizing_changes_culling() {
        let canvas = Canvas::new(Vec2::new(100.0, 100.0));
        canvas.add(Arc::new(Node::new(unit(), Mat2D::from_translate(150.0, 0.0))));
        assert_eq!(canvas.visible_count(), 0);
        canvas.set_size(Vec2::new(200.0, 100.0));
        assert_eq!(canvas.visible_count(), 1);
    }

    #[test]
    fn nodes_can_be_removed() {
        let canvas = Canvas::new(Vec2::new(10.0, 10.0));
        let node: Arc<dyn CanvasNode> = Arc::new(Node::new(unit(), Mat2D::IDENTITY));
        canvas.add(node.clone());
        assert!(canvas.remove(&node));
        assert!(!canvas.remove(&node));
        assert!(canvas.is_empty());
    }
}
