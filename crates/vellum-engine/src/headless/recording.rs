use crate::coords::{Mat2D, Rect};
use crate::paint::Paint;
use crate::vector::{Path, RenderImage, Renderer};

/// One call made on a [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Save,
    Restore,
    Transform(Mat2D),
    DrawPath { bounds: Option<Rect>, paint: Paint },
    ClipPath { bounds: Option<Rect> },
    DrawImage { width: u32, height: u32, opacity: f32 },
}

/// Renderer that only records what it is asked to do.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub ops: Vec<RenderOp>,
}

impl RecordingRenderer {
    pub fn count(&self, pred: impl Fn(&RenderOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Saves minus restores so far. Zero when every save was matched.
    pub fn depth(&self) -> isize {
        self.ops.iter().fold(0, |depth, op| match op {
            RenderOp::Save => depth + 1,
            RenderOp::Restore => depth - 1,
            _ => depth,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn save(&mut self) {
        self.ops.push(RenderOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(RenderOp::Restore);
    }

    fn transform(&mut self, transform: &Mat2D) {
        self.ops.push(RenderOp::Transform(*transform));
    }

    fn draw_path(&mut self, path: &Path, paint: &Paint) {
        self.ops.push(RenderOp::DrawPath { bounds: path.bounds(), paint: paint.clone() });
    }

    fn clip_path(&mut self, path: &Path) {
        self.ops.push(RenderOp::ClipPath { bounds: path.bounds() });
    }

    fn draw_image(&mut self, image: &dyn RenderImage, opacity: f32) {
        self.ops.push(RenderOp::DrawImage { width: image.width(), height: image.height(), opacity });
    }
}
