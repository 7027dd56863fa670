use parking_lot::Mutex;

use crate::coords::{compute_alignment, Alignment, Fit, Mat2D, Rect, Vec2};
use crate::registry::Drawable;
use crate::vector::Renderer;

use super::{ArtboardInstance, CanvasNode, PointerEvent};

struct PlayerState<A> {
    artboard: A,
    fit: Fit,
    alignment: Alignment,
    size: Vec2,
}

impl<A: ArtboardInstance> PlayerState<A> {
    fn transform(&self) -> Mat2D {
        let frame = Rect::new(0.0, 0.0, self.size.x, self.size.y);
        compute_alignment(self.fit, self.alignment, frame, self.artboard.bounds())
    }
}

/// Plays one artboard inside a `size` frame, placed by `fit` and `alignment`.
///
/// All state sits behind one lock, so advance may run on a worker thread while
/// pointer events arrive from the host's input thread.
pub struct Player<A> {
    state: Mutex<PlayerState<A>>,
}

impl<A: ArtboardInstance> Player<A> {
    /// Advances the artboard by zero so its first frame is drawable right away.
    pub fn new(mut artboard: A, size: Vec2) -> Self {
        artboard.advance(0.0);
        Self {
            state: Mutex::new(PlayerState {
                artboard,
                fit: Fit::default(),
                alignment: Alignment::default(),
                size,
            }),
        }
    }

    pub fn with_fit(self, fit: Fit) -> Self {
        self.state.lock().fit = fit;
        self
    }

    pub fn with_alignment(self, alignment: Alignment) -> Self {
        self.state.lock().alignment = alignment;
        self
    }

    pub fn set_fit(&self, fit: Fit) {
        self.state.lock().fit = fit;
    }

    pub fn set_alignment(&self, alignment: Alignment) {
        self.state.lock().alignment = alignment;
    }

    pub fn set_size(&self, size: Vec2) {
        self.state.lock().size = size;
    }

    pub fn size(&self) -> Vec2 {
        self.state.lock().size
    }

    /// Returns false once the artboard has nothing left to play.
    pub fn advance(&self, seconds: f32) -> bool {
        self.state.lock().artboard.advance(seconds)
    }

    /// Artboard-to-frame transform.
    pub fn transform(&self) -> Mat2D {
        self.state.lock().transform()
    }

    /// Forwards a pointer event given in frame coordinates. Returns false when
    /// the transform is singular or nothing was hit.
    pub fn pointer(&self, event: PointerEvent, position: Vec2) -> bool {
        let mut state = self.state.lock();
        let Some(inverse) = state.transform().invert() else {
            return false;
        };
        state.artboard.pointer(event, inverse.map_point(position))
    }

    /// Runs `f` with exclusive access to the artboard.
    pub fn with_artboard<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.state.lock().artboard)
    }
}

impl<A: ArtboardInstance> Drawable for Player<A> {
    fn draw(&self, renderer: &mut dyn Renderer) {
        let state = self.state.lock();
        renderer.save();
        renderer.transform(&state.transform());
        state.artboard.draw(renderer);
        renderer.restore();
    }
}

impl<A: ArtboardInstance> CanvasNode for Player<A> {
    fn advance(&self, seconds: f32) {
        Player::advance(self, seconds);
    }

    fn draw(&self, renderer: &mut dyn Renderer) {
        Drawable::draw(self, renderer);
    }

    fn bounds(&self) -> Option<Rect> {
        let size = self.size();
        Some(Rect::new(0.0, 0.0, size.x, size.y))
    }
}
