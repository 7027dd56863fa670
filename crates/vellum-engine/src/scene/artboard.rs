use crate::coords::{Rect, Vec2};
use crate::vector::Renderer;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PointerEvent {
    Down,
    Up,
    Move,
}

/// An instantiated artboard of the vector-graphics library, with its active
/// state machine or animation.
pub trait ArtboardInstance: Send {
    /// Advances animation time. Returns false once nothing is left to play.
    fn advance(&mut self, seconds: f32) -> bool;

    fn draw(&self, renderer: &mut dyn Renderer);

    /// Artboard bounds in artboard units.
    fn bounds(&self) -> Rect;

    /// Forwards a pointer event in artboard units to the state machine.
    /// Returns true if it hit a listener.
    fn pointer(&mut self, event: PointerEvent, position: Vec2) -> bool;
}
