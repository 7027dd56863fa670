use crate::vector::Renderer;

/// Anything that records per-frame draw commands.
///
/// Implementers own their renderer-side resources; they are released when the
/// drawable is dropped, never by the registry.
pub trait Drawable: Send + Sync {
    fn draw(&self, renderer: &mut dyn Renderer);
}

/// Adapts a closure into a drawable.
pub struct DrawFn<F>(pub F);

impl<F> Drawable for DrawFn<F>
where
    F: Fn(&mut dyn Renderer) + Send + Sync,
{
    fn draw(&self, renderer: &mut dyn Renderer) {
        (self.0)(renderer)
    }
}
