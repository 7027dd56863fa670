use std::any::Any;

/// Library-side image handle produced by the factory.
pub trait RenderImage: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Lets a library renderer recover its concrete image type.
    fn as_any(&self) -> &dyn Any;
}
