//! Render registry: the active library factory plus the set of live drawables.
//!
//! The registry is owned by the [`Bridge`](crate::core::Bridge) and shared with
//! scene code through an `Arc`. It never keeps a drawable or the factory alive.

mod drawable;
mod render_registry;

pub use drawable::{DrawFn, Drawable};
pub use render_registry::{Registration, RenderRegistry};
