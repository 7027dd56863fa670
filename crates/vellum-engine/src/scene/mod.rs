//! Scene-side drawables built on library artboards.
//!
//! Advance may run on worker threads; draw happens on the render thread after
//! every advance has joined.

mod artboard;
mod canvas;
mod multi_instance;
mod player;

pub use artboard::{ArtboardInstance, PointerEvent};
pub use canvas::{Canvas, CanvasNode};
pub use multi_instance::MultiInstance;
pub use player::Player;
