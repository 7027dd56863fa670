//! Geometry types shared by the bridge, the scene drawables and the software renderer.
//!
//! Canonical CPU space:
//! - artboard units, origin top-left
//! - +X right, +Y down
//!
//! The OpenGL backend flips Y once at the frame boundary; nothing else in the crate
//! is aware of bottom-up texture origins.

mod alignment;
mod mat2d;
mod rect;
mod size;
mod vec2;

pub use alignment::{compute_alignment, Alignment, Fit};
pub use mat2d::Mat2D;
pub use rect::Rect;
pub use size::Size;
pub use vec2::Vec2;
