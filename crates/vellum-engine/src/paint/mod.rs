//! Paint model passed through the vector renderer.
//!
//! Scope:
//! - color representation (premultiplied alpha, packed ARGB at API boundaries)
//! - paint sources (solid, linear gradient)

pub mod color;
pub mod gradient;
mod paint;

pub use color::{Color, ColorInt};
pub use gradient::{ColorStop, LinearGradient, SpreadMode};
pub use paint::Paint;
