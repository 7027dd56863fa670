//! Vellum engine crate.
//!
//! Bridges an embedded vector-graphics runtime into a host renderer: frames
//! are drawn by the runtime's render context straight into textures the host
//! owns, on Vulkan, D3D12, Metal or OpenGL.

pub mod backend;
pub mod core;
pub mod host;
pub mod import;
pub mod registry;
pub mod router;
pub mod target;
pub mod time;
pub mod vector;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod scene;

#[cfg(feature = "headless")]
pub mod headless;
