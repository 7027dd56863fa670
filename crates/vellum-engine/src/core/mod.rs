//! Embedder-facing entry points.
//!
//! [`Bridge`] is the context object a host constructs once per renderer; it
//! owns the render registry and the dispatch router. [`BridgeConfig`] carries
//! the few knobs the backends read.

mod bridge;
mod config;

pub use bridge::Bridge;
pub use config::BridgeConfig;
