//! Frame timing for drivers of `advance`.
//!
//! Hosts usually hand the bridge their own delta time. `FrameClock` covers the
//! standalone case (the studio harness, tests) with either wall-clock or fixed
//! steps, so headless runs stay deterministic.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
