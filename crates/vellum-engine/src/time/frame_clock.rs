use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds elapsed since the previous tick.
    pub dt: f32,

    /// Seconds accumulated since the clock started.
    pub elapsed: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

#[derive(Debug, Clone)]
enum Source {
    Wall { last: Instant, dt_min: Duration, dt_max: Duration },
    Fixed(Duration),
}

/// Clock producing `FrameTime` snapshots.
///
/// Wall-clock deltas are clamped so a stalled or debugged process does not
/// advance animations by seconds at once.
#[derive(Debug, Clone)]
pub struct FrameClock {
    source: Source,
    elapsed: f32,
    frame_index: u64,
}

impl FrameClock {
    /// Wall-clock timing with default clamps (0.1ms .. 250ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Wall-clock timing with custom delta clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            source: Source::Wall { last: Instant::now(), dt_min, dt_max },
            elapsed: 0.0,
            frame_index: 0,
        }
    }

    /// Every tick advances by exactly `step`.
    pub fn fixed(step: Duration) -> Self {
        Self { source: Source::Fixed(step), elapsed: 0.0, frame_index: 0 }
    }

    /// Fixed clock running at `fps` frames per second.
    pub fn fixed_rate(fps: u32) -> Self {
        Self::fixed(Duration::from_secs_f64(1.0 / f64::from(fps.max(1))))
    }

    /// Resets the wall-clock baseline, e.g. after the host resumes from suspension.
    pub fn reset(&mut self) {
        if let Source::Wall { last, .. } = &mut self.source {
            *last = Instant::now();
        }
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let dt = match &mut self.source {
            Source::Wall { last, dt_min, dt_max } => {
                let now = Instant::now();
                let dt = now.saturating_duration_since(*last).clamp(*dt_min, *dt_max);
                *last = now;
                dt
            }
            Source::Fixed(step) => *step,
        };

        self.elapsed += dt.as_secs_f32();
        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_deterministic() {
        let mut clock = FrameClock::fixed(Duration::from_millis(20));
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
        assert!((b.dt - 0.02).abs() < 1e-6);
        assert!((b.elapsed - 0.04).abs() < 1e-6);
    }

    #[test]
    fn wall_clock_respects_lower_clamp() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(5), Duration::from_millis(10));
        let t = clock.tick();
        assert!(t.dt >= 0.005 - 1e-6);
        assert!(t.dt <= 0.010 + 1e-6);
    }
}
