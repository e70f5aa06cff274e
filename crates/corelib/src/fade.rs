//! Linear opacity ramp for newly inserted objects.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct FadeIn {
    started: Instant,
    duration: Duration,
}

impl FadeIn {
    pub fn start(now: Instant, duration: Duration) -> Self {
        Self {
            started: now,
            duration,
        }
    }

    /// Opacity in [0, 1].
    pub fn opacity(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.opacity(now) >= 1.0
    }
}
