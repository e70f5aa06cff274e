//! Throttled snapshot of object/camera coordinates for the coordinates panel.

use std::time::{Duration, Instant};

use corelib::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coords {
    pub position: Vec3,
    pub rotation: Vec3,
    pub camera: Vec3,
    pub target: Vec3,
}

impl Coords {
    /// Label + x/y/z, two decimals.
    pub fn rows(&self) -> [(&'static str, [String; 3]); 4] {
        let fmt = |v: Vec3| [format!("{:.2}", v.x), format!("{:.2}", v.y), format!("{:.2}", v.z)];
        [
            ("Position", fmt(self.position)),
            ("Rotation", fmt(self.rotation)),
            ("Camera", fmt(self.camera)),
            ("Target", fmt(self.target)),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct CoordsReadout {
    interval: Duration,
    last_refresh: Option<Instant>,
    current: Option<Coords>,
}

impl CoordsReadout {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_refresh: None,
            current: None,
        }
    }

    /// Take `sample` if the refresh interval has elapsed. Returns `true` on refresh.
    pub fn refresh(&mut self, now: Instant, sample: Option<Coords>) -> bool {
        let due = self
            .last_refresh
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_refresh = Some(now);
            self.current = sample;
        }
        due
    }

    pub fn current(&self) -> Option<&Coords> {
        self.current.as_ref()
    }
}
