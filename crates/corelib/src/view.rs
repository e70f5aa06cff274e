//! Initial-view bookkeeping for the "reset camera" action.

use std::time::{Duration, Instant};

use crate::Vec3;
use crate::camera::Camera;
use crate::controls::OrbitControls;
use crate::error::{CoreError, CoreResult};

/// Camera eye + orbit target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewSnapshot {
    pub eye: Vec3,
    pub target: Vec3,
}

impl ViewSnapshot {
    pub fn capture(camera: &Camera, controls: &OrbitControls) -> Self {
        Self {
            eye: camera.eye,
            target: controls.target,
        }
    }
}

/// Holds the baseline view and an optional pending (delayed) capture.
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    initial: Option<ViewSnapshot>,
    capture_at: Option<Instant>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial(&self) -> Option<ViewSnapshot> {
        self.initial
    }

    pub fn is_capture_pending(&self) -> bool {
        self.capture_at.is_some()
    }

    /// Capture the view once `delay` has elapsed after `now`.
    pub fn schedule_capture(&mut self, now: Instant, delay: Duration) {
        self.capture_at = Some(now + delay);
    }

    pub fn cancel_capture(&mut self) {
        self.capture_at = None;
    }

    /// Store the current view if a scheduled capture is due. Returns `true` on capture.
    pub fn poll(&mut self, now: Instant, camera: &Camera, controls: &OrbitControls) -> bool {
        match self.capture_at {
            Some(due) if now >= due => {
                self.capture_at = None;
                self.initial = Some(ViewSnapshot::capture(camera, controls));
                true
            }
            _ => false,
        }
    }

    /// Restore the baseline view. The camera is untouched when nothing was captured.
    pub fn reset(&self, camera: &mut Camera, controls: &mut OrbitControls) -> CoreResult<()> {
        let snap = self.initial.ok_or(CoreError::NoInitialView)?;
        controls.stop();
        camera.eye = snap.eye;
        controls.target = snap.target;
        controls.update(camera);
        Ok(())
    }
}
