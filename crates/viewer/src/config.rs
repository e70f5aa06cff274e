use std::time::Duration;

/// Tunables for camera, controls and UI timing.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub fov_y_deg: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub damping_factor: f32,
    pub enable_pan: bool,
    /// Zoom limits for the eye-target distance.
    pub min_distance: f32,
    pub max_distance: f32,
    /// Opacity ramp for a newly inserted model.
    pub fade_duration: Duration,
    /// Delay between insertion and the initial-view capture.
    pub initial_view_delay: Duration,
    /// How long the loading overlay lingers at 100%.
    pub overlay_hide_delay: Duration,
    pub coords_interval: Duration,
    /// Keyboard nudge distance in scene units; Shift multiplies it.
    pub nudge_step: f32,
    pub coarse_nudge_multiplier: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            z_near: 0.01,
            z_far: 1000.0,
            damping_factor: 0.06,
            enable_pan: true,
            min_distance: 0.1,
            max_distance: 500.0,
            fade_duration: Duration::from_millis(600),
            initial_view_delay: Duration::from_millis(800),
            overlay_hide_delay: Duration::from_millis(400),
            coords_interval: Duration::from_millis(200),
            nudge_step: 0.1,
            coarse_nudge_multiplier: 10.0,
        }
    }
}
