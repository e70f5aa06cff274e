//! Loading overlay state: title, percent, delayed hide.

use std::time::{Duration, Instant};

#[derive(Clone, Debug, Default)]
pub struct LoadingOverlay {
    visible: bool,
    title: String,
    percent: u8,
    hide_at: Option<Instant>,
}

impl LoadingOverlay {
    pub fn show(&mut self, model_name: &str) {
        self.visible = true;
        self.percent = 0;
        self.hide_at = None;
        self.title = format!("Loading {model_name}...");
    }

    pub fn set_percent(&mut self, percent: u8) {
        self.percent = percent.min(100);
    }

    /// Schedule the hide; the bar jumps to 100%.
    pub fn finish(&mut self, now: Instant, delay: Duration) {
        self.percent = 100;
        self.hide_at = Some(now + delay);
    }

    pub fn tick(&mut self, now: Instant) {
        if self.hide_at.is_some_and(|at| now >= at) {
            self.visible = false;
            self.hide_at = None;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hides_after_delay() {
        let mut overlay = LoadingOverlay::default();
        overlay.show("Human Skull");
        assert!(overlay.is_visible());
        assert_eq!(overlay.title(), "Loading Human Skull...");
        overlay.set_percent(42);
        assert_eq!(overlay.percent(), 42);

        let t0 = Instant::now();
        overlay.finish(t0, Duration::from_millis(400));
        overlay.tick(t0 + Duration::from_millis(399));
        assert!(overlay.is_visible());
        overlay.tick(t0 + Duration::from_millis(400));
        assert!(!overlay.is_visible());
    }

    #[test]
    fn show_cancels_pending_hide() {
        let mut overlay = LoadingOverlay::default();
        let t0 = Instant::now();
        overlay.show("a");
        overlay.finish(t0, Duration::from_millis(400));
        overlay.show("b");
        overlay.tick(t0 + Duration::from_secs(1));
        assert!(overlay.is_visible());
        assert_eq!(overlay.percent(), 0);
    }
}
