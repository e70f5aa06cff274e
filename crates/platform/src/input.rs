//! Mapping from winit input to viewer actions.

use corelib::Vec3;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta},
    keyboard::KeyCode,
};

/// Pixels of trackpad scrolling that count as one wheel notch.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Orbit,
    Pan,
}

impl DragMode {
    pub fn from_button(button: MouseButton) -> Option<Self> {
        match button {
            MouseButton::Left => Some(Self::Orbit),
            MouseButton::Right | MouseButton::Middle => Some(Self::Pan),
            _ => None,
        }
    }
}

/// A drag step in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drag {
    pub mode: DragMode,
    pub dx: f32,
    pub dy: f32,
}

/// Tracks the active drag and the last cursor position.
#[derive(Debug, Default)]
pub struct PointerInput {
    drag: Option<DragMode>,
    last: Option<PhysicalPosition<f64>>,
}

impl PointerInput {
    /// `allow_start` is false while the pointer is over the UI.
    pub fn button(&mut self, button: MouseButton, state: ElementState, allow_start: bool) {
        let Some(mode) = DragMode::from_button(button) else {
            return;
        };
        match state {
            ElementState::Pressed if allow_start && self.drag.is_none() => self.drag = Some(mode),
            ElementState::Released if self.drag == Some(mode) => self.drag = None,
            _ => {}
        }
    }

    pub fn moved(&mut self, position: PhysicalPosition<f64>) -> Option<Drag> {
        let last = self.last.replace(position)?;
        let mode = self.drag?;
        Some(Drag {
            mode,
            dx: (position.x - last.x) as f32,
            dy: (position.y - last.y) as f32,
        })
    }

    pub fn left(&mut self) {
        self.last = None;
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

/// Wheel delta as zoom steps; positive zooms in.
pub fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
    }
}

/// Arrows move along X/Y, PageUp/PageDown along Z.
pub fn nudge_direction(key: KeyCode) -> Option<Vec3> {
    match key {
        KeyCode::ArrowLeft => Some(Vec3::NEG_X),
        KeyCode::ArrowRight => Some(Vec3::X),
        KeyCode::ArrowUp => Some(Vec3::Y),
        KeyCode::ArrowDown => Some(Vec3::NEG_Y),
        KeyCode::PageUp => Some(Vec3::Z),
        KeyCode::PageDown => Some(Vec3::NEG_Z),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn keys_map_to_axes() {
        assert_eq!(nudge_direction(KeyCode::ArrowLeft), Some(Vec3::NEG_X));
        assert_eq!(nudge_direction(KeyCode::ArrowUp), Some(Vec3::Y));
        assert_eq!(nudge_direction(KeyCode::PageDown), Some(Vec3::NEG_Z));
        assert_eq!(nudge_direction(KeyCode::KeyA), None);
    }

    #[test]
    fn buttons_pick_drag_mode() {
        assert_eq!(DragMode::from_button(MouseButton::Left), Some(DragMode::Orbit));
        assert_eq!(DragMode::from_button(MouseButton::Right), Some(DragMode::Pan));
        assert_eq!(DragMode::from_button(MouseButton::Middle), Some(DragMode::Pan));
        assert_eq!(DragMode::from_button(MouseButton::Back), None);
    }

    #[test]
    fn drag_reports_deltas_only_while_pressed() {
        let mut p = PointerInput::default();
        assert_eq!(p.moved(PhysicalPosition::new(10.0, 10.0)), None);
        p.button(MouseButton::Left, ElementState::Pressed, true);
        let d = p.moved(PhysicalPosition::new(15.0, 7.0)).expect("drag");
        assert_eq!(d.mode, DragMode::Orbit);
        assert_eq!((d.dx, d.dy), (5.0, -3.0));
        p.button(MouseButton::Left, ElementState::Released, true);
        assert_eq!(p.moved(PhysicalPosition::new(20.0, 7.0)), None);
    }

    #[test]
    fn press_over_ui_does_not_start_drag() {
        let mut p = PointerInput::default();
        p.button(MouseButton::Right, ElementState::Pressed, false);
        assert!(!p.is_dragging());
    }

    #[test]
    fn other_button_release_keeps_drag() {
        let mut p = PointerInput::default();
        p.button(MouseButton::Left, ElementState::Pressed, true);
        p.button(MouseButton::Right, ElementState::Released, true);
        assert!(p.is_dragging());
    }

    #[test]
    fn wheel_lines_and_pixels() {
        assert_eq!(wheel_steps(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let px = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -100.0));
        assert_eq!(wheel_steps(px), -2.0);
    }
}
