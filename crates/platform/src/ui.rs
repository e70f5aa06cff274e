//! In-window panels: model menu, info window, coordinates and loading overlay.

use viewer::Viewer;

/// Windows at most this wide (logical px) get a collapsible sidebar.
pub const NARROW_WIDTH: f32 = 900.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiAction {
    LoadModel(String),
    ResetView,
    ToggleCoords,
    ShowInfo,
    ToggleSidebar,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiState {
    pub sidebar_open: bool,
    pub show_info: bool,
    pub show_coords: bool,
}

impl UiState {
    pub fn new(show_coords: bool) -> Self {
        Self {
            sidebar_open: false,
            show_info: false,
            show_coords,
        }
    }

    /// Apply the UI-local part of an action. Menu buttons close the sidebar
    /// on narrow windows.
    pub fn apply(&mut self, action: &UiAction, narrow: bool) {
        match action {
            UiAction::ToggleCoords => self.show_coords = !self.show_coords,
            UiAction::ShowInfo => self.show_info = true,
            UiAction::ToggleSidebar => {
                self.sidebar_open = !self.sidebar_open;
                return;
            }
            UiAction::LoadModel(_) | UiAction::ResetView => {}
        }
        if narrow {
            self.sidebar_open = false;
        }
    }
}

pub fn is_narrow(width_points: f32) -> bool {
    width_points <= NARROW_WIDTH
}

/// Build this frame's UI; returns the buttons pressed.
pub fn draw(ctx: &egui::Context, state: &mut UiState, viewer: &Viewer) -> Vec<UiAction> {
    let mut actions = Vec::new();
    let narrow = is_narrow(ctx.screen_rect().width());

    if narrow {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            if ui.button("☰ Menu").clicked() {
                actions.push(UiAction::ToggleSidebar);
            }
        });
    }

    if !narrow || state.sidebar_open {
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.heading("Models");
                for desc in viewer.registry().iter() {
                    let selected = viewer.active_model() == Some(desc.id.as_str());
                    if ui.selectable_label(selected, desc.name.as_str()).clicked() {
                        actions.push(UiAction::LoadModel(desc.id.clone()));
                    }
                }
                ui.separator();
                if ui.button("Reset view").clicked() {
                    actions.push(UiAction::ResetView);
                }
                if ui.button("Toggle coordinates").clicked() {
                    actions.push(UiAction::ToggleCoords);
                }
                if ui.button("Info").clicked() {
                    actions.push(UiAction::ShowInfo);
                }
            });
    }

    if state.show_info {
        let info = viewer.info();
        let mut open = true;
        egui::Window::new(info.title)
            .id(egui::Id::new("info_window"))
            .open(&mut open)
            .collapsible(false)
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.label(info.description);
            });
        state.show_info = open;
    }

    if state.show_coords {
        if let Some(coords) = viewer.coords() {
            egui::Area::new(egui::Id::new("coords"))
                .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        egui::Grid::new("coords_grid").striped(true).show(ui, |ui| {
                            for (label, [x, y, z]) in coords.rows() {
                                ui.strong(label);
                                ui.monospace(x);
                                ui.monospace(y);
                                ui.monospace(z);
                                ui.end_row();
                            }
                        });
                    });
                });
        }
    }

    let overlay = viewer.overlay();
    if overlay.is_visible() {
        egui::Window::new("loading")
            .title_bar(false)
            .resizable(false)
            .collapsible(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.heading(overlay.title());
                ui.add(
                    egui::ProgressBar::new(f32::from(overlay.percent()) / 100.0)
                        .desired_width(260.0)
                        .text(format!("{}%", overlay.percent())),
                );
            });
    }

    for action in &actions {
        state.apply(action, narrow);
    }
    actions
}
