//! Platform layer: windowing, event loop, input and the egui panels.
//!
//! The event loop owns one [`AppState`] (window, GPU, viewer, egui). Input is
//! offered to egui first; whatever egui does not claim drives the orbit
//! controls and the keyboard nudge.

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result, anyhow};
use asset::ModelRegistry;
use renderer::{EguiFrame, GpuState};
use viewer::{LoadOutcome, Viewer, ViewerConfig, ViewerError};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

pub mod input;
pub mod ui;

use input::{DragMode, PointerInput};
use ui::{UiAction, UiState};

/// Startup options collected by the binary.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    /// JSON registry; the built-in one when `None`.
    pub models_path: Option<PathBuf>,
    /// Model loaded on startup; the first registry entry when `None`.
    pub initial_model: Option<String>,
    pub show_coords: bool,
    pub viewer: ViewerConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            models_path: None,
            initial_model: None,
            show_coords: false,
            viewer: ViewerConfig::default(),
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run(config: PlatformConfig) -> Result<()> {
    let registry = match &config.models_path {
        Some(path) => ModelRegistry::load(path)
            .with_context(|| format!("Failed to load model registry {}", path.display()))?,
        None => ModelRegistry::builtin()?,
    };
    log::info!("Model registry: {} model(s)", registry.len());

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App {
        config,
        registry: Some(registry),
        state: None,
        fatal: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    match app.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    config: PlatformConfig,
    registry: Option<ModelRegistry>,
    state: Option<AppState>,
    fatal: Option<anyhow::Error>,
}

struct AppState {
    window: Arc<Window>,
    gpu: GpuState,
    viewer: Viewer,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    ui: UiState,
    pointer: PointerInput,
    modifiers: ModifiersState,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<AppState> {
        let registry = self
            .registry
            .take()
            .ok_or_else(|| anyhow!("Application resumed twice without a registry"))?;

        let attrs = Window::default_attributes()
            .with_title("Anatomical Viewer")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);

        let gpu = pollster::block_on(GpuState::new(window.clone(), self.config.backends))?;

        let initial = self
            .config
            .initial_model
            .clone()
            .unwrap_or_else(|| registry.first().id.clone());
        let mut viewer = Viewer::new(
            registry,
            self.config.viewer.clone(),
            size.width,
            size.height,
        );
        if let Err(err) = viewer.request_model(&initial) {
            log::warn!("Initial model '{initial}' not loaded: {err}");
        }

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Ok(AppState {
            window,
            gpu,
            viewer,
            egui_ctx,
            egui_state,
            ui: UiState::new(self.config.show_coords),
            pointer: PointerInput::default(),
            modifiers: ModifiersState::empty(),
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err:#}");
                self.fatal = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let response = state.egui_state.on_window_event(&state.window, &event);
        if response.repaint {
            state.window.request_redraw();
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::debug!("Resized: {}x{}", size.width, size.height);
                // Minimised windows report 0x0; keep the last viewport.
                if state.viewer.resize(size.width, size.height).is_ok() {
                    state.gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => state.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event: key, .. } => {
                if response.consumed
                    || state.egui_ctx.wants_keyboard_input()
                    || key.state != ElementState::Pressed
                {
                    return;
                }
                let PhysicalKey::Code(code) = key.physical_key else {
                    return;
                };
                if let Some(direction) = input::nudge_direction(code) {
                    match state
                        .viewer
                        .nudge_active(direction, state.modifiers.shift_key())
                    {
                        Ok(position) => log::debug!("Model moved to {position:?}"),
                        Err(ViewerError::NoActiveModel) => {}
                        Err(err) => log::warn!("Nudge failed: {err}"),
                    }
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let allow = !response.consumed && !state.egui_ctx.wants_pointer_input();
                state.pointer.button(button, button_state, allow);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(drag) = state.pointer.moved(position) {
                    match drag.mode {
                        DragMode::Orbit => state.viewer.orbit(drag.dx, drag.dy),
                        DragMode::Pan => state.viewer.pan(drag.dx, drag.dy),
                    }
                }
            }
            WindowEvent::CursorLeft { .. } => state.pointer.left(),
            WindowEvent::MouseWheel { delta, .. } => {
                if !response.consumed && !state.egui_ctx.wants_pointer_input() {
                    state.viewer.zoom(input::wheel_steps(delta));
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = state.frame() {
                    log::error!("Fatal render error: {err:#}");
                    self.fatal = Some(err);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Damping, fades and load polling all advance per frame.
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl AppState {
    fn frame(&mut self) -> Result<()> {
        let now = Instant::now();
        match self.viewer.tick(now) {
            Some(LoadOutcome::Inserted { model_id, object }) => {
                log::info!("Model '{model_id}' ready ({object:?})");
            }
            Some(LoadOutcome::Failed { model_id, reason }) => {
                log::warn!("Model '{model_id}' failed to load: {reason}");
            }
            None => {}
        }

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let mut actions = Vec::new();
        let (ui_state, viewer) = (&mut self.ui, &self.viewer);
        let output = self.egui_ctx.run(raw_input, |ctx| {
            actions = ui::draw(ctx, ui_state, viewer);
        });
        self.egui_state
            .handle_platform_output(&self.window, output.platform_output);

        for action in actions {
            self.handle_action(action);
        }

        let ui_frame = EguiFrame {
            primitives: self
                .egui_ctx
                .tessellate(output.shapes, output.pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        };
        let camera = *self.viewer.camera();
        match self
            .gpu
            .render(self.viewer.scene_mut(), &camera, Some(&ui_frame))
        {
            Ok(()) => Ok(()),
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface lost/outdated, recreating");
                self.gpu.recreate_surface();
                Ok(())
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("GPU out of memory")),
            Err(err) => {
                log::error!("Surface error: {err:?}");
                Ok(())
            }
        }
    }

    fn handle_action(&mut self, action: UiAction) {
        match action {
            UiAction::LoadModel(id) => {
                if let Err(err) = self.viewer.request_model(&id) {
                    log::warn!("Cannot load '{id}': {err}");
                }
            }
            UiAction::ResetView => match self.viewer.reset_view() {
                Ok(()) => {}
                Err(ViewerError::Core(err)) => log::info!("Reset ignored: {err}"),
                Err(err) => log::warn!("Reset failed: {err}"),
            },
            UiAction::ToggleCoords | UiAction::ShowInfo | UiAction::ToggleSidebar => {}
        }
    }
}
