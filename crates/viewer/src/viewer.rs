//! The orchestrator behind every menu action.
//!
//! Only one load is ever in flight: a new request drops the previous
//! [`LoadHandle`], so an abandoned result can never reach the scene. The
//! active object is removed as soon as a switch is requested, which keeps
//! the scene at zero or one model object.

use std::time::Instant;

use asset::{AssetLoader, LoadHandle, LoadedModel, ModelDescriptor, ModelRegistry};
use corelib::{
    Vec3,
    camera::Camera,
    controls::OrbitControls,
    error::CoreError,
    fade::FadeIn,
    transform::Transform,
    view::ViewState,
};

use crate::{
    config::ViewerConfig,
    coords::{Coords, CoordsReadout},
    error::ViewerError,
    overlay::LoadingOverlay,
    scene::{ObjectId, Scene},
};

/// What a [`Viewer::tick`] did with a finished load.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    Inserted { model_id: String, object: ObjectId },
    Failed { model_id: String, reason: String },
}

/// Text for the info panel.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub title: String,
    pub description: String,
}

struct PendingLoad {
    descriptor: ModelDescriptor,
    handle: LoadHandle,
}

struct ActiveModel {
    object: ObjectId,
    model_id: String,
    fade: FadeIn,
}

pub struct Viewer {
    config: ViewerConfig,
    registry: ModelRegistry,
    loader: AssetLoader,
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    view: ViewState,
    pending: Option<PendingLoad>,
    active: Option<ActiveModel>,
    selected: Option<String>,
    overlay: LoadingOverlay,
    coords: CoordsReadout,
    viewport: (u32, u32),
}

impl Viewer {
    pub fn new(registry: ModelRegistry, config: ViewerConfig, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let camera = Camera::new_perspective(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            Vec3::Y,
            config.fov_y_deg.to_radians(),
            config.z_near,
            config.z_far,
            width as f32 / height as f32,
        );
        let mut controls = OrbitControls::new(Vec3::ZERO).with_damping(config.damping_factor);
        controls.enable_pan = config.enable_pan;
        controls.min_distance = config.min_distance;
        controls.max_distance = config.max_distance;

        Self {
            loader: AssetLoader::for_registry(&registry),
            coords: CoordsReadout::new(config.coords_interval),
            config,
            registry,
            scene: Scene::new(),
            camera,
            controls,
            view: ViewState::new(),
            pending: None,
            active: None,
            selected: None,
            overlay: LoadingOverlay::default(),
            viewport: (width, height),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access for the renderer's release drain.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn overlay(&self) -> &LoadingOverlay {
        &self.overlay
    }

    pub fn coords(&self) -> Option<&Coords> {
        self.coords.current()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn active_model(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.model_id.as_str())
    }

    pub fn active_object(&self) -> Option<ObjectId> {
        self.active.as_ref().map(|a| a.object)
    }

    /// Info panel text for the most recently requested model.
    pub fn info(&self) -> ModelInfo {
        match self.selected.as_deref().and_then(|id| self.registry.get(id)) {
            Some(desc) => ModelInfo {
                title: desc.name.clone(),
                description: desc.description.clone(),
            },
            None => ModelInfo {
                title: "Anatomical model".to_owned(),
                description: "Select a model to see its details.".to_owned(),
            },
        }
    }

    /// Switch to model `id`: clear the current object and start loading.
    pub fn request_model(&mut self, id: &str) -> Result<(), ViewerError> {
        let descriptor = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| ViewerError::UnknownModel(id.to_owned()))?;

        if let Some(active) = self.active.take() {
            self.scene.remove(active.object);
            log::debug!("Removed model '{}' from scene", active.model_id);
        }
        if let Some(abandoned) = self.pending.take() {
            log::info!("Abandoning load of '{}'", abandoned.descriptor.id);
        }
        self.view.cancel_capture();

        self.overlay.show(&descriptor.name);
        self.selected = Some(descriptor.id.clone());
        log::info!("Loading model '{}' ({})", descriptor.id, descriptor.path);

        let handle = self.loader.spawn(descriptor.clone());
        self.pending = Some(PendingLoad { descriptor, handle });
        Ok(())
    }

    /// Advance one frame: collect finished loads, fade, damping, view capture, overlays.
    pub fn tick(&mut self, now: Instant) -> Option<LoadOutcome> {
        let outcome = self.poll_pending(now);

        if let Some(active) = &self.active {
            let opacity = active.fade.opacity(now);
            if let Some(obj) = self.scene.get_mut(active.object) {
                obj.opacity = opacity;
            }
        }

        self.controls.update(&mut self.camera);
        if self.view.poll(now, &self.camera, &self.controls) {
            log::debug!("Initial view captured at eye {:?}", self.camera.eye);
        }
        self.overlay.tick(now);

        let sample = self.current_coords();
        self.coords.refresh(now, sample);

        outcome
    }

    fn poll_pending(&mut self, now: Instant) -> Option<LoadOutcome> {
        let pending = self.pending.as_mut()?;
        let progress = pending.handle.progress();
        if progress.is_started() {
            self.overlay.set_percent(progress.percent());
        }
        let result = pending.handle.try_finish()?;
        let PendingLoad { descriptor, .. } = self.pending.take()?;

        match result {
            Ok(model) => {
                let object = self.insert_model(model, &descriptor, now);
                self.overlay.finish(now, self.config.overlay_hide_delay);
                Some(LoadOutcome::Inserted {
                    model_id: descriptor.id,
                    object,
                })
            }
            Err(err) => {
                log::warn!("Failed to load model '{}': {err:#}", descriptor.id);
                self.overlay.finish(now, std::time::Duration::ZERO);
                Some(LoadOutcome::Failed {
                    model_id: descriptor.id,
                    reason: format!("{err:#}"),
                })
            }
        }
    }

    fn insert_model(&mut self, model: LoadedModel, desc: &ModelDescriptor, now: Instant) -> ObjectId {
        if let Some(previous) = self.active.take() {
            self.scene.remove(previous.object);
        }

        let transform = Transform::from_position_rotation(desc.position, desc.rotation);
        let object = self.scene.insert(model, transform, 0.0);
        self.active = Some(ActiveModel {
            object,
            model_id: desc.id.clone(),
            fade: FadeIn::start(now, self.config.fade_duration),
        });

        self.controls.stop();
        self.camera.eye = Vec3::from(desc.camera);
        self.controls.target = Vec3::from(desc.target);
        self.controls.update(&mut self.camera);
        self.view.schedule_capture(now, self.config.initial_view_delay);

        log::info!("Model '{}' added to scene as {:?}", desc.id, object);
        object
    }

    fn current_coords(&self) -> Option<Coords> {
        let active = self.active.as_ref()?;
        let obj = self.scene.get(active.object)?;
        Some(Coords {
            position: obj.transform.translation,
            rotation: obj.transform.rotation_euler,
            camera: self.camera.eye,
            target: self.controls.target,
        })
    }

    /// Return to the captured initial view.
    pub fn reset_view(&mut self) -> Result<(), ViewerError> {
        self.view.reset(&mut self.camera, &mut self.controls)?;
        log::info!("Camera reset to initial view");
        Ok(())
    }

    /// Move the active model by `direction` (unit axes) times the nudge step.
    pub fn nudge_active(&mut self, direction: Vec3, coarse: bool) -> Result<Vec3, ViewerError> {
        let active = self.active.as_ref().ok_or(ViewerError::NoActiveModel)?;
        let obj = self
            .scene
            .get_mut(active.object)
            .ok_or(ViewerError::NoActiveModel)?;
        let mut step = self.config.nudge_step;
        if coarse {
            step *= self.config.coarse_nudge_multiplier;
        }
        obj.transform.translate(direction * step);
        Ok(obj.transform.translation)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ViewerError> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidViewport { width, height }.into());
        }
        self.viewport = (width, height);
        self.camera.aspect = width as f32 / height as f32;
        Ok(())
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Pointer drag that orbits around the target (pixels).
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.controls
            .rotate_by_pixels(dx, dy, self.viewport.1 as f32);
    }

    /// Pointer drag that pans the target (pixels).
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.controls
            .pan_by_pixels(dx, dy, &self.camera, self.viewport.1 as f32);
    }

    /// Wheel steps; positive zooms in.
    pub fn zoom(&mut self, steps: f32) {
        self.controls.zoom_steps(steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn fixture_registry() -> (PathBuf, ModelRegistry) {
        let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("viewer-{}-{}", std::process::id(), n));
        std::fs::create_dir_all(&dir).expect("fixture dir");
        std::fs::write(dir.join("jaw.obj"), TRIANGLE_OBJ).expect("jaw");
        std::fs::write(dir.join("skull.obj"), TRIANGLE_OBJ).expect("skull");
        let json = r#"{"models":[
            {"id":"jaw","name":"Human Jaw","path":"jaw.obj",
             "position":[-5.03,-5.24,-6.83],"camera":[154.66,-38.62,123.34],
             "description":"Mandible"},
            {"id":"skull","name":"Human Skull","path":"skull.obj",
             "position":[0,0.76,-13.81],"camera":[1.58,-44.73,8.13],"target":[1.65,-0.48,-2.64]},
            {"id":"broken","name":"Broken","path":"missing.obj",
             "position":[0,0,0],"camera":[0,0,5]}]}"#;
        let registry = ModelRegistry::from_json_str(json, &dir).expect("registry");
        (dir, registry)
    }

    fn viewer() -> Viewer {
        let (_, registry) = fixture_registry();
        Viewer::new(registry, ViewerConfig::default(), 800, 600)
    }

    /// Tick until the pending load settles; returns the outcome and the tick time.
    fn settle(viewer: &mut Viewer, mut now: Instant) -> (LoadOutcome, Instant) {
        for _ in 0..2000 {
            if let Some(outcome) = viewer.tick(now) {
                return (outcome, now);
            }
            std::thread::sleep(Duration::from_millis(2));
            now += Duration::from_millis(2);
        }
        panic!("load did not settle");
    }

    #[test]
    fn unknown_model_changes_nothing() {
        let mut v = viewer();
        let err = v.request_model("femur").unwrap_err();
        assert!(matches!(err, ViewerError::UnknownModel(id) if id == "femur"));
        assert!(!v.is_loading());
        assert!(!v.overlay().is_visible());
    }

    #[test]
    fn load_inserts_once_and_applies_descriptor_pose() {
        let mut v = viewer();
        let t0 = Instant::now();
        v.request_model("skull").expect("request");
        assert!(v.overlay().is_visible());
        assert_eq!(v.overlay().title(), "Loading Human Skull...");
        assert_eq!(v.info().title, "Human Skull");

        let (outcome, t1) = settle(&mut v, t0);
        let LoadOutcome::Inserted { model_id, object } = outcome else {
            panic!("expected insert, got {outcome:?}");
        };
        assert_eq!(model_id, "skull");
        assert_eq!(v.scene().len(), 1);
        assert_eq!(v.active_object(), Some(object));

        let obj = v.scene().get(object).expect("object");
        assert_eq!(obj.transform.translation, Vec3::new(0.0, 0.76, -13.81));
        assert_eq!(obj.opacity, 0.0);
        assert!(v.camera().eye.distance(Vec3::new(1.58, -44.73, 8.13)) < 1e-2);
        assert_eq!(v.controls().target, Vec3::new(1.65, -0.48, -2.64));

        // Fade completes, overlay hides, view is captured.
        v.tick(t1 + Duration::from_secs(2));
        assert_eq!(v.scene().get(object).map(|o| o.opacity), Some(1.0));
        assert!(!v.overlay().is_visible());
        assert!(v.view_state().initial().is_some());
        assert!(v.tick(t1 + Duration::from_secs(3)).is_none());
    }

    #[test]
    fn switching_models_replaces_the_object_and_releases_it() {
        let mut v = viewer();
        let t0 = Instant::now();
        v.request_model("jaw").expect("jaw");
        let (first, t1) = settle(&mut v, t0);
        let LoadOutcome::Inserted { object: jaw, .. } = first else {
            panic!("jaw failed: {first:?}");
        };
        v.scene_mut().drain_released();

        v.request_model("skull").expect("skull");
        assert!(v.scene().is_empty());
        assert_eq!(v.scene_mut().drain_released(), vec![jaw]);
        assert!(v.active_model().is_none());

        let (second, _) = settle(&mut v, t1);
        assert!(matches!(second, LoadOutcome::Inserted { ref model_id, .. } if model_id == "skull"));
        assert_eq!(v.scene().len(), 1);
        assert_eq!(v.active_model(), Some("skull"));
    }

    #[test]
    fn superseded_request_never_reaches_the_scene() {
        let mut v = viewer();
        let t0 = Instant::now();
        v.request_model("jaw").expect("jaw");
        v.request_model("skull").expect("skull");
        let (outcome, t1) = settle(&mut v, t0);
        assert!(matches!(outcome, LoadOutcome::Inserted { ref model_id, .. } if model_id == "skull"));
        // Give the abandoned worker time to finish; nothing more may arrive.
        std::thread::sleep(Duration::from_millis(50));
        assert!(v.tick(t1 + Duration::from_millis(50)).is_none());
        assert_eq!(v.scene().len(), 1);
        assert_eq!(v.scene().iter().next().map(|o| o.model_id.as_str()), Some("skull"));
    }

    #[test]
    fn failed_load_leaves_scene_empty_and_hides_overlay() {
        let mut v = viewer();
        let t0 = Instant::now();
        v.request_model("broken").expect("request");
        let (outcome, t1) = settle(&mut v, t0);
        assert!(matches!(outcome, LoadOutcome::Failed { ref model_id, .. } if model_id == "broken"));
        assert!(v.scene().is_empty());
        v.tick(t1);
        assert!(!v.overlay().is_visible());
        assert!(matches!(v.reset_view(), Err(ViewerError::Core(CoreError::NoInitialView))));
    }

    #[test]
    fn reset_returns_to_captured_view_after_orbiting() {
        let mut v = viewer();
        let t0 = Instant::now();
        v.request_model("jaw").expect("jaw");
        let (_, t1) = settle(&mut v, t0);
        let t2 = t1 + v.config().initial_view_delay;
        v.tick(t2);
        let baseline = v.view_state().initial().expect("captured");

        v.orbit(120.0, -40.0);
        v.pan(30.0, 10.0);
        v.zoom(3.0);
        for i in 1..30 {
            v.tick(t2 + Duration::from_millis(16 * i));
        }
        assert!(v.camera().eye.distance(baseline.eye) > 1.0);

        v.reset_view().expect("reset");
        assert!(v.camera().eye.distance(baseline.eye) < 1e-2);
        assert_eq!(v.controls().target, baseline.target);
    }

    #[test]
    fn nudge_moves_only_with_an_active_model() {
        let mut v = viewer();
        assert!(matches!(v.nudge_active(Vec3::X, false), Err(ViewerError::NoActiveModel)));

        let t0 = Instant::now();
        v.request_model("jaw").expect("jaw");
        let (_, t1) = settle(&mut v, t0);
        let pos = v.nudge_active(Vec3::X, false).expect("nudge");
        assert!((pos.x - (-4.93)).abs() < 1e-4);
        let pos = v.nudge_active(Vec3::NEG_Z, true).expect("coarse nudge");
        assert!((pos.z - (-7.83)).abs() < 1e-4);

        v.tick(t1 + Duration::from_secs(1));
        let coords = v.coords().expect("coords");
        assert!((coords.position.z - (-7.83)).abs() < 1e-4);
    }

    #[test]
    fn zoom_is_clamped_to_configured_range() {
        let mut v = viewer();
        let mut now = Instant::now();
        v.zoom(400.0);
        v.tick(now);
        let min = v.config().min_distance;
        assert!((v.camera().eye.distance(v.controls().target) - min).abs() < 1e-4);
        assert!(v.camera().view().is_finite());

        v.zoom(-5.0);
        now += Duration::from_millis(16);
        v.tick(now);
        assert!(v.camera().eye.distance(v.controls().target) > min);
    }

    #[test]
    fn resize_updates_aspect_and_rejects_zero() {
        let mut v = viewer();
        v.resize(1000, 500).expect("resize");
        assert!((v.camera().aspect - 2.0).abs() < 1e-6);
        assert!(v.resize(0, 500).is_err());
        assert_eq!(v.viewport(), (1000, 500));
    }

    fn large_obj(vertices: usize) -> String {
        let mut src = String::with_capacity(vertices * 40);
        for i in 0..vertices {
            src.push_str(&format!("v {}.125 {}.25 0.5\n", i, (i * i) % 97));
        }
        for i in 1..vertices - 1 {
            src.push_str(&format!("f {} {} {}\n", i, i + 1, i + 2));
        }
        src
    }

    #[test]
    fn overlay_progress_starts_at_zero_and_never_goes_back() {
        let (dir, registry) = fixture_registry();
        std::fs::write(dir.join("jaw.obj"), large_obj(150_000)).expect("large jaw");
        let mut v = Viewer::new(registry, ViewerConfig::default(), 800, 600);

        let mut now = Instant::now();
        v.request_model("jaw").expect("jaw");
        assert_eq!(v.overlay().percent(), 0);

        let mut last = 0;
        for _ in 0..20_000 {
            let outcome = v.tick(now);
            let percent = v.overlay().percent();
            assert!(percent >= last, "overlay went from {last}% back to {percent}%");
            last = percent;
            if let Some(outcome) = outcome {
                assert!(matches!(outcome, LoadOutcome::Inserted { .. }), "{outcome:?}");
                assert_eq!(last, 100);
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
            now += Duration::from_millis(1);
        }
        panic!("load did not settle");
    }

    #[test]
    fn info_defaults_without_selection() {
        let v = viewer();
        assert_eq!(v.info().title, "Anatomical model");
    }
}
