use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec2, Vec3};
use glint_assets::{AnimationPlayer, AssetError, AssetStore};
use glint_common::Transform;
use glint_environment::{
    EnvironmentAsset, EnvironmentJobs, EnvironmentLoader, EnvironmentParams, EnvironmentRequest,
    EnvironmentSlot, InstallToken, SceneEnvironment, resolve,
};
use glint_input::{Action, KeyBinding, default_bindings, lookup};
use glint_render::RenderView;
use glint_render_wgpu::CameraRig;
use glint_scene::{ModelState, RingSet, SceneDescription, SceneNode, ShadowBaker, ShadowMap, compose};
use glint_settings::{Setting, SettingsEvent, ViewerSettings};

/// Tabs of the settings panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Model,
    Environment,
    Lighting,
    Effects,
    Camera,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Model, Tab::Environment, Tab::Lighting, Tab::Effects, Tab::Camera];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Model => "Model",
            Tab::Environment => "Environment",
            Tab::Lighting => "Lighting",
            Tab::Effects => "Effects",
            Tab::Camera => "Camera",
        }
    }
}

/// Everything the viewer owns apart from the window and GPU.
pub struct Viewer {
    pub settings: ViewerSettings,
    settings_path: PathBuf,
    store: AssetStore,
    model: Option<ModelState>,
    player: Option<AnimationPlayer>,
    loader: EnvironmentLoader,
    jobs: Option<EnvironmentJobs>,
    requested: Option<EnvironmentRequest>,
    /// A request is out on the worker and its result has not arrived.
    pending: bool,
    reload: bool,
    loaded: Option<EnvironmentAsset>,
    slot: EnvironmentSlot,
    token: Option<InstallToken>,
    installed: Option<EnvironmentParams>,
    rings: RingSet,
    baker: ShadowBaker,
    shadow: Option<ShadowMap>,
    shadow_stale: bool,
    shadow_changed: bool,
    scene: SceneDescription,
    pose: Vec<Transform>,
    bindings: Vec<KeyBinding>,
    held: BTreeSet<String>,
    elapsed: f32,
    pub camera: CameraRig,
    pub panel_open: bool,
    pub tab: Tab,
    pub scale_text: String,
    pub shadow_hex: String,
    pub status: Option<String>,
    pub hovering_file: bool,
}

impl Viewer {
    pub fn new(settings: ViewerSettings, settings_path: PathBuf, loader: EnvironmentLoader) -> Self {
        let jobs = match EnvironmentJobs::spawn(loader.clone()) {
            Ok(jobs) => Some(jobs),
            Err(e) => {
                tracing::warn!("environment worker unavailable, loading inline: {e}");
                None
            }
        };
        let scene = compose(&settings, None);
        let camera = CameraRig::new(&RenderView::for_scene(&scene), settings.use_first_person_camera);
        let scale_text = format!("{:.2}", settings.model_scale);
        let shadow_hex = settings.shadow_color.to_hex();
        Self {
            settings,
            settings_path,
            store: AssetStore::new(),
            model: None,
            player: None,
            loader,
            jobs,
            requested: None,
            pending: false,
            reload: true,
            loaded: None,
            slot: EnvironmentSlot::new(),
            token: None,
            installed: None,
            rings: RingSet::new(),
            baker: ShadowBaker::default(),
            shadow: None,
            shadow_stale: true,
            shadow_changed: false,
            scene,
            pose: Vec::new(),
            bindings: default_bindings(),
            held: BTreeSet::new(),
            elapsed: 0.0,
            camera,
            panel_open: false,
            tab: Tab::default(),
            scale_text,
            shadow_hex,
            status: None,
            hovering_file: false,
        }
    }

    pub fn scene(&self) -> &SceneDescription {
        &self.scene
    }

    pub fn model(&self) -> Option<&ModelState> {
        self.model.as_ref()
    }

    pub fn pose(&self) -> &[Transform] {
        &self.pose
    }

    pub fn rings(&self) -> &RingSet {
        &self.rings
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// The environment to draw this frame.
    pub fn environment(&self) -> SceneEnvironment {
        if self.requested.is_some() {
            if let Some(env) = self.slot.current() {
                return env.clone();
            }
        }
        SceneEnvironment::solid(self.scene.background_color())
    }

    /// A new shadow mask to upload, or `Some(None)` when the catcher went away.
    pub fn take_shadow_update(&mut self) -> Option<Option<&ShadowMap>> {
        if !self.shadow_changed {
            return None;
        }
        self.shadow_changed = false;
        Some(self.shadow.as_ref())
    }

    /// Import a dropped or named `.glb` file.
    pub fn open_model(&mut self, path: &Path) -> Result<(), AssetError> {
        match self.store.load_path(path) {
            Ok((id, asset)) => {
                let summary = asset.summary();
                tracing::info!(
                    "loaded {} ({} meshes, {} triangles, {} animations)",
                    summary.name,
                    summary.meshes,
                    summary.triangles,
                    summary.animations.len()
                );
                let state = ModelState::new(id, asset);
                self.player = if state.autoplay {
                    AnimationPlayer::autoplay(&state.asset, state.animation_index)
                } else {
                    None
                };
                self.pose = state.asset.rest_pose();
                self.model = Some(state);
                self.shadow_stale = true;
                self.status = None;
                Ok(())
            }
            Err(e) => {
                tracing::error!("failed to open {}: {e}", path.display());
                self.status = Some(format!("Could not open {}: {e}", path.display()));
                Err(e)
            }
        }
    }

    /// Move the model, as the gizmo does.
    pub fn set_model_position(&mut self, position: Vec3) {
        if let Some(model) = &mut self.model {
            if model.position != position {
                model.position = position;
                self.shadow_stale = true;
            }
        }
    }

    pub fn save_settings(&mut self) {
        match self.settings.save(&self.settings_path) {
            Ok(()) => self.status = None,
            Err(e) => {
                tracing::error!("failed to save settings: {e}");
                self.status = Some(format!("Could not save settings: {e}"));
            }
        }
    }

    /// Apply the shadow color typed into the hex field, or restore the
    /// field when it does not parse.
    pub fn commit_shadow_hex(&mut self) {
        let text = self.shadow_hex.trim().to_string();
        if let Err(e) = self.settings.set_shadow_color(&text) {
            tracing::warn!("{e}");
            self.shadow_hex = self.settings.shadow_color.to_hex();
        }
    }

    /// Key press or release by name; returns the action a press triggered.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, pressed: bool) -> Option<Action> {
        let name = key.to_ascii_uppercase();
        if !pressed {
            // Modifiers may have changed since the press.
            self.held.remove(&name);
            return None;
        }
        let action = lookup(&self.bindings, key, ctrl).cloned();
        if let Some(Action::Move(_)) = action {
            self.held.insert(name);
        }
        let action = action?;
        self.dispatch(action.clone());
        Some(action)
    }

    pub fn dispatch(&mut self, action: Action) {
        match &action {
            Action::Toggle(_) | Action::ToggleCameraMode => {
                glint_input::apply(&action, &mut self.settings);
            }
            Action::ToggleSettingsPanel => self.panel_open = !self.panel_open,
            Action::OpenModel(path) => {
                // Failures are reported through `status`.
                let _ = self.open_model(path);
            }
            Action::ResetCamera => self.reset_camera(),
            Action::Jump => {
                if let CameraRig::FirstPerson(cam) = &mut self.camera {
                    cam.jump();
                }
            }
            Action::SaveSettings => self.save_settings(),
            Action::Move(_) | Action::Noop => {}
        }
    }

    pub fn reset_camera(&mut self) {
        let aspect = self.camera.lens().aspect;
        self.camera = CameraRig::new(
            &RenderView::for_scene(&self.scene),
            self.settings.use_first_person_camera,
        );
        self.camera.set_aspect(aspect);
        self.apply_orbit_controls();
    }

    /// Pointer drag with the primary button held.
    pub fn drag(&mut self, delta: Vec2, viewport_height: f32) {
        match &mut self.camera {
            CameraRig::Orbit(cam) => cam.drag(delta, viewport_height),
            CameraRig::FirstPerson(cam) => cam.look(delta),
        }
    }

    pub fn scroll(&mut self, steps: f32) {
        if let CameraRig::Orbit(cam) = &mut self.camera {
            cam.scroll(steps);
        }
    }

    /// Advance one frame: react to settings changes, recompose the scene,
    /// sync the environment, animate and re-bake shadows when needed.
    pub fn frame(&mut self, dt: f32) {
        self.elapsed += dt;
        self.process_events();

        self.scene = compose(&self.settings, self.model.as_ref());
        self.sync_environment();

        if let (Some(player), Some(model)) = (&mut self.player, &self.model) {
            player.update(dt, &model.asset);
            self.pose = player.sample(&model.asset);
        }
        if self.scene.nodes().iter().any(|n| matches!(n, SceneNode::Rings)) {
            self.rings.update(self.elapsed);
        }
        self.sync_shadows();

        if let CameraRig::FirstPerson(cam) = &mut self.camera {
            let input: Vec3 = self
                .held
                .iter()
                .filter_map(|k| match lookup(&self.bindings, k, false) {
                    Some(Action::Move(v)) => Some(*v),
                    _ => None,
                })
                .sum();
            cam.walk(input, dt);
        }
        self.camera.update(dt);
    }

    fn process_events(&mut self) {
        let mut reload = false;
        for event in self.settings.drain_events() {
            tracing::debug!("settings: {event:?}");
            reload |= event.requires_environment_reload();
            if event.requires_shadow_rebake() {
                self.shadow_stale = true;
            }
            match event {
                SettingsEvent::Toggled {
                    setting: Setting::FirstPersonCamera,
                    value,
                } => {
                    self.camera.set_first_person(value);
                    self.apply_orbit_controls();
                }
                SettingsEvent::ScaleChanged { new, .. } => {
                    self.scale_text = format!("{new:.2}");
                }
                SettingsEvent::ShadowColorChanged(color) => {
                    self.shadow_hex = color.to_hex();
                }
                SettingsEvent::Replaced => {
                    self.scale_text = format!("{:.2}", self.settings.model_scale);
                    self.shadow_hex = self.settings.shadow_color.to_hex();
                    self.camera.set_first_person(self.settings.use_first_person_camera);
                }
                _ => {}
            }
        }
        // A fresh request goes out even when it equals the previous one.
        self.reload |= reload;
    }

    fn apply_orbit_controls(&mut self) {
        let controls = self.scene.nodes().iter().find_map(|n| match n {
            SceneNode::OrbitControls {
                rotate_speed,
                damping,
            } => Some((*rotate_speed, *damping)),
            _ => None,
        });
        if let (CameraRig::Orbit(cam), Some((rotate_speed, damping))) = (&mut self.camera, controls) {
            cam.rotate_speed = rotate_speed;
            cam.damping = damping;
        }
    }

    fn sync_environment(&mut self) {
        let request = self.scene.environment_request();
        if self.reload || request != self.requested {
            self.reload = false;
            self.requested = request.clone();
            match request {
                Some(req) => self.submit(req),
                None => {
                    if let Some(token) = self.token.take() {
                        self.slot.uninstall(token);
                    }
                    self.pending = false;
                    self.loaded = None;
                    self.installed = None;
                }
            }
        }

        if let Some(jobs) = &mut self.jobs {
            match jobs.poll() {
                Ok(Some(result)) => {
                    tracing::info!("environment ready: {}", result.request);
                    self.pending = false;
                    self.loaded = Some(result.asset);
                    self.installed = None;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("environment worker stopped, loading inline: {e}");
                    self.jobs = None;
                    if self.pending {
                        if let Some(request) = self.requested.clone() {
                            self.load_inline(&request);
                        }
                    }
                }
            }
        }

        let (Some(asset), Some(params)) = (&self.loaded, self.scene.environment_params()) else {
            return;
        };
        if self.installed == Some(params) {
            return;
        }
        if let Some(token) = self.token.take() {
            self.slot.uninstall(token);
        }
        self.token = Some(self.slot.install(SceneEnvironment::build(asset, &params)));
        self.installed = Some(params);
    }

    fn submit(&mut self, request: EnvironmentRequest) {
        if let Some(jobs) = &mut self.jobs {
            match jobs.submit(request.clone()) {
                Ok(_) => {
                    self.pending = true;
                    return;
                }
                Err(e) => {
                    tracing::warn!("environment worker stopped, loading inline: {e}");
                    self.jobs = None;
                }
            }
        }
        self.load_inline(&request);
    }

    fn load_inline(&mut self, request: &EnvironmentRequest) {
        self.pending = false;
        self.loaded = Some(resolve(&self.loader, request));
        self.installed = None;
    }

    fn sync_shadows(&mut self) {
        let target = self
            .scene
            .accumulative_shadows()
            .zip(self.scene.model());
        let Some((params, model)) = target else {
            if self.shadow.take().is_some() {
                self.shadow_changed = true;
            }
            self.shadow_stale = true;
            return;
        };
        if !self.shadow_stale {
            return;
        }
        let root = Mat4::from_translation(model.position) * Mat4::from_scale(Vec3::splat(model.scale));
        let triangles = model.asset.world_triangles(&root, &model.asset.rest_pose());
        let map = self.baker.bake(&triangles, params, &self.scene.soft_shadows());
        tracing::info!(
            "baked shadows for {} triangles, coverage {:.1}%",
            triangles.len(),
            map.coverage() * 100.0
        );
        self.shadow = Some(map);
        self.shadow_stale = false;
        self.shadow_changed = true;
    }
}
