use glint_common::Color;
use serde::{Deserialize, Serialize};

use crate::config::SettingsError;
use crate::options::{HDR_OPTIONS, PANORAMA_OPTIONS, SHADOW_COLOR_PRESETS};

/// Lower bound shared by the scale slider and number box.
pub const MODEL_SCALE_MIN: f32 = 0.1;
/// Upper bound of the scale number box (the slider stops at 5).
pub const MODEL_SCALE_MAX: f32 = 10.0;
pub const MODEL_SCALE_SLIDER_MAX: f32 = 5.0;

/// Where the environment lighting comes from when no panorama is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentType {
    #[default]
    Hdr,
    Studio,
}

/// How a panorama image is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanoramaType {
    /// Background and environment lighting.
    #[default]
    Environment,
    /// A large inward-facing sphere that follows the camera.
    Sphere,
}

/// Lightformer rig used by the studio environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudioPreset {
    #[default]
    Default,
    Disco,
    Sunset,
    Night,
}

impl StudioPreset {
    pub const ALL: [StudioPreset; 4] = [
        StudioPreset::Default,
        StudioPreset::Disco,
        StudioPreset::Sunset,
        StudioPreset::Night,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StudioPreset::Default => "Studio",
            StudioPreset::Disco => "Disco",
            StudioPreset::Sunset => "Sunset",
            StudioPreset::Night => "Night",
        }
    }
}

/// The boolean toggles of the settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Setting {
    AccumulativeShadows,
    Lighting,
    Environment,
    GroundProjection,
    PostProcessing,
    Ssr,
    Rings,
    Bloom,
    FirstPersonCamera,
    Cursor,
    Panorama,
    StandardFloor,
    ReflectiveFloor,
}

impl Setting {
    pub fn label(&self) -> &'static str {
        match self {
            Setting::AccumulativeShadows => "Accumulative Shadows",
            Setting::Lighting => "Enable Lighting",
            Setting::Environment => "Enable Environment",
            Setting::GroundProjection => "Ground Projection",
            Setting::PostProcessing => "Post Processing",
            Setting::Ssr => "Screen Space Reflections",
            Setting::Rings => "Animated Rings",
            Setting::Bloom => "Bloom",
            Setting::FirstPersonCamera => "First Person Camera",
            Setting::Cursor => "Enable Cursor",
            Setting::Panorama => "Panorama",
            Setting::StandardFloor => "Standard Floor",
            Setting::ReflectiveFloor => "Reflective Floor",
        }
    }
}

/// A change made through one of the settings handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingsEvent {
    Toggled { setting: Setting, value: bool },
    HdrSelected { file: String },
    PanoramaSelected { file: String },
    EnvironmentTypeChanged(EnvironmentType),
    PanoramaTypeChanged(PanoramaType),
    StudioPresetChanged(StudioPreset),
    ScaleChanged { old: f32, new: f32 },
    ShadowColorChanged(Color),
    LightColorChanged(Color),
    LightIntensityChanged(f32),
    BackgroundColorChanged(Color),
    Replaced,
}

impl SettingsEvent {
    /// Whether the scene's environment image (or studio bake) has to be reloaded.
    pub fn requires_environment_reload(&self) -> bool {
        match self {
            SettingsEvent::Toggled { setting, .. } => {
                matches!(setting, Setting::Environment | Setting::Panorama)
            }
            SettingsEvent::HdrSelected { .. }
            | SettingsEvent::PanoramaSelected { .. }
            | SettingsEvent::EnvironmentTypeChanged(_)
            | SettingsEvent::PanoramaTypeChanged(_)
            | SettingsEvent::StudioPresetChanged(_)
            | SettingsEvent::Replaced => true,
            _ => false,
        }
    }

    /// Whether baked accumulative shadows are stale.
    pub fn requires_shadow_rebake(&self) -> bool {
        match self {
            SettingsEvent::Toggled { setting, .. } => {
                matches!(setting, Setting::AccumulativeShadows)
            }
            SettingsEvent::ScaleChanged { .. }
            | SettingsEvent::ShadowColorChanged(_)
            | SettingsEvent::Replaced => true,
            _ => false,
        }
    }
}

/// The flat settings record held by the viewer and passed down to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerSettings {
    pub enable_accumulative_shadows: bool,
    pub enable_lighting: bool,
    pub enable_environment: bool,
    pub selected_hdr: String,
    pub enable_ground_projection: bool,
    pub enable_post_processing: bool,
    pub enable_ssr: bool,
    pub enable_rings: bool,
    pub enable_bloom: bool,
    pub use_first_person_camera: bool,
    pub model_scale: f32,
    pub enable_cursor: bool,
    pub shadow_color: Color,
    pub enable_panorama: bool,
    pub selected_panorama: String,
    pub panorama_type: PanoramaType,
    pub environment_type: EnvironmentType,
    pub studio_preset: StudioPreset,
    pub enable_standard_floor: bool,
    pub enable_reflective_floor: bool,
    pub background_color: Color,
    pub light_color: Color,
    pub light_intensity: f32,
    #[serde(skip)]
    events: Vec<SettingsEvent>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            enable_accumulative_shadows: true,
            enable_lighting: true,
            enable_environment: true,
            selected_hdr: "dawn.hdr".into(),
            enable_ground_projection: true,
            enable_post_processing: false,
            enable_ssr: false,
            enable_rings: false,
            enable_bloom: false,
            use_first_person_camera: false,
            model_scale: 0.8,
            enable_cursor: false,
            shadow_color: Color::BLACK,
            enable_panorama: false,
            selected_panorama: "09.jpg".into(),
            panorama_type: PanoramaType::Environment,
            environment_type: EnvironmentType::Hdr,
            studio_preset: StudioPreset::Default,
            enable_standard_floor: false,
            enable_reflective_floor: false,
            background_color: Color::WHITE,
            light_color: Color::WHITE,
            light_intensity: 5.5,
            events: Vec::new(),
        }
    }
}

impl ViewerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return the change log.
    pub fn drain_events(&mut self) -> Vec<SettingsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to the change log.
    pub fn events(&self) -> &[SettingsEvent] {
        &self.events
    }

    /// Replace the whole record (config reload), logging a single event.
    pub fn replace(&mut self, mut other: ViewerSettings) {
        other.events = std::mem::take(&mut self.events);
        *self = other;
        self.enforce_ground_projection();
        self.events.push(SettingsEvent::Replaced);
    }

    pub fn get(&self, setting: Setting) -> bool {
        match setting {
            Setting::AccumulativeShadows => self.enable_accumulative_shadows,
            Setting::Lighting => self.enable_lighting,
            Setting::Environment => self.enable_environment,
            Setting::GroundProjection => self.enable_ground_projection,
            Setting::PostProcessing => self.enable_post_processing,
            Setting::Ssr => self.enable_ssr,
            Setting::Rings => self.enable_rings,
            Setting::Bloom => self.enable_bloom,
            Setting::FirstPersonCamera => self.use_first_person_camera,
            Setting::Cursor => self.enable_cursor,
            Setting::Panorama => self.enable_panorama,
            Setting::StandardFloor => self.enable_standard_floor,
            Setting::ReflectiveFloor => self.enable_reflective_floor,
        }
    }

    fn slot(&mut self, setting: Setting) -> &mut bool {
        match setting {
            Setting::AccumulativeShadows => &mut self.enable_accumulative_shadows,
            Setting::Lighting => &mut self.enable_lighting,
            Setting::Environment => &mut self.enable_environment,
            Setting::GroundProjection => &mut self.enable_ground_projection,
            Setting::PostProcessing => &mut self.enable_post_processing,
            Setting::Ssr => &mut self.enable_ssr,
            Setting::Rings => &mut self.enable_rings,
            Setting::Bloom => &mut self.enable_bloom,
            Setting::FirstPersonCamera => &mut self.use_first_person_camera,
            Setting::Cursor => &mut self.enable_cursor,
            Setting::Panorama => &mut self.enable_panorama,
            Setting::StandardFloor => &mut self.enable_standard_floor,
            Setting::ReflectiveFloor => &mut self.enable_reflective_floor,
        }
    }

    /// Flip one toggle. Returns false when the toggle is currently locked
    /// (ground projection while a panorama or the studio rig is active).
    pub fn toggle(&mut self, setting: Setting) -> bool {
        let value = !self.get(setting);
        self.set(setting, value)
    }

    /// Set one toggle to an explicit value.
    pub fn set(&mut self, setting: Setting, value: bool) -> bool {
        if setting == Setting::GroundProjection && value && !self.ground_projection_available() {
            tracing::debug!("ground projection locked off");
            return false;
        }
        if self.get(setting) == value {
            return true;
        }
        *self.slot(setting) = value;
        self.events.push(SettingsEvent::Toggled { setting, value });
        if setting == Setting::Panorama && value {
            self.enforce_ground_projection();
        }
        true
    }

    /// Ground projection only makes sense for the HDR environment.
    pub fn ground_projection_available(&self) -> bool {
        !self.enable_panorama && self.environment_type == EnvironmentType::Hdr
    }

    fn enforce_ground_projection(&mut self) {
        if !self.ground_projection_available() && self.enable_ground_projection {
            self.enable_ground_projection = false;
            self.events.push(SettingsEvent::Toggled {
                setting: Setting::GroundProjection,
                value: false,
            });
        }
    }

    pub fn select_hdr(&mut self, file: &str) -> Result<(), SettingsError> {
        if !HDR_OPTIONS.contains(&file) {
            return Err(SettingsError::UnknownOption(file.to_string()));
        }
        if self.selected_hdr != file {
            self.selected_hdr = file.to_string();
            self.events.push(SettingsEvent::HdrSelected {
                file: file.to_string(),
            });
        }
        Ok(())
    }

    pub fn select_panorama(&mut self, file: &str) -> Result<(), SettingsError> {
        if !PANORAMA_OPTIONS.contains(&file) {
            return Err(SettingsError::UnknownOption(file.to_string()));
        }
        if self.selected_panorama != file {
            self.selected_panorama = file.to_string();
            self.events.push(SettingsEvent::PanoramaSelected {
                file: file.to_string(),
            });
        }
        Ok(())
    }

    pub fn set_environment_type(&mut self, ty: EnvironmentType) {
        if self.environment_type == ty {
            return;
        }
        self.environment_type = ty;
        self.events.push(SettingsEvent::EnvironmentTypeChanged(ty));
        self.enforce_ground_projection();
    }

    pub fn set_panorama_type(&mut self, ty: PanoramaType) {
        if self.panorama_type != ty {
            self.panorama_type = ty;
            self.events.push(SettingsEvent::PanoramaTypeChanged(ty));
        }
    }

    pub fn set_studio_preset(&mut self, preset: StudioPreset) {
        if self.studio_preset != preset {
            self.studio_preset = preset;
            self.events.push(SettingsEvent::StudioPresetChanged(preset));
        }
    }

    /// Set the model scale, clamped to the number box range.
    pub fn set_model_scale(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        let new = value.clamp(MODEL_SCALE_MIN, MODEL_SCALE_MAX);
        let old = self.model_scale;
        if old != new {
            self.model_scale = new;
            self.events.push(SettingsEvent::ScaleChanged { old, new });
        }
    }

    /// Parse user text into a scale. Non-numeric input leaves the record
    /// untouched and returns false.
    pub fn set_model_scale_str(&mut self, text: &str) -> bool {
        match text.trim().parse::<f32>() {
            Ok(v) if v.is_finite() => {
                self.set_model_scale(v);
                true
            }
            _ => false,
        }
    }

    pub fn set_shadow_color(&mut self, hex: &str) -> Result<(), SettingsError> {
        let color = Color::parse(hex)?;
        if self.shadow_color != color {
            self.shadow_color = color;
            self.events.push(SettingsEvent::ShadowColorChanged(color));
        }
        Ok(())
    }

    pub fn apply_shadow_preset(&mut self, index: usize) -> Result<(), SettingsError> {
        let preset = SHADOW_COLOR_PRESETS
            .get(index)
            .ok_or_else(|| SettingsError::UnknownOption(format!("shadow preset #{index}")))?;
        self.set_shadow_color(preset.hex)
    }

    pub fn set_light_color(&mut self, color: Color) {
        if self.light_color != color {
            self.light_color = color;
            self.events.push(SettingsEvent::LightColorChanged(color));
        }
    }

    pub fn set_light_intensity(&mut self, intensity: f32) {
        let intensity = intensity.max(0.0);
        if self.light_intensity != intensity {
            self.light_intensity = intensity;
            self.events
                .push(SettingsEvent::LightIntensityChanged(intensity));
        }
    }

    pub fn set_background_color(&mut self, color: Color) {
        if self.background_color != color {
            self.background_color = color;
            self.events.push(SettingsEvent::BackgroundColorChanged(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_viewer() {
        let s = ViewerSettings::default();
        assert!(s.enable_accumulative_shadows);
        assert!(s.enable_environment);
        assert_eq!(s.selected_hdr, "dawn.hdr");
        assert_eq!(s.selected_panorama, "09.jpg");
        assert_eq!(s.model_scale, 0.8);
        assert_eq!(s.light_intensity, 5.5);
        assert_eq!(s.background_color, Color::WHITE);
        assert!(!s.enable_bloom);
        assert!(s.events().is_empty());
    }

    #[test]
    fn toggle_flips_and_logs() {
        let mut s = ViewerSettings::default();
        assert!(s.toggle(Setting::Rings));
        assert!(s.enable_rings);
        assert!(s.toggle(Setting::Rings));
        assert!(!s.enable_rings);
        assert_eq!(s.events().len(), 2);
    }

    #[test]
    fn panorama_disables_ground_projection() {
        let mut s = ViewerSettings::default();
        assert!(s.enable_ground_projection);
        s.toggle(Setting::Panorama);
        assert!(!s.enable_ground_projection);
        assert!(!s.toggle(Setting::GroundProjection));
        assert!(!s.enable_ground_projection);

        s.toggle(Setting::Panorama);
        assert!(s.toggle(Setting::GroundProjection));
        assert!(s.enable_ground_projection);
    }

    #[test]
    fn studio_disables_ground_projection() {
        let mut s = ViewerSettings::default();
        s.set_environment_type(EnvironmentType::Studio);
        assert!(!s.enable_ground_projection);
        assert!(!s.ground_projection_available());
        let events = s.drain_events();
        assert!(events.contains(&SettingsEvent::Toggled {
            setting: Setting::GroundProjection,
            value: false
        }));
    }

    #[test]
    fn hdr_selection_validated() {
        let mut s = ViewerSettings::default();
        s.select_hdr("city.hdr").unwrap();
        assert_eq!(s.selected_hdr, "city.hdr");
        assert!(matches!(
            s.select_hdr("moon.hdr"),
            Err(SettingsError::UnknownOption(_))
        ));
        assert_eq!(s.selected_hdr, "city.hdr");
        let events = s.drain_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].requires_environment_reload());
    }

    #[test]
    fn scale_text_ignores_garbage() {
        let mut s = ViewerSettings::default();
        assert!(!s.set_model_scale_str("abc"));
        assert_eq!(s.model_scale, 0.8);
        assert!(s.set_model_scale_str(" 2.5 "));
        assert_eq!(s.model_scale, 2.5);
        assert!(s.set_model_scale_str("42"));
        assert_eq!(s.model_scale, MODEL_SCALE_MAX);
        assert!(s.set_model_scale_str("0"));
        assert_eq!(s.model_scale, MODEL_SCALE_MIN);
    }

    #[test]
    fn shadow_presets_apply() {
        let mut s = ViewerSettings::default();
        s.apply_shadow_preset(1).unwrap();
        assert_eq!(s.shadow_color.to_hex(), "#081c76");
        assert!(s.apply_shadow_preset(99).is_err());
        assert!(s.set_shadow_color("not a color").is_err());
        assert_eq!(s.shadow_color.to_hex(), "#081c76");
    }

    #[test]
    fn event_classification() {
        let reload = SettingsEvent::Toggled {
            setting: Setting::Panorama,
            value: true,
        };
        let cosmetic = SettingsEvent::Toggled {
            setting: Setting::Bloom,
            value: true,
        };
        assert!(reload.requires_environment_reload());
        assert!(!cosmetic.requires_environment_reload());
        assert!(SettingsEvent::ScaleChanged { old: 1.0, new: 2.0 }.requires_shadow_rebake());
        assert!(!SettingsEvent::LightIntensityChanged(1.0).requires_shadow_rebake());
    }

    #[test]
    fn replace_enforces_rules() {
        let mut s = ViewerSettings::default();
        let other = ViewerSettings {
            enable_panorama: true,
            enable_ground_projection: true,
            ..ViewerSettings::default()
        };
        s.replace(other);
        assert!(s.enable_panorama);
        assert!(!s.enable_ground_projection);
        assert_eq!(s.events().last(), Some(&SettingsEvent::Replaced));
    }
}
