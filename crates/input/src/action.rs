use glam::Vec3;
use glint_settings::{Setting, ViewerSettings};
use std::path::PathBuf;

/// Help lines shown in the Camera tab.
pub const CAMERA_HELP: [&str; 3] = [
    "Orbit Mode: Click and drag to rotate",
    "First Person: WASD to move, mouse to look",
    "Space to jump in First Person mode",
];

/// A high-level action produced by the keyboard or the drop zone.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Flip one boolean setting.
    Toggle(Setting),
    ToggleSettingsPanel,
    /// Import the model at this path.
    OpenModel(PathBuf),
    /// Switch between orbit and first-person controls.
    ToggleCameraMode,
    ResetCamera,
    /// Walk direction in camera space, first-person only.
    Move(Vec3),
    Jump,
    SaveSettings,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}

/// A key (optionally with Ctrl) bound to an action.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBinding {
    pub key: &'static str,
    pub ctrl: bool,
    pub action: Action,
}

impl KeyBinding {
    fn new(key: &'static str, action: Action) -> Self {
        Self {
            key,
            ctrl: false,
            action,
        }
    }

    fn ctrl(key: &'static str, action: Action) -> Self {
        Self {
            key,
            ctrl: true,
            action,
        }
    }
}

pub fn default_bindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new("Tab", Action::ToggleSettingsPanel),
        KeyBinding::new("C", Action::ToggleCameraMode),
        KeyBinding::new("R", Action::ResetCamera),
        KeyBinding::new("Space", Action::Jump),
        KeyBinding::new("W", Action::Move(Vec3::NEG_Z)),
        KeyBinding::new("S", Action::Move(Vec3::Z)),
        KeyBinding::new("A", Action::Move(Vec3::NEG_X)),
        KeyBinding::new("D", Action::Move(Vec3::X)),
        KeyBinding::new("L", Action::Toggle(Setting::Lighting)),
        KeyBinding::new("E", Action::Toggle(Setting::Environment)),
        KeyBinding::new("G", Action::Toggle(Setting::GroundProjection)),
        KeyBinding::new("P", Action::Toggle(Setting::Panorama)),
        KeyBinding::new("B", Action::Toggle(Setting::Bloom)),
        KeyBinding::ctrl("S", Action::SaveSettings),
    ]
}

/// Find the action bound to `key`. Key names compare case-insensitively.
pub fn lookup<'a>(bindings: &'a [KeyBinding], key: &str, ctrl: bool) -> Option<&'a Action> {
    bindings
        .iter()
        .find(|b| b.ctrl == ctrl && b.key.eq_ignore_ascii_case(key))
        .map(|b| &b.action)
}

/// Perform the settings side of `action`. Returns whether the settings
/// changed; actions without a settings side return false.
pub fn apply(action: &Action, settings: &mut ViewerSettings) -> bool {
    match action {
        Action::Toggle(setting) => {
            let changed = settings.toggle(*setting);
            if !changed {
                tracing::debug!("{} is locked", setting.label());
            }
            changed
        }
        Action::ToggleCameraMode => settings.toggle(Setting::FirstPersonCamera),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_respects_modifier() {
        let b = default_bindings();
        assert_eq!(lookup(&b, "s", false), Some(&Action::Move(Vec3::Z)));
        assert_eq!(lookup(&b, "S", true), Some(&Action::SaveSettings));
        assert_eq!(lookup(&b, "F12", false), None);
    }

    #[test]
    fn toggle_action_flips_setting() {
        let mut s = ViewerSettings::default();
        assert!(apply(&Action::Toggle(Setting::Bloom), &mut s));
        assert!(s.enable_bloom);
        assert!(apply(&Action::ToggleCameraMode, &mut s));
        assert!(s.use_first_person_camera);
    }

    #[test]
    fn locked_ground_projection_reports_no_change() {
        let mut s = ViewerSettings::default();
        apply(&Action::Toggle(Setting::Panorama), &mut s);
        assert!(!s.enable_ground_projection);
        assert!(!apply(&Action::Toggle(Setting::GroundProjection), &mut s));
        assert!(!s.enable_ground_projection);
    }

    #[test]
    fn non_settings_actions_leave_settings_alone() {
        let mut s = ViewerSettings::default();
        assert!(!apply(&Action::Jump, &mut s));
        assert!(!apply(&Action::OpenModel("a.glb".into()), &mut s));
        assert!(s.drain_events().is_empty());
    }
}
