//! The scene's single background/environment slot.

use std::sync::Arc;

use glint_assets::EquirectImage;
use glint_common::Color;

use crate::ground::GroundProjection;
use crate::loader::{EnvironmentAsset, FALLBACK_COLOR};
use crate::prefilter::PrefilteredEnvironment;

#[derive(Debug, Clone)]
pub enum Background {
    Color(Color),
    Map(Arc<PrefilteredEnvironment>),
    /// Panorama drawn on a large inward-facing sphere.
    Sphere(Arc<EquirectImage>),
}

/// How a loaded environment is presented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentParams {
    /// Whether the map replaces the scene background.
    pub show_background: bool,
    /// Whether the map lights the scene.
    pub lighting: bool,
    pub background_intensity: f32,
    pub background_blurriness: f32,
    pub environment_intensity: f32,
    pub ground: Option<GroundProjection>,
    /// Scene background color, kept when the map is not shown.
    pub base_color: Color,
}

impl EnvironmentParams {
    /// Selected HDR file with an optional projected ground.
    pub fn hdr(ground: bool, base_color: Color) -> Self {
        Self {
            show_background: true,
            lighting: true,
            background_intensity: 0.4,
            background_blurriness: 0.0,
            environment_intensity: 0.1,
            ground: ground.then(GroundProjection::default),
            base_color,
        }
    }

    /// The standalone drop-in loader: dimmer, slightly blurred background.
    pub fn fallback_loader(base_color: Color) -> Self {
        Self {
            show_background: true,
            lighting: true,
            background_intensity: 0.4,
            background_blurriness: 0.3,
            environment_intensity: 1.0,
            ground: None,
            base_color,
        }
    }

    /// Baked lightformers light the scene but keep the scene background.
    pub fn studio(base_color: Color) -> Self {
        Self {
            show_background: false,
            lighting: true,
            background_intensity: 1.0,
            background_blurriness: 0.0,
            environment_intensity: 1.0,
            ground: None,
            base_color,
        }
    }

    /// Panorama used as both background and lighting.
    pub fn panorama(base_color: Color) -> Self {
        Self {
            show_background: true,
            lighting: true,
            background_intensity: 1.0,
            background_blurriness: 0.0,
            environment_intensity: 1.0,
            ground: None,
            base_color,
        }
    }

    /// Panorama on a sphere: visible only, no lighting.
    pub fn panorama_sphere(base_color: Color) -> Self {
        Self {
            lighting: false,
            ..Self::panorama(base_color)
        }
    }
}

/// What the renderer draws behind the scene and lights it with.
#[derive(Debug, Clone)]
pub struct SceneEnvironment {
    pub background: Background,
    pub lighting: Option<Arc<PrefilteredEnvironment>>,
    pub background_intensity: f32,
    pub background_blurriness: f32,
    pub environment_intensity: f32,
    pub ground: Option<GroundProjection>,
}

impl SceneEnvironment {
    /// A plain colored background with no environment lighting.
    pub fn solid(color: Color) -> Self {
        Self {
            background: Background::Color(color),
            lighting: None,
            background_intensity: 1.0,
            background_blurriness: 0.0,
            environment_intensity: 0.0,
            ground: None,
        }
    }

    /// Combine a loaded asset with presentation parameters.
    pub fn build(asset: &EnvironmentAsset, params: &EnvironmentParams) -> Self {
        let base = Background::Color(params.base_color);
        match asset {
            EnvironmentAsset::Missing { color } => Self::solid(*color),
            EnvironmentAsset::Prefiltered(env) => Self {
                background: if params.show_background {
                    Background::Map(env.clone())
                } else {
                    base
                },
                lighting: params.lighting.then(|| env.clone()),
                background_intensity: params.background_intensity,
                background_blurriness: params.background_blurriness,
                environment_intensity: params.environment_intensity,
                ground: params.ground.filter(|_| params.show_background),
            },
            EnvironmentAsset::Panorama(image) => Self {
                background: if params.show_background {
                    Background::Sphere(image.clone())
                } else {
                    base
                },
                lighting: None,
                background_intensity: params.background_intensity,
                background_blurriness: 0.0,
                environment_intensity: 0.0,
                ground: None,
            },
        }
    }

    pub fn has_lighting(&self) -> bool {
        self.lighting.is_some()
    }
}

#[derive(Debug, Clone)]
struct Installed {
    id: u64,
    environment: SceneEnvironment,
}

/// Returned by [`EnvironmentSlot::install`]; hand it back to undo the install.
#[derive(Debug)]
#[must_use = "dropping the token makes the install permanent"]
pub struct InstallToken {
    id: u64,
    previous: Option<Installed>,
}

/// Holds the environment the scene currently renders with.
#[derive(Debug, Default)]
pub struct EnvironmentSlot {
    current: Option<Installed>,
    next_id: u64,
}

impl EnvironmentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SceneEnvironment> {
        self.current.as_ref().map(|i| &i.environment)
    }

    pub fn install(&mut self, environment: SceneEnvironment) -> InstallToken {
        self.next_id += 1;
        let id = self.next_id;
        let previous = self.current.replace(Installed { id, environment });
        tracing::debug!("environment {id} installed");
        InstallToken { id, previous }
    }

    /// Restore what was there before `token`'s install, unless something
    /// else has been installed since. Returns whether the slot changed.
    pub fn uninstall(&mut self, token: InstallToken) -> bool {
        match &self.current {
            Some(cur) if cur.id == token.id => {
                self.current = token.previous;
                tracing::debug!("environment {} uninstalled", token.id);
                true
            }
            _ => {
                tracing::debug!("environment {} already replaced, leaving slot", token.id);
                false
            }
        }
    }

    /// Drop any environment and show the fallback background.
    pub fn reset(&mut self) {
        self.next_id += 1;
        self.current = Some(Installed {
            id: self.next_id,
            environment: SceneEnvironment::solid(FALLBACK_COLOR),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Arc<PrefilteredEnvironment> {
        Arc::new(PrefilteredEnvironment::from_equirect(
            EquirectImage::solid(8, 4, [1.0; 3]),
            crate::PrefilterConfig {
                base_width: 8,
                levels: 2,
                samples: 4,
                irradiance_width: 4,
                irradiance_samples: 4,
            },
        ))
    }

    fn is_color(e: Option<&SceneEnvironment>, hex: &str) -> bool {
        matches!(e, Some(SceneEnvironment { background: Background::Color(c), .. }) if c.to_hex() == hex)
    }

    #[test]
    fn hdr_params_match_viewer() {
        let asset = EnvironmentAsset::Prefiltered(env());
        let e = SceneEnvironment::build(&asset, &EnvironmentParams::hdr(true, Color::WHITE));
        assert!(matches!(e.background, Background::Map(_)));
        assert_eq!(e.background_intensity, 0.4);
        assert_eq!(e.environment_intensity, 0.1);
        assert_eq!(e.ground, Some(GroundProjection::default()));
        let e = SceneEnvironment::build(&asset, &EnvironmentParams::hdr(false, Color::WHITE));
        assert!(e.ground.is_none());
    }

    #[test]
    fn studio_keeps_scene_background() {
        let asset = EnvironmentAsset::Prefiltered(env());
        let e = SceneEnvironment::build(&asset, &EnvironmentParams::studio(Color::BLACK));
        assert!(matches!(e.background, Background::Color(c) if c == Color::BLACK));
        assert!(e.has_lighting());
    }

    #[test]
    fn missing_asset_is_solid_fallback() {
        let asset = EnvironmentAsset::Missing {
            color: FALLBACK_COLOR,
        };
        let e = SceneEnvironment::build(&asset, &EnvironmentParams::hdr(true, Color::WHITE));
        assert!(!e.has_lighting());
        assert!(e.ground.is_none());
        assert!(is_color(Some(&e), "#121212"));
    }

    #[test]
    fn uninstall_restores_previous() {
        let mut slot = EnvironmentSlot::new();
        let a = slot.install(SceneEnvironment::solid(Color::from_rgb8(1, 1, 1)));
        let b = slot.install(SceneEnvironment::solid(Color::from_rgb8(2, 2, 2)));
        assert!(slot.uninstall(b));
        assert!(is_color(slot.current(), "#010101"));
        assert!(slot.uninstall(a));
        assert!(slot.current().is_none());
    }

    #[test]
    fn stale_uninstall_leaves_newer_environment() {
        let mut slot = EnvironmentSlot::new();
        let a = slot.install(SceneEnvironment::solid(Color::from_rgb8(1, 1, 1)));
        let _b = slot.install(SceneEnvironment::solid(Color::from_rgb8(2, 2, 2)));
        assert!(!slot.uninstall(a));
        assert!(is_color(slot.current(), "#020202"));
    }

    #[test]
    fn reset_shows_fallback() {
        let mut slot = EnvironmentSlot::new();
        let t = slot.install(SceneEnvironment::solid(Color::WHITE));
        slot.reset();
        assert!(is_color(slot.current(), "#121212"));
        assert!(!slot.uninstall(t));
    }
}
