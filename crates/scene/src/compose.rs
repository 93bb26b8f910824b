//! Mapping from [`ViewerSettings`] to an ordered list of scene nodes.

use std::sync::Arc;

use glam::Vec3;
use glint_assets::{AssetId, ModelAsset};
use glint_common::Color;
use glint_environment::{EnvironmentParams, EnvironmentRequest, STUDIO_RESOLUTION};
use glint_settings::{EnvironmentType, PanoramaType, StudioPreset, ViewerSettings};

/// Size of the translation gizmo drawn in cursor mode.
pub const GIZMO_SCALE: f32 = 3.0;

/// A model the user has dropped into the viewer.
#[derive(Debug, Clone)]
pub struct ModelState {
    pub id: AssetId,
    pub asset: Arc<ModelAsset>,
    /// Offset applied by dragging the gizmo.
    pub position: Vec3,
    pub autoplay: bool,
    pub animation_index: usize,
}

impl ModelState {
    pub fn new(id: AssetId, asset: Arc<ModelAsset>) -> Self {
        Self {
            id,
            asset,
            position: Vec3::ZERO,
            autoplay: true,
            animation_index: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub id: AssetId,
    pub asset: Arc<ModelAsset>,
    pub scale: f32,
    pub position: Vec3,
    pub autoplay: bool,
    pub animation_index: usize,
    pub gizmo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomizedLight {
    pub amount: u32,
    pub radius: f32,
    /// Fraction of samples spread over the sky instead of around `position`.
    pub ambient: f32,
    pub intensity: f32,
    pub position: Vec3,
    pub bias: f32,
}

impl Default for RandomizedLight {
    fn default() -> Self {
        Self {
            amount: 8,
            radius: 4.0,
            ambient: 0.3,
            intensity: 2.0,
            position: Vec3::new(6.0, 8.0, 5.0),
            bias: 0.001,
        }
    }
}

/// Shadow catcher on the ground, accumulated from randomized lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulativeShadows {
    pub temporal: bool,
    pub frames: u32,
    /// Side length of the catcher in world units.
    pub scale: f32,
    pub y: f32,
    pub color: Color,
    pub opacity: f32,
    pub blend: u32,
    pub light: RandomizedLight,
}

impl AccumulativeShadows {
    pub fn with_color(color: Color) -> Self {
        Self {
            temporal: true,
            frames: 10,
            scale: 20.0,
            y: 0.01,
            color,
            opacity: 1.0,
            blend: 10,
            light: RandomizedLight::default(),
        }
    }
}

/// Key light of the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingNode {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub ambient: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftShadows {
    pub size: f32,
    pub focus: f32,
    pub samples: u32,
}

impl Default for SoftShadows {
    fn default() -> Self {
        Self {
            size: 40.0,
            focus: 0.2,
            samples: 17,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardFloor {
    pub size: f32,
    pub y: f32,
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub receive_shadow: bool,
}

impl Default for StandardFloor {
    fn default() -> Self {
        Self {
            size: 50.0,
            y: -0.2,
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 0.0,
            receive_shadow: true,
        }
    }
}

/// Mirror-like floor that reflects the scene with a blurred mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectiveFloor {
    pub size: f32,
    pub color: Color,
    pub mirror: f32,
    pub mix_strength: f32,
    pub mix_blur: f32,
    pub blur: [f32; 2],
    pub resolution: u32,
    pub roughness: f32,
    pub metalness: f32,
    pub depth_scale: f32,
    pub min_depth_threshold: f32,
    pub max_depth_threshold: f32,
}

impl Default for ReflectiveFloor {
    fn default() -> Self {
        Self {
            size: 100.0,
            color: Color::from_rgb8(0x20, 0x20, 0x20),
            mirror: 0.5,
            mix_strength: 50.0,
            mix_blur: 1.0,
            blur: [300.0, 100.0],
            resolution: 1024,
            roughness: 1.0,
            metalness: 0.0,
            depth_scale: 1.2,
            min_depth_threshold: 0.4,
            max_depth_threshold: 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessing {
    pub vignette_offset: f32,
    pub vignette_darkness: f32,
    pub chromatic_offset: [f32; 2],
}

impl Default for PostProcessing {
    fn default() -> Self {
        Self {
            vignette_offset: 0.3,
            vignette_darkness: 0.6,
            chromatic_offset: [0.0005, 0.0012],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bloom {
    pub intensity: f32,
    pub threshold: f32,
    pub smoothing: f32,
    pub kernel_size: u32,
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            intensity: 1.3,
            threshold: 0.15,
            smoothing: 0.025,
            kernel_size: 5,
        }
    }
}

/// Initial camera placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraDefaults {
    pub position: Vec3,
    pub fov_degrees: f32,
}

impl Default for CameraDefaults {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            fov_degrees: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Background,
    Model,
    AccumulativeShadows,
    Lighting,
    SoftShadows,
    HdrEnvironment,
    StudioEnvironment,
    PanoramaEnvironment,
    PanoramaSphere,
    Ssr,
    StandardFloor,
    ReflectiveFloor,
    OrbitControls,
    FirstPersonControls,
    PostProcessing,
    Bloom,
    Rings,
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Background => "background",
            NodeKind::Model => "model",
            NodeKind::AccumulativeShadows => "accumulative-shadows",
            NodeKind::Lighting => "lighting",
            NodeKind::SoftShadows => "soft-shadows",
            NodeKind::HdrEnvironment => "hdr-environment",
            NodeKind::StudioEnvironment => "studio-environment",
            NodeKind::PanoramaEnvironment => "panorama-environment",
            NodeKind::PanoramaSphere => "panorama-sphere",
            NodeKind::Ssr => "ssr",
            NodeKind::StandardFloor => "standard-floor",
            NodeKind::ReflectiveFloor => "reflective-floor",
            NodeKind::OrbitControls => "orbit-controls",
            NodeKind::FirstPersonControls => "first-person-controls",
            NodeKind::PostProcessing => "post-processing",
            NodeKind::Bloom => "bloom",
            NodeKind::Rings => "rings",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SceneNode {
    Background {
        color: Color,
    },
    Model(ModelNode),
    AccumulativeShadows(AccumulativeShadows),
    Lighting(LightingNode),
    SoftShadows(SoftShadows),
    HdrEnvironment {
        file: String,
        params: EnvironmentParams,
    },
    StudioEnvironment {
        resolution: u32,
        preset: StudioPreset,
        params: EnvironmentParams,
    },
    PanoramaEnvironment {
        path: String,
        params: EnvironmentParams,
    },
    PanoramaSphere {
        path: String,
        radius: f32,
        width_segments: u32,
        height_segments: u32,
        params: EnvironmentParams,
    },
    Ssr {
        physically_correct_lights: bool,
    },
    StandardFloor(StandardFloor),
    ReflectiveFloor(ReflectiveFloor),
    OrbitControls {
        rotate_speed: f32,
        damping: f32,
    },
    FirstPersonControls,
    PostProcessing(PostProcessing),
    Bloom(Bloom),
    Rings,
}

impl SceneNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            SceneNode::Background { .. } => NodeKind::Background,
            SceneNode::Model(_) => NodeKind::Model,
            SceneNode::AccumulativeShadows(_) => NodeKind::AccumulativeShadows,
            SceneNode::Lighting(_) => NodeKind::Lighting,
            SceneNode::SoftShadows(_) => NodeKind::SoftShadows,
            SceneNode::HdrEnvironment { .. } => NodeKind::HdrEnvironment,
            SceneNode::StudioEnvironment { .. } => NodeKind::StudioEnvironment,
            SceneNode::PanoramaEnvironment { .. } => NodeKind::PanoramaEnvironment,
            SceneNode::PanoramaSphere { .. } => NodeKind::PanoramaSphere,
            SceneNode::Ssr { .. } => NodeKind::Ssr,
            SceneNode::StandardFloor(_) => NodeKind::StandardFloor,
            SceneNode::ReflectiveFloor(_) => NodeKind::ReflectiveFloor,
            SceneNode::OrbitControls { .. } => NodeKind::OrbitControls,
            SceneNode::FirstPersonControls => NodeKind::FirstPersonControls,
            SceneNode::PostProcessing(_) => NodeKind::PostProcessing,
            SceneNode::Bloom(_) => NodeKind::Bloom,
            SceneNode::Rings => NodeKind::Rings,
        }
    }
}

/// The composed scene for one frame.
#[derive(Debug, Clone)]
pub struct SceneDescription {
    nodes: Vec<SceneNode>,
    pub camera: CameraDefaults,
    pub cursor_visible: bool,
}

impl SceneDescription {
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn kinds(&self) -> Vec<NodeKind> {
        self.nodes.iter().map(SceneNode::kind).collect()
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.nodes.iter().any(|n| n.kind() == kind)
    }

    pub fn find(&self, kind: NodeKind) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.kind() == kind)
    }

    pub fn model(&self) -> Option<&ModelNode> {
        self.nodes.iter().find_map(|n| match n {
            SceneNode::Model(m) => Some(m),
            _ => None,
        })
    }

    pub fn background_color(&self) -> Color {
        self.nodes
            .iter()
            .find_map(|n| match n {
                SceneNode::Background { color } => Some(*color),
                _ => None,
            })
            .unwrap_or(Color::WHITE)
    }

    /// The environment or panorama the scene needs loaded, if any.
    pub fn environment_request(&self) -> Option<EnvironmentRequest> {
        self.nodes.iter().find_map(|n| match n {
            SceneNode::HdrEnvironment { file, .. } => {
                Some(EnvironmentRequest::Hdr { file: file.clone() })
            }
            SceneNode::StudioEnvironment { preset, .. } => {
                Some(EnvironmentRequest::Studio { preset: *preset })
            }
            SceneNode::PanoramaEnvironment { path, .. } => Some(EnvironmentRequest::Panorama {
                file: path.clone(),
                sphere: false,
            }),
            SceneNode::PanoramaSphere { path, .. } => Some(EnvironmentRequest::Panorama {
                file: path.clone(),
                sphere: true,
            }),
            _ => None,
        })
    }

    /// Presentation of the requested environment.
    pub fn environment_params(&self) -> Option<EnvironmentParams> {
        self.nodes.iter().find_map(|n| match n {
            SceneNode::HdrEnvironment { params, .. }
            | SceneNode::StudioEnvironment { params, .. }
            | SceneNode::PanoramaEnvironment { params, .. }
            | SceneNode::PanoramaSphere { params, .. } => Some(*params),
            _ => None,
        })
    }

    pub fn accumulative_shadows(&self) -> Option<&AccumulativeShadows> {
        self.nodes.iter().find_map(|n| match n {
            SceneNode::AccumulativeShadows(s) => Some(s),
            _ => None,
        })
    }

    pub fn soft_shadows(&self) -> SoftShadows {
        self.nodes
            .iter()
            .find_map(|n| match n {
                SceneNode::SoftShadows(s) => Some(*s),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn lighting(&self) -> Option<&LightingNode> {
        self.nodes.iter().find_map(|n| match n {
            SceneNode::Lighting(l) => Some(l),
            _ => None,
        })
    }
}

/// Build the scene for the current settings.
pub fn compose(settings: &ViewerSettings, model: Option<&ModelState>) -> SceneDescription {
    let mut nodes = Vec::new();
    let base = settings.background_color;

    nodes.push(SceneNode::Background { color: base });

    if let Some(m) = model {
        nodes.push(SceneNode::Model(ModelNode {
            id: m.id,
            asset: m.asset.clone(),
            scale: settings.model_scale,
            position: m.position,
            autoplay: m.autoplay,
            animation_index: m.animation_index,
            gizmo: settings.enable_cursor,
        }));
    }

    if settings.enable_accumulative_shadows {
        nodes.push(SceneNode::AccumulativeShadows(
            AccumulativeShadows::with_color(settings.shadow_color),
        ));
    }

    if settings.enable_lighting {
        nodes.push(SceneNode::Lighting(LightingNode {
            color: settings.light_color,
            intensity: settings.light_intensity,
            position: Vec3::new(5.0, 10.0, 5.0),
            ambient: 0.5,
        }));
    }

    nodes.push(SceneNode::SoftShadows(SoftShadows::default()));

    if settings.enable_environment && !settings.enable_panorama {
        match settings.environment_type {
            EnvironmentType::Hdr => nodes.push(SceneNode::HdrEnvironment {
                file: format!("/{}", settings.selected_hdr),
                params: EnvironmentParams::hdr(settings.enable_ground_projection, base),
            }),
            EnvironmentType::Studio => nodes.push(SceneNode::StudioEnvironment {
                resolution: STUDIO_RESOLUTION,
                preset: settings.studio_preset,
                params: EnvironmentParams::studio(base),
            }),
        }
    }

    if settings.enable_panorama {
        let path = format!("/{}", settings.selected_panorama);
        nodes.push(match settings.panorama_type {
            PanoramaType::Environment => SceneNode::PanoramaEnvironment {
                path,
                params: EnvironmentParams::panorama(base),
            },
            PanoramaType::Sphere => SceneNode::PanoramaSphere {
                path,
                radius: 500.0,
                width_segments: 60,
                height_segments: 40,
                params: EnvironmentParams::panorama_sphere(base),
            },
        });
    }

    if settings.enable_ssr {
        nodes.push(SceneNode::Ssr {
            physically_correct_lights: true,
        });
    }

    if settings.enable_standard_floor {
        nodes.push(SceneNode::StandardFloor(StandardFloor::default()));
    }

    if settings.enable_reflective_floor {
        nodes.push(SceneNode::ReflectiveFloor(ReflectiveFloor::default()));
    }

    if settings.use_first_person_camera {
        nodes.push(SceneNode::FirstPersonControls);
    } else {
        nodes.push(SceneNode::OrbitControls {
            rotate_speed: 1.0,
            damping: 0.1,
        });
    }

    if settings.enable_post_processing {
        nodes.push(SceneNode::PostProcessing(PostProcessing::default()));
    }
    if settings.enable_bloom {
        nodes.push(SceneNode::Bloom(Bloom::default()));
    }
    if settings.enable_rings {
        nodes.push(SceneNode::Rings);
    }

    tracing::trace!("composed {} scene nodes", nodes.len());
    SceneDescription {
        nodes,
        camera: CameraDefaults::default(),
        cursor_visible: settings.enable_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_settings::Setting;

    fn model() -> ModelState {
        ModelState::new(AssetId(7), Arc::new(ModelAsset::default()))
    }

    #[test]
    fn default_settings_without_model() {
        let scene = compose(&ViewerSettings::default(), None);
        assert_eq!(
            scene.kinds(),
            vec![
                NodeKind::Background,
                NodeKind::AccumulativeShadows,
                NodeKind::Lighting,
                NodeKind::SoftShadows,
                NodeKind::HdrEnvironment,
                NodeKind::OrbitControls,
            ]
        );
        assert_eq!(
            scene.environment_request(),
            Some(EnvironmentRequest::Hdr {
                file: "/dawn.hdr".into()
            })
        );
        let params = scene.environment_params().unwrap();
        assert!(params.ground.is_some());
        assert_eq!(params.environment_intensity, 0.1);
        assert_eq!(scene.camera, CameraDefaults::default());
        assert!(!scene.cursor_visible);
    }

    #[test]
    fn model_follows_scale_and_cursor() {
        let mut s = ViewerSettings::default();
        s.set_model_scale(2.5);
        s.toggle(Setting::Cursor);
        let scene = compose(&s, Some(&model()));
        assert_eq!(scene.kinds()[1], NodeKind::Model);
        let m = scene.model().unwrap();
        assert_eq!(m.scale, 2.5);
        assert!(m.gizmo);
        assert!(m.autoplay);
        assert!(scene.cursor_visible);
    }

    #[test]
    fn shadow_node_uses_settings_color() {
        let mut s = ViewerSettings::default();
        s.apply_shadow_preset(1).unwrap();
        let scene = compose(&s, None);
        let shadows = scene.accumulative_shadows().unwrap();
        assert_eq!(shadows.color.to_hex(), "#081c76");
        assert_eq!(shadows.frames, 10);
        assert_eq!(shadows.light.amount, 8);
        assert_eq!(shadows.light.position, Vec3::new(6.0, 8.0, 5.0));
    }

    #[test]
    fn panorama_replaces_environment() {
        let mut s = ViewerSettings::default();
        s.toggle(Setting::Panorama);
        let scene = compose(&s, None);
        assert!(!scene.contains(NodeKind::HdrEnvironment));
        assert!(scene.contains(NodeKind::PanoramaEnvironment));
        assert_eq!(
            scene.environment_request(),
            Some(EnvironmentRequest::Panorama {
                file: "/09.jpg".into(),
                sphere: false
            })
        );

        s.set_panorama_type(PanoramaType::Sphere);
        let scene = compose(&s, None);
        match scene.find(NodeKind::PanoramaSphere) {
            Some(SceneNode::PanoramaSphere {
                radius,
                width_segments,
                height_segments,
                params,
                ..
            }) => {
                assert_eq!(*radius, 500.0);
                assert_eq!((*width_segments, *height_segments), (60, 40));
                assert!(!params.lighting);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn studio_environment_uses_preset() {
        let mut s = ViewerSettings::default();
        s.set_environment_type(EnvironmentType::Studio);
        s.set_studio_preset(StudioPreset::Sunset);
        let scene = compose(&s, None);
        assert!(scene.contains(NodeKind::StudioEnvironment));
        assert_eq!(
            scene.environment_request(),
            Some(EnvironmentRequest::Studio {
                preset: StudioPreset::Sunset
            })
        );
        assert!(scene.environment_params().unwrap().ground.is_none());
    }

    #[test]
    fn disabled_environment_requests_nothing() {
        let mut s = ViewerSettings::default();
        s.toggle(Setting::Environment);
        let scene = compose(&s, None);
        assert!(scene.environment_request().is_none());
    }

    #[test]
    fn everything_on_keeps_render_order() {
        let mut s = ViewerSettings::default();
        for setting in [
            Setting::Ssr,
            Setting::StandardFloor,
            Setting::ReflectiveFloor,
            Setting::FirstPersonCamera,
            Setting::PostProcessing,
            Setting::Bloom,
            Setting::Rings,
        ] {
            s.toggle(setting);
        }
        let kinds = compose(&s, Some(&model())).kinds();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Background,
                NodeKind::Model,
                NodeKind::AccumulativeShadows,
                NodeKind::Lighting,
                NodeKind::SoftShadows,
                NodeKind::HdrEnvironment,
                NodeKind::Ssr,
                NodeKind::StandardFloor,
                NodeKind::ReflectiveFloor,
                NodeKind::FirstPersonControls,
                NodeKind::PostProcessing,
                NodeKind::Bloom,
                NodeKind::Rings,
            ]
        );
    }

    #[test]
    fn floors_carry_their_materials() {
        let mut s = ViewerSettings::default();
        s.toggle(Setting::StandardFloor);
        s.toggle(Setting::ReflectiveFloor);
        let scene = compose(&s, None);
        match scene.find(NodeKind::ReflectiveFloor) {
            Some(SceneNode::ReflectiveFloor(f)) => {
                assert_eq!(f.color.to_hex(), "#202020");
                assert_eq!(f.blur, [300.0, 100.0]);
                assert_eq!(f.mirror, 0.5);
            }
            other => panic!("unexpected {other:?}"),
        }
        match scene.find(NodeKind::StandardFloor) {
            Some(SceneNode::StandardFloor(f)) => {
                assert_eq!(f.size, 50.0);
                assert_eq!(f.y, -0.2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
