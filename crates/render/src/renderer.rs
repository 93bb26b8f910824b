use std::fmt::Write;

use glam::Vec3;
use glint_scene::{SceneDescription, SceneNode};

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            fov_degrees: 50.0,
        }
    }
}

impl RenderView {
    /// The view a scene starts with.
    pub fn for_scene(scene: &SceneDescription) -> Self {
        Self {
            eye: scene.camera.position,
            target: Vec3::ZERO,
            fov_degrees: scene.camera.fov_degrees,
        }
    }
}

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads the composed scene and a view, then produces output.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `scene` from `view`.
    fn render(&self, scene: &SceneDescription, view: &RenderView) -> Self::Output;
}

/// Human-readable dump of the scene nodes, for the CLI and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn describe(node: &SceneNode) -> String {
    match node {
        SceneNode::Background { color } => format!("color={color}"),
        SceneNode::Model(m) => format!(
            "{} scale={:.2} pos=({:.2}, {:.2}, {:.2}) autoplay={} gizmo={}",
            m.asset.name, m.scale, m.position.x, m.position.y, m.position.z, m.autoplay, m.gizmo
        ),
        SceneNode::AccumulativeShadows(s) => format!(
            "frames={} scale={} color={} opacity={} lights={}",
            s.frames, s.scale, s.color, s.opacity, s.light.amount
        ),
        SceneNode::Lighting(l) => format!("color={} intensity={:.1}", l.color, l.intensity),
        SceneNode::SoftShadows(s) => {
            format!("size={} focus={} samples={}", s.size, s.focus, s.samples)
        }
        SceneNode::HdrEnvironment { file, params } => format!(
            "file={} background={} blur={} intensity={} ground={}",
            file,
            params.background_intensity,
            params.background_blurriness,
            params.environment_intensity,
            params.ground.is_some()
        ),
        SceneNode::StudioEnvironment {
            resolution, preset, ..
        } => format!("preset={} resolution={}", preset.label(), resolution),
        SceneNode::PanoramaEnvironment { path, .. } => format!("path={path}"),
        SceneNode::PanoramaSphere {
            path,
            radius,
            width_segments,
            height_segments,
            ..
        } => format!("path={path} radius={radius} segments={width_segments}x{height_segments}"),
        SceneNode::Ssr {
            physically_correct_lights,
        } => format!("physically_correct_lights={physically_correct_lights}"),
        SceneNode::StandardFloor(f) => format!("size={} y={}", f.size, f.y),
        SceneNode::ReflectiveFloor(f) => {
            format!("size={} color={} mirror={}", f.size, f.color, f.mirror)
        }
        SceneNode::OrbitControls {
            rotate_speed,
            damping,
        } => format!("rotate_speed={rotate_speed} damping={damping}"),
        SceneNode::FirstPersonControls => String::new(),
        SceneNode::PostProcessing(p) => format!(
            "vignette={}/{}",
            p.vignette_offset, p.vignette_darkness
        ),
        SceneNode::Bloom(b) => format!("intensity={} threshold={}", b.intensity, b.threshold),
        SceneNode::Rings => String::new(),
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &SceneDescription, view: &RenderView) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Scene ({} nodes) ===", scene.nodes().len());
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z,
            view.fov_degrees
        );
        for (i, node) in scene.nodes().iter().enumerate() {
            let detail = describe(node);
            if detail.is_empty() {
                let _ = writeln!(out, "  {:>2}. {}", i + 1, node.kind().label());
            } else {
                let _ = writeln!(out, "  {:>2}. {} {}", i + 1, node.kind().label(), detail);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_assets::{AssetId, ModelAsset};
    use glint_scene::{ModelState, compose};
    use glint_settings::{Setting, ViewerSettings};
    use std::sync::Arc;

    #[test]
    fn debug_renderer_default_scene() {
        let scene = compose(&ViewerSettings::default(), None);
        let view = RenderView::for_scene(&scene);
        let output = DebugTextRenderer::new().render(&scene, &view);

        assert!(output.contains("=== Scene (6 nodes) ==="));
        assert!(output.contains("fov=50"));
        assert!(output.contains("1. background color=#ffffff"));
        assert!(output.contains("hdr-environment file=/dawn.hdr"));
        assert!(output.contains("ground=true"));
    }

    #[test]
    fn debug_renderer_lists_model_and_rings() {
        let mut settings = ViewerSettings::default();
        settings.toggle(Setting::Rings);
        let asset = ModelAsset {
            name: "car.glb".into(),
            ..ModelAsset::default()
        };
        let model = ModelState::new(AssetId(1), Arc::new(asset));
        let scene = compose(&settings, Some(&model));
        let output = DebugTextRenderer::new().render(&scene, &RenderView::default());

        assert!(output.contains("2. model car.glb scale=0.80"));
        assert!(output.trim_end().ends_with("rings"));
    }

    #[test]
    fn render_view_default() {
        let view = RenderView::default();
        assert_eq!(view.fov_degrees, 50.0);
        assert_eq!(view.eye, Vec3::new(0.0, 2.0, 5.0));
    }
}
