//! Studio lighting built from emissive shapes baked into an equirect map.

use glam::{EulerRot, Mat4, Quat, Vec3};
use glint_assets::EquirectImage;
use glint_common::Color;
use glint_settings::StudioPreset;
use std::f32::consts::FRAC_PI_2;

/// Studio environments are baked at this width.
pub const STUDIO_RESOLUTION: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightformerShape {
    /// Unit square centered on the origin.
    Rect,
    /// Disc of radius 1.
    Circle,
    /// Annulus between radius 0.5 and 1.
    Ring,
}

/// An emissive shape that only exists inside the environment map.
///
/// Shapes lie in their local XY plane facing +Z.
#[derive(Debug, Clone, PartialEq)]
pub struct Lightformer {
    pub shape: LightformerShape,
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Extra transform applied outside the shape's own (parent groups).
    pub parent: Mat4,
}

impl Lightformer {
    pub fn rect(position: Vec3, scale: Vec3) -> Self {
        Self {
            shape: LightformerShape::Rect,
            color: Color::WHITE,
            intensity: 1.0,
            position,
            rotation: Quat::IDENTITY,
            scale,
            parent: Mat4::IDENTITY,
        }
    }

    pub fn with_shape(mut self, shape: LightformerShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Rotation given as XYZ euler angles in radians.
    pub fn with_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
        self
    }

    /// Turn the shape so its face points at `target`.
    pub fn looking_at(mut self, target: Vec3) -> Self {
        if let Some(dir) = (target - self.position).try_normalize() {
            self.rotation = Quat::from_rotation_arc(Vec3::Z, dir);
        }
        self
    }

    pub fn with_parent(mut self, parent: Mat4) -> Self {
        self.parent = parent;
        self
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.parent
            * Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Emitted linear radiance.
    pub fn radiance(&self) -> Vec3 {
        Vec3::from(self.color.to_linear()) * self.intensity
    }

    fn covers(&self, x: f32, y: f32) -> bool {
        match self.shape {
            LightformerShape::Rect => x.abs() <= 0.5 && y.abs() <= 0.5,
            LightformerShape::Circle => x * x + y * y <= 1.0,
            LightformerShape::Ring => {
                let r2 = x * x + y * y;
                (0.25..=1.0).contains(&r2)
            }
        }
    }
}

/// What the baked map shows where no shape is hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StudioBackground {
    Solid(Color),
    /// Base color half-covered by a depth gradient measured from `origin`
    /// across `far` units on a sphere of radius 100.
    Depth {
        base: Color,
        near: Color,
        far_color: Color,
        origin: Vec3,
        far: f32,
    },
}

impl StudioBackground {
    fn radiance(&self, dir: Vec3) -> Vec3 {
        match *self {
            StudioBackground::Solid(c) => Vec3::from(c.to_linear()),
            StudioBackground::Depth {
                base,
                near,
                far_color,
                origin,
                far,
            } => {
                let t = ((dir * 100.0 - origin).length() / far).clamp(0.0, 1.0);
                let depth = Vec3::from(near.to_linear()).lerp(Vec3::from(far_color.to_linear()), t);
                Vec3::from(base.to_linear()).lerp(depth, 0.5)
            }
        }
    }
}

/// Shapes and backdrop for one studio preset.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioRig {
    pub forms: Vec<Lightformer>,
    pub background: StudioBackground,
}

fn hex(s: &str) -> Color {
    Color::parse(s).unwrap_or(Color::WHITE)
}

struct PresetTable {
    ceiling: (&'static str, f32),
    moving: (&'static [&'static str], f32),
    side: [(&'static str, f32); 3],
    accents: &'static [(&'static str, f32, f32, [f32; 3])],
    background: (&'static str, &'static str, &'static str),
}

const DISCO: PresetTable = PresetTable {
    ceiling: ("#ff00ff", 0.75),
    moving: (
        &["#ff0000", "#00ff00", "#0000ff", "#ff00ff", "#ffff00", "#00ffff"],
        2.0,
    ),
    side: [("#00ff00", 4.0), ("#0000ff", 3.0), ("#ff00ff", 3.0)],
    accents: &[
        ("#ff0000", 1.0, 10.0, [-15.0, 4.0, -18.0]),
        ("#00ff00", 1.0, 8.0, [15.0, 4.0, -15.0]),
        ("#0000ff", 1.0, 6.0, [0.0, 8.0, -20.0]),
    ],
    background: ("#222", "#ff00ff", "#00ffff"),
};

const SUNSET: PresetTable = PresetTable {
    ceiling: ("#ff7b00", 1.0),
    moving: (&["#ff7b00", "#ff5500", "#ff8800", "#ffaa00"], 1.5),
    side: [("#ff5500", 3.0), ("#ff8800", 2.0), ("#ffaa00", 2.0)],
    accents: &[("#ff0000", 0.8, 15.0, [-10.0, 10.0, -15.0])],
    background: ("#351111", "blue", "#000000"),
};

const NIGHT: PresetTable = PresetTable {
    ceiling: ("#0a0a2a", 0.2),
    moving: (&["#ffffff", "#ffffaa", "#aaaaff"], 0.3),
    side: [("#0000aa", 1.0), ("#000066", 0.5), ("#000044", 0.5)],
    accents: &[
        ("#ffffff", 0.2, 2.0, [-15.0, 8.0, -18.0]),
        ("#ffffaa", 0.15, 1.5, [10.0, 6.0, -15.0]),
        ("#aaaaff", 0.1, 1.0, [0.0, 10.0, -20.0]),
    ],
    background: ("#000000", "#000033", "#000000"),
};

/// X offsets of the moving circle lights.
const MOVING_POSITIONS: [f32; 8] = [2.0, 0.0, 2.0, 0.0, 2.0, 0.0, 2.0, 0.0];

fn default_rig() -> StudioRig {
    let mut forms: Vec<Lightformer> = (0..7)
        .map(|i| {
            let z = -9.0 + 3.0 * i as f32;
            Lightformer::rect(Vec3::new(0.0, 4.0, z), Vec3::new(10.0, 1.0, 1.0))
                .with_intensity(2.0)
                .with_euler(FRAC_PI_2, 0.0, 0.0)
        })
        .collect();
    for (x, yaw) in [(-50.0, FRAC_PI_2), (50.0, -FRAC_PI_2)] {
        forms.push(
            Lightformer::rect(Vec3::new(x, 2.0, 0.0), Vec3::new(100.0, 2.0, 1.0))
                .with_intensity(2.0)
                .with_euler(0.0, yaw, 0.0),
        );
    }
    forms.push(
        Lightformer::rect(Vec3::new(10.0, 5.0, 10.0), Vec3::splat(2.0))
            .with_shape(LightformerShape::Ring)
            .with_color(hex("red"))
            .with_intensity(10.0)
            .looking_at(Vec3::ZERO),
    );
    StudioRig {
        forms,
        background: StudioBackground::Solid(Color::BLACK),
    }
}

fn table_rig(table: &PresetTable) -> StudioRig {
    let mut forms = vec![
        Lightformer::rect(Vec3::new(0.0, 5.0, -9.0), Vec3::new(10.0, 10.0, 1.0))
            .with_euler(FRAC_PI_2, 0.0, 0.0)
            .with_intensity(table.ceiling.1)
            .with_color(hex(table.ceiling.0)),
    ];

    // The moving group sits at its starting offset.
    let group = Mat4::from_rotation_y(0.5);
    let (colors, intensity) = table.moving;
    for (i, x) in MOVING_POSITIONS.iter().enumerate() {
        forms.push(
            Lightformer::rect(Vec3::new(*x, 4.0, i as f32 * 4.0), Vec3::new(3.0, 1.0, 1.0))
                .with_shape(LightformerShape::Circle)
                .with_euler(FRAC_PI_2, 0.0, 0.0)
                .with_intensity(intensity)
                .with_color(hex(colors[i % colors.len()]))
                .with_parent(group),
        );
    }

    for (i, (color, intensity)) in table.side.iter().enumerate() {
        let (yaw, position) = if i == 2 {
            (-FRAC_PI_2, Vec3::new(10.0, 1.0, 0.0))
        } else {
            (FRAC_PI_2, Vec3::new(-5.0, i as f32 * -2.0 + 1.0, -1.0))
        };
        let height = if i == 0 { 0.1 } else { 0.5 };
        forms.push(
            Lightformer::rect(position, Vec3::new(20.0, height, 1.0))
                .with_euler(0.0, yaw, 0.0)
                .with_intensity(*intensity)
                .with_color(hex(color)),
        );
    }

    for (color, intensity, scale, position) in table.accents {
        forms.push(
            Lightformer::rect(Vec3::from(*position), Vec3::splat(*scale))
                .with_shape(LightformerShape::Ring)
                .with_color(hex(color))
                .with_intensity(*intensity)
                .looking_at(Vec3::ZERO),
        );
    }

    let (base, near, far_color) = table.background;
    StudioRig {
        forms,
        background: StudioBackground::Depth {
            base: hex(base),
            near: hex(near),
            far_color: hex(far_color),
            origin: Vec3::splat(100.0),
            far: 300.0,
        },
    }
}

/// The shapes and backdrop making up `preset`.
pub fn studio_lightformers(preset: StudioPreset) -> StudioRig {
    match preset {
        StudioPreset::Default => default_rig(),
        StudioPreset::Disco => table_rig(&DISCO),
        StudioPreset::Sunset => table_rig(&SUNSET),
        StudioPreset::Night => table_rig(&NIGHT),
    }
}

/// Render the shapes as seen from the origin into a `width` x `width / 2`
/// equirect image.
pub fn bake_lightformers(
    forms: &[Lightformer],
    background: StudioBackground,
    width: u32,
) -> EquirectImage {
    let prepared: Vec<(Mat4, Vec3, &Lightformer)> = forms
        .iter()
        .map(|f| (f.world_matrix().inverse(), f.radiance(), f))
        .collect();
    let image = EquirectImage::from_fn(width.max(2), (width / 2).max(1), |dir| {
        let mut nearest = f32::INFINITY;
        let mut hit = None;
        for (inv, radiance, form) in &prepared {
            let o = inv.transform_point3(Vec3::ZERO);
            let d = inv.transform_vector3(dir);
            if d.z.abs() < 1e-8 {
                continue;
            }
            // World distance along `dir` equals the local parameter since
            // the local ray is the linear image of the world ray.
            let t = -o.z / d.z;
            if t <= 0.0 || t >= nearest {
                continue;
            }
            let p = o + d * t;
            if form.covers(p.x, p.y) {
                nearest = t;
                hit = Some(*radiance);
            }
        }
        hit.unwrap_or_else(|| background.radiance(dir)).to_array()
    });
    tracing::debug!(
        "baked {} lightformers at {}x{}",
        forms.len(),
        image.width,
        image.height
    );
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_layout() {
        let rig = studio_lightformers(StudioPreset::Default);
        assert_eq!(rig.forms.len(), 10);
        let strips: Vec<f32> = rig.forms[..7].iter().map(|f| f.position.z).collect();
        assert_eq!(strips, vec![-9.0, -6.0, -3.0, 0.0, 3.0, 6.0, 9.0]);
        assert!(rig.forms[..9].iter().all(|f| f.intensity == 2.0));
        let ring = &rig.forms[9];
        assert_eq!(ring.shape, LightformerShape::Ring);
        assert_eq!(ring.intensity, 10.0);
        // The ring faces the origin.
        let facing = ring.rotation * Vec3::Z;
        assert!((facing + ring.position.normalize()).length() < 1e-4);
    }

    #[test]
    fn preset_rigs_follow_tables() {
        let disco = studio_lightformers(StudioPreset::Disco);
        // ceiling + 8 moving + 3 side + 3 accents
        assert_eq!(disco.forms.len(), 15);
        assert_eq!(disco.forms[0].color.to_hex(), "#ff00ff");
        assert_eq!(disco.forms[7].color.to_hex(), "#ff0000");
        let sunset = studio_lightformers(StudioPreset::Sunset);
        assert_eq!(sunset.forms.len(), 13);
        assert_eq!(studio_lightformers(StudioPreset::Night).forms[0].intensity, 0.2);
    }

    #[test]
    fn ceiling_strips_light_up_the_zenith() {
        let rig = studio_lightformers(StudioPreset::Default);
        let img = bake_lightformers(&rig.forms, rig.background, 64);
        assert_eq!((img.width, img.height), (64, 32));
        let up = img.sample(Vec3::new(0.0, 1.0, 0.01));
        assert!(up.x > 1.5, "{up:?}");
    }

    #[test]
    fn ring_emits_only_its_color() {
        let rig = studio_lightformers(StudioPreset::Default);
        let img = bake_lightformers(&rig.forms[9..], rig.background, 256);
        assert!(img.pixels.iter().any(|p| *p == [10.0, 0.0, 0.0]));
        assert!(
            img.pixels
                .iter()
                .all(|p| *p == [0.0; 3] || *p == [10.0, 0.0, 0.0])
        );
        let down = img.sample(-Vec3::Y);
        assert_eq!(down, Vec3::ZERO);
    }

    #[test]
    fn ring_hole_spans_half_the_radius() {
        let ring = Lightformer::rect(Vec3::ZERO, Vec3::ONE).with_shape(LightformerShape::Ring);
        assert!(!ring.covers(0.0, 0.0));
        assert!(!ring.covers(0.4, 0.0));
        assert!(!ring.covers(0.0, -0.49));
        assert!(ring.covers(0.5, 0.0));
        assert!(ring.covers(0.0, 0.75));
        assert!(ring.covers(-1.0, 0.0));
        assert!(!ring.covers(0.8, 0.8));
    }

    #[test]
    fn nearest_shape_wins() {
        let near = Lightformer::rect(Vec3::new(0.0, 0.0, -2.0), Vec3::splat(4.0))
            .with_color(Color::rgb(1.0, 0.0, 0.0));
        let far = Lightformer::rect(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(40.0))
            .with_color(Color::rgb(0.0, 0.0, 1.0));
        let img = bake_lightformers(&[far, near], StudioBackground::Solid(Color::BLACK), 32);
        let c = img.sample(-Vec3::Z);
        assert!((c - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5, "{c:?}");
    }

    #[test]
    fn depth_background_mixes_half() {
        let bg = StudioBackground::Depth {
            base: Color::BLACK,
            near: Color::WHITE,
            far_color: Color::WHITE,
            origin: Vec3::splat(100.0),
            far: 300.0,
        };
        let c = bg.radiance(Vec3::X);
        assert!((c - Vec3::splat(0.5)).length() < 1e-5);
    }
}
