use glam::{Mat4, Vec2, Vec3};
use glint_render::RenderView;

const MIN_POLAR: f32 = 0.01;
const MAX_POLAR: f32 = std::f32::consts::PI - 0.01;

/// Gravity for the first-person body, in units per second squared.
pub const GRAVITY: f32 = 30.0;
/// Upward velocity given by a jump.
pub const JUMP_SPEED: f32 = 8.0;

/// Projection shared by both camera kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lens {
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            fov: 50.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 2000.0,
        }
    }
}

impl Lens {
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }
}

/// Camera that circles a target point. Drag input accumulates into a
/// velocity that decays by `damping` each update.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Angle around +Y, zero looking down -Z.
    pub azimuth: f32,
    /// Angle from +Y.
    pub polar: f32,
    pub rotate_speed: f32,
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub lens: Lens,
    velocity: Vec2,
    zoom_velocity: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, 50.0)
    }
}

impl OrbitCamera {
    pub fn looking_at(eye: Vec3, target: Vec3, fov_degrees: f32) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(1e-3);
        Self {
            target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / distance).clamp(-1.0, 1.0).acos(),
            rotate_speed: 1.0,
            damping: 0.1,
            min_distance: 0.5,
            max_distance: 500.0,
            lens: Lens {
                fov: fov_degrees.to_radians(),
                ..Lens::default()
            },
            velocity: Vec2::ZERO,
            zoom_velocity: 0.0,
        }
    }

    pub fn from_view(view: &RenderView) -> Self {
        Self::looking_at(view.eye, view.target, view.fov_degrees)
    }

    /// Pointer drag in pixels, relative to a viewport of `height` pixels.
    pub fn drag(&mut self, delta: Vec2, height: f32) {
        let scale = 2.0 * std::f32::consts::PI * self.rotate_speed / height.max(1.0);
        self.velocity -= delta * scale;
    }

    /// Scroll steps; positive zooms in.
    pub fn scroll(&mut self, steps: f32) {
        self.zoom_velocity -= steps * 0.1;
    }

    pub fn update(&mut self) {
        let d = self.damping.clamp(0.0, 1.0);
        // No damping means input applies immediately.
        let step = if d > 0.0 { d } else { 1.0 };
        self.azimuth += self.velocity.x * step;
        self.polar = (self.polar + self.velocity.y * step).clamp(MIN_POLAR, MAX_POLAR);
        self.distance = (self.distance * (1.0 + self.zoom_velocity * step))
            .clamp(self.min_distance, self.max_distance);
        if d > 0.0 {
            self.velocity *= 1.0 - d;
            self.zoom_velocity *= 1.0 - d;
        } else {
            self.velocity = Vec2::ZERO;
            self.zoom_velocity = 0.0;
        }
    }

    pub fn eye(&self) -> Vec3 {
        let s = self.polar.sin();
        self.target
            + self.distance * Vec3::new(s * self.azimuth.sin(), self.polar.cos(), s * self.azimuth.cos())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }
}

/// Walking camera with mouse look and a simple jump.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstPersonCamera {
    /// Eye position.
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    /// Eye height above the ground plane at y = 0.
    pub eye_height: f32,
    pub lens: Lens,
    vertical_velocity: f32,
}

impl FirstPersonCamera {
    pub fn from_view(view: &RenderView) -> Self {
        let dir = (view.target - view.eye).try_normalize().unwrap_or(-Vec3::Z);
        Self {
            position: view.eye,
            yaw: dir.z.atan2(dir.x),
            pitch: dir.y.clamp(-1.0, 1.0).asin(),
            speed: 5.0,
            sensitivity: 0.003,
            eye_height: view.eye.y.max(0.5),
            lens: Lens {
                fov: view.fov_degrees.to_radians(),
                ..Lens::default()
            },
            vertical_velocity: 0.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Forward projected onto the ground.
    fn heading(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    pub fn right(&self) -> Vec3 {
        self.heading().cross(Vec3::Y).normalize()
    }

    pub fn look(&mut self, delta: Vec2) {
        self.yaw += delta.x * self.sensitivity;
        self.pitch = (self.pitch - delta.y * self.sensitivity)
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Walk along `input` in view space (x right, -z forward) for `dt` seconds.
    pub fn walk(&mut self, input: Vec3, dt: f32) {
        let dir = self.right() * input.x - self.heading() * input.z;
        if let Some(dir) = dir.try_normalize() {
            self.position += dir * self.speed * dt;
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.position.y <= self.eye_height + 1e-4 && self.vertical_velocity <= 0.0
    }

    /// Start a jump; ignored while airborne.
    pub fn jump(&mut self) -> bool {
        if !self.is_grounded() {
            return false;
        }
        self.vertical_velocity = JUMP_SPEED;
        true
    }

    pub fn update(&mut self, dt: f32) {
        self.vertical_velocity -= GRAVITY * dt;
        self.position.y += self.vertical_velocity * dt;
        if self.position.y <= self.eye_height {
            self.position.y = self.eye_height;
            self.vertical_velocity = 0.0;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }
}

/// Whichever camera the scene's controls ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraRig {
    Orbit(OrbitCamera),
    FirstPerson(FirstPersonCamera),
}

impl CameraRig {
    pub fn new(view: &RenderView, first_person: bool) -> Self {
        if first_person {
            CameraRig::FirstPerson(FirstPersonCamera::from_view(view))
        } else {
            CameraRig::Orbit(OrbitCamera::from_view(view))
        }
    }

    pub fn is_first_person(&self) -> bool {
        matches!(self, CameraRig::FirstPerson(_))
    }

    /// Switch mode in place, keeping the current eye position.
    pub fn set_first_person(&mut self, first_person: bool) {
        if self.is_first_person() == first_person {
            return;
        }
        let lens = *self.lens();
        let view = match self {
            CameraRig::Orbit(c) => RenderView {
                eye: c.eye(),
                target: c.target,
                fov_degrees: lens.fov.to_degrees(),
            },
            CameraRig::FirstPerson(c) => RenderView {
                eye: c.position,
                target: c.position + c.forward() * 5.0,
                fov_degrees: lens.fov.to_degrees(),
            },
        };
        *self = CameraRig::new(&view, first_person);
        self.set_aspect(lens.aspect);
    }

    pub fn lens(&self) -> &Lens {
        match self {
            CameraRig::Orbit(c) => &c.lens,
            CameraRig::FirstPerson(c) => &c.lens,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        let lens = match self {
            CameraRig::Orbit(c) => &mut c.lens,
            CameraRig::FirstPerson(c) => &mut c.lens,
        };
        lens.aspect = aspect.max(1e-3);
    }

    pub fn update(&mut self, dt: f32) {
        match self {
            CameraRig::Orbit(c) => c.update(),
            CameraRig::FirstPerson(c) => c.update(dt),
        }
    }

    pub fn eye(&self) -> Vec3 {
        match self {
            CameraRig::Orbit(c) => c.eye(),
            CameraRig::FirstPerson(c) => c.position,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self {
            CameraRig::Orbit(c) => c.view_matrix(),
            CameraRig::FirstPerson(c) => c.view_matrix(),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.lens().projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_view() -> RenderView {
        RenderView::default()
    }

    #[test]
    fn orbit_starts_at_view_eye() {
        let cam = OrbitCamera::from_view(&default_view());
        assert!((cam.eye() - Vec3::new(0.0, 2.0, 5.0)).length() < 1e-4);
        let vp = Lens::default().projection_matrix() * cam.view_matrix();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn orbit_drag_keeps_distance_and_decays() {
        let mut cam = OrbitCamera::default();
        let start = cam.eye();
        let distance = cam.distance;
        cam.drag(Vec2::new(40.0, 0.0), 600.0);
        cam.update();
        let first = cam.eye();
        assert_ne!(first, start);
        assert!(((first - cam.target).length() - distance).abs() < 1e-4);

        let moved_first = (first - start).length();
        cam.update();
        let moved_second = (cam.eye() - first).length();
        assert!(moved_second < moved_first);
        for _ in 0..200 {
            cam.update();
        }
        let settled = cam.eye();
        cam.update();
        assert!((cam.eye() - settled).length() < 1e-5);
    }

    #[test]
    fn orbit_polar_is_clamped() {
        let mut cam = OrbitCamera {
            damping: 0.0,
            ..OrbitCamera::default()
        };
        cam.drag(Vec2::new(0.0, -100_000.0), 100.0);
        cam.update();
        assert!(cam.polar <= MAX_POLAR);
        assert!(cam.eye().y < cam.target.y + cam.distance);
    }

    #[test]
    fn orbit_scroll_zooms_in() {
        let mut cam = OrbitCamera {
            damping: 0.0,
            ..OrbitCamera::default()
        };
        let before = cam.distance;
        cam.scroll(1.0);
        cam.update();
        assert!(cam.distance < before);
    }

    #[test]
    fn first_person_walks_on_the_ground_plane() {
        let mut cam = FirstPersonCamera::from_view(&default_view());
        let y = cam.position.y;
        let start = cam.position;
        cam.walk(Vec3::NEG_Z, 1.0);
        assert!((cam.position.y - y).abs() < 1e-5);
        // Looking toward the origin from +Z walks toward -Z.
        assert!(cam.position.z < start.z);
        assert!(((cam.position - start).length() - cam.speed).abs() < 1e-4);
    }

    #[test]
    fn jump_rises_then_lands() {
        let mut cam = FirstPersonCamera::from_view(&default_view());
        let ground = cam.position.y;
        assert!(cam.jump());
        cam.update(0.1);
        assert!(cam.position.y > ground);
        assert!(!cam.jump(), "no double jump while airborne");
        for _ in 0..100 {
            cam.update(0.05);
        }
        assert_eq!(cam.position.y, ground);
        assert!(cam.is_grounded());
    }

    #[test]
    fn look_clamps_pitch() {
        let mut cam = FirstPersonCamera::from_view(&default_view());
        cam.look(Vec2::new(0.0, -1_000_000.0));
        assert!(cam.pitch <= 89.0_f32.to_radians());
    }

    #[test]
    fn rig_switch_keeps_eye() {
        let mut rig = CameraRig::new(&default_view(), false);
        rig.set_aspect(2.0);
        let eye = rig.eye();
        rig.set_first_person(true);
        assert!(rig.is_first_person());
        assert!((rig.eye() - eye).length() < 1e-4);
        assert_eq!(rig.lens().aspect, 2.0);
        rig.set_first_person(false);
        assert!((rig.eye() - eye).length() < 1e-3);
    }
}
