//! Ground-projected environment backgrounds.
//!
//! The lower half of the environment is projected onto a flat disc so the
//! model appears to stand on the ground of the panorama. The same math runs
//! in the background shader.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundProjection {
    /// Height of the capturing camera above the ground.
    pub height: f32,
    /// Radius of the projection sphere.
    pub radius: f32,
    /// Size of the dome the background is drawn on.
    pub scale: f32,
}

impl Default for GroundProjection {
    fn default() -> Self {
        Self {
            height: 10.0,
            radius: 40.0,
            scale: 30.0,
        }
    }
}

impl GroundProjection {
    /// Direction to sample the environment with for a view ray leaving
    /// `camera_pos` along `view_dir`.
    pub fn project(&self, view_dir: Vec3, camera_pos: Vec3) -> Vec3 {
        let Some(view_dir) = view_dir.try_normalize() else {
            return Vec3::Y;
        };
        // Point on the dome the ray would shade.
        let dome_t = sphere_intersect(camera_pos, view_dir, Vec3::ZERO, self.scale);
        let on_dome = if dome_t > 0.0 {
            camera_pos + view_dir * dome_t
        } else {
            view_dir
        };
        let p = on_dome.try_normalize().unwrap_or(Vec3::Y);

        let mut cam = camera_pos;
        cam.y -= self.height;
        let t = sphere_intersect(cam, p, Vec3::ZERO, self.radius);
        if t <= 0.0 {
            return Vec3::Y;
        }
        let floor = Vec3::new(0.0, -self.height, 0.0);
        let t_disk = disk_intersect(cam, p, floor, Vec3::Y, self.radius);
        ((cam + t.min(t_disk) * p) / self.radius)
            .try_normalize()
            .unwrap_or(Vec3::Y)
    }
}

/// Far intersection distance of a ray with a sphere, or -1 on a miss.
fn sphere_intersect(ro: Vec3, rd: Vec3, center: Vec3, radius: f32) -> f32 {
    let oc = ro - center;
    let b = oc.dot(rd);
    let c = oc.dot(oc) - radius * radius;
    let h = b * b - c;
    if h < 0.0 {
        return -1.0;
    }
    -b + h.sqrt()
}

/// Distance to a front-facing disc, or a large value on a miss.
fn disk_intersect(ro: Vec3, rd: Vec3, center: Vec3, normal: Vec3, radius: f32) -> f32 {
    let d = rd.dot(normal);
    if d > 0.0 {
        return 1e6;
    }
    let o = ro - center;
    let t = -normal.dot(o) / d;
    let q = o + rd * t;
    if q.dot(q) < radius * radius { t } else { 1e6 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_down_hits_floor_center() {
        let g = GroundProjection::default();
        let d = g.project(-Vec3::Y, Vec3::new(0.0, 1.0, 0.0));
        assert!((d + Vec3::Y).length() < 1e-4, "{d:?}");
    }

    #[test]
    fn sky_is_left_alone() {
        let g = GroundProjection::default();
        let d = g.project(Vec3::Y, Vec3::new(0.0, 1.0, 0.0));
        assert!((d - Vec3::Y).length() < 1e-4, "{d:?}");
        let up = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!(g.project(up, Vec3::ZERO).y > 0.0);
    }

    #[test]
    fn floor_flattens_towards_horizon() {
        let g = GroundProjection::default();
        let cam = Vec3::new(0.0, 2.0, 5.0);
        let steep = g.project(Vec3::new(0.0, -1.0, -0.2), cam);
        let shallow = g.project(Vec3::new(0.0, -0.1, -1.0), cam);
        assert!(steep.y < 0.0 && shallow.y < 0.0);
        // Farther floor points map closer to the horizon.
        assert!(shallow.y > steep.y, "{shallow:?} {steep:?}");
    }
}
