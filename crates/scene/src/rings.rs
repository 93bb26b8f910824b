//! A tunnel of glowing rings sliding along the z axis.

use glam::{Mat4, Vec3};
use glint_assets::MeshData;

use crate::geometry::torus;

const RING_COUNT: usize = 14;
const SPACING: f32 = 3.5;
const SPEED: f32 = 0.4;

/// One ring's placement and glow for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingInstance {
    pub position: Vec3,
    pub scale: f32,
    /// Linear emissive radiance.
    pub emissive: [f32; 3],
}

impl RingInstance {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

#[derive(Debug, Clone)]
pub struct RingSet {
    mesh: MeshData,
    rings: Vec<RingInstance>,
}

impl Default for RingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RingSet {
    pub fn new() -> Self {
        let mut set = Self {
            mesh: torus(3.35, 0.05, 16, 100),
            rings: Vec::with_capacity(RING_COUNT),
        };
        set.update(0.0);
        set
    }

    /// Shared torus mesh drawn once per ring.
    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn rings(&self) -> &[RingInstance] {
        &self.rings
    }

    /// Recompute every ring for `elapsed` seconds.
    pub fn update(&mut self, elapsed: f32) {
        self.rings.clear();
        let drift = (elapsed * SPEED).rem_euclid(SPACING) * 2.0;
        for i in 0..RING_COUNT {
            let z = (i as f32 - 7.0) * SPACING + drift;
            let dist = z.abs();
            let mut glow = if dist > 2.0 {
                1.0 - (dist.min(12.0) - 2.0) / 10.0
            } else {
                1.0
            };
            glow *= 0.5;
            let base = if i % 2 == 1 {
                [6.0, 0.15, 0.7]
            } else {
                [0.1, 0.7, 3.0]
            };
            self.rings.push(RingInstance {
                position: Vec3::new(0.0, 0.0, -z),
                scale: 1.0 - dist * 0.04,
                emissive: base.map(|c| c * glow),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourteen_rings_centered_on_origin() {
        let set = RingSet::new();
        assert_eq!(set.rings().len(), 14);
        let center = set.rings()[7];
        assert_eq!(center.position, Vec3::ZERO);
        assert_eq!(center.scale, 1.0);
        assert_eq!(center.emissive, [3.0, 0.075, 0.35]);
    }

    #[test]
    fn far_rings_shrink_and_dim() {
        let set = RingSet::new();
        let far = set.rings()[0];
        assert_eq!(far.position.z, 24.5);
        assert!((far.scale - (1.0 - 24.5 * 0.04)).abs() < 1e-6);
        assert_eq!(far.emissive, [0.0; 3]);
    }

    #[test]
    fn update_slides_and_wraps() {
        let mut set = RingSet::new();
        set.update(1.0);
        assert!((set.rings()[7].position.z + 0.8).abs() < 1e-5);
        // One full period later the layout repeats.
        let before = set.rings().to_vec();
        set.update(1.0 + SPACING / SPEED);
        for (a, b) in before.iter().zip(set.rings()) {
            assert!((a.position - b.position).length() < 1e-3);
        }
    }
}
