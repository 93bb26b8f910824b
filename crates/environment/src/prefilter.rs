//! CPU prefiltering of equirect environments into roughness levels.
//!
//! Level 0 is the downsampled source (mirror reflections). Each following
//! level halves the resolution and is convolved with a GGX lobe whose
//! roughness grows linearly up to 1.0 at the last level. A small
//! cosine-weighted irradiance map is kept for diffuse lighting.

use glam::Vec3;
use glint_assets::EquirectImage;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefilterConfig {
    pub base_width: u32,
    pub levels: u32,
    pub samples: u32,
    pub irradiance_width: u32,
    pub irradiance_samples: u32,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            base_width: 512,
            levels: 6,
            samples: 64,
            irradiance_width: 32,
            irradiance_samples: 128,
        }
    }
}

/// An environment ready for lookup at any roughness.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilteredEnvironment {
    levels: Vec<EquirectImage>,
    irradiance: EquirectImage,
}

impl PrefilteredEnvironment {
    /// Build the level chain and irradiance map. Consumes the source so the
    /// full-resolution pixels are freed once filtering is done.
    pub fn from_equirect(source: EquirectImage, config: PrefilterConfig) -> Self {
        let level_count = config.levels.max(1);
        let base = source.downsample(config.base_width.max(4));
        let mut levels = Vec::with_capacity(level_count as usize);
        levels.push(base.clone());
        for i in 1..level_count {
            let roughness = i as f32 / (level_count - 1) as f32;
            let width = (base.width >> i).max(4);
            // Sample from a source twice the target size to limit aliasing.
            let src = base.downsample(width * 2);
            let level = EquirectImage::from_fn(width, width / 2, |r| {
                prefilter_specular(&src, r, roughness, config.samples).to_array()
            });
            levels.push(level);
        }
        let coarse = base.downsample(config.irradiance_width.max(4) * 2);
        let irradiance = EquirectImage::from_fn(
            config.irradiance_width.max(4),
            config.irradiance_width.max(4) / 2,
            |n| compute_irradiance(&coarse, n, config.irradiance_samples).to_array(),
        );
        drop(source);
        tracing::debug!(
            "prefiltered {} levels from {}x{}, mean luminance {:.3}",
            levels.len(),
            base.width,
            base.height,
            base.average_luminance()
        );
        Self { levels, irradiance }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, index: usize) -> Option<&EquirectImage> {
        self.levels.get(index)
    }

    pub fn levels(&self) -> &[EquirectImage] {
        &self.levels
    }

    pub fn irradiance_map(&self) -> &EquirectImage {
        &self.irradiance
    }

    /// Roughness the given level was filtered for.
    pub fn level_roughness(&self, index: usize) -> f32 {
        if self.levels.len() <= 1 {
            return 0.0;
        }
        (index as f32 / (self.levels.len() - 1) as f32).min(1.0)
    }

    /// Specular radiance along `direction`, blending adjacent levels.
    pub fn sample(&self, direction: Vec3, roughness: f32) -> Vec3 {
        let max = (self.levels.len() - 1) as f32;
        let lf = roughness.clamp(0.0, 1.0) * max;
        let lo = lf.floor() as usize;
        let hi = (lo + 1).min(self.levels.len() - 1);
        let t = lf - lo as f32;
        let a = self.levels[lo].sample(direction);
        if hi == lo || t == 0.0 {
            return a;
        }
        a.lerp(self.levels[hi].sample(direction), t)
    }

    /// Diffuse irradiance for a surface facing `normal`, normalized so a
    /// uniform environment of radiance `L` returns `L`.
    pub fn irradiance(&self, normal: Vec3) -> Vec3 {
        self.irradiance.sample(normal)
    }

    /// Level used to draw the background at the given blurriness.
    pub fn blurred_background(&self, blurriness: f32) -> &EquirectImage {
        let max = (self.levels.len() - 1) as f32;
        let index = (blurriness.clamp(0.0, 1.0) * max).round() as usize;
        &self.levels[index]
    }
}

fn hammersley(i: u32, n: u32) -> (f32, f32) {
    (i as f32 / n as f32, radical_inverse_vdc(i))
}

fn radical_inverse_vdc(bits: u32) -> f32 {
    bits.reverse_bits() as f32 * 2.328_306_4e-10
}

/// Orthonormal basis with `n` as the third axis.
fn basis(n: Vec3) -> (Vec3, Vec3) {
    let up = if n.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };
    let tangent = up.cross(n).normalize();
    (tangent, n.cross(tangent))
}

fn sample_cosine_hemisphere(u1: f32, u2: f32) -> Vec3 {
    let cos_theta = (1.0 - u2).sqrt();
    let sin_theta = u2.sqrt();
    let phi = 2.0 * PI * u1;
    Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
}

fn sample_ggx(u1: f32, u2: f32, roughness: f32) -> Vec3 {
    let alpha = roughness * roughness;
    let cos_theta = ((1.0 - u2) / (1.0 + (alpha * alpha - 1.0) * u2)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u1;
    Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
}

fn compute_irradiance(env: &EquirectImage, normal: Vec3, samples: u32) -> Vec3 {
    let (t, b) = basis(normal);
    let mut acc = Vec3::ZERO;
    let n = samples.max(1);
    for i in 0..n {
        let (u1, u2) = hammersley(i, n);
        let s = sample_cosine_hemisphere(u1, u2);
        acc += env.sample(s.x * t + s.y * b + s.z * normal);
    }
    // Cosine-distributed samples: the plain mean is the cosine-weighted mean.
    acc / n as f32
}

fn prefilter_specular(env: &EquirectImage, r: Vec3, roughness: f32, samples: u32) -> Vec3 {
    let (t, b) = basis(r);
    let mut acc = Vec3::ZERO;
    let mut weight = 0.0;
    for i in 0..samples.max(1) {
        let (u1, u2) = hammersley(i, samples.max(1));
        let h = sample_ggx(u1, u2, roughness);
        let h = h.x * t + h.y * b + h.z * r;
        let l = 2.0 * r.dot(h) * h - r;
        let n_dot_l = l.dot(r);
        if n_dot_l > 0.0 {
            acc += env.sample(l) * n_dot_l;
            weight += n_dot_l;
        }
    }
    if weight > 0.0 {
        acc / weight
    } else {
        env.sample(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> PrefilterConfig {
        PrefilterConfig {
            base_width: 32,
            levels: 4,
            samples: 32,
            irradiance_width: 8,
            irradiance_samples: 64,
        }
    }

    fn sky_ground() -> EquirectImage {
        EquirectImage::from_fn(64, 32, |d| if d.y > 0.0 { [2.0; 3] } else { [0.0; 3] })
    }

    #[test]
    fn level_chain_halves() {
        let env = PrefilteredEnvironment::from_equirect(sky_ground(), small());
        assert_eq!(env.level_count(), 4);
        let widths: Vec<u32> = env.levels().iter().map(|l| l.width).collect();
        assert_eq!(widths, vec![32, 16, 8, 4]);
        assert_eq!(env.level_roughness(3), 1.0);
        assert_eq!(env.irradiance_map().width, 8);
    }

    #[test]
    fn uniform_environment_stays_uniform() {
        let src = EquirectImage::solid(32, 16, [0.5, 1.0, 1.5]);
        let env = PrefilteredEnvironment::from_equirect(src, small());
        for roughness in [0.0, 0.4, 1.0] {
            let c = env.sample(Vec3::new(0.3, 0.5, -0.8), roughness);
            assert!((c - Vec3::new(0.5, 1.0, 1.5)).length() < 1e-3, "{c:?}");
        }
        let e = env.irradiance(Vec3::Y);
        assert!((e - Vec3::new(0.5, 1.0, 1.5)).length() < 1e-3, "{e:?}");
    }

    #[test]
    fn rough_levels_spread_light() {
        let env = PrefilteredEnvironment::from_equirect(sky_ground(), small());
        let sharp = env.sample(Vec3::new(1.0, 0.15, 0.0), 0.0);
        let rough = env.sample(Vec3::new(1.0, 0.15, 0.0), 1.0);
        assert!(sharp.x > 1.9);
        assert!(rough.x < sharp.x);
        // Straight up stays bright, facing down picks up some sky at full roughness.
        assert!(env.sample(Vec3::Y, 1.0).x > 1.0);
        assert!(env.sample(-Vec3::Y, 0.0).x < 0.01);
    }

    #[test]
    fn irradiance_is_brighter_towards_sky() {
        let env = PrefilteredEnvironment::from_equirect(sky_ground(), small());
        let up = env.irradiance(Vec3::Y).x;
        let side = env.irradiance(Vec3::X).x;
        let down = env.irradiance(-Vec3::Y).x;
        assert!(up > side && side > down, "{up} {side} {down}");
        assert!((side - 1.0).abs() < 0.3);
    }

    #[test]
    fn blurriness_selects_level() {
        let env = PrefilteredEnvironment::from_equirect(sky_ground(), small());
        assert_eq!(env.blurred_background(0.0).width, 32);
        assert_eq!(env.blurred_background(0.3).width, 16);
        assert_eq!(env.blurred_background(5.0).width, 4);
    }
}
