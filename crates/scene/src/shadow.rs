//! Accumulated soft shadows baked on the CPU.
//!
//! Stands in for temporal accumulation on the GPU: the randomized light is
//! jittered `amount` times per frame for `frames` frames, every sample
//! projects the model's triangles onto the catcher plane, and the
//! coverage is blended frame by frame. The seed is fixed so a bake is
//! reproducible.

use glam::{Vec2, Vec3};
use glint_common::Color;

use crate::compose::{AccumulativeShadows, SoftShadows};

const SEED: u64 = 0x5eed_0f_5ad0;

/// Alpha mask over a square centered on the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    pub resolution: u32,
    /// Side length in world units.
    pub scale: f32,
    pub y: f32,
    pub color: Color,
    /// Per-texel shadow alpha in `0.0..=1.0`, row-major, row 0 at -Z.
    pub alpha: Vec<f32>,
}

impl ShadowMap {
    /// Alpha at a world-space XZ position, zero outside the catcher.
    pub fn alpha_at(&self, x: f32, z: f32) -> f32 {
        let half = self.scale * 0.5;
        let u = (x + half) / self.scale;
        let v = (z + half) / self.scale;
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return 0.0;
        }
        let n = self.resolution as f32;
        let ix = (u * n) as u32;
        let iy = (v * n) as u32;
        self.alpha[(iy * self.resolution + ix) as usize]
    }

    /// Coverage fraction of texels with any shadow.
    pub fn coverage(&self) -> f32 {
        let lit = self.alpha.iter().filter(|a| **a > 0.01).count();
        lit as f32 / self.alpha.len().max(1) as f32
    }

    /// Shadow color in sRGB with alpha, for texture upload.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let [r, g, b] = self.color.to_rgb8();
        let mut out = Vec::with_capacity(self.alpha.len() * 4);
        for a in &self.alpha {
            out.extend_from_slice(&[r, g, b, (a.clamp(0.0, 1.0) * 255.0).round() as u8]);
        }
        out
    }
}

/// Small deterministic generator for light jitter.
struct SplitMix(u64);

impl SplitMix {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `0.0..1.0`.
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    fn spread(&mut self, range: f32) -> f32 {
        range * (0.5 - self.next_f32())
    }
}

#[derive(Debug, Clone)]
pub struct ShadowBaker {
    resolution: u32,
}

impl Default for ShadowBaker {
    fn default() -> Self {
        Self { resolution: 256 }
    }
}

impl ShadowBaker {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution: resolution.max(4),
        }
    }

    /// Light positions used for one frame.
    fn light_samples(params: &AccumulativeShadows, rng: &mut SplitMix) -> Vec<Vec3> {
        let light = &params.light;
        let length = light.position.length();
        (0..light.amount.max(1))
            .map(|_| {
                if rng.next_f32() > light.ambient {
                    light.position
                        + Vec3::new(
                            rng.spread(light.radius),
                            rng.spread(light.radius),
                            rng.spread(light.radius),
                        )
                } else {
                    let lambda = (2.0 * rng.next_f32() - 1.0).acos() - std::f32::consts::FRAC_PI_2;
                    let phi = 2.0 * std::f32::consts::PI * rng.next_f32();
                    Vec3::new(
                        lambda.cos() * phi.cos() * length,
                        (lambda.cos() * phi.sin() * length).abs(),
                        lambda.sin() * length,
                    )
                }
            })
            .collect()
    }

    /// Bake the catcher for world-space `triangles`.
    pub fn bake(
        &self,
        triangles: &[[Vec3; 3]],
        params: &AccumulativeShadows,
        soft: &SoftShadows,
    ) -> ShadowMap {
        let n = self.resolution as usize;
        let texel = params.scale / n as f32;
        let half = params.scale * 0.5;
        let mut rng = SplitMix(SEED);
        let mut accum = vec![0.0f32; n * n];
        let mut coverage = vec![false; n * n];
        let mut frame = vec![0.0f32; n * n];

        for f in 0..params.frames.max(1) {
            frame.iter_mut().for_each(|v| *v = 0.0);
            let lights = Self::light_samples(params, &mut rng);
            for light in &lights {
                // Directional light aimed at the origin.
                let dir = -light.try_normalize().unwrap_or(Vec3::Y);
                if dir.y >= -1e-4 {
                    continue;
                }
                coverage.iter_mut().for_each(|c| *c = false);
                for tri in triangles {
                    if tri.iter().all(|p| p.y <= params.y + params.light.bias) {
                        continue;
                    }
                    let projected = tri.map(|p| {
                        let t = (p.y - params.y) / -dir.y;
                        let q = p + dir * t;
                        Vec2::new((q.x + half) / texel, (q.z + half) / texel)
                    });
                    rasterize(&projected, n, &mut coverage);
                }
                for (acc, hit) in frame.iter_mut().zip(&coverage) {
                    if *hit {
                        *acc += 1.0;
                    }
                }
            }
            let inv = 1.0 / lights.len() as f32;
            // Temporal blend: running average over the last `blend` frames.
            let weight = 1.0 / (f + 1).min(params.blend.max(1)) as f32;
            for (a, v) in accum.iter_mut().zip(&frame) {
                *a += (v * inv - *a) * weight;
            }
        }

        let radius = soft_radius_texels(soft, texel);
        if radius > 0 {
            box_blur(&mut accum, n, radius);
        }
        let alpha = accum
            .into_iter()
            .map(|a| (a * params.opacity).clamp(0.0, 1.0))
            .collect();
        tracing::debug!(
            "baked shadows: {} triangles, {} frames, {}x{} texels",
            triangles.len(),
            params.frames,
            n,
            n
        );
        ShadowMap {
            resolution: self.resolution,
            scale: params.scale,
            y: params.y,
            color: params.color,
            alpha,
        }
    }
}

/// Penumbra width in texels for the soft shadow settings.
fn soft_radius_texels(soft: &SoftShadows, texel: f32) -> usize {
    let world = soft.size * 0.005 * (1.0 - soft.focus.clamp(0.0, 1.0));
    let taps = (soft.samples as f32).sqrt().max(1.0);
    ((world / texel).min(taps * 2.0)).round() as usize
}

fn rasterize(tri: &[Vec2; 3], n: usize, out: &mut [bool]) {
    let min = tri[0].min(tri[1]).min(tri[2]);
    let max = tri[0].max(tri[1]).max(tri[2]);
    if max.x < 0.0 || max.y < 0.0 || min.x >= n as f32 || min.y >= n as f32 {
        return;
    }
    let x0 = min.x.floor().max(0.0) as usize;
    let y0 = min.y.floor().max(0.0) as usize;
    let x1 = (max.x.ceil() as usize).min(n);
    let y1 = (max.y.ceil() as usize).min(n);
    let edge = |a: Vec2, b: Vec2, p: Vec2| (b - a).perp_dot(p - a);
    let area = edge(tri[0], tri[1], tri[2]);
    if area.abs() < 1e-12 {
        return;
    }
    let mut any = false;
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(tri[1], tri[2], p) * area.signum();
            let w1 = edge(tri[2], tri[0], p) * area.signum();
            let w2 = edge(tri[0], tri[1], p) * area.signum();
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                out[y * n + x] = true;
                any = true;
            }
        }
    }
    // Sub-texel triangles still darken the texel they fall in.
    if !any && x0 < n && y0 < n && x1 - x0 <= 1 && y1 - y0 <= 1 {
        out[y0 * n + x0] = true;
    }
}

fn box_blur(data: &mut [f32], n: usize, radius: usize) {
    let mut tmp = vec![0.0f32; data.len()];
    for y in 0..n {
        for x in 0..n {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(n - 1);
            let sum: f32 = data[y * n + lo..=y * n + hi].iter().sum();
            tmp[y * n + x] = sum / (hi - lo + 1) as f32;
        }
    }
    for y in 0..n {
        for x in 0..n {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(n - 1);
            let sum: f32 = (lo..=hi).map(|yy| tmp[yy * n + x]).sum();
            data[y * n + x] = sum / (hi - lo + 1) as f32;
        }
    }
}
