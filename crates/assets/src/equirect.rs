//! Equirectangular (latitude/longitude) images in linear light.

use glam::Vec3;
use glint_common::srgb_to_linear;
use image::ImageFormat;
use std::f32::consts::PI;
use std::path::Path;

use crate::AssetError;

/// A panoramic image stored as linear RGB.
///
/// Row 0 is the top of the sky (+Y); column 0 starts behind the viewer and
/// sweeps to the right.
#[derive(Debug, Clone, PartialEq)]
pub struct EquirectImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 3]>,
}

impl EquirectImage {
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 3]>) -> Result<Self, AssetError> {
        if width == 0 || height == 0 || pixels.len() != (width * height) as usize {
            return Err(AssetError::InvalidImage(format!(
                "{width}x{height} image with {} pixels",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// An image filled with one color.
    pub fn solid(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels: vec![rgb; (width.max(1) * height.max(1)) as usize],
        }
    }

    /// Build an image by evaluating `f` for the direction at each texel center.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(Vec3) -> [f32; 3]) -> Self {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let v = (y as f32 + 0.5) / height as f32;
                pixels.push(f(uv_to_direction(u, v)));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decode an HDR or LDR image. `hint` is the file name, used to pick
    /// the decoder; without it the format is sniffed from the bytes.
    pub fn decode(bytes: &[u8], hint: Option<&str>) -> Result<Self, AssetError> {
        let format = hint
            .and_then(|h| ImageFormat::from_path(h).ok())
            .map(Ok)
            .unwrap_or_else(|| image::guess_format(bytes))?;
        let img = image::load_from_memory_with_format(bytes, format)?;
        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let linear = format == ImageFormat::Hdr || format == ImageFormat::OpenExr;
        let pixels = rgb
            .pixels()
            .map(|p| {
                if linear {
                    [p[0], p[1], p[2]]
                } else {
                    [
                        srgb_to_linear(p[0]),
                        srgb_to_linear(p[1]),
                        srgb_to_linear(p[2]),
                    ]
                }
            })
            .collect();
        Self::new(width, height, pixels)
    }

    /// Read and decode a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes, path.to_str())
    }

    /// Encode as Radiance HDR.
    pub fn write_hdr(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        let encoder = image::codecs::hdr::HdrEncoder::new(std::io::BufWriter::new(file));
        let pixels: Vec<image::Rgb<f32>> = self.pixels.iter().map(|p| image::Rgb(*p)).collect();
        encoder.encode(&pixels, self.width as usize, self.height as usize)?;
        Ok(())
    }

    pub fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }

    /// Bilinear lookup at texture coordinates, wrapping horizontally.
    pub fn sample_uv(&self, u: f32, v: f32) -> Vec3 {
        let fx = u.rem_euclid(1.0) * self.width as f32 - 0.5;
        let fy = (v.clamp(0.0, 1.0) * self.height as f32 - 0.5).max(0.0);
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let w = self.width as i64;
        let wrap = |x: i64| x.rem_euclid(w) as u32;
        let xa = wrap(x0 as i64);
        let xb = wrap(x0 as i64 + 1);
        let ya = y0 as u32;
        let yb = (y0 as u32 + 1).min(self.height - 1);
        let px = |x, y| Vec3::from(self.texel(x, y));
        let top = px(xa, ya).lerp(px(xb, ya), tx);
        let bottom = px(xa, yb).lerp(px(xb, yb), tx);
        top.lerp(bottom, ty)
    }

    /// Radiance arriving from `direction`.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        let (u, v) = direction_to_uv(direction);
        self.sample_uv(u, v)
    }

    /// Box-filter down to `width` x `width / 2`.
    pub fn downsample(&self, width: u32) -> Self {
        let width = width.clamp(1, self.width);
        let height = (width / 2).max(1);
        if width == self.width && height == self.height {
            return self.clone();
        }
        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let x0 = (x as f32 * sx) as u32;
                let y0 = (y as f32 * sy) as u32;
                let x1 = (((x + 1) as f32 * sx) as u32).max(x0 + 1).min(self.width);
                let y1 = (((y + 1) as f32 * sy) as u32).max(y0 + 1).min(self.height);
                let mut acc = Vec3::ZERO;
                for yy in y0..y1 {
                    for xx in x0..x1 {
                        acc += Vec3::from(self.texel(xx, yy));
                    }
                }
                let n = ((x1 - x0) * (y1 - y0)).max(1) as f32;
                pixels.push((acc / n).to_array());
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Mean luminance, used for logging and sanity checks.
    pub fn average_luminance(&self) -> f32 {
        let sum: f32 = self
            .pixels
            .iter()
            .map(|p| 0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2])
            .sum();
        sum / self.pixels.len().max(1) as f32
    }

    /// Interleaved RGBA f32 data for texture upload.
    pub fn to_rgba_f32(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            out.extend_from_slice(&[p[0], p[1], p[2], 1.0]);
        }
        out
    }
}

/// Map a direction to equirect texture coordinates.
pub fn direction_to_uv(d: Vec3) -> (f32, f32) {
    let d = d.try_normalize().unwrap_or(Vec3::Z);
    let u = d.x.atan2(-d.z) / (2.0 * PI) + 0.5;
    let v = d.y.clamp(-1.0, 1.0).acos() / PI;
    (u, v)
}

/// Inverse of [`direction_to_uv`].
pub fn uv_to_direction(u: f32, v: f32) -> Vec3 {
    let phi = (u - 0.5) * 2.0 * PI;
    let theta = v * PI;
    Vec3::new(
        theta.sin() * phi.sin(),
        theta.cos(),
        -theta.sin() * phi.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uv_direction_round_trip_axes() {
        for d in [Vec3::X, -Vec3::X, Vec3::Z, -Vec3::Z] {
            let (u, v) = direction_to_uv(d);
            let back = uv_to_direction(u, v);
            assert!((back - d).length() < 1e-4, "{d:?} -> {back:?}");
        }
        let (_, v_up) = direction_to_uv(Vec3::Y);
        assert!(v_up.abs() < 1e-6);
    }

    #[test]
    fn sample_picks_sky_and_ground() {
        let img = EquirectImage::from_fn(64, 32, |d| if d.y > 0.0 { [1.0; 3] } else { [0.0; 3] });
        assert!(img.sample(Vec3::Y).x > 0.99);
        assert!(img.sample(-Vec3::Y).x < 0.01);
    }

    #[test]
    fn new_checks_dimensions() {
        assert!(EquirectImage::new(2, 1, vec![[0.0; 3]; 2]).is_ok());
        assert!(matches!(
            EquirectImage::new(2, 2, vec![[0.0; 3]; 3]),
            Err(AssetError::InvalidImage(_))
        ));
    }

    #[test]
    fn downsample_preserves_average() {
        let img = EquirectImage::from_fn(64, 32, |d| [d.y.max(0.0) * 2.0, 0.5, 0.0]);
        let small = img.downsample(16);
        assert_eq!((small.width, small.height), (16, 8));
        assert!((small.average_luminance() - img.average_luminance()).abs() < 1e-3);
    }

    #[test]
    fn hdr_file_round_trip_stays_linear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bright.hdr");
        EquirectImage::solid(8, 4, [4.0, 2.0, 1.0]).write_hdr(&path).unwrap();
        let back = EquirectImage::open(&path).unwrap();
        assert_eq!((back.width, back.height), (8, 4));
        let p = back.texel(3, 2);
        assert!((p[0] - 4.0).abs() < 0.1 && (p[2] - 1.0).abs() < 0.05, "{p:?}");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(EquirectImage::decode(b"nope", Some("sky.hdr")).is_err());
        assert!(EquirectImage::decode(b"nope", None).is_err());
    }
}
