//! Procedural meshes for floors, the panorama sphere and the rings.

use glint_assets::MeshData;
use std::f32::consts::PI;

/// Flat `width` x `depth` plane in XZ facing +Y.
pub fn plane(width: f32, depth: f32) -> MeshData {
    let (hw, hd) = (width * 0.5, depth * 0.5);
    MeshData {
        positions: vec![[-hw, 0.0, -hd], [hw, 0.0, -hd], [hw, 0.0, hd], [-hw, 0.0, hd]],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 2, 1, 0, 3, 2],
        material: None,
    }
}

/// Latitude/longitude sphere. Normals point outwards.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut mesh = MeshData::default();
    for y in 0..=hs {
        let v = y as f32 / hs as f32;
        let theta = v * PI;
        for x in 0..=ws {
            let u = x as f32 / ws as f32;
            let phi = u * 2.0 * PI;
            let n = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            mesh.positions.push([n[0] * radius, n[1] * radius, n[2] * radius]);
            mesh.normals.push(n);
            mesh.uvs.push([u, 1.0 - v]);
        }
    }
    let row = ws + 1;
    for y in 0..hs {
        for x in 0..ws {
            let a = y * row + x + 1;
            let b = y * row + x;
            let c = (y + 1) * row + x;
            let d = (y + 1) * row + x + 1;
            if y != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if y != hs - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

/// Torus in the XY plane around the Z axis.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let rs = radial_segments.max(3);
    let ts = tubular_segments.max(3);
    let mut mesh = MeshData::default();
    for j in 0..=rs {
        for i in 0..=ts {
            let u = i as f32 / ts as f32 * 2.0 * PI;
            let v = j as f32 / rs as f32 * 2.0 * PI;
            let x = (radius + tube * v.cos()) * u.cos();
            let y = (radius + tube * v.cos()) * u.sin();
            let z = tube * v.sin();
            let center = [radius * u.cos(), radius * u.sin(), 0.0];
            let n = glam::Vec3::new(x - center[0], y - center[1], z)
                .try_normalize()
                .unwrap_or(glam::Vec3::Z);
            mesh.positions.push([x, y, z]);
            mesh.normals.push(n.to_array());
            mesh.uvs.push([i as f32 / ts as f32, j as f32 / rs as f32]);
        }
    }
    for j in 1..=rs {
        for i in 1..=ts {
            let a = (ts + 1) * j + i - 1;
            let b = (ts + 1) * (j - 1) + i - 1;
            let c = (ts + 1) * (j - 1) + i;
            let d = (ts + 1) * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}
