//! Binary glTF import.
//!
//! The importer keeps the node hierarchy of the default scene, one
//! [`MeshData`] per triangle primitive, the PBR material factors, and node
//! animations. Textures are not imported; materials render with their
//! factors only.

use glam::{Mat4, Quat, Vec3};
use glint_common::{Aabb, Transform};
use serde::Serialize;
use std::path::Path;

use crate::AssetError;
use crate::animation::{AnimationClip, Channel, ChannelValues, Interpolation};

/// Triangle mesh data, ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().map(|p| Vec3::from(*p)))
    }

    /// Give every triangle its own three vertices and its face normal.
    ///
    /// Triangles with an out-of-range index are dropped. Shared vertices
    /// are split, so the index list becomes `0..3 * triangles`.
    pub fn compute_flat_normals(&mut self) {
        let mut positions = Vec::with_capacity(self.indices.len());
        let mut uvs = Vec::with_capacity(self.indices.len());
        let mut normals = Vec::with_capacity(self.indices.len());
        for tri in self.indices.chunks_exact(3) {
            let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let get = |i: usize| self.positions.get(i).copied().map(Vec3::from);
            let (Some(pa), Some(pb), Some(pc)) = (get(corners[0]), get(corners[1]), get(corners[2]))
            else {
                continue;
            };
            let n = (pb - pa).cross(pc - pa).try_normalize().unwrap_or(Vec3::Y);
            for (i, p) in corners.into_iter().zip([pa, pb, pc]) {
                positions.push(p.to_array());
                uvs.push(self.uvs.get(i).copied().unwrap_or([0.0, 0.0]));
                normals.push(n.to_array());
            }
        }
        self.indices = (0..positions.len() as u32).collect();
        self.positions = positions;
        self.uvs = uvs;
        self.normals = normals;
    }

    /// Iterate the triangles of this mesh transformed by `m`.
    pub fn triangles<'a>(&'a self, m: &'a Mat4) -> impl Iterator<Item = [Vec3; 3]> + 'a {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            let p = |i: u32| {
                self.positions
                    .get(i as usize)
                    .map(|v| m.transform_point3(Vec3::from(*v)))
            };
            Some([p(tri[0])?, p(tri[1])?, p(tri[2])?])
        })
    }
}

/// PBR material factors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            emissive: [0.0; 3],
        }
    }
}

/// A node of the model's hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub local: Transform,
    pub children: Vec<usize>,
    /// Indices into [`ModelAsset::meshes`].
    pub meshes: Vec<usize>,
}

/// An imported model.
#[derive(Debug, Clone, Default)]
pub struct ModelAsset {
    pub name: String,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<Material>,
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub animations: Vec<AnimationClip>,
    /// Every imported mesh casts and receives shadows.
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Counts reported by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub nodes: usize,
    pub meshes: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub animations: Vec<String>,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl ModelAsset {
    /// Rest-pose local transforms of every node.
    pub fn rest_pose(&self) -> Vec<Transform> {
        self.nodes.iter().map(|n| n.local).collect()
    }

    /// Resolve local transforms into model-space matrices.
    pub fn world_matrices(&self, locals: &[Transform]) -> Vec<Mat4> {
        let mut out = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> =
            self.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();
        while let Some((idx, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else {
                continue;
            };
            let local = locals.get(idx).copied().unwrap_or(node.local);
            let world = parent * local.matrix();
            out[idx] = world;
            for &child in &node.children {
                stack.push((child, world));
            }
        }
        out
    }

    /// Every (mesh index, model-space matrix) pair reachable from the roots.
    pub fn mesh_instances(&self, locals: &[Transform]) -> Vec<(usize, Mat4)> {
        let worlds = self.world_matrices(locals);
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(idx) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else {
                continue;
            };
            for &mesh in &node.meshes {
                out.push((mesh, worlds[idx]));
            }
            stack.extend(node.children.iter().copied());
        }
        out
    }

    /// Model-space bounds in the rest pose.
    pub fn bounds(&self) -> Aabb {
        self.mesh_instances(&self.rest_pose())
            .into_iter()
            .filter_map(|(mesh, m)| self.meshes.get(mesh).map(|d| d.bounds().transform(&m)))
            .fold(Aabb::EMPTY, Aabb::union)
    }

    /// All triangles in world space for the given root transform and pose.
    pub fn world_triangles(&self, root: &Mat4, locals: &[Transform]) -> Vec<[Vec3; 3]> {
        let mut out = Vec::new();
        for (mesh, m) in self.mesh_instances(locals) {
            if let Some(data) = self.meshes.get(mesh) {
                let full = *root * m;
                out.extend(data.triangles(&full));
            }
        }
        out
    }

    pub fn material_for(&self, mesh: usize) -> Material {
        self.meshes
            .get(mesh)
            .and_then(|m| m.material)
            .and_then(|i| self.materials.get(i))
            .cloned()
            .unwrap_or_default()
    }

    pub fn summary(&self) -> ModelSummary {
        let b = self.bounds();
        let (min, max) = if b.is_empty() {
            ([0.0; 3], [0.0; 3])
        } else {
            (b.min.to_array(), b.max.to_array())
        };
        ModelSummary {
            name: self.name.clone(),
            nodes: self.nodes.len(),
            meshes: self.meshes.len(),
            vertices: self.meshes.iter().map(MeshData::vertex_count).sum(),
            triangles: self.meshes.iter().map(MeshData::triangle_count).sum(),
            materials: self.materials.len(),
            animations: self.animations.iter().map(|a| a.name.clone()).collect(),
            bounds_min: min,
            bounds_max: max,
        }
    }
}

/// Only binary glTF files are accepted by the drop zone.
pub fn is_model_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("glb"))
}

/// Read and import a `.glb` file.
pub fn import_path(path: impl AsRef<Path>) -> Result<ModelAsset, AssetError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("model.glb");
    import_glb(name, &bytes)
}

/// Import a model from `.glb` bytes.
pub fn import_glb(name: &str, bytes: &[u8]) -> Result<ModelAsset, AssetError> {
    let (doc, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| AssetError::GltfParse(e.to_string()))?;
    let buffer_data = |buffer: gltf::Buffer<'_>| buffers.get(buffer.index()).map(|d| d.0.as_slice());

    let materials: Vec<Material> = doc
        .materials()
        .enumerate()
        .map(|(i, m)| {
            let pbr = m.pbr_metallic_roughness();
            Material {
                name: m.name().map(str::to_string).unwrap_or_else(|| format!("material_{i}")),
                base_color: pbr.base_color_factor(),
                metallic: pbr.metallic_factor(),
                roughness: pbr.roughness_factor(),
                emissive: m.emissive_factor(),
            }
        })
        .collect();

    let mut meshes = Vec::new();
    let mut mesh_primitives: Vec<Vec<usize>> = Vec::new();
    for mesh in doc.meshes() {
        let mut prims = Vec::new();
        for prim in mesh.primitives() {
            if prim.mode() != gltf::mesh::Mode::Triangles {
                tracing::warn!(
                    "skipping non-triangle primitive in mesh {:?}",
                    mesh.name().unwrap_or("unnamed")
                );
                continue;
            }
            let reader = prim.reader(buffer_data);
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let mut data = MeshData {
                positions: positions.collect(),
                material: prim.material().index(),
                ..MeshData::default()
            };
            data.indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..data.positions.len() as u32).collect(),
            };
            data.uvs = reader
                .read_tex_coords(0)
                .map(|uv| uv.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; data.positions.len()]);
            match reader.read_normals() {
                Some(normals) => data.normals = normals.collect(),
                None => data.compute_flat_normals(),
            }
            prims.push(meshes.len());
            meshes.push(data);
        }
        mesh_primitives.push(prims);
    }

    let nodes: Vec<Node> = doc
        .nodes()
        .map(|n| {
            let (t, r, s) = n.transform().decomposed();
            Node {
                name: n
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node_{}", n.index())),
                local: Transform {
                    position: Vec3::from(t),
                    rotation: Quat::from_array(r),
                    scale: Vec3::from(s),
                },
                children: n.children().map(|c| c.index()).collect(),
                meshes: n
                    .mesh()
                    .and_then(|m| mesh_primitives.get(m.index()).cloned())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let roots: Vec<usize> = match doc.default_scene().or_else(|| doc.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => (0..nodes.len()).collect(),
    };

    let animations = doc
        .animations()
        .enumerate()
        .map(|(i, anim)| {
            let channels = anim
                .channels()
                .filter_map(|ch| read_channel(&ch, &buffers))
                .collect();
            AnimationClip::new(
                anim.name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("animation_{i}")),
                channels,
            )
        })
        .collect::<Vec<_>>();

    let model = ModelAsset {
        name: name.to_string(),
        meshes,
        materials,
        nodes,
        roots,
        animations,
        cast_shadow: true,
        receive_shadow: true,
    };
    tracing::info!(
        "imported {}: {} meshes, {} nodes, {} animations",
        model.name,
        model.meshes.len(),
        model.nodes.len(),
        model.animations.len()
    );
    Ok(model)
}

fn read_channel(ch: &gltf::animation::Channel<'_>, buffers: &[gltf::buffer::Data]) -> Option<Channel> {
    use gltf::animation::util::ReadOutputs;

    let reader = ch.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
    let times: Vec<f32> = reader.read_inputs()?.collect();
    let interpolation = match ch.sampler().interpolation() {
        gltf::animation::Interpolation::Step => Interpolation::Step,
        gltf::animation::Interpolation::Linear => Interpolation::Linear,
        gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
    };
    let values = match reader.read_outputs()? {
        ReadOutputs::Translations(it) => {
            ChannelValues::Translation(it.map(Vec3::from).collect())
        }
        ReadOutputs::Scales(it) => ChannelValues::Scale(it.map(Vec3::from).collect()),
        ReadOutputs::Rotations(it) => {
            ChannelValues::Rotation(it.into_f32().map(Quat::from_array).collect())
        }
        ReadOutputs::MorphTargetWeights(_) => {
            tracing::debug!("morph target animation ignored");
            return None;
        }
    };
    Some(Channel::new(ch.target().node().index(), interpolation, times, values))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    fn pad(buf: &mut Vec<u8>, byte: u8) {
        while buf.len() % 4 != 0 {
            buf.push(byte);
        }
    }

    /// A single-triangle `.glb` with one material and a two-key translation clip.
    pub fn triangle_glb() -> Vec<u8> {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 2, 1] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        pad(&mut bin, 0);
        for t in [0.0f32, 2.0] {
            bin.extend_from_slice(&t.to_le_bytes());
        }
        for p in [[0.0f32, 1.0, 0.0], [4.0, 1.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        assert_eq!(bin.len(), 76);

        let doc = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "name": "tri", "mesh": 0, "translation": [0.0, 1.0, 0.0] }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] }],
            "materials": [{
                "name": "red",
                "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.25, "roughnessFactor": 0.75 }
            }],
            "buffers": [{ "byteLength": 76 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 },
                { "buffer": 0, "byteOffset": 44, "byteLength": 8 },
                { "buffer": 0, "byteOffset": 52, "byteLength": 24 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 0.0, 1.0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
                { "bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR",
                  "min": [0.0], "max": [2.0] },
                { "bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3" }
            ],
            "animations": [{
                "name": "slide",
                "samplers": [{ "input": 2, "output": 3, "interpolation": "LINEAR" }],
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }]
            }]
        });

        let mut json_bytes = serde_json::to_vec(&doc).unwrap();
        pad(&mut json_bytes, b' ');

        let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json_bytes);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_triangle() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        assert_eq!(model.meshes.len(), 1);
        // No normals in the file, so the triangle is split and flat shaded.
        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.positions, vec![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);
        assert_eq!(mesh.normals, vec![[0.0, 1.0, 0.0]; 3]);
        assert_eq!(mesh.uvs.len(), 3);
        assert_eq!(model.roots, vec![0]);
        assert!(model.cast_shadow && model.receive_shadow);

        let mat = model.material_for(0);
        assert_eq!(mat.name, "red");
        assert_eq!(mat.base_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mat.metallic, 0.25);
    }

    #[test]
    fn flat_normals_split_shared_vertices() {
        // Two triangles folded along the x axis, sharing an edge.
        let mut mesh = MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            indices: vec![0, 2, 1, 0, 1, 3, 9, 0, 1],
            ..MeshData::default()
        };
        mesh.compute_flat_normals();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, (0..6).collect::<Vec<u32>>());
        assert_eq!(&mesh.normals[..3], &[[0.0, 1.0, 0.0]; 3]);
        assert_eq!(&mesh.normals[3..], &[[0.0, 0.0, 1.0]; 3]);
        assert_eq!(mesh.uvs[1], [0.0, 1.0]);
        assert_eq!(mesh.uvs[5], [1.0, 1.0]);
    }

    #[test]
    fn generated_normals_point_up() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        // winding 0,2,1 with the points above faces +Y
        for n in &model.meshes[0].normals {
            assert!((n[1] - 1.0).abs() < 1e-5, "{n:?}");
        }
    }

    #[test]
    fn bounds_include_node_translation() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        let b = model.bounds();
        assert_eq!(b.min, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 1.0));
        let s = model.summary();
        assert_eq!(s.triangles, 1);
        assert_eq!(s.animations, vec!["slide".to_string()]);
    }

    #[test]
    fn world_triangles_apply_root() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        let root = Mat4::from_scale(Vec3::splat(2.0));
        let tris = model.world_triangles(&root, &model.rest_pose());
        assert_eq!(tris.len(), 1);
        assert!(tris[0].iter().all(|p| (p.y - 2.0).abs() < 1e-5));
    }

    #[test]
    fn rejects_non_glb_bytes() {
        assert!(matches!(
            import_glb("junk.glb", b"definitely not gltf"),
            Err(AssetError::GltfParse(_))
        ));
    }

    #[test]
    fn model_file_filter() {
        assert!(is_model_file("robot.glb"));
        assert!(is_model_file("ROBOT.GLB"));
        assert!(!is_model_file("robot.gltf"));
        assert!(!is_model_file("notes.txt"));
        assert!(!is_model_file("glb"));
    }
}
