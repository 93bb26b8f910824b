use std::ops::Range;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use glint_assets::{AssetId, EquirectImage, MeshData, ModelAsset};
use glint_common::Transform;
use glint_environment::{Background, PrefilteredEnvironment, SceneEnvironment};
use glint_scene::geometry;
use glint_scene::{GIZMO_SCALE, RingSet, SceneDescription, SceneNode, ShadowMap};
use half::f16;
use wgpu::util::DeviceExt;

use crate::camera::CameraRig;
use crate::shaders;

/// Format of the offscreen scene target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MAX_INSTANCES: u32 = 4096;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    background: [f32; 4],
    env: [f32; 4],
    ground: [f32; 4],
    env_lod: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct PostUniforms {
    vignette: [f32; 4],
    chromatic: [f32; 4],
    bloom: [f32; 4],
    texel: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    base_color: [f32; 4],
    material: [f32; 4],
    emissive: [f32; 4],
}

impl InstanceData {
    fn new(model: Mat4, base_color: [f32; 4], metallic: f32, roughness: f32, emissive: [f32; 3]) -> Self {
        let cols = model.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            base_color,
            material: [metallic, roughness, 0.0, 0.0],
            emissive: [emissive[0], emissive[1], emissive[2], 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ShadowVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct LineVertex {
    position: [f32; 3],
    color: [f32; 4],
}

/// Everything one frame needs besides the GPU handles.
pub struct FrameInput<'a> {
    pub scene: &'a SceneDescription,
    pub camera: &'a CameraRig,
    pub environment: &'a SceneEnvironment,
    /// Local node transforms of the model, usually from the animation player.
    pub pose: &'a [Transform],
    pub rings: Option<&'a RingSet>,
}

/// Which mesh a batch of instances uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshRef {
    Model(usize),
    Plane,
    Ring,
}

#[derive(Debug, Clone, PartialEq)]
struct Batch {
    mesh: MeshRef,
    instances: Range<u32>,
}

fn rgba16f_bytes(image: &EquirectImage) -> Vec<u8> {
    let halves: Vec<f16> = image.to_rgba_f32().into_iter().map(f16::from_f32).collect();
    bytemuck::cast_slice(&halves).to_vec()
}

/// Number of leading images that form a valid mip chain of the first.
fn mip_chain_len(sizes: &[(u32, u32)]) -> usize {
    let Some(&(w0, h0)) = sizes.first() else {
        return 0;
    };
    sizes
        .iter()
        .enumerate()
        .take_while(|(i, (w, h))| {
            let i = *i as u32;
            i < 32 && *w == (w0 >> i).max(1) && *h == (h0 >> i).max(1)
        })
        .count()
}

/// Pack the frame uniforms from the scene, camera and environment.
fn frame_uniforms(input: &FrameInput<'_>, radiance_lod: f32, background_lod: f32) -> FrameUniforms {
    let view_proj = input.camera.view_projection();
    let eye = input.camera.eye();
    let (light_dir, light_color) = match input.scene.lighting() {
        Some(l) => {
            let dir = l.position.try_normalize().unwrap_or(Vec3::Y);
            let [r, g, b] = l.color.to_linear();
            ([dir.x, dir.y, dir.z, l.intensity], [r, g, b, l.ambient])
        }
        None => ([0.0, 1.0, 0.0, 0.0], [0.0; 4]),
    };
    let env = input.environment;
    let background = match &env.background {
        Background::Color(c) => {
            let [r, g, b] = c.to_linear();
            [r, g, b, 0.0]
        }
        Background::Map(_) | Background::Sphere(_) => {
            let [r, g, b] = input.scene.background_color().to_linear();
            [r, g, b, 1.0]
        }
    };
    let ground = match env.ground {
        Some(g) => [g.height, g.radius, g.scale, 1.0],
        None => [0.0; 4],
    };
    FrameUniforms {
        view_proj: view_proj.to_cols_array_2d(),
        inv_view_proj: view_proj.inverse().to_cols_array_2d(),
        camera_pos: [eye.x, eye.y, eye.z, 1.0],
        light_dir,
        light_color,
        background,
        env: [
            env.background_intensity,
            env.background_blurriness.clamp(0.0, 1.0) * background_lod,
            env.environment_intensity,
            if env.has_lighting() { 1.0 } else { 0.0 },
        ],
        ground,
        env_lod: [radiance_lod, 0.0, 0.0, 0.0],
    }
}

/// Pack the screen-space effect switches for `scene`.
fn post_uniforms(scene: &SceneDescription, bloom_width: u32, bloom_height: u32) -> PostUniforms {
    let mut post = PostUniforms {
        vignette: [0.0; 4],
        chromatic: [0.0; 4],
        bloom: [0.0; 4],
        texel: [
            1.0 / bloom_width.max(1) as f32,
            1.0 / bloom_height.max(1) as f32,
            0.0,
            0.0,
        ],
    };
    for node in scene.nodes() {
        match node {
            SceneNode::PostProcessing(p) => {
                post.vignette = [p.vignette_offset, p.vignette_darkness, 1.0, 0.0];
                post.chromatic = [p.chromatic_offset[0], p.chromatic_offset[1], 1.0, 0.0];
            }
            SceneNode::Bloom(b) => {
                post.bloom = [b.intensity, b.threshold, b.smoothing.max(1e-4), 1.0];
                post.texel[2] = (b.kernel_size / 2) as f32;
            }
            _ => {}
        }
    }
    post
}

/// Instances for the model, floors and rings, grouped into draw batches.
fn collect_instances(input: &FrameInput<'_>) -> (Vec<InstanceData>, Vec<Batch>) {
    let mut instances = Vec::new();
    let mut batches = Vec::new();
    let mut push = |mesh: MeshRef, data: Vec<InstanceData>| {
        if data.is_empty() {
            return;
        }
        let start = instances.len() as u32;
        instances.extend(data);
        batches.push(Batch {
            mesh,
            instances: start..instances.len() as u32,
        });
    };

    for node in input.scene.nodes() {
        match node {
            SceneNode::Model(m) => {
                let root = Mat4::from_translation(m.position) * Mat4::from_scale(Vec3::splat(m.scale));
                for (mesh, local) in m.asset.mesh_instances(input.pose) {
                    let mat = m.asset.material_for(mesh);
                    push(
                        MeshRef::Model(mesh),
                        vec![InstanceData::new(
                            root * local,
                            mat.base_color,
                            mat.metallic,
                            mat.roughness,
                            mat.emissive,
                        )],
                    );
                }
            }
            SceneNode::StandardFloor(f) => {
                let model = Mat4::from_translation(Vec3::new(0.0, f.y, 0.0))
                    * Mat4::from_scale(Vec3::new(f.size, 1.0, f.size));
                let [r, g, b] = f.color.to_linear();
                push(
                    MeshRef::Plane,
                    vec![InstanceData::new(model, [r, g, b, 1.0], f.metalness, f.roughness, [0.0; 3])],
                );
            }
            SceneNode::ReflectiveFloor(f) => {
                let model = Mat4::from_scale(Vec3::new(f.size, 1.0, f.size));
                let [r, g, b] = f.color.to_linear();
                // The mirror term sharpens the environment reflection.
                let roughness = f.roughness * (1.0 - f.mirror.clamp(0.0, 1.0));
                push(
                    MeshRef::Plane,
                    vec![InstanceData::new(model, [r, g, b, 1.0], f.metalness, roughness, [0.0; 3])],
                );
            }
            SceneNode::Rings => {
                if let Some(rings) = input.rings {
                    let data = rings
                        .rings()
                        .iter()
                        .map(|r| InstanceData::new(r.matrix(), [0.0, 0.0, 0.0, 1.0], 0.0, 1.0, r.emissive))
                        .collect();
                    push(MeshRef::Ring, data);
                }
            }
            _ => {}
        }
    }
    (instances, batches)
}

/// Axis lines at the model's origin while the transform cursor is shown.
fn gizmo_lines(scene: &SceneDescription) -> Vec<LineVertex> {
    let Some(model) = scene.model().filter(|m| m.gizmo) else {
        return Vec::new();
    };
    let o = model.position;
    let axis = |dir: Vec3, color: [f32; 4]| {
        let end = o + dir * GIZMO_SCALE;
        [
            LineVertex {
                position: o.to_array(),
                color,
            },
            LineVertex {
                position: end.to_array(),
                color,
            },
        ]
    };
    let mut out = Vec::with_capacity(6);
    out.extend(axis(Vec3::X, [1.0, 0.2, 0.2, 1.0]));
    out.extend(axis(Vec3::Y, [0.2, 1.0, 0.2, 1.0]));
    out.extend(axis(Vec3::Z, [0.2, 0.4, 1.0, 1.0]));
    out
}

fn shadow_quad(map: &ShadowMap) -> Vec<ShadowVertex> {
    let h = map.scale * 0.5;
    let y = map.y;
    vec![
        ShadowVertex { position: [-h, y, -h], uv: [0.0, 0.0] },
        ShadowVertex { position: [h, y, -h], uv: [1.0, 0.0] },
        ShadowVertex { position: [h, y, h], uv: [1.0, 1.0] },
        ShadowVertex { position: [-h, y, -h], uv: [0.0, 0.0] },
        ShadowVertex { position: [h, y, h], uv: [1.0, 1.0] },
        ShadowVertex { position: [-h, y, h], uv: [0.0, 1.0] },
    ]
}

fn same_background(a: &Background, b: &Background) -> bool {
    match (a, b) {
        (Background::Color(_), Background::Color(_)) => true,
        (Background::Map(a), Background::Map(b)) => Arc::ptr_eq(a, b),
        (Background::Sphere(a), Background::Sphere(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Option<Self> {
        if mesh.positions.is_empty() || mesh.indices.is_empty() {
            return None;
        }
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| Vertex {
                position: *p,
                normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            })
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Some(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        })
    }
}

struct ModelGpu {
    id: AssetId,
    meshes: Vec<Option<GpuMesh>>,
}

struct EnvironmentGpu {
    lighting: Option<Arc<PrefilteredEnvironment>>,
    background: Background,
    bind_group: wgpu::BindGroup,
    radiance_lod: f32,
    background_lod: f32,
    _textures: Vec<wgpu::Texture>,
}

struct ShadowGpu {
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    _texture: wgpu::Texture,
}

struct Targets {
    width: u32,
    height: u32,
    hdr: wgpu::TextureView,
    depth: wgpu::TextureView,
    bloom: wgpu::TextureView,
    bloom_size: (u32, u32),
    bright_bind_group: wgpu::BindGroup,
    composite_bind_group: wgpu::BindGroup,
}

struct PipelineSpec<'a> {
    label: &'a str,
    module: &'a wgpu::ShaderModule,
    vs: &'a str,
    fs: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
    topology: wgpu::PrimitiveTopology,
    depth: Option<(bool, wgpu::CompareFunction)>,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    spec: PipelineSpec<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: spec.module,
            entry_point: Some(spec.vs),
            compilation_options: Default::default(),
            buffers: spec.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.module,
            entry_point: Some(spec.fs),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: Some(spec.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: spec.depth.map(|(write, compare)| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Upload equirect images as one float texture, using as many of them as
/// form a mip chain. Returns the texture and its highest mip level.
fn upload_equirect_chain(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    images: &[&EquirectImage],
) -> (wgpu::Texture, f32) {
    let sizes: Vec<(u32, u32)> = images.iter().map(|i| (i.width, i.height)).collect();
    let mips = mip_chain_len(&sizes).max(1);
    let first = images[0];
    let mut data = Vec::new();
    for image in &images[..mips] {
        data.extend(rgba16f_bytes(image));
    }
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: first.width,
                height: first.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mips as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &data,
    );
    (texture, (mips - 1) as f32)
}

/// wgpu-based scene renderer: HDR scene pass, optional bloom, tone-mapped
/// composite into the surface.
pub struct WgpuRenderer {
    mesh_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    bright_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    post_buffer: wgpu::Buffer,
    env_layout: wgpu::BindGroupLayout,
    shadow_layout: wgpu::BindGroupLayout,
    post_layout: wgpu::BindGroupLayout,
    env_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    dummy: wgpu::Texture,
    environment: EnvironmentGpu,
    model: Option<ModelGpu>,
    shadow: Option<ShadowGpu>,
    plane: Option<GpuMesh>,
    ring: Option<GpuMesh>,
    instance_buffer: wgpu::Buffer,
    line_buffer: wgpu::Buffer,
    targets: Targets,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let post_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("post_uniforms"),
            size: std::mem::size_of::<PostUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let env_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("environment_layout"),
            entries: &[texture_entry(0), texture_entry(1), texture_entry(2), sampler_entry(3)],
        });
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &env_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &env_layout, &shadow_layout],
            push_constant_ranges: &[],
        });
        let post_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post_pipeline_layout"),
            bind_group_layouts: &[&post_layout],
            push_constant_ranges: &[],
        });

        let module = |label: &str, source: String| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let background_shader = module("background_shader", shaders::scene_source(shaders::BACKGROUND_SHADER));
        let mesh_shader = module("mesh_shader", shaders::scene_source(shaders::MESH_SHADER));
        let shadow_shader = module("shadow_shader", shaders::scene_source(shaders::SHADOW_SHADER));
        let line_shader = module("line_shader", shaders::scene_source(shaders::LINE_SHADER));
        let bright_shader = module("bright_shader", shaders::post_source(shaders::BRIGHT_SHADER));
        let composite_shader = module("composite_shader", shaders::post_source(shaders::COMPOSITE_SHADER));

        let background_pipeline = create_pipeline(
            device,
            &scene_layout,
            PipelineSpec {
                label: "background_pipeline",
                module: &background_shader,
                vs: "vs_fullscreen",
                fs: "fs_background",
                buffers: &[],
                format: HDR_FORMAT,
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                depth: Some((false, wgpu::CompareFunction::Always)),
            },
        );
        let mesh_pipeline = create_pipeline(
            device,
            &scene_layout,
            PipelineSpec {
                label: "mesh_pipeline",
                module: &mesh_shader,
                vs: "vs_mesh",
                fs: "fs_mesh",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                            7 => Float32x4,
                            8 => Float32x4,
                        ],
                    },
                ],
                format: HDR_FORMAT,
                blend: wgpu::BlendState::ALPHA_BLENDING,
                topology: wgpu::PrimitiveTopology::TriangleList,
                depth: Some((true, wgpu::CompareFunction::Less)),
            },
        );
        let shadow_pipeline = create_pipeline(
            device,
            &shadow_pipeline_layout,
            PipelineSpec {
                label: "shadow_pipeline",
                module: &shadow_shader,
                vs: "vs_shadow",
                fs: "fs_shadow",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ShadowVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x2,
                    ],
                }],
                format: HDR_FORMAT,
                blend: wgpu::BlendState::ALPHA_BLENDING,
                topology: wgpu::PrimitiveTopology::TriangleList,
                depth: Some((false, wgpu::CompareFunction::LessEqual)),
            },
        );
        let line_pipeline = create_pipeline(
            device,
            &scene_layout,
            PipelineSpec {
                label: "line_pipeline",
                module: &line_shader,
                vs: "vs_line",
                fs: "fs_line",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x4,
                    ],
                }],
                format: HDR_FORMAT,
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::LineList,
                depth: Some((false, wgpu::CompareFunction::Always)),
            },
        );
        let bright_pipeline = create_pipeline(
            device,
            &post_pipeline_layout,
            PipelineSpec {
                label: "bright_pipeline",
                module: &bright_shader,
                vs: "vs_fullscreen",
                fs: "fs_bright",
                buffers: &[],
                format: HDR_FORMAT,
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                depth: None,
            },
        );
        let composite_pipeline = create_pipeline(
            device,
            &post_pipeline_layout,
            PipelineSpec {
                label: "composite_pipeline",
                module: &composite_shader,
                vs: "vs_fullscreen",
                fs: "fs_composite",
                buffers: &[],
                format: surface_format,
                blend: wgpu::BlendState::REPLACE,
                topology: wgpu::PrimitiveTopology::TriangleList,
                depth: None,
            },
        );

        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let clamp_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("clamp_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let black = EquirectImage::solid(1, 1, [0.0; 3]);
        let (dummy, _) = upload_equirect_chain(device, queue, "dummy_texture", &[&black]);
        let environment = Self::build_environment(
            device,
            queue,
            &env_layout,
            &env_sampler,
            &dummy,
            &SceneEnvironment::solid(glint_common::Color::BLACK),
        );

        let plane = GpuMesh::upload(device, "plane_mesh", &geometry::plane(1.0, 1.0));
        let ring = GpuMesh::upload(device, "ring_mesh", RingSet::new().mesh());

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: MAX_INSTANCES as u64 * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let line_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gizmo_buffer"),
            size: 6 * std::mem::size_of::<LineVertex>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let targets = Self::create_targets(
            device,
            &post_layout,
            &clamp_sampler,
            &post_buffer,
            &dummy,
            width,
            height,
        );

        Self {
            mesh_pipeline,
            background_pipeline,
            shadow_pipeline,
            line_pipeline,
            bright_pipeline,
            composite_pipeline,
            frame_buffer,
            frame_bind_group,
            post_buffer,
            env_layout,
            shadow_layout,
            post_layout,
            env_sampler,
            clamp_sampler,
            dummy,
            environment,
            model: None,
            shadow: None,
            plane,
            ring,
            instance_buffer,
            line_buffer,
            targets,
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.targets = Self::create_targets(
            device,
            &self.post_layout,
            &self.clamp_sampler,
            &self.post_buffer,
            &self.dummy,
            width,
            height,
        );
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.targets.width, self.targets.height)
    }

    /// Upload a newly baked shadow mask, or drop the catcher with `None`.
    pub fn set_shadow_map(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, map: Option<&ShadowMap>) {
        let Some(map) = map else {
            self.shadow = None;
            return;
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("shadow_texture"),
                size: wgpu::Extent3d {
                    width: map.resolution,
                    height: map.resolution,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &map.to_rgba8(),
        );
        let view = texture.create_view(&Default::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_bind_group"),
            layout: &self.shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.clamp_sampler),
                },
            ],
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow_quad"),
            contents: bytemuck::cast_slice(&shadow_quad(map)),
            usage: wgpu::BufferUsages::VERTEX,
        });
        tracing::debug!("uploaded {}px shadow map", map.resolution);
        self.shadow = Some(ShadowGpu {
            bind_group,
            vertex_buffer,
            _texture: texture,
        });
    }

    /// Render one frame: HDR scene pass, bloom bright pass, tone-mapped composite.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        input: &FrameInput<'_>,
    ) {
        self.sync_environment(device, queue, input.environment);
        self.sync_model(device, input.scene);

        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&frame_uniforms(
                input,
                self.environment.radiance_lod,
                self.environment.background_lod,
            )),
        );
        let post = post_uniforms(input.scene, self.targets.bloom_size.0, self.targets.bloom_size.1);
        queue.write_buffer(&self.post_buffer, 0, bytemuck::bytes_of(&post));

        let (mut instances, mut batches) = collect_instances(input);
        if instances.len() > MAX_INSTANCES as usize {
            tracing::warn!("{} instances, drawing the first {MAX_INSTANCES}", instances.len());
            instances.truncate(MAX_INSTANCES as usize);
            batches.retain(|b| b.instances.end <= MAX_INSTANCES);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        let lines = gizmo_lines(input.scene);
        if !lines.is_empty() {
            queue.write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&lines));
        }
        let draw_shadow = input.scene.accumulative_shadows().is_some() && input.scene.model().is_some();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_bind_group(1, &self.environment.bind_group, &[]);

            pass.set_pipeline(&self.background_pipeline);
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.mesh_pipeline);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for batch in &batches {
                let mesh = match batch.mesh {
                    MeshRef::Model(i) => self
                        .model
                        .as_ref()
                        .and_then(|m| m.meshes.get(i))
                        .and_then(Option::as_ref),
                    MeshRef::Plane => self.plane.as_ref(),
                    MeshRef::Ring => self.ring.as_ref(),
                };
                let Some(mesh) = mesh else {
                    continue;
                };
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, batch.instances.clone());
            }

            if let (true, Some(shadow)) = (draw_shadow, &self.shadow) {
                pass.set_pipeline(&self.shadow_pipeline);
                pass.set_bind_group(2, &shadow.bind_group, &[]);
                pass.set_vertex_buffer(0, shadow.vertex_buffer.slice(..));
                pass.draw(0..6, 0..1);
            }

            if !lines.is_empty() {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                pass.draw(0..lines.len() as u32, 0..1);
            }
        }

        if post.bloom[3] > 0.5 {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bright_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.bloom,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.bright_pipeline);
            pass.set_bind_group(0, &self.targets.bright_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("composite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.composite_pipeline);
            pass.set_bind_group(0, &self.targets.composite_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn sync_model(&mut self, device: &wgpu::Device, scene: &SceneDescription) {
        let Some(node) = scene.model() else {
            return;
        };
        if self.model.as_ref().is_some_and(|m| m.id == node.id) {
            return;
        }
        let meshes = node
            .asset
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| GpuMesh::upload(device, &format!("model_mesh_{i}"), mesh))
            .collect();
        tracing::info!("uploaded model {} ({} meshes)", node.asset.name, node.asset.meshes.len());
        self.model = Some(ModelGpu { id: node.id, meshes });
    }

    fn sync_environment(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, env: &SceneEnvironment) {
        let same_lighting = match (&self.environment.lighting, &env.lighting) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        if same_lighting && same_background(&self.environment.background, &env.background) {
            return;
        }
        self.environment = Self::build_environment(
            device,
            queue,
            &self.env_layout,
            &self.env_sampler,
            &self.dummy,
            env,
        );
    }

    fn build_environment(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        dummy: &wgpu::Texture,
        env: &SceneEnvironment,
    ) -> EnvironmentGpu {
        let mut textures = Vec::new();
        let mut radiance_lod = 0.0;
        let mut background_lod = 0.0;

        let (radiance, irradiance) = match &env.lighting {
            Some(p) => {
                let levels: Vec<&EquirectImage> = p.levels().iter().collect();
                let (radiance, lod) = upload_equirect_chain(device, queue, "radiance_map", &levels);
                let (irradiance, _) =
                    upload_equirect_chain(device, queue, "irradiance_map", &[p.irradiance_map()]);
                radiance_lod = lod;
                let views = (radiance.create_view(&Default::default()), irradiance.create_view(&Default::default()));
                textures.push(radiance);
                textures.push(irradiance);
                views
            }
            None => (dummy.create_view(&Default::default()), dummy.create_view(&Default::default())),
        };

        let background = match &env.background {
            Background::Color(_) => dummy.create_view(&Default::default()),
            Background::Map(p) => {
                let levels: Vec<&EquirectImage> = p.levels().iter().collect();
                let (texture, lod) = upload_equirect_chain(device, queue, "background_map", &levels);
                background_lod = lod;
                let view = texture.create_view(&Default::default());
                textures.push(texture);
                view
            }
            Background::Sphere(image) => {
                let (texture, _) = upload_equirect_chain(device, queue, "panorama_map", &[&**image]);
                let view = texture.create_view(&Default::default());
                textures.push(texture);
                view
            }
        };

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("environment_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&radiance),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&irradiance),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&background),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        tracing::debug!(
            "environment textures uploaded: {} (radiance lod {radiance_lod}, background lod {background_lod})",
            textures.len()
        );
        EnvironmentGpu {
            lighting: env.lighting.clone(),
            background: env.background.clone(),
            bind_group,
            radiance_lod,
            background_lod,
            _textures: textures,
        }
    }

    fn create_targets(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        post_buffer: &wgpu::Buffer,
        dummy: &wgpu::Texture,
        width: u32,
        height: u32,
    ) -> Targets {
        let width = width.max(1);
        let height = height.max(1);
        let target = |label: &str, w: u32, h: u32, format: wgpu::TextureFormat, usage: wgpu::TextureUsages| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width: w,
                        height: h,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage,
                    view_formats: &[],
                })
                .create_view(&Default::default())
        };
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let hdr = target("hdr_target", width, height, HDR_FORMAT, sampled);
        let depth = target(
            "depth_texture",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let bloom_size = ((width / 2).max(1), (height / 2).max(1));
        let bloom = target("bloom_target", bloom_size.0, bloom_size.1, HDR_FORMAT, sampled);

        let dummy_view = dummy.create_view(&Default::default());
        let post_group = |label: &str, second: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&hdr),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(second),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: post_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bright_bind_group = post_group("bright_bind_group", &dummy_view);
        let composite_bind_group = post_group("composite_bind_group", &bloom);

        Targets {
            width,
            height,
            hdr,
            depth,
            bloom,
            bloom_size,
            bright_bind_group,
            composite_bind_group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_assets::Node;
    use glint_common::Color;
    use glint_render::RenderView;
    use glint_scene::{ModelState, NodeKind, compose};
    use glint_settings::{Setting, ViewerSettings};

    fn tile_model() -> ModelState {
        let asset = ModelAsset {
            name: "tile".into(),
            meshes: vec![geometry::plane(1.0, 1.0)],
            nodes: vec![Node {
                name: "tile".into(),
                local: Transform::default(),
                children: Vec::new(),
                meshes: vec![0],
            }],
            roots: vec![0],
            ..ModelAsset::default()
        };
        ModelState::new(AssetId(7), Arc::new(asset))
    }

    #[test]
    fn rgba16f_upload_rounds_to_nearest() {
        let image = EquirectImage::new(2, 1, vec![[0.999_755_86, 2051.0, 1.0], [0.5, -2.0, 1.0e6]])
            .unwrap();
        let bytes = rgba16f_bytes(&image);
        assert_eq!(bytes.len(), 2 * 4 * 2);
        let halves: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        // Ties round to even instead of truncating.
        assert_eq!(halves[0], 0x3c00);
        assert_eq!(halves[1], 0x6802);
        assert_eq!(halves[2], 0x3c00);
        assert_eq!(halves[3], 0x3c00);
        assert_eq!(&halves[4..7], &[0x3800, 0xc000, 0x7c00]);
    }

    #[test]
    fn mip_chain_stops_at_first_mismatch() {
        assert_eq!(mip_chain_len(&[]), 0);
        assert_eq!(mip_chain_len(&[(512, 256), (256, 128), (128, 64)]), 3);
        assert_eq!(mip_chain_len(&[(16, 8), (8, 4), (4, 2), (4, 2)]), 3);
        assert_eq!(mip_chain_len(&[(16, 8), (6, 3)]), 1);
    }

    #[test]
    fn frame_uniforms_follow_lighting_and_background() {
        let mut settings = ViewerSettings::default();
        settings.background_color = Color::WHITE;
        let scene = compose(&settings, None);
        let camera = CameraRig::new(&RenderView::for_scene(&scene), false);
        let env = SceneEnvironment::solid(Color::rgb(1.0, 0.0, 0.0));
        let input = FrameInput {
            scene: &scene,
            camera: &camera,
            environment: &env,
            pose: &[],
            rings: None,
        };
        let u = frame_uniforms(&input, 5.0, 5.0);
        assert!((u.background[0] - 1.0).abs() < 1e-5);
        assert_eq!(u.background[1..], [0.0, 0.0, 0.0]);
        assert_eq!(u.env[3], 0.0);
        let eye = Vec3::from_slice(&u.camera_pos[..3]);
        assert!((eye - Vec3::new(0.0, 2.0, 5.0)).length() < 1e-4);
        let lit = scene.lighting().is_some();
        assert_eq!(u.light_dir[3] > 0.0, lit);
        assert_eq!(u.env_lod[0], 5.0);
    }

    #[test]
    fn post_uniforms_switch_with_effects() {
        let mut settings = ViewerSettings::default();
        settings.set(Setting::PostProcessing, false);
        settings.set(Setting::Bloom, false);
        let plain = post_uniforms(&compose(&settings, None), 100, 50);
        assert_eq!(plain.vignette[2], 0.0);
        assert_eq!(plain.bloom[3], 0.0);
        assert_eq!(plain.texel[..2], [0.01, 0.02]);

        settings.set(Setting::PostProcessing, true);
        settings.set(Setting::Bloom, true);
        let scene = compose(&settings, None);
        assert!(scene.contains(NodeKind::Bloom));
        let fx = post_uniforms(&scene, 100, 50);
        assert_eq!(fx.vignette, [0.3, 0.6, 1.0, 0.0]);
        assert_eq!(fx.chromatic, [0.0005, 0.0012, 1.0, 0.0]);
        assert_eq!(fx.bloom[..2], [1.3, 0.15]);
        assert_eq!(fx.bloom[3], 1.0);
        assert_eq!(fx.texel[2], 2.0);
    }

    #[test]
    fn instances_cover_model_floors_and_rings() {
        let mut settings = ViewerSettings::default();
        settings.set(Setting::StandardFloor, true);
        settings.set(Setting::Rings, true);
        let model = tile_model();
        let scene = compose(&settings, Some(&model));
        let camera = CameraRig::new(&RenderView::for_scene(&scene), false);
        let env = SceneEnvironment::solid(Color::BLACK);
        let rings = RingSet::new();
        let pose = model.asset.rest_pose();
        let input = FrameInput {
            scene: &scene,
            camera: &camera,
            environment: &env,
            pose: &pose,
            rings: Some(&rings),
        };
        let (instances, batches) = collect_instances(&input);
        assert!(batches.iter().any(|b| matches!(b.mesh, MeshRef::Model(_))));
        let floor = batches.iter().find(|b| b.mesh == MeshRef::Plane).unwrap();
        let floor_instance = instances[floor.instances.start as usize];
        assert_eq!(floor_instance.model_3[1], -0.2);
        assert_eq!(floor_instance.model_0[0], 50.0);
        let ring_batch = batches.iter().find(|b| b.mesh == MeshRef::Ring).unwrap();
        assert_eq!(ring_batch.instances.len(), rings.rings().len());
        assert_eq!(batches.last().unwrap().instances.end as usize, instances.len());
    }

    #[test]
    fn rings_need_a_ring_set() {
        let mut settings = ViewerSettings::default();
        settings.set(Setting::Rings, true);
        let scene = compose(&settings, None);
        let camera = CameraRig::new(&RenderView::default(), false);
        let env = SceneEnvironment::solid(Color::BLACK);
        let input = FrameInput {
            scene: &scene,
            camera: &camera,
            environment: &env,
            pose: &[],
            rings: None,
        };
        let (_, batches) = collect_instances(&input);
        assert!(batches.iter().all(|b| b.mesh != MeshRef::Ring));
    }

    #[test]
    fn gizmo_follows_cursor() {
        let mut settings = ViewerSettings::default();
        let model = tile_model();
        settings.set(Setting::Cursor, false);
        assert!(gizmo_lines(&compose(&settings, Some(&model))).is_empty());
        settings.set(Setting::Cursor, true);
        let lines = gizmo_lines(&compose(&settings, Some(&model)));
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1].position, [GIZMO_SCALE, 0.0, 0.0]);
    }

    #[test]
    fn shadow_quad_spans_scale() {
        let map = ShadowMap {
            resolution: 2,
            scale: 20.0,
            y: 0.01,
            color: Color::BLACK,
            alpha: vec![0.0; 4],
        };
        let quad = shadow_quad(&map);
        assert_eq!(quad.len(), 6);
        assert_eq!(quad[0].position, [-10.0, 0.01, -10.0]);
        assert_eq!(quad[2].uv, [1.0, 1.0]);
    }
}
