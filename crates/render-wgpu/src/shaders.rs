/// Declarations shared by every scene pass: frame uniforms, environment
/// textures, the equirect mapping and the ground projection.
pub const COMMON: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    inv_view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    // xyz toward the key light, w intensity
    light_dir: vec4<f32>,
    // rgb light color, w ambient
    light_color: vec4<f32>,
    // rgb base color, w background mode (0 color, 1 map)
    background: vec4<f32>,
    // x background intensity, y background lod, z environment intensity, w has lighting
    env: vec4<f32>,
    // x height, y radius, z scale, w enabled
    ground: vec4<f32>,
    // x highest specular lod
    env_lod: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

@group(1) @binding(0)
var radiance_map: texture_2d<f32>;
@group(1) @binding(1)
var irradiance_map: texture_2d<f32>;
@group(1) @binding(2)
var background_map: texture_2d<f32>;
@group(1) @binding(3)
var env_sampler: sampler;

const PI: f32 = 3.14159265;

fn dir_to_uv(d: vec3<f32>) -> vec2<f32> {
    let n = normalize(d);
    let u = atan2(n.x, -n.z) / (2.0 * PI) + 0.5;
    let v = acos(clamp(n.y, -1.0, 1.0)) / PI;
    return vec2<f32>(u, v);
}

fn sphere_intersect(ro: vec3<f32>, rd: vec3<f32>, center: vec3<f32>, radius: f32) -> f32 {
    let oc = ro - center;
    let b = dot(oc, rd);
    let c = dot(oc, oc) - radius * radius;
    let h = b * b - c;
    if (h < 0.0) {
        return -1.0;
    }
    return -b + sqrt(h);
}

fn disk_intersect(ro: vec3<f32>, rd: vec3<f32>, center: vec3<f32>, normal: vec3<f32>, radius: f32) -> f32 {
    let d = dot(rd, normal);
    if (d >= 0.0) {
        return 1e6;
    }
    let o = ro - center;
    let t = -dot(normal, o) / d;
    let q = o + rd * t;
    if (dot(q, q) < radius * radius) {
        return t;
    }
    return 1e6;
}

fn ground_project(view_dir: vec3<f32>, camera_pos: vec3<f32>) -> vec3<f32> {
    let height = frame.ground.x;
    let radius = frame.ground.y;
    let scale = frame.ground.z;
    let dome_t = sphere_intersect(camera_pos, view_dir, vec3<f32>(0.0), scale);
    var on_dome = view_dir;
    if (dome_t > 0.0) {
        on_dome = camera_pos + view_dir * dome_t;
    }
    let p = normalize(on_dome);
    let cam = camera_pos - vec3<f32>(0.0, height, 0.0);
    let t = sphere_intersect(cam, p, vec3<f32>(0.0), radius);
    if (t <= 0.0) {
        return vec3<f32>(0.0, 1.0, 0.0);
    }
    let t_disk = disk_intersect(cam, p, vec3<f32>(0.0, -height, 0.0), vec3<f32>(0.0, 1.0, 0.0), radius);
    return normalize((cam + min(t, t_disk) * p) / radius);
}
"#;

/// Fullscreen triangle used by the background and post passes.
pub const FULLSCREEN: &str = r#"
struct ScreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> ScreenOutput {
    let x = f32((index << 1u) & 2u) * 2.0 - 1.0;
    let y = f32(index & 2u) * 2.0 - 1.0;
    var out: ScreenOutput;
    out.clip_position = vec4<f32>(x, y, 0.0, 1.0);
    out.ndc = vec2<f32>(x, y);
    return out;
}

fn ndc_to_uv(ndc: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
}
"#;

/// Solid color, environment map or panorama behind the scene.
pub const BACKGROUND_SHADER: &str = r#"
@fragment
fn fs_background(in: ScreenOutput) -> @location(0) vec4<f32> {
    if (frame.background.w < 0.5) {
        return vec4<f32>(frame.background.rgb, 1.0);
    }
    let far = frame.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let camera_pos = frame.camera_pos.xyz;
    var dir = normalize(far.xyz / far.w - camera_pos);
    if (frame.ground.w > 0.5) {
        dir = ground_project(dir, camera_pos);
    }
    let color = textureSampleLevel(background_map, env_sampler, dir_to_uv(dir), frame.env.y).rgb;
    return vec4<f32>(color * frame.env.x, 1.0);
}
"#;

/// Model meshes, floors and rings: base color, metal/rough, one key light
/// and image-based lighting from the environment.
pub const MESH_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) base_color: vec4<f32>,
    // x metallic, y roughness
    @location(7) material: vec4<f32>,
    @location(8) emissive: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) base_color: vec4<f32>,
    @location(3) material: vec4<f32>,
    @location(4) emissive: vec3<f32>,
};

@vertex
fn vs_mesh(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);
    let world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;

    var out: VertexOutput;
    out.clip_position = frame.view_proj * world_pos;
    out.world_pos = world_pos.xyz;
    out.world_normal = world_normal;
    out.base_color = instance.base_color;
    out.material = instance.material;
    out.emissive = instance.emissive.rgb;
    return out;
}

@fragment
fn fs_mesh(in: VertexOutput) -> @location(0) vec4<f32> {
    var n = normalize(in.world_normal);
    let v = normalize(frame.camera_pos.xyz - in.world_pos);
    if (dot(n, v) < 0.0) {
        n = -n;
    }
    let metallic = clamp(in.material.x, 0.0, 1.0);
    let roughness = clamp(in.material.y, 0.04, 1.0);
    let base = in.base_color.rgb;
    let diffuse_color = base * (1.0 - metallic);
    let f0 = mix(vec3<f32>(0.04), base, metallic);

    let l = normalize(frame.light_dir.xyz);
    let h = normalize(l + v);
    let n_dot_l = max(dot(n, l), 0.0);
    let n_dot_h = max(dot(n, h), 0.0);
    let n_dot_v = max(dot(n, v), 1e-4);
    let a2 = max(pow(roughness, 4.0), 1e-4);
    let shininess = 2.0 / a2 - 2.0;
    let specular = f0 * pow(n_dot_h, shininess) * (shininess + 8.0) / (8.0 * PI);
    let light = frame.light_color.rgb * frame.light_dir.w;

    var color = (diffuse_color / PI + specular) * light * n_dot_l;
    color += diffuse_color * frame.light_color.rgb * frame.light_color.w;

    if (frame.env.w > 0.5) {
        let irradiance = textureSampleLevel(irradiance_map, env_sampler, dir_to_uv(n), 0.0).rgb;
        let r = reflect(-v, n);
        let lod = roughness * frame.env_lod.x;
        let prefiltered = textureSampleLevel(radiance_map, env_sampler, dir_to_uv(r), lod).rgb;
        let fresnel = f0 + (max(vec3<f32>(1.0 - roughness), f0) - f0) * pow(1.0 - n_dot_v, 5.0);
        color += (diffuse_color * irradiance + prefiltered * fresnel) * frame.env.z;
    }

    color += in.emissive;
    return vec4<f32>(color, in.base_color.a);
}
"#;

/// Transparent ground quad carrying the accumulated shadow mask.
pub const SHADOW_SHADER: &str = r#"
@group(2) @binding(0)
var shadow_map: texture_2d<f32>;
@group(2) @binding(1)
var shadow_sampler: sampler;

struct ShadowVertex {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct ShadowOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_shadow(vertex: ShadowVertex) -> ShadowOutput {
    var out: ShadowOutput;
    out.clip_position = frame.view_proj * vec4<f32>(vertex.position, 1.0);
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_shadow(in: ShadowOutput) -> @location(0) vec4<f32> {
    return textureSample(shadow_map, shadow_sampler, in.uv);
}
"#;

/// Colored line list for the transform gizmo.
pub const LINE_SHADER: &str = r#"
struct LineVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_line(vertex: LineVertex) -> LineOutput {
    var out: LineOutput;
    out.clip_position = frame.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_line(in: LineOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Bindings of the two screen-space passes.
pub const POST_COMMON: &str = r#"
struct Post {
    // x offset, y darkness, z enabled
    vignette: vec4<f32>,
    // xy offset, z enabled
    chromatic: vec4<f32>,
    // x intensity, y threshold, z smoothing, w enabled
    bloom: vec4<f32>,
    // xy texel size of the bloom target, z kernel radius
    texel: vec4<f32>,
};

@group(0) @binding(0)
var hdr_map: texture_2d<f32>;
@group(0) @binding(1)
var bloom_map: texture_2d<f32>;
@group(0) @binding(2)
var post_sampler: sampler;
@group(0) @binding(3)
var<uniform> post: Post;

fn luminance(c: vec3<f32>) -> f32 {
    return dot(c, vec3<f32>(0.2126, 0.7152, 0.0722));
}
"#;

/// Keep only what is brighter than the bloom threshold.
pub const BRIGHT_SHADER: &str = r#"
@fragment
fn fs_bright(in: ScreenOutput) -> @location(0) vec4<f32> {
    let color = textureSampleLevel(hdr_map, post_sampler, ndc_to_uv(in.ndc), 0.0).rgb;
    let threshold = post.bloom.y;
    let weight = smoothstep(threshold, threshold + post.bloom.z, luminance(color));
    return vec4<f32>(color * weight, 1.0);
}
"#;

/// Chromatic aberration, bloom, ACES tone mapping and vignette.
pub const COMPOSITE_SHADER: &str = r#"
fn aces(x: vec3<f32>) -> vec3<f32> {
    let a = 2.51;
    let b = 0.03;
    let c = 2.43;
    let d = 0.59;
    let e = 0.14;
    return clamp((x * (a * x + b)) / (x * (c * x + d) + e), vec3<f32>(0.0), vec3<f32>(1.0));
}

fn blurred_bloom(uv: vec2<f32>) -> vec3<f32> {
    let radius = i32(post.texel.z);
    var sum = vec3<f32>(0.0);
    var weight = 0.0;
    for (var y = -radius; y <= radius; y++) {
        for (var x = -radius; x <= radius; x++) {
            let offset = vec2<f32>(f32(x), f32(y)) * post.texel.xy * 2.0;
            let w = exp(-f32(x * x + y * y) / max(f32(radius * radius), 1.0));
            sum += textureSampleLevel(bloom_map, post_sampler, uv + offset, 0.0).rgb * w;
            weight += w;
        }
    }
    return sum / max(weight, 1e-4);
}

@fragment
fn fs_composite(in: ScreenOutput) -> @location(0) vec4<f32> {
    let uv = ndc_to_uv(in.ndc);
    var color: vec3<f32>;
    if (post.chromatic.z > 0.5) {
        let offset = post.chromatic.xy;
        color = vec3<f32>(
            textureSampleLevel(hdr_map, post_sampler, uv + offset, 0.0).r,
            textureSampleLevel(hdr_map, post_sampler, uv, 0.0).g,
            textureSampleLevel(hdr_map, post_sampler, uv - offset, 0.0).b,
        );
    } else {
        color = textureSampleLevel(hdr_map, post_sampler, uv, 0.0).rgb;
    }
    if (post.bloom.w > 0.5) {
        color += blurred_bloom(uv) * post.bloom.x;
    }
    color = aces(color);
    if (post.vignette.z > 0.5) {
        let d = distance(uv, vec2<f32>(0.5));
        color *= smoothstep(0.8, post.vignette.x * 0.799, d * (post.vignette.y + post.vignette.x));
    }
    return vec4<f32>(color, 1.0);
}
"#;

/// Scene pass source: shared declarations followed by `body`.
pub fn scene_source(body: &str) -> String {
    format!("{COMMON}\n{FULLSCREEN}\n{body}")
}

/// Screen-space pass source.
pub fn post_source(body: &str) -> String {
    format!("{FULLSCREEN}\n{POST_COMMON}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_are_present() {
        for (source, entry) in [
            (BACKGROUND_SHADER, "fn fs_background"),
            (MESH_SHADER, "fn vs_mesh"),
            (MESH_SHADER, "fn fs_mesh"),
            (SHADOW_SHADER, "fn fs_shadow"),
            (LINE_SHADER, "fn vs_line"),
            (BRIGHT_SHADER, "fn fs_bright"),
            (COMPOSITE_SHADER, "fn fs_composite"),
            (FULLSCREEN, "fn vs_fullscreen"),
        ] {
            assert!(source.contains(entry), "missing {entry}");
        }
    }

    #[test]
    fn sources_include_shared_declarations() {
        let mesh = scene_source(MESH_SHADER);
        assert!(mesh.contains("struct Frame"));
        assert!(mesh.contains("fn ground_project"));
        let post = post_source(COMPOSITE_SHADER);
        assert!(post.contains("struct Post"));
        assert!(post.contains("fn vs_fullscreen"));
    }
}
