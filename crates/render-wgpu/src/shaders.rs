/// Frame-wide bindings shared by every program (group 0).
macro_rules! frame_prelude {
    () => {
        r#"
struct Light {
    position_range: vec4<f32>,
    color_intensity: vec4<f32>,
};

struct Frame {
    view_proj: mat4x4<f32>,
    inv_view_proj: mat4x4<f32>,
    // w: 1.0 when the target encodes sRGB on write
    eye: vec4<f32>,
    // w: number of active lights
    ambient: vec4<f32>,
    background: vec4<f32>,
    lights: array<Light, 4>,
};

@group(0) @binding(0)
var<uniform> frame: Frame;

fn srgb_to_linear(c: vec3<f32>) -> vec3<f32> {
    let low = c / 12.92;
    let high = pow((c + vec3<f32>(0.055)) / 1.055, vec3<f32>(2.4));
    return select(high, low, c <= vec3<f32>(0.04045));
}
"#
    };
}

/// Instanced grass: noise sway, player push, height gradient.
pub const GRASS_SHADER: &str = concat!(
    frame_prelude!(),
    r#"
struct GrassUniforms {
    model: mat4x4<f32>,
    player_position: vec3<f32>,
    time: f32,
    collider_radius: f32,
    sway_amplitude: f32,
    sway_falloff: f32,
    color_height: f32,
    noise_floor: f32,
    noise_range: f32,
    _pad: vec2<f32>,
    root_color: vec4<f32>,
    tip_color: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> grass: GrassUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
};

struct InstanceInput {
    @location(4) model_0: vec4<f32>,
    @location(5) model_1: vec4<f32>,
    @location(6) model_2: vec4<f32>,
    @location(7) model_3: vec4<f32>,
    @location(8) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) height: f32,
    @location(1) instance_color: vec3<f32>,
};

fn hash(n: vec2<f32>) -> f32 {
    return fract(sin(dot(n, vec2<f32>(12.9898, 4.1414))) * 43758.5453);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let b = floor(p);
    let f = smoothstep(vec2<f32>(0.0), vec2<f32>(1.0), fract(p));
    return mix(
        mix(hash(b), hash(b + vec2<f32>(1.0, 0.0)), f.x),
        mix(hash(b + vec2<f32>(0.0, 1.0)), hash(b + vec2<f32>(1.0, 1.0)), f.x),
        f.y,
    );
}

@vertex
fn vs_grass(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let instance_model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let height = max(0.0, vertex.position.y);
    var world = (grass.model * instance_model * vec4<f32>(vertex.position, 1.0)).xyz;

    let noise = value_noise(vertex.position.xz) * grass.noise_range + grass.noise_floor;
    let to_player = grass.player_position - world;
    let distance = length(to_player);

    let sway = vec3<f32>(grass.sway_amplitude * cos(grass.time) * noise * height, 0.0, 0.0)
        * min(1.0, distance / grass.sway_falloff);

    var normal = vec3<f32>(0.0);
    if (distance > 0.0) {
        normal = to_player / distance;
    }
    normal.y = abs(normal.y);
    let push = -normal * (grass.collider_radius - distance);

    world += select(sway, push, distance < grass.collider_radius);

    var out: VertexOutput;
    out.clip_position = frame.view_proj * vec4<f32>(world, 1.0);
    out.height = height;
    out.instance_color = instance.color.rgb;
    return out;
}

@fragment
fn fs_grass(in: VertexOutput) -> @location(0) vec4<f32> {
    // Held at the tip colour above color_height.
    let t = clamp(in.height / grass.color_height, 0.0, 1.0);
    var color = clamp(mix(grass.root_color.rgb, grass.tip_color.rgb, t), vec3<f32>(0.0), vec3<f32>(1.0));
    if (frame.eye.w > 0.5) {
        color = srgb_to_linear(color);
    }
    return vec4<f32>(color, 1.0);
}
"#
);

/// Ground and follower: albedo texture times vertex colour, point lights
/// plus ambient.
pub const LIT_SHADER: &str = concat!(
    frame_prelude!(),
    r#"
struct Object {
    model: mat4x4<f32>,
    tint: vec4<f32>,
    uv_scale: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> object: Object;

@group(2) @binding(0)
var albedo_texture: texture_2d<f32>;
@group(2) @binding(1)
var albedo_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) color: vec4<f32>,
};

@vertex
fn vs_lit(vertex: VertexInput) -> VertexOutput {
    let world = object.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = frame.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = (object.model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv * object.uv_scale.xy;
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_lit(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    var n = normalize(in.world_normal);
    if (!front_facing) {
        n = -n;
    }
    let albedo = textureSample(albedo_texture, albedo_sampler, in.uv) * in.color * object.tint;

    var light = frame.ambient.rgb;
    let count = min(u32(frame.ambient.w), 4u);
    for (var i = 0u; i < count; i = i + 1u) {
        let l = frame.lights[i];
        let to_light = l.position_range.xyz - in.world_position;
        let d = length(to_light);
        let dir = to_light / max(d, 1e-4);
        let ratio = d / max(l.position_range.w, 1e-4);
        let falloff = clamp(1.0 - ratio * ratio * ratio * ratio, 0.0, 1.0);
        light += l.color_intensity.rgb * l.color_intensity.w * max(dot(n, dir), 0.0) * falloff * falloff;
    }
    return vec4<f32>(albedo.rgb * light, 1.0);
}
"#
);

/// Full-screen equirectangular background looked up by view direction.
pub const BACKGROUND_SHADER: &str = concat!(
    frame_prelude!(),
    r#"
const PI: f32 = 3.14159265;

@group(1) @binding(0)
var sky_texture: texture_2d<f32>;
@group(1) @binding(1)
var sky_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) ndc: vec2<f32>,
};

@vertex
fn vs_background(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    let ndc = uv * 2.0 - vec2<f32>(1.0);
    var out: VertexOutput;
    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    out.ndc = ndc;
    return out;
}

@fragment
fn fs_background(in: VertexOutput) -> @location(0) vec4<f32> {
    let far = frame.inv_view_proj * vec4<f32>(in.ndc, 1.0, 1.0);
    let dir = normalize(far.xyz / far.w - frame.eye.xyz);
    let u = atan2(dir.z, dir.x) / (2.0 * PI) + 0.5;
    let v = acos(clamp(dir.y, -1.0, 1.0)) / PI;
    let color = textureSampleLevel(sky_texture, sky_sampler, vec2<f32>(u, v), 0.0);
    return vec4<f32>(color.rgb, 1.0);
}
"#
);

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga;

    fn validate(name: &str, src: &str) {
        let module = naga::front::wgsl::parse_str(src)
            .unwrap_or_else(|e| panic!("{name}: {}", e.emit_to_string(src)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{name}: {e:?}"));
    }

    #[test]
    fn programs_parse_and_validate() {
        validate("grass", GRASS_SHADER);
        validate("lit", LIT_SHADER);
        validate("background", BACKGROUND_SHADER);
    }

    #[test]
    fn programs_share_the_frame_block() {
        for src in [GRASS_SHADER, LIT_SHADER, BACKGROUND_SHADER] {
            assert!(src.contains("struct Frame"));
            assert!(src.contains("@group(0) @binding(0)"));
        }
    }

    #[test]
    fn entry_points_present() {
        assert!(GRASS_SHADER.contains("fn vs_grass") && GRASS_SHADER.contains("fn fs_grass"));
        assert!(LIT_SHADER.contains("fn vs_lit") && LIT_SHADER.contains("fn fs_lit"));
        assert!(BACKGROUND_SHADER.contains("fn vs_background"));
    }

    #[test]
    fn grass_constants_match_reference_hash() {
        assert!(GRASS_SHADER.contains("12.9898, 4.1414"));
        assert!(GRASS_SHADER.contains("43758.5453"));
    }
}
