//! WGSL sources and the GPU-side layouts that feed them.
//!
//! Two programs: the lit mesh shader, instanced with one model matrix and
//! one packed material per draw, and the present shader that stretches the
//! offscreen scene over the window.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::scene::Frame;
use crate::visuals::{Light, Material};

/// Lights beyond this many non-ambient lights are ignored.
pub const MAX_LIGHTS: usize = 4;

pub const MESH_SHADER: &str = r#"
struct Light {
    // w = 0: directional (xyz points at the light), w = 1: point
    position: vec4<f32>,
    // rgb premultiplied by intensity, w = range
    color: vec4<f32>,
};

struct Scene {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    // rgb = summed ambient light, w = light count
    ambient: vec4<f32>,
    lights: array<Light, 4>,
};

@group(0) @binding(0)
var<uniform> scene: Scene;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    // rgb, opacity
    @location(6) color: vec4<f32>,
    // emissive rgb premultiplied by intensity, shininess
    @location(7) emissive: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) emissive: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(instance.model_0, instance.model_1, instance.model_2, instance.model_3);
    let world = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = scene.view_proj * world;
    out.world_position = world.xyz;
    // Scales are uniform, so the model matrix transforms normals correctly
    out.normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = instance.color;
    out.emissive = instance.emissive;
    return out;
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    var n = normalize(in.normal);
    if (!front_facing) {
        n = -n;
    }
    let view_dir = normalize(scene.camera_position.xyz - in.world_position);
    let shininess = in.emissive.w;

    var diffuse = scene.ambient.rgb;
    var specular = vec3<f32>(0.0, 0.0, 0.0);
    let count = u32(scene.ambient.w);
    for (var i = 0u; i < count; i = i + 1u) {
        let light = scene.lights[i];
        var dir = normalize(light.position.xyz);
        var attenuation = 1.0;
        if (light.position.w > 0.5) {
            let to_light = light.position.xyz - in.world_position;
            let dist = length(to_light);
            dir = to_light / max(dist, 0.0001);
            let falloff = clamp(1.0 - dist / light.color.w, 0.0, 1.0);
            attenuation = falloff * falloff;
        }
        let radiance = light.color.rgb * attenuation;
        diffuse = diffuse + radiance * max(dot(n, dir), 0.0);
        if (shininess > 0.0) {
            let half_dir = normalize(dir + view_dir);
            specular = specular + radiance * pow(max(dot(n, half_dir), 0.0), shininess) * 0.2;
        }
    }

    let rgb = in.color.rgb * diffuse + specular + in.emissive.rgb;
    let alpha = in.color.a;
    return vec4<f32>(rgb * alpha, alpha);
}
"#;

pub const PRESENT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var scene: texture_2d<f32>;
@group(0) @binding(1)
var scene_sampler: sampler;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(scene, scene_sampler, in.uv);
}
"#;

/// Mesh vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-draw instance data: model matrix plus packed material.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4
    ];

    pub fn new(model: Mat4, material: &Material) -> Self {
        let color = material.color.rgb();
        let emissive = material.emissive.rgb() * material.emissive_intensity;
        Self {
            model: model.to_cols_array_2d(),
            color: [color.x, color.y, color.z, material.opacity],
            emissive: [emissive.x, emissive.y, emissive.z, material.shininess],
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct LightRaw {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

/// Scene uniform block, mirrored by `Scene` in [`MESH_SHADER`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub lights: [LightRaw; MAX_LIGHTS],
}

impl SceneUniforms {
    /// Pack a frame's camera and lights. Ambient lights are summed.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut ambient = glam::Vec3::ZERO;
        let mut lights = [LightRaw::default(); MAX_LIGHTS];
        let mut count = 0;

        for light in &frame.lights {
            let raw = match *light {
                Light::Ambient { color, intensity } => {
                    ambient += color.rgb() * intensity;
                    continue;
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => {
                    let c = color.rgb() * intensity;
                    LightRaw {
                        position: [position.x, position.y, position.z, 0.0],
                        color: [c.x, c.y, c.z, 0.0],
                    }
                }
                Light::Point {
                    color,
                    intensity,
                    position,
                    range,
                } => {
                    let c = color.rgb() * intensity;
                    LightRaw {
                        position: [position.x, position.y, position.z, 1.0],
                        color: [c.x, c.y, c.z, range.max(f32::EPSILON)],
                    }
                }
            };
            if count < MAX_LIGHTS {
                lights[count] = raw;
                count += 1;
            }
        }

        let camera = frame.camera.position;
        Self {
            view_proj: frame.camera.view_proj().to_cols_array_2d(),
            camera_position: [camera.x, camera.y, camera.z, 1.0],
            ambient: [ambient.x, ambient.y, ambient.z, count as f32],
            lights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CameraView;
    use crate::visuals::Color;
    use glam::Vec3;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 96);
        // Uniform blocks must be 16-byte aligned
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 224);
    }

    #[test]
    fn test_instance_packs_material() {
        let material = Material::new(Color::hex(0xff0000))
            .emissive(Color::hex(0x00ff00), 0.5)
            .shininess(80.0)
            .opacity(0.3);
        let raw = InstanceRaw::new(Mat4::IDENTITY, &material);
        assert_eq!(raw.color, [1.0, 0.0, 0.0, 0.3]);
        assert_eq!(raw.emissive, [0.0, 0.5, 0.0, 80.0]);
    }

    #[test]
    fn test_scene_uniforms_pack_lights() {
        let frame = Frame {
            camera: CameraView {
                view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
                position: Vec3::new(0.0, 0.0, 5.0),
            },
            lights: vec![
                Light::Ambient {
                    color: Color::WHITE,
                    intensity: 0.25,
                },
                Light::Ambient {
                    color: Color::WHITE,
                    intensity: 0.25,
                },
                Light::Point {
                    color: Color::WHITE,
                    intensity: 2.0,
                    position: Vec3::ONE,
                    range: 400.0,
                },
            ],
            clear: (Color::BLACK, 0.0),
            draws: Vec::new(),
        };
        let uniforms = SceneUniforms::from_frame(&frame);
        assert_eq!(uniforms.ambient, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(uniforms.lights[0].position[3], 1.0);
        assert_eq!(uniforms.lights[0].color, [2.0, 2.0, 2.0, 400.0]);
    }
}
