use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use meadow_assets::{MeshData, PixelFormat, TextureData};
use meadow_common::{BoundingSphere, GroundConfig, Rgb};
use meadow_field::{GrassField, GrassUniforms, GrassUniformsRaw, InstanceRaw};
use meadow_render::{RenderScene, RenderView};
use wgpu::util::DeviceExt;

use crate::shaders;

/// Lights beyond this many are ignored.
pub const MAX_LIGHTS: usize = 4;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct LightRaw {
    position_range: [f32; 4],
    color_intensity: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    inv_view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    ambient: [f32; 4],
    background: [f32; 4],
    lights: [LightRaw; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    tint: [f32; 4],
    uv_scale: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
    color: [f32; 4],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x4,
];

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    4 => Float32x4,
    5 => Float32x4,
    6 => Float32x4,
    7 => Float32x4,
    8 => Float32x4,
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    }
}

/// Interleave a mesh's attribute streams. Missing attributes fall back to
/// up normals, zero uvs, and white.
fn interleave(mesh: &MeshData) -> Vec<Vertex> {
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, p)| Vertex {
            position: *p,
            normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            color: mesh.colors.get(i).copied().unwrap_or([1.0; 4]),
        })
        .collect()
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// RGBA8 sRGB pixels for upload. Float textures are clamped and encoded.
fn rgba8_pixels(texture: &TextureData) -> Cow<'_, [u8]> {
    match texture.format {
        PixelFormat::Rgba8 => Cow::Borrowed(&texture.bytes),
        PixelFormat::Rgba32Float => Cow::Owned(
            texture
                .bytes
                .chunks_exact(4)
                .enumerate()
                .map(|(i, b)| {
                    let v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]).clamp(0.0, 1.0);
                    let v = if i % 4 == 3 { v } else { linear_to_srgb(v) };
                    (v * 255.0 + 0.5) as u8
                })
                .collect(),
        ),
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bounds: BoundingSphere,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertices = interleave(mesh);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            bounds: mesh.bounds(),
        }
    }
}

/// A lit mesh with its own model uniforms and albedo texture.
struct LitObject {
    mesh: GpuMesh,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: Option<wgpu::BindGroup>,
    model: Mat4,
}

/// What the last frame actually drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub background_drawn: bool,
    pub follower_drawn: bool,
    pub grass_drawn: bool,
    /// Total instance-buffer uploads since creation.
    pub instance_uploads: u64,
}

/// wgpu scene renderer: background, ground, follower, instanced grass.
pub struct WgpuRenderer {
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
    srgb_output: bool,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    repeat_sampler: wgpu::Sampler,
    white_texture: wgpu::BindGroup,
    lit_pipeline: wgpu::RenderPipeline,
    grass_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,
    grass_uniform_buffer: wgpu::Buffer,
    grass_bind_group: wgpu::BindGroup,
    grass_mesh: Option<GpuMesh>,
    instance_buffer: Option<wgpu::Buffer>,
    instance_capacity: usize,
    /// `(generation, revision)` of the field last written to the GPU.
    uploaded_revision: Option<(u64, u64)>,
    ground: LitObject,
    follower: Option<LitObject>,
    background: Option<wgpu::BindGroup>,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    stats: FrameStats,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        sample_count: u32,
        ground: &GroundConfig,
    ) -> Self {
        let sample_count = sample_count.max(1);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniform_buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_layout = uniform_layout(device, "frame_bind_group_layout");
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let object_layout = uniform_layout(device, "object_bind_group_layout");
        let grass_layout = uniform_layout(device, "grass_bind_group_layout");
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let repeat_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("repeat_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = TextureData {
            name: "white".into(),
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
            bytes: vec![255; 4],
        };
        let white_texture =
            texture_bind_group(device, queue, &texture_layout, &repeat_sampler, &white);

        // Lit pipeline (ground, follower)
        let lit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::LIT_SHADER.into()),
        });
        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lit_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let lit_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "lit_pipeline",
                layout: &lit_layout,
                module: &lit_shader,
                vs_entry: "vs_lit",
                fs_entry: "fs_lit",
                buffers: &[vertex_layout()],
                format: surface_format,
                sample_count,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
            },
        );

        // Grass pipeline
        let grass_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::GRASS_SHADER.into()),
        });
        let grass_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &grass_layout],
            push_constant_ranges: &[],
        });
        let grass_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "grass_pipeline",
                layout: &grass_pipeline_layout,
                module: &grass_shader,
                vs_entry: "vs_grass",
                fs_entry: "fs_grass",
                buffers: &[vertex_layout(), instance_layout()],
                format: surface_format,
                sample_count,
                depth_write: true,
                depth_compare: wgpu::CompareFunction::Less,
            },
        );

        // Background pipeline
        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BACKGROUND_SHADER.into()),
        });
        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let background_pipeline = create_pipeline(
            device,
            PipelineSpec {
                label: "background_pipeline",
                layout: &background_layout,
                module: &background_shader,
                vs_entry: "vs_background",
                fs_entry: "fs_background",
                buffers: &[],
                format: surface_format,
                sample_count,
                depth_write: false,
                depth_compare: wgpu::CompareFunction::Always,
            },
        );

        let grass_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grass_uniform_buffer"),
            contents: bytemuck::bytes_of(&GrassUniforms::default().to_raw()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let grass_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_bind_group"),
            layout: &grass_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: grass_uniform_buffer.as_entire_binding(),
            }],
        });

        let disc = &ground.disc;
        let ground_mesh = MeshData::cylinder(disc.radius, disc.thickness, ground.segments);
        let ground_object = LitObject::new(
            device,
            &object_layout,
            "ground",
            &ground_mesh,
            Mat4::from_translation(disc.center),
            ground.color,
            ground.texture_repeat,
        );

        let (depth_view, msaa_view) =
            Self::create_targets(device, surface_format, sample_count, width, height);

        tracing::info!(?surface_format, sample_count, "wgpu renderer ready");

        Self {
            surface_format,
            sample_count,
            srgb_output: surface_format.is_srgb(),
            frame_buffer,
            frame_bind_group,
            object_layout,
            texture_layout,
            repeat_sampler,
            white_texture,
            lit_pipeline,
            grass_pipeline,
            background_pipeline,
            grass_uniform_buffer,
            grass_bind_group,
            grass_mesh: None,
            instance_buffer: None,
            instance_capacity: 0,
            uploaded_revision: None,
            ground: ground_object,
            follower: None,
            background: None,
            depth_view,
            msaa_view,
            stats: FrameStats::default(),
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (depth_view, msaa_view) =
            Self::create_targets(device, self.surface_format, self.sample_count, width, height);
        self.depth_view = depth_view;
        self.msaa_view = msaa_view;
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn set_floor_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &TextureData) {
        if let Some(group) = self.texture_group(device, queue, texture) {
            self.ground.texture_bind_group = Some(group);
        }
    }

    pub fn set_background(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &TextureData) {
        self.background = self.texture_group(device, queue, texture);
    }

    pub fn set_grass_mesh(&mut self, device: &wgpu::Device, mesh: &MeshData) {
        self.grass_mesh = Some(GpuMesh::upload(device, "grass", mesh));
        self.uploaded_revision = None;
    }

    pub fn set_follower_mesh(&mut self, device: &wgpu::Device, mesh: &MeshData) {
        self.follower = Some(LitObject::new(
            device,
            &self.object_layout,
            "follower",
            mesh,
            Mat4::IDENTITY,
            [1.0, 1.0, 1.0],
            1.0,
        ));
    }

    /// Render one frame into `target`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        scene: &RenderScene<'_>,
        view: &RenderView,
    ) -> FrameStats {
        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&self.frame_uniforms(scene, view)),
        );

        let frustum = view.frustum();

        let follower_model = scene.follower.filter(|m| {
            self.follower
                .as_ref()
                .is_some_and(|f| frustum.intersects_sphere(&f.mesh.bounds.transformed(m)))
        });
        if let (Some(model), Some(follower)) = (follower_model, self.follower.as_mut()) {
            follower.set_model(queue, model);
        }

        let grass_visible = match scene.grass {
            Some(field) if self.grass_mesh.is_some() => {
                self.sync_grass(device, queue, field);
                frustum.intersects_sphere(&field.world_bounds())
            }
            _ => false,
        };
        let instance_count = scene.grass.map_or(0, |f| f.capacity() as u32);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let clear = self.clear_color(scene.background);
            let (color_view, resolve_target, store) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(target), wgpu::StoreOp::Discard),
                None => (target, None, wgpu::StoreOp::Store),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            // Background
            if let Some(sky) = &self.background {
                pass.set_pipeline(&self.background_pipeline);
                pass.set_bind_group(1, sky, &[]);
                pass.draw(0..3, 0..1);
            }

            // Ground and follower
            pass.set_pipeline(&self.lit_pipeline);
            self.ground.draw(&mut pass, &self.white_texture);
            if follower_model.is_some() {
                if let Some(follower) = &self.follower {
                    follower.draw(&mut pass, &self.white_texture);
                }
            }

            // Grass
            if let (true, Some(mesh), Some(instances)) =
                (grass_visible, &self.grass_mesh, &self.instance_buffer)
            {
                pass.set_pipeline(&self.grass_pipeline);
                pass.set_bind_group(1, &self.grass_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_vertex_buffer(1, instances.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..instance_count);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));

        self.stats.background_drawn = self.background.is_some();
        self.stats.follower_drawn = follower_model.is_some();
        self.stats.grass_drawn = grass_visible && self.instance_buffer.is_some();
        self.stats
    }

    /// Upload grass uniforms every frame; instances only when a different
    /// field arrived, its revision moved or the buffer is too small.
    fn sync_grass(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, field: &GrassField) {
        let raw: GrassUniformsRaw = field.uniforms().to_raw();
        queue.write_buffer(&self.grass_uniform_buffer, 0, bytemuck::bytes_of(&raw));

        if self.instance_buffer.is_none() || self.instance_capacity < field.capacity() {
            self.instance_buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("grass_instance_buffer"),
                size: (field.capacity().max(1) * std::mem::size_of::<InstanceRaw>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.instance_capacity = field.capacity();
            self.uploaded_revision = None;
        }

        let current = (field.generation(), field.revision());
        if self.uploaded_revision != Some(current) {
            if let Some(buffer) = &self.instance_buffer {
                queue.write_buffer(buffer, 0, bytemuck::cast_slice(field.raw_instances()));
                self.uploaded_revision = Some(current);
                self.stats.instance_uploads += 1;
                tracing::debug!(revision = field.revision(), "uploaded grass instances");
            }
        }
    }

    fn frame_uniforms(&self, scene: &RenderScene<'_>, view: &RenderView) -> FrameUniforms {
        let mut lights = [LightRaw::zeroed(); MAX_LIGHTS];
        let count = scene.lights.len().min(MAX_LIGHTS);
        for (slot, light) in lights.iter_mut().zip(scene.lights) {
            let p = light.position;
            let c = light.color;
            *slot = LightRaw {
                position_range: [p.x, p.y, p.z, light.range],
                color_intensity: [c[0], c[1], c[2], light.intensity],
            };
        }
        let eye: Vec3 = view.eye;
        let a = scene.ambient;
        let b = scene.background;
        FrameUniforms {
            view_proj: view.view_projection.to_cols_array_2d(),
            inv_view_proj: view.view_projection.inverse().to_cols_array_2d(),
            eye: [eye.x, eye.y, eye.z, if self.srgb_output { 1.0 } else { 0.0 }],
            ambient: [a[0], a[1], a[2], count as f32],
            background: [b[0], b[1], b[2], 1.0],
            lights,
        }
    }

    fn clear_color(&self, background: Rgb) -> wgpu::Color {
        let encode = |c: f32| {
            if self.srgb_output {
                srgb_to_linear(c) as f64
            } else {
                c as f64
            }
        };
        wgpu::Color {
            r: encode(background[0]),
            g: encode(background[1]),
            b: encode(background[2]),
            a: 1.0,
        }
    }

    fn texture_group(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &TextureData,
    ) -> Option<wgpu::BindGroup> {
        if texture.width == 0 || texture.height == 0 {
            tracing::warn!(name = %texture.name, "skipping empty texture");
            return None;
        }
        Some(texture_bind_group(
            device,
            queue,
            &self.texture_layout,
            &self.repeat_sampler,
            texture,
        ))
    }

    fn create_targets(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        sample_count: u32,
        width: u32,
        height: u32,
    ) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let msaa = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("msaa_color_texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&Default::default())
        });
        (depth.create_view(&Default::default()), msaa)
    }
}

impl LitObject {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        mesh: &MeshData,
        model: Mat4,
        tint: Rgb,
        uv_repeat: f32,
    ) -> Self {
        let uniforms = ObjectUniforms {
            model: model.to_cols_array_2d(),
            tint: [tint[0], tint[1], tint[2], 1.0],
            uv_scale: [uv_repeat, uv_repeat, 0.0, 0.0],
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_uniform_buffer")),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}_bind_group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self {
            mesh: GpuMesh::upload(device, label, mesh),
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group: None,
            model,
        }
    }

    /// Rewrite the model matrix (first 64 bytes of the uniforms) if it moved.
    fn set_model(&mut self, queue: &wgpu::Queue, model: Mat4) {
        if model != self.model {
            self.model = model;
            queue.write_buffer(
                &self.uniform_buffer,
                0,
                bytemuck::bytes_of(&model.to_cols_array_2d()),
            );
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, fallback_texture: &wgpu::BindGroup) {
        pass.set_bind_group(1, &self.uniform_bind_group, &[]);
        pass.set_bind_group(
            2,
            self.texture_bind_group.as_ref().unwrap_or(fallback_texture),
            &[],
        );
        pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.mesh.index_count, 0, 0..1);
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn texture_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &TextureData,
) -> wgpu::BindGroup {
    let pixels = rgba8_pixels(texture);
    let gpu_texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(texture.name.as_str()),
            size: wgpu::Extent3d {
                width: texture.width,
                height: texture.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &pixels,
    );
    let view = gpu_texture.create_view(&Default::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{}_bind_group", texture.name)),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

struct PipelineSpec<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    vs_entry: &'a str,
    fs_entry: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    format: wgpu::TextureFormat,
    sample_count: u32,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
}

/// Every pipeline draws both faces: blades are single quads and the
/// follower may be an imported model with arbitrary winding.
fn create_pipeline(device: &wgpu::Device, spec: PipelineSpec<'_>) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(spec.layout),
        vertex: wgpu::VertexState {
            module: spec.module,
            entry_point: Some(spec.vs_entry),
            compilation_options: Default::default(),
            buffers: spec.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.module,
            entry_point: Some(spec.fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write,
            depth_compare: spec.depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: spec.sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meadow_common::{CameraConfig, Ground, GrassConfig, LightingConfig};
    use meadow_render::OrbitCamera;

    fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await?;
            adapter
                .request_device(&wgpu::DeviceDescriptor::default(), None)
                .await
                .ok()
        })
    }

    fn offscreen(device: &wgpu::Device) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("test_target"),
                size: wgpu::Extent3d {
                    width: 64,
                    height: 64,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default())
    }

    #[test]
    fn uniform_struct_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 304);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 96);
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
    }

    #[test]
    fn float_textures_are_encoded_to_srgb_bytes() {
        let mut bytes = Vec::new();
        for v in [0.0_f32, 1.0, 4.0, 0.5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let tex = TextureData {
            name: "hdr".into(),
            width: 1,
            height: 1,
            format: PixelFormat::Rgba32Float,
            bytes,
        };
        let px = rgba8_pixels(&tex);
        assert_eq!(px[0], 0);
        assert_eq!(px[1], 255);
        assert_eq!(px[2], 255);
        assert_eq!(px[3], 128);
    }

    #[test]
    fn srgb_round_trip() {
        for c in [0.0_f32, 0.02, 0.2, 0.5, 1.0] {
            assert!((linear_to_srgb(srgb_to_linear(c)) - c).abs() < 1e-4);
        }
    }

    #[test]
    fn renders_scene_offscreen() {
        let Some((device, queue)) = create_test_device_queue() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };
        let ground_config = meadow_common::GroundConfig::default();
        let mut renderer = WgpuRenderer::new(
            &device,
            &queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            (64, 64),
            1,
            &ground_config,
        );
        renderer.set_grass_mesh(&device, &MeshData::grass_blade(3, 2.0, 0.1));
        renderer.set_follower_mesh(&device, &MeshData::follower_ball(1.0, 8, 12));
        renderer.set_floor_texture(
            &device,
            &queue,
            &TextureData::checker(16, 4, [255, 255, 255], [0, 0, 0]),
        );

        let config = GrassConfig {
            count: 100,
            capacity: 128,
            ..GrassConfig::default()
        };
        let blade = MeshData::grass_blade(3, 2.0, 0.1).bounds();
        let field = GrassField::build(&config, blade).unwrap();
        let ground = Ground::default();
        let lights = LightingConfig::default().lights;
        let scene = RenderScene {
            background: [0.13; 3],
            ambient: [0.25; 3],
            ground: &ground,
            lights: &lights,
            follower: Some(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))),
            grass: Some(&field),
            elapsed: 0.0,
            tick: 0,
        };
        let view = RenderView::from_camera(&OrbitCamera::new(&CameraConfig::default(), 1.0));
        let target = offscreen(&device);

        let first = renderer.render(&device, &queue, &target, &scene, &view);
        assert!(first.grass_drawn);
        assert!(first.follower_drawn);
        assert_eq!(first.instance_uploads, 1);

        let second = renderer.render(&device, &queue, &target, &scene, &view);
        assert_eq!(second.instance_uploads, 1);

        // Same capacity and revision, different field.
        let rebuilt = GrassField::build(&config, blade).unwrap();
        assert_eq!(rebuilt.revision(), field.revision());
        let scene = RenderScene {
            grass: Some(&rebuilt),
            ..scene
        };
        let third = renderer.render(&device, &queue, &target, &scene, &view);
        assert_eq!(third.instance_uploads, 2);

        renderer.set_grass_mesh(&device, &MeshData::grass_blade(3, 2.0, 0.1));
        let fourth = renderer.render(&device, &queue, &target, &scene, &view);
        assert_eq!(fourth.instance_uploads, 3);
    }
}
