//! wgpu implementation of [`RenderBackend`].
//!
//! Meshes live in vertex/index buffers keyed by handle. Materials stay on
//! the CPU and are packed into the per-instance buffer each frame, so
//! updating one costs nothing until the next render. Consecutive draws that
//! share a mesh and a pipeline collapse into one instanced draw call.

#[cfg(feature = "egui")]
mod egui_integration;
mod post_process;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::{MaterialHandle, MeshHandle, RenderBackend, RendererOptions};
use crate::error::{BackendError, GpuError};
use crate::geometry::Mesh;
use crate::scene::Frame;
use crate::shader::{InstanceRaw, SceneUniforms, Vertex, MESH_SHADER};
use crate::visuals::{Material, Side};

#[cfg(feature = "egui")]
use egui_integration::EguiIntegration;
use post_process::SceneTarget;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_INSTANCE_CAPACITY: usize = 256;

/// Pipeline variant: which faces, and whether depth is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    side: Side,
    transparent: bool,
}

impl PipelineKey {
    fn of(material: &Material) -> Self {
        Self {
            side: material.side,
            transparent: material.is_transparent(),
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// A run of consecutive draws sharing mesh and pipeline.
struct Batch {
    mesh: MeshHandle,
    key: PipelineKey,
    instances: std::ops::Range<u32>,
}

/// Everything tied to the device; dropped on [`RenderBackend::release`].
struct GpuContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    target: SceneTarget,
    meshes: HashMap<MeshHandle, GpuMesh>,
}

pub struct WgpuBackend {
    context: Option<GpuContext>,
    materials: HashMap<MaterialHandle, Material>,
    next_handle: u32,
    options: RendererOptions,
    logical_size: (u32, u32),
    pixel_ratio: f32,
    out_of_memory: bool,
    #[cfg(feature = "egui")]
    egui: Option<EguiIntegration>,
}

impl WgpuBackend {
    /// Create a backend drawing into `window`.
    pub async fn new(window: Arc<Window>, options: RendererOptions) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let scale = window.scale_factor() as f32;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        info!("GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let alpha_mode = if options.transparent
            && surface_caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };
        debug!("surface format {:?}, alpha mode {:?}", surface_format, alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Bind Group Layout"),
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
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let sample_count = options.sample_count();
        let pipelines = create_mesh_pipelines(
            &device,
            &uniform_bind_group_layout,
            surface_format,
            sample_count,
        );

        let instance_buffer = create_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);

        let logical = (
            (size.width as f32 / scale).round().max(1.0) as u32,
            (size.height as f32 / scale).round().max(1.0) as u32,
        );
        let target = SceneTarget::new(&device, logical.0, logical.1, surface_format, sample_count);

        #[cfg(feature = "egui")]
        let egui = Some(EguiIntegration::new(&device, surface_format, &window));

        Ok(Self {
            context: Some(GpuContext {
                surface,
                device,
                queue,
                config,
                pipelines,
                uniform_buffer,
                uniform_bind_group,
                instance_buffer,
                instance_capacity: INITIAL_INSTANCE_CAPACITY,
                target,
                meshes: HashMap::new(),
            }),
            materials: HashMap::new(),
            next_handle: 1,
            options,
            logical_size: logical,
            pixel_ratio: 1.0,
            out_of_memory: false,
            #[cfg(feature = "egui")]
            egui,
        })
    }

    pub fn options(&self) -> RendererOptions {
        self.options
    }

    /// Reconfigure the swapchain after the window changed physical size.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.config.width = width;
            ctx.config.height = height;
            ctx.surface.configure(&ctx.device, &ctx.config);
        }
    }

    /// The device ran out of memory; the viewer should exit.
    pub fn is_out_of_memory(&self) -> bool {
        self.out_of_memory
    }

    pub fn live_meshes(&self) -> usize {
        self.context.as_ref().map_or(0, |c| c.meshes.len())
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    /// Offer a window event to the overlay. `true` means egui consumed it.
    #[cfg(feature = "egui")]
    pub fn egui_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.egui
            .as_mut()
            .is_some_and(|egui| egui.on_window_event(window, event))
    }

    /// Start an overlay pass; `None` once the context is released.
    #[cfg(feature = "egui")]
    pub fn egui_begin(&mut self, window: &Window) -> Option<egui::Context> {
        let egui = self.egui.as_mut()?;
        egui.begin_pass(window);
        Some(egui.ctx.clone())
    }

    /// Finish the pass started by [`egui_begin`](Self::egui_begin). It is
    /// painted by the next [`RenderBackend::render`].
    #[cfg(feature = "egui")]
    pub fn egui_end(&mut self, window: &Window) {
        if let (Some(egui), Some(ctx)) = (self.egui.as_mut(), self.context.as_ref()) {
            egui.end_pass(window, &ctx.device, &ctx.queue);
        }
    }

    fn next_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn resize_target(&mut self) {
        let (w, h) = self.logical_size;
        let ratio = self.pixel_ratio;
        if let Some(ctx) = self.context.as_mut() {
            let width = (w as f32 * ratio).round() as u32;
            let height = (h as f32 * ratio).round() as u32;
            ctx.target.resize(&ctx.device, width, height);
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn create_mesh(&mut self, mesh: &Mesh) -> Result<MeshHandle, BackendError> {
        mesh.validate().map_err(BackendError::InvalidMesh)?;
        let handle = MeshHandle(self.next_handle());
        let ctx = self.context.as_mut().ok_or(BackendError::ContextReleased)?;

        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();

        let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        ctx.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
            },
        );
        debug!(
            "uploaded mesh {:?}: {} vertices, {} triangles",
            handle,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(handle)
    }

    fn create_material(&mut self, material: &Material) -> Result<MaterialHandle, BackendError> {
        if self.context.is_none() {
            return Err(BackendError::ContextReleased);
        }
        let handle = MaterialHandle(self.next_handle());
        self.materials.insert(handle, *material);
        Ok(handle)
    }

    fn update_material(
        &mut self,
        handle: MaterialHandle,
        material: &Material,
    ) -> Result<(), BackendError> {
        let slot = self.materials.get_mut(&handle).ok_or(BackendError::UnknownHandle)?;
        *slot = *material;
        Ok(())
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if let Some(ctx) = self.context.as_mut() {
            if let Some(mesh) = ctx.meshes.remove(&handle) {
                mesh.vertex_buffer.destroy();
                mesh.index_buffer.destroy();
            }
        }
    }

    fn release_material(&mut self, handle: MaterialHandle) {
        self.materials.remove(&handle);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio.is_finite() && ratio > 0.0 {
            self.pixel_ratio = ratio;
            self.resize_target();
        }
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width.max(1), height.max(1));
        self.resize_target();
    }

    fn output_size(&self) -> (u32, u32) {
        self.logical_size
    }

    fn render(&mut self, frame: &Frame) -> Result<(), BackendError> {
        let ctx = self.context.as_mut().ok_or(BackendError::ContextReleased)?;

        // Opaque first so transparent layers blend over them
        let mut ordered = Vec::with_capacity(frame.draws.len());
        for pass_transparent in [false, true] {
            for draw in &frame.draws {
                let material = self
                    .materials
                    .get(&draw.material)
                    .ok_or(BackendError::UnknownHandle)?;
                if !ctx.meshes.contains_key(&draw.mesh) {
                    return Err(BackendError::UnknownHandle);
                }
                if material.is_transparent() == pass_transparent {
                    ordered.push((draw, material));
                }
            }
        }

        let mut instances = Vec::with_capacity(ordered.len());
        let mut batches: Vec<Batch> = Vec::new();
        for (draw, material) in &ordered {
            let key = PipelineKey::of(material);
            let index = instances.len() as u32;
            instances.push(InstanceRaw::new(draw.model, material));
            match batches.last_mut() {
                Some(batch) if batch.mesh == draw.mesh && batch.key == key => {
                    batch.instances.end = index + 1
                }
                _ => batches.push(Batch {
                    mesh: draw.mesh,
                    key,
                    instances: index..index + 1,
                }),
            }
        }

        if instances.len() > ctx.instance_capacity {
            ctx.instance_capacity = instances.len().next_power_of_two();
            ctx.instance_buffer = create_instance_buffer(&ctx.device, ctx.instance_capacity);
        }
        if !instances.is_empty() {
            ctx.queue
                .write_buffer(&ctx.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        let uniforms = SceneUniforms::from_frame(frame);
        ctx.queue
            .write_buffer(&ctx.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let output = match ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                ctx.surface.configure(&ctx.device, &ctx.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                self.out_of_memory = true;
                return Err(BackendError::Surface(wgpu::SurfaceError::OutOfMemory));
            }
            Err(e) => return Err(e.into()),
        };
        let surface_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let (clear_color, clear_alpha) = frame.clear;
            let clear_alpha = if self.options.transparent { clear_alpha } else { 1.0 };
            let c = clear_color.rgb() * clear_alpha;
            let clear = wgpu::Color {
                r: c.x as f64,
                g: c.y as f64,
                b: c.z as f64,
                a: clear_alpha as f64,
            };

            let mut render_pass = ctx.device_pass(&mut encoder, clear);
            render_pass.set_bind_group(0, &ctx.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(1, ctx.instance_buffer.slice(..));
            for batch in &batches {
                let (Some(pipeline), Some(mesh)) =
                    (ctx.pipelines.get(&batch.key), ctx.meshes.get(&batch.mesh))
                else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, batch.instances.clone());
            }
        }

        ctx.target.present(&mut encoder, &surface_view);

        #[cfg(feature = "egui")]
        let overlay = match self.egui.as_mut() {
            Some(egui) => egui.paint(
                &ctx.device,
                &ctx.queue,
                &mut encoder,
                &surface_view,
                [ctx.config.width, ctx.config.height],
            ),
            None => Vec::new(),
        };
        #[cfg(not(feature = "egui"))]
        let overlay: Vec<wgpu::CommandBuffer> = Vec::new();

        ctx.queue
            .submit(overlay.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }

    fn release(&mut self) {
        #[cfg(feature = "egui")]
        {
            self.egui = None;
        }
        if let Some(ctx) = self.context.take() {
            for mesh in ctx.meshes.values() {
                mesh.vertex_buffer.destroy();
                mesh.index_buffer.destroy();
            }
            ctx.instance_buffer.destroy();
            ctx.uniform_buffer.destroy();
            info!("rendering context released");
        }
        self.materials.clear();
    }
}

impl GpuContext {
    fn device_pass<'a>(
        &'a self,
        encoder: &'a mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'a> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(self.target.color_attachment(clear))],
            depth_stencil_attachment: Some(self.target.depth_attachment()),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// One pipeline per face mode, each in an opaque and a transparent variant.
fn create_mesh_pipelines(
    device: &wgpu::Device,
    uniform_bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    sample_count: u32,
) -> HashMap<PipelineKey, wgpu::RenderPipeline> {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(MESH_SHADER.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[uniform_bind_group_layout],
        push_constant_ranges: &[],
    });

    let mut pipelines = HashMap::new();
    for side in [Side::Front, Side::Back, Side::Double] {
        for transparent in [false, true] {
            let cull_mode = match side {
                Side::Front => Some(wgpu::Face::Back),
                Side::Back => Some(wgpu::Face::Front),
                Side::Double => None,
            };
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Mesh Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout(), InstanceRaw::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: !transparent,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    ..Default::default()
                },
                multiview: None,
                cache: None,
            });
            pipelines.insert(PipelineKey { side, transparent }, pipeline);
        }
    }
    pipelines
}
