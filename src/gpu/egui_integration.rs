//! Egui overlay for the desktop viewer.
//!
//! Only compiled with the `egui` feature. The overlay is built once per
//! redraw, before the component's frame callback, and painted straight onto
//! the swapchain image after the scene has been presented into it. Texture
//! uploads happen as soon as a pass ends, so a frame the component skips
//! (throttling) never loses the font atlas.

use std::sync::Arc;

use winit::window::Window;

/// Egui integration state.
///
/// Wraps egui context, winit state, and wgpu renderer.
pub struct EguiIntegration {
    pub ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    /// Tessellated output waiting for the next presented frame.
    pending: Option<EguiFrameOutput>,
}

/// Output from one egui pass.
struct EguiFrameOutput {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_free: Vec<egui::TextureId>,
    pixels_per_point: f32,
}

impl EguiIntegration {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        window: &Arc<Window>,
    ) -> Self {
        let ctx = egui::Context::default();

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        style.visuals.popup_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            window.theme(),
            Some(device.limits().max_texture_dimension_2d as usize),
        );

        let renderer =
            egui_wgpu::Renderer::new(device, output_format, egui_wgpu::RendererOptions::default());

        Self {
            ctx,
            state,
            renderer,
            pending: None,
        }
    }

    /// Process a winit event.
    ///
    /// Returns true if egui consumed the event (don't pass to the component).
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Begin a new pass. Call before your UI code.
    pub fn begin_pass(&mut self, window: &Window) {
        let raw_input = self.state.take_egui_input(window);
        self.ctx.begin_pass(raw_input);
    }

    /// End the pass, upload texture changes and keep the shapes for painting.
    pub fn end_pass(&mut self, window: &Window, device: &wgpu::Device, queue: &wgpu::Queue) {
        let full_output = self.ctx.end_pass();
        self.state.handle_platform_output(window, full_output.platform_output);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        // An unpainted pass is superseded; its frees still apply
        if let Some(stale) = self.pending.take() {
            self.free_textures(&stale.textures_free);
        }

        let paint_jobs = self.ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        self.pending = Some(EguiFrameOutput {
            paint_jobs,
            textures_free: full_output.textures_delta.free,
            pixels_per_point: full_output.pixels_per_point,
        });
    }

    /// Draw the pending pass over `view`. Returns command buffers the egui
    /// renderer needs submitted ahead of `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(output) = self.pending.take() else {
            return Vec::new();
        };
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: output.pixels_per_point,
        };

        let callbacks = self
            .renderer
            .update_buffers(device, queue, encoder, &output.paint_jobs, &screen);

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        // Draw over the presented scene
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut pass.forget_lifetime(), &output.paint_jobs, &screen);
        }

        self.free_textures(&output.textures_free);
        callbacks
    }

    fn free_textures(&mut self, ids: &[egui::TextureId]) {
        for id in ids {
            self.renderer.free_texture(id);
        }
    }
}
