use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use winit::window::Window;

use crate::gpu::GpuContext;
use crate::sketch::{DrawFrame, Sketch, SketchConfig};

/// Per-window application state: the GPU context, frame pacing, and the
/// input snapshot handed to the sketch each frame.
pub struct App {
    pub gpu: GpuContext,
    pub window: Arc<Window>,
    background: wgpu::Color,
    start_time: Instant,
    last_frame: Instant,
    frame_count: u64,
    mouse: (f32, f32),
}

impl App {
    pub fn new(window: Arc<Window>, config: &SketchConfig) -> Result<Self> {
        let gpu = GpuContext::new(window.clone(), config.vsync)?;
        let now = Instant::now();
        Ok(Self {
            gpu,
            window,
            background: config.background,
            start_time: now,
            last_frame: now,
            frame_count: 0,
            mouse: (0.0, 0.0),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    pub fn set_mouse(&mut self, x: f32, y: f32) {
        self.mouse = (x, y);
    }

    /// Render one frame: clear to the background color, hand the pass to the
    /// sketch, submit, present.
    pub fn render(&mut self, sketch: &mut dyn Sketch) -> Result<(), wgpu::SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("skizze-encoder"),
            });

        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sketch-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut frame = DrawFrame {
                pass,
                device: &self.gpu.device,
                queue: &self.gpu.queue,
                format: self.gpu.format,
                width: self.gpu.width(),
                height: self.gpu.height(),
                time: now.duration_since(self.start_time).as_secs_f32(),
                delta_time,
                frame_count: self.frame_count,
                mouse_x: self.mouse.0,
                mouse_y: self.mouse.1,
            };
            sketch.draw(&mut frame);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.frame_count = self.frame_count.wrapping_add(1);

        Ok(())
    }
}
