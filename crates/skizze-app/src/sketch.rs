use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::gpu::GpuContext;

/// Startup options a sketch declares before the window exists.
#[derive(Debug, Clone)]
pub struct SketchConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Clear color applied at the start of every frame.
    pub background: wgpu::Color,
    pub vsync: bool,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "skizze".into(),
            background: wgpu::Color::BLACK,
            vsync: true,
        }
    }
}

/// One frame of drawing: the active render pass plus everything a sketch
/// needs to replay retained resources into it.
pub struct DrawFrame<'a> {
    pub pass: wgpu::RenderPass<'a>,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Surface format, needed when (re)finalizing shapes mid-sketch.
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Seconds since setup.
    pub time: f32,
    /// Seconds since the previous frame.
    pub delta_time: f32,
    pub frame_count: u64,
    pub mouse_x: f32,
    pub mouse_y: f32,
}

/// A user sketch. The host calls `setup` once after the GPU context exists,
/// then `draw` every frame from the render thread; input callbacks arrive
/// between frames on the same thread.
pub trait Sketch {
    fn config(&self) -> SketchConfig {
        SketchConfig::default()
    }

    /// Create shapes, open media, start audio. Runs once.
    fn setup(&mut self, _gpu: &GpuContext) {}

    /// Runs every frame inside an active render pass.
    fn draw(&mut self, frame: &mut DrawFrame<'_>);

    fn key_pressed(&mut self, _key: KeyCode) {}

    fn mouse_moved(&mut self, _x: f32, _y: f32) {}

    fn mouse_pressed(&mut self, _button: MouseButton) {}

    /// Runs once when the application shuts down.
    fn finish(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let c = SketchConfig::default();
        assert_eq!(c.width, 1024);
        assert_eq!(c.height, 768);
        assert_eq!(c.title, "skizze");
        assert!(c.vsync);
    }
}
