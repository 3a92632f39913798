use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::sketch::DrawFrame;

/// Interleaved layout: position.xyz + color.rgb.
const FLOATS_PER_VERTEX: usize = 6;
const VERTEX_STRIDE: u64 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u64;

/// Shape shader (WGSL). Vertices arrive in pixel coordinates and are mapped
/// to clip space by an orthographic projection uniform.
const SHAPE_SHADER: &str = r#"
struct ShapeUniforms {
    proj: mat4x4f,
}

@group(0) @binding(0) var<uniform> u: ShapeUniforms;

struct VertexInput {
    @location(0) position: vec3f,
    @location(1) color: vec3f,
}

struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) color: vec3f,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = u.proj * vec4f(in.position, 1.0);
    out.color = in.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4f {
    return vec4f(in.color, 1.0);
}
"#;

/// Primitive interpretation of the recorded vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeMode {
    /// Every 3 recorded vertices form one triangle.
    #[default]
    Triangles,
    /// The recorded vertices form one convex polygon outline, fan-triangulated
    /// at finalize time.
    Polygon,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ShapeUniforms {
    proj: [[f32; 4]; 4],
}

/// GPU half of a finalized shape. Valid from `end_shape` until `release`.
struct ShapeGpu {
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    /// Vertices actually in the buffer (post fan-expansion for `Polygon`).
    draw_count: u32,
}

/// A retained shape: record vertices between `begin_shape` and `end_shape`,
/// then replay with `draw` as often as needed without re-uploading.
///
/// Misuse (vertex outside a recording block, draw before finalize) is a
/// tolerated no-op so a stray call never takes down the frame loop;
/// `misuse_count` exposes it for diagnostics.
pub struct Shape {
    mode: ShapeMode,
    recording: bool,
    pending: Vec<f32>,
    vertex_count: u32,
    gpu: Option<ShapeGpu>,
    compile_error: Option<String>,
    misuse_count: u32,
}

impl Shape {
    pub fn new() -> Self {
        Self {
            mode: ShapeMode::default(),
            recording: false,
            pending: Vec::new(),
            vertex_count: 0,
            gpu: None,
            compile_error: None,
            misuse_count: 0,
        }
    }

    /// Enter recording state, discarding any unflushed vertices from a prior
    /// incomplete recording. No GPU side effects; a previously finalized
    /// buffer stays drawable until the next `end_shape` completes.
    pub fn begin_shape(&mut self, mode: ShapeMode) {
        self.recording = true;
        self.mode = mode;
        self.pending.clear();
    }

    /// Append one vertex (pixel-space position, 0..1 color) to the pending
    /// buffer. Outside a recording block this is a counted no-op.
    pub fn vertex(&mut self, x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) {
        if !self.recording {
            self.misuse_count += 1;
            return;
        }
        self.pending.extend_from_slice(&[x, y, z, r, g, b]);
    }

    /// Finalize the recording: upload the pending vertices, build the shader
    /// pipeline, and capture the vertex count. Host-side vertex storage is
    /// released after upload; the GPU owns the authoritative copy.
    ///
    /// A compile/link failure leaves the shape undrawable (see
    /// [`Shape::shader_error`]) rather than panicking the frame loop.
    pub fn end_shape(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        // Resources of a prior finalize are released here, not in
        // begin_shape: the old geometry stays drawable until its
        // replacement is ready.
        self.gpu = None;
        self.compile_error = None;

        let recorded = self.finish_recording();
        if recorded.is_empty() {
            return;
        }

        let data = match self.mode {
            ShapeMode::Triangles => recorded,
            ShapeMode::Polygon => triangulate_fan(&recorded),
        };
        let draw_count = (data.len() / FLOATS_PER_VERTEX) as u32;
        if draw_count == 0 {
            // Polygon with fewer than 3 vertices: nothing to rasterize.
            return;
        }

        // WGSL errors surface at module/pipeline creation; run the whole
        // build inside a validation scope so a bad shader marks this shape
        // undrawable instead of raising an uncaptured device error.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = build_shape_gpu(device, format, &data, draw_count);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("shape pipeline build failed: {err}");
            self.compile_error = Some(err.to_string());
            return;
        }
        self.gpu = Some(built);
    }

    /// Leave recording state, capture the authoritative vertex count, and
    /// hand back the recorded floats, leaving the host-side buffer empty.
    fn finish_recording(&mut self) -> Vec<f32> {
        self.recording = false;
        self.vertex_count = (self.pending.len() / FLOATS_PER_VERTEX) as u32;
        std::mem::take(&mut self.pending)
    }

    /// Replay the finalized buffer into the current frame. No-op when the
    /// shape was never finalized, failed to compile, or holds no vertices.
    pub fn draw(&self, frame: &mut DrawFrame<'_>) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        let proj = Mat4::orthographic_rh(
            0.0,
            frame.width as f32,
            frame.height as f32,
            0.0,
            -1.0,
            1.0,
        );
        frame.queue.write_buffer(
            &gpu.uniform_buffer,
            0,
            bytemuck::bytes_of(&ShapeUniforms {
                proj: proj.to_cols_array_2d(),
            }),
        );
        frame.pass.set_pipeline(&gpu.pipeline);
        frame.pass.set_bind_group(0, &gpu.bind_group, &[]);
        frame.pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        frame.pass.draw(0..gpu.draw_count, 0..1);
    }

    /// Release all GPU handles. Idempotent; also implied by drop. Must run
    /// before the owning `GpuContext` is torn down.
    pub fn release(&mut self) {
        self.gpu = None;
    }

    /// Number of vertices recorded by the last completed `end_shape`.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_finalized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Compile/link diagnostic from the last `end_shape`, if it failed.
    pub fn shader_error(&self) -> Option<&str> {
        self.compile_error.as_deref()
    }

    /// Count of tolerated misuse calls (vertex outside recording).
    pub fn misuse_count(&self) -> u32 {
        self.misuse_count
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new()
    }
}

fn build_shape_gpu(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    data: &[f32],
    draw_count: u32,
) -> ShapeGpu {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("shape-vertices"),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("shape-uniforms"),
        size: std::mem::size_of::<ShapeUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("shape-bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(
                    std::mem::size_of::<ShapeUniforms>() as u64,
                ),
            },
            count: None,
        }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("shape-bg"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shape-shader"),
        source: wgpu::ShaderSource::Wgsl(SHAPE_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("shape-pipeline-layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: (3 * std::mem::size_of::<f32>()) as u64,
                shader_location: 1,
            },
        ],
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("shape-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader_module,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader_module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    ShapeGpu {
        vertex_buffer,
        uniform_buffer,
        bind_group,
        pipeline,
        draw_count,
    }
}

/// Expand a polygon outline (fan order) into a triangle list. Returns an
/// empty list for fewer than 3 vertices.
fn triangulate_fan(ring: &[f32]) -> Vec<f32> {
    let n = ring.len() / FLOATS_PER_VERTEX;
    if n < 3 {
        return Vec::new();
    }
    let vert = |i: usize| &ring[i * FLOATS_PER_VERTEX..(i + 1) * FLOATS_PER_VERTEX];
    let mut out = Vec::with_capacity((n - 2) * 3 * FLOATS_PER_VERTEX);
    for i in 1..n - 1 {
        out.extend_from_slice(vert(0));
        out.extend_from_slice(vert(i));
        out.extend_from_slice(vert(i + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(shape: &mut Shape, n: usize) {
        for i in 0..n {
            let f = i as f32;
            shape.vertex(f, f * 2.0, 0.0, 0.5, 0.5, 0.5);
        }
    }

    #[test]
    fn vertex_outside_recording_is_a_counted_noop() {
        let mut shape = Shape::new();
        shape.vertex(1.0, 2.0, 3.0, 1.0, 0.0, 0.0);
        assert!(shape.pending.is_empty());
        assert_eq!(shape.misuse_count(), 1);
    }

    #[test]
    fn recording_appends_six_floats_per_vertex() {
        let mut shape = Shape::new();
        shape.begin_shape(ShapeMode::Triangles);
        record(&mut shape, 4);
        assert_eq!(shape.pending.len(), 4 * FLOATS_PER_VERTEX);
        assert!(shape.is_recording());
    }

    #[test]
    fn finishing_captures_the_recorded_count_and_frees_the_host_buffer() {
        let mut shape = Shape::new();
        shape.begin_shape(ShapeMode::Triangles);
        record(&mut shape, 5);
        let recorded = shape.finish_recording();
        assert_eq!(shape.vertex_count(), 5);
        assert_eq!(recorded.len(), 5 * FLOATS_PER_VERTEX);
        assert!(shape.pending.is_empty());
        assert!(!shape.is_recording());
    }

    #[test]
    fn re_recording_supersedes_the_previous_count() {
        let mut shape = Shape::new();
        shape.begin_shape(ShapeMode::Triangles);
        record(&mut shape, 6);
        shape.finish_recording();
        assert_eq!(shape.vertex_count(), 6);

        shape.begin_shape(ShapeMode::Triangles);
        record(&mut shape, 3);
        shape.finish_recording();
        assert_eq!(shape.vertex_count(), 3);
    }

    #[test]
    fn vertices_after_finishing_are_excluded() {
        let mut shape = Shape::new();
        shape.begin_shape(ShapeMode::Triangles);
        record(&mut shape, 3);
        shape.finish_recording();
        shape.vertex(9.0, 9.0, 9.0, 1.0, 1.0, 1.0);
        assert_eq!(shape.vertex_count(), 3);
        assert_eq!(shape.misuse_count(), 1);
    }

    #[test]
    fn begin_shape_discards_unflushed_vertices() {
        let mut shape = Shape::new();
        shape.begin_shape(ShapeMode::Triangles);
        record(&mut shape, 3);
        shape.begin_shape(ShapeMode::Polygon);
        assert!(shape.pending.is_empty());
        assert_eq!(shape.mode, ShapeMode::Polygon);
    }

    #[test]
    fn draw_before_finalize_is_a_noop() {
        let shape = Shape::new();
        assert!(!shape.is_finalized());
        assert_eq!(shape.vertex_count(), 0);
        // draw() needs a live frame; the no-op path is the gpu.is_none()
        // early return, which is what is_finalized reflects.
    }

    #[test]
    fn release_is_idempotent() {
        let mut shape = Shape::new();
        shape.release();
        shape.release();
        assert!(!shape.is_finalized());
    }

    #[test]
    fn fan_triangulation_of_a_triangle_is_identity_sized() {
        let ring: Vec<f32> = (0..3 * FLOATS_PER_VERTEX).map(|i| i as f32).collect();
        let out = triangulate_fan(&ring);
        assert_eq!(out.len(), 3 * FLOATS_PER_VERTEX);
        assert_eq!(out, ring);
    }

    #[test]
    fn fan_triangulation_expands_a_quad_to_two_triangles() {
        let ring: Vec<f32> = (0..4 * FLOATS_PER_VERTEX).map(|i| i as f32).collect();
        let out = triangulate_fan(&ring);
        assert_eq!(out.len(), 6 * FLOATS_PER_VERTEX);
        // Second triangle is v0, v2, v3.
        let v0 = &ring[0..FLOATS_PER_VERTEX];
        let v2 = &ring[2 * FLOATS_PER_VERTEX..3 * FLOATS_PER_VERTEX];
        let v3 = &ring[3 * FLOATS_PER_VERTEX..4 * FLOATS_PER_VERTEX];
        assert_eq!(&out[3 * FLOATS_PER_VERTEX..4 * FLOATS_PER_VERTEX], v0);
        assert_eq!(&out[4 * FLOATS_PER_VERTEX..5 * FLOATS_PER_VERTEX], v2);
        assert_eq!(&out[5 * FLOATS_PER_VERTEX..6 * FLOATS_PER_VERTEX], v3);
    }

    #[test]
    fn fan_triangulation_rejects_degenerate_input() {
        let ring: Vec<f32> = (0..2 * FLOATS_PER_VERTEX).map(|i| i as f32).collect();
        assert!(triangulate_fan(&ring).is_empty());
    }
}
