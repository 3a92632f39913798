use std::f32::consts::TAU;
use std::path::PathBuf;

use winit::keyboard::KeyCode;

use crate::audio::{AudioOutput, Oscillator};
#[cfg(feature = "video")]
use crate::gpu::blit::TextureBlit;
use crate::gpu::{GpuContext, Shape, ShapeMode};
#[cfg(feature = "video")]
use crate::media::Movie;
use crate::sketch::{DrawFrame, Sketch, SketchConfig};

/// Bundled demo: a wheel of triangles, a re-recordable polygon, optional
/// movie playback (first CLI argument), and a sine tone on the default
/// audio output.
pub struct DemoSketch {
    movie_path: Option<PathBuf>,
    wheel: Shape,
    polygon: Shape,
    /// 3..=9, cycled with the P key; the polygon is re-recorded on change.
    polygon_sides: u32,
    polygon_dirty: bool,
    #[cfg(feature = "video")]
    movie: Option<Movie>,
    #[cfg(feature = "video")]
    movie_blit: Option<TextureBlit>,
    audio: Option<AudioOutput>,
}

impl DemoSketch {
    pub fn new(movie_path: Option<PathBuf>) -> Self {
        Self {
            movie_path,
            wheel: Shape::new(),
            polygon: Shape::new(),
            polygon_sides: 6,
            polygon_dirty: false,
            #[cfg(feature = "video")]
            movie: None,
            #[cfg(feature = "video")]
            movie_blit: None,
            audio: None,
        }
    }

    fn record_polygon(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        let (cx, cy, radius) = (700.0, 430.0, 150.0);
        let sides = self.polygon_sides;
        self.polygon.begin_shape(ShapeMode::Polygon);
        for i in 0..sides {
            let a = i as f32 / sides as f32 * TAU;
            let t = i as f32 / sides as f32;
            self.polygon.vertex(
                cx + a.cos() * radius,
                cy + a.sin() * radius,
                0.0,
                0.2 + 0.8 * t,
                0.3,
                1.0 - 0.7 * t,
            );
        }
        self.polygon.end_shape(device, format);
        if let Some(err) = self.polygon.shader_error() {
            log::error!("polygon shape is undrawable: {err}");
        }
    }
}

impl Sketch for DemoSketch {
    fn config(&self) -> SketchConfig {
        SketchConfig {
            title: "skizze demo".into(),
            background: wgpu::Color {
                r: 0.02,
                g: 0.02,
                b: 0.03,
                a: 1.0,
            },
            ..SketchConfig::default()
        }
    }

    fn setup(&mut self, gpu: &GpuContext) {
        // Wheel of 12 colored triangles around a white hub.
        const WEDGES: u32 = 12;
        let (cx, cy, radius) = (330.0, 330.0, 200.0);
        self.wheel.begin_shape(ShapeMode::Triangles);
        for i in 0..WEDGES {
            let a0 = i as f32 / WEDGES as f32 * TAU;
            let a1 = (i + 1) as f32 / WEDGES as f32 * TAU;
            let t = i as f32 / WEDGES as f32;
            self.wheel.vertex(cx, cy, 0.0, 1.0, 1.0, 1.0);
            self.wheel
                .vertex(cx + a0.cos() * radius, cy + a0.sin() * radius, 0.0, t, 1.0 - t, 0.4);
            self.wheel
                .vertex(cx + a1.cos() * radius, cy + a1.sin() * radius, 0.0, t, 1.0 - t, 0.8);
        }
        self.wheel.end_shape(&gpu.device, gpu.format);
        if let Some(err) = self.wheel.shader_error() {
            log::error!("wheel shape is undrawable: {err}");
        }
        log::info!("wheel recorded: {} vertices", self.wheel.vertex_count());

        self.record_polygon(&gpu.device, gpu.format);

        #[cfg(feature = "video")]
        if let Some(path) = self.movie_path.clone() {
            match Movie::open(&gpu.device, &path, -1) {
                Ok(movie) => {
                    log::info!(
                        "movie: {}x{}, {} channels",
                        movie.width(),
                        movie.height(),
                        movie.channels()
                    );
                    self.movie_blit = Some(TextureBlit::new(&gpu.device, gpu.format, &movie.texture));
                    self.movie = Some(movie);
                }
                Err(e) => log::error!("could not open movie: {e}"),
            }
        }
        #[cfg(not(feature = "video"))]
        if self.movie_path.is_some() {
            log::warn!("movie playback requested but video support was compiled out");
        }

        match AudioOutput::new(|sample_rate| {
            let mut osc = Oscillator::new(sample_rate);
            osc.frequency = 220.0;
            osc.amplitude = 0.2;
            move |block: &mut [f32], channels: usize| osc.fill(block, channels)
        }) {
            Ok(output) => {
                log::info!(
                    "tone on {} at {}Hz, {} channels",
                    output.device_name,
                    output.sample_rate,
                    output.channels
                );
                self.audio = Some(output);
            }
            Err(e) => log::warn!("audio output unavailable: {e}"),
        }
    }

    fn draw(&mut self, frame: &mut DrawFrame<'_>) {
        if frame.frame_count > 0 && frame.frame_count % 600 == 0 {
            log::debug!(
                "t={:.1}s dt={:.2}ms mouse=({:.0},{:.0})",
                frame.time,
                frame.delta_time * 1000.0,
                frame.mouse_x,
                frame.mouse_y
            );
        }

        if self.polygon_dirty {
            self.polygon_dirty = false;
            self.record_polygon(frame.device, frame.format);
        }

        #[cfg(feature = "video")]
        if let Some(movie) = &mut self.movie {
            if movie.available() {
                movie.read(frame.queue);
            }
            if let Some(blit) = &self.movie_blit {
                blit.draw(frame);
            }
        }

        self.wheel.draw(frame);
        self.polygon.draw(frame);
    }

    fn key_pressed(&mut self, key: KeyCode) {
        match key {
            KeyCode::KeyP => {
                self.polygon_sides = if self.polygon_sides >= 9 {
                    3
                } else {
                    self.polygon_sides + 1
                };
                self.polygon_dirty = true;
            }
            KeyCode::KeyI => {
                log::info!(
                    "wheel: {} vertices, finalized={}, recording={}, misuse={}",
                    self.wheel.vertex_count(),
                    self.wheel.is_finalized(),
                    self.wheel.is_recording(),
                    self.wheel.misuse_count()
                );
            }
            _ => {}
        }
    }

    fn finish(&mut self) {
        #[cfg(feature = "video")]
        if let Some(movie) = &self.movie {
            log::info!("movie frames decoded: {}", movie.frames_decoded());
        }
        if self.audio.take().is_some() {
            log::info!("audio output stopped");
        }
        self.wheel.release();
        self.polygon.release();
        log::info!("demo shutting down");
    }
}
