mod app;
mod audio;
mod demo;
mod gpu;
mod media;
mod settings;
mod sketch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use app::App;
use demo::DemoSketch;
use settings::Settings;
use sketch::{Sketch, SketchConfig};

/// Winit host around a sketch: owns the window, dispatches events into the
/// sketch callbacks, and drives the per-frame render.
struct SketchHost<S: Sketch> {
    sketch: S,
    config: SketchConfig,
    settings: Settings,
    app: Option<App>,
    window: Option<Arc<Window>>,
    finished: bool,
}

impl<S: Sketch> SketchHost<S> {
    fn new(sketch: S) -> Self {
        let mut config = sketch.config();
        let settings = Settings::load();
        // A previously saved window size wins over the sketch default.
        if settings.width > 0 && settings.height > 0 {
            config.width = settings.width;
            config.height = settings.height;
        }
        Self {
            sketch,
            config,
            settings,
            app: None,
            window: None,
            finished: false,
        }
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        if !self.finished {
            self.finished = true;
            if let Some(app) = &self.app {
                self.settings.width = app.gpu.width();
                self.settings.height = app.gpu.height();
                self.settings.save();
            }
            self.sketch.finish();
        }
        event_loop.exit();
    }
}

impl<S: Sketch> ApplicationHandler for SketchHost<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("Failed to create window"),
        );
        self.window = Some(window.clone());

        match App::new(window, &self.config) {
            Ok(app) => {
                self.sketch.setup(&app.gpu);
                self.app = Some(app);
                log::info!("sketch initialized");
            }
            Err(e) => {
                log::error!("Failed to initialize app: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = self.app.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                self.shut_down(event_loop);
            }
            WindowEvent::Resized(size) => {
                app.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if key == KeyCode::Escape {
                    self.shut_down(event_loop);
                } else {
                    self.sketch.key_pressed(key);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                app.set_mouse(position.x as f32, position.y as f32);
                self.sketch
                    .mouse_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => {
                self.sketch.mouse_pressed(button);
            }
            WindowEvent::RedrawRequested => {
                match app.render(&mut self.sketch) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let w = app.gpu.width();
                        let h = app.gpu.height();
                        app.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {e}");
                    }
                }
                app.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Run a sketch to completion on this thread.
fn run(sketch: impl Sketch) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut host = SketchHost::new(sketch);
    event_loop.run_app(&mut host)?;

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let movie_path = std::env::args().nth(1).map(PathBuf::from);
    run(DemoSketch::new(movie_path))
}
