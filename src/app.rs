//! The windowed demo: one window, one presentation, keyboard and wheel
//! control.

use crate::assets::AssetLoader;
use crate::config::StrataConfig;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::input::{Command, Input};
use crate::pipeline::layout::Viewport;
use crate::presentation::Presentation;
use crate::scene::sections::load_sections;
use crate::tunables::Tunable;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

/// Open a window and run the presentation until it is closed.
///
/// # Errors
///
/// Any startup failure: window, GPU, section list, or texture loading.
pub fn run(config: StrataConfig) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = StrataApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        StrataApp::Failed(error) => Err(error),
        _ => Ok(()),
    }
}

enum StrataApp {
    Pending {
        config: StrataConfig,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        presentation: Presentation,
        input: Input,
        selected: Tunable,
        start_time: Instant,
    },
    Failed(Error),
}

impl StrataApp {
    fn start(config: &StrataConfig, event_loop: &ActiveEventLoop) -> Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;

        let sections = load_sections(config.assets.sections_path())?;
        let size = window.inner_size();
        let viewport = Viewport::from_physical(size.width, size.height, window.scale_factor());

        let mut presentation = Presentation::new(&gpu, sections, viewport, config.tunables)?
            .with_shadows(config.shadows);
        let loader = AssetLoader::new(&config.assets);
        presentation.load(&gpu, &loader)?;
        if !presentation.animate_in() {
            log::error!("scenes reported loaded but are not ready");
        }

        window.request_redraw();
        Ok(StrataApp::Running {
            window,
            gpu,
            presentation,
            input: Input::new(),
            selected: Tunable::Threshold,
            start_time: Instant::now(),
        })
    }
}

impl ApplicationHandler for StrataApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let StrataApp::Pending { config } = self else {
            return;
        };
        *self = match Self::start(config, event_loop) {
            Ok(running) => running,
            Err(e) => {
                log::error!("startup failed: {e}");
                event_loop.exit();
                StrataApp::Failed(e)
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let StrataApp::Running {
            window,
            gpu,
            presentation,
            input,
            selected,
            start_time,
        } = self
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                let viewport =
                    Viewport::from_physical(size.width, size.height, window.scale_factor());
                presentation.resize(gpu, viewport);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = window.inner_size();
                presentation.resize(
                    gpu,
                    Viewport::from_physical(size.width, size.height, scale_factor),
                );
            }
            WindowEvent::RedrawRequested => {
                for command in input.commands() {
                    apply(command, presentation, selected);
                }
                input.begin_frame();

                let time = start_time.elapsed().as_secs_f32();
                if let Err(e) = presentation.frame(gpu, time) {
                    log::error!("frame failed: {e}");
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}

fn apply(command: Command, presentation: &mut Presentation, selected: &mut Tunable) {
    match command {
        Command::Scroll(delta) => presentation.scroll_by(delta),
        Command::Step(steps) => presentation.step_section(steps),
        Command::First => presentation.set_scroll(0.0),
        Command::Last => presentation.set_scroll(presentation.sections().len() as f32),
        Command::Select(tunable) => {
            *selected = tunable;
            let value = presentation.tunables().get(tunable);
            log::info!("selected {tunable} ({value:.2})");
        }
        Command::Nudge(steps) => {
            let value = presentation.tunables_mut().nudge(*selected, steps);
            log::info!("{selected} = {value:.2}");
        }
    }
}
