//! Interactive fluid simulator.
//!
//! Drag with the left mouse button to push the fluid and drop dye.
//!
//! # Keys
//! - V: toggle velocity/density view
//! - Up/Down: time step
//! - Right/Left: force intensity
//! - ]/[: force radius
//! - =/-: diffusion rate
//! - R: reset fields and controls
//! - Q/Escape: exit

use anyhow::{anyhow, Result};
use clap::Parser;
use fluid_sim::{
    capture::{save_frame_as_png, OffscreenTarget, CAPTURE_FORMAT},
    gpu::GpuContext,
    gpu_executor::GpuExecutor,
    kernel::DensityPattern,
    params::{self, ControlAction, Controls, RenderMode},
    FrameDriver, Instrumented,
};
use glam::Vec2;
use std::{path::PathBuf, sync::Arc};
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "fluid_sim")]
#[command(about = "GPU stable-fluids simulator driven by the mouse")]
struct Args {
    /// Window (and simulation grid) width in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), default_value = "800")]
    width: u32,

    /// Window (and simulation grid) height in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), default_value = "600")]
    height: u32,

    /// Initial time step per frame
    #[arg(long, default_value_t = params::DEFAULT_TIME_STEP)]
    time_step: f32,

    /// Initial diffusion rate; 0 disables the diffusion solves
    #[arg(long, default_value_t = params::DEFAULT_DIFFUSE)]
    diffuse: f32,

    /// Initial force radius in cells
    #[arg(long, default_value_t = params::DEFAULT_FORCE_RADIUS)]
    force_radius: f32,

    /// Initial force intensity
    #[arg(long, default_value_t = params::DEFAULT_FORCE_INTENSITY)]
    force_intensity: f32,

    /// Field drawn to the window
    #[arg(long, value_enum, default_value_t = RenderMode::Density)]
    render_mode: RenderMode,

    /// Starting dye distribution
    #[arg(long, value_enum, default_value_t = DensityPattern::Blob)]
    initial_density: DensityPattern,

    /// Run this many steps offscreen with a scripted stroke, then exit
    #[arg(long)]
    headless: Option<u32>,

    /// Save the last headless frame to this PNG file
    #[arg(long, requires = "headless")]
    save_frame: Option<PathBuf>,

    /// Log the pass counts of every frame at info level
    #[arg(long)]
    trace_passes: bool,
}

impl Args {
    fn controls(&self) -> Controls {
        Controls {
            time_step: self.time_step,
            diffuse: self.diffuse,
            force_rad: self.force_radius,
            force_intensity: self.force_intensity,
            render_mode: self.render_mode,
        }
    }
}

type Executor = Instrumented<GpuExecutor>;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(steps) = args.headless {
        return run_headless(&args, steps);
    }
    run_interactive(args)
}

fn run_interactive(args: Args) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Fluid Simulation")
            .with_inner_size(winit::dpi::PhysicalSize::new(args.width, args.height))
            .build(&event_loop)?,
    );

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let surface = instance.create_surface(window.clone())?;
    let gpu = Arc::new(pollster::block_on(GpuContext::with_instance(instance, Some(&surface)))?);

    let capabilities = surface.get_capabilities(&gpu.adapter);
    let format = capabilities
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| capabilities.formats.first().copied())
        .ok_or_else(|| anyhow!("surface reports no supported formats"))?;

    let size = window.inner_size();
    let (width, height) = if size.width > 0 && size.height > 0 {
        (size.width, size.height)
    } else {
        (args.width, args.height)
    };
    let mut config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&gpu.device, &config);

    let mut exec: Executor = Instrumented::new(pollster::block_on(GpuExecutor::new(gpu.clone(), format))?);
    let mut driver = FrameDriver::new(&mut exec, width, height, args.initial_density, args.controls())?;
    let trace_passes = args.trace_passes;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::AboutToWait => window.request_redraw(),
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    if new_size.width > 0 && new_size.height > 0 {
                        config.width = new_size.width;
                        config.height = new_size.height;
                        surface.configure(&gpu.device, &config);
                    }
                    if let Err(e) = driver.resize(&mut exec, new_size.width, new_size.height) {
                        fail(elwt, e.into());
                    }
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => driver.input_mut().pointer_pressed(state == ElementState::Pressed),
                WindowEvent::CursorMoved { position, .. } => {
                    driver
                        .input_mut()
                        .pointer_moved(Vec2::new(position.x as f32, position.y as f32));
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => match code {
                    KeyCode::KeyQ | KeyCode::Escape => elwt.exit(),
                    code => {
                        if let Some(action) = control_for_key(code) {
                            if let Err(e) = driver.apply(&mut exec, action) {
                                fail(elwt, e.into());
                            }
                        }
                    }
                },
                WindowEvent::RedrawRequested => {
                    if let Err(e) = handle_redraw(&surface, &gpu, &config, &mut driver, &mut exec, trace_passes) {
                        fail(elwt, e);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    })?;

    Ok(())
}

fn fail(elwt: &EventLoopWindowTarget<()>, error: anyhow::Error) {
    log::error!("{:#}", error);
    elwt.exit();
}

fn control_for_key(code: KeyCode) -> Option<ControlAction> {
    let action = match code {
        KeyCode::KeyV => ControlAction::ToggleRenderMode,
        KeyCode::ArrowUp => ControlAction::IncreaseTimeStep,
        KeyCode::ArrowDown => ControlAction::DecreaseTimeStep,
        KeyCode::ArrowRight => ControlAction::IncreaseForceIntensity,
        KeyCode::ArrowLeft => ControlAction::DecreaseForceIntensity,
        KeyCode::BracketRight => ControlAction::IncreaseForceRadius,
        KeyCode::BracketLeft => ControlAction::DecreaseForceRadius,
        KeyCode::Equal => ControlAction::IncreaseDiffuse,
        KeyCode::Minus => ControlAction::DecreaseDiffuse,
        KeyCode::KeyR => ControlAction::Reset,
        _ => return None,
    };
    Some(action)
}

fn handle_redraw(
    surface: &wgpu::Surface<'_>,
    gpu: &GpuContext,
    config: &wgpu::SurfaceConfiguration,
    driver: &mut FrameDriver<Executor>,
    exec: &mut Executor,
    trace_passes: bool,
) -> Result<()> {
    let output = match surface.get_current_texture() {
        Ok(output) => output,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            log::warn!("surface lost, reconfiguring");
            surface.configure(&gpu.device, config);
            return Ok(());
        }
        Err(wgpu::SurfaceError::OutOfMemory) => return Err(anyhow!("surface out of memory")),
        Err(e) => {
            log::warn!("skipping frame: {:?}", e);
            return Ok(());
        }
    };
    let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

    driver.frame(exec, &view)?;
    output.present();
    report_passes(driver.frame_count(), exec, trace_passes);
    Ok(())
}

fn report_passes(frame: u64, exec: &mut Executor, trace_passes: bool) {
    let summary = exec.summary();
    let total: usize = summary.values().sum();
    if trace_passes {
        log::info!("frame {}: {} passes {:?}", frame, total, summary);
    } else {
        log::debug!("frame {}: {} passes", frame, total);
    }
    exec.take_records();
}

fn run_headless(args: &Args, steps: u32) -> Result<()> {
    println!("Running {} steps headless at {}x{}", steps, args.width, args.height);

    let gpu = Arc::new(pollster::block_on(GpuContext::new())?);
    let mut exec: Executor = Instrumented::new(pollster::block_on(GpuExecutor::new(gpu.clone(), CAPTURE_FORMAT))?);
    let mut driver = FrameDriver::new(&mut exec, args.width, args.height, args.initial_density, args.controls())?;
    let target = OffscreenTarget::new(&gpu, args.width, args.height);

    let center = Vec2::new(args.width as f32, args.height as f32) * 0.5;
    let radius = args.width.min(args.height) as f32 * 0.25;
    driver.input_mut().pointer_pressed(true);

    let mut passes = 0;
    for step in 0..steps {
        let angle = step as f32 * 0.1;
        driver
            .input_mut()
            .pointer_moved(center + radius * Vec2::new(angle.cos(), angle.sin()));
        driver.frame(&mut exec, &target.view)?;
        passes += exec.take_records().len();

        if (step + 1) % 30 == 0 {
            println!("Step {} of {}", step + 1, steps);
        }
    }
    println!("Finished {} steps, {} passes", steps, passes);

    if let Some(path) = &args.save_frame {
        let rgba = target.capture(&gpu)?;
        save_frame_as_png(path, &rgba, target.width, target.height)?;
        println!("Frame saved to {}", path.display());
    }
    Ok(())
}
