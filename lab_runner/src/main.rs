mod display;
mod opencv_driver;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use frame_lab::core_modules::agent::Bounds;
use frame_lab::core_modules::capture::CaptureDriver;
use frame_lab::core_modules::flier::{Flier, FlierStatus};
use frame_lab::core_modules::region_detector::region_detector;
use frame_lab::core_modules::simulation::{ColorSampling, Population, Simulation, TickPolicy};
use frame_lab::{
    AgentCommand, CaptureHandle, CaptureSourceManager, CaptureState, ClickAction, Frame, FrameSource, Interaction, LabConfig,
    LabPipeline, Pixel, SimulationConfig, SimulationHandle, SyntheticCamera, spawn_capture_worker, spawn_simulation,
};
use opencv::{highgui, prelude::*};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const WINDOW: &str = "frame lab";
const FLIER_SPEED: f64 = 6.0;
const FLIER_RADIUS: f64 = 6.0;
const PAINT_RADIUS: f64 = 10.0;
const PAINT_SPEED: u32 = 10;
const ANIMATION_SPACING: f64 = 3.0;
const ANIMATION_MOVES_PER_TICK: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Follow the pixel closest to a clicked color.
    Track,
    /// Outline and recolor connected regions of a clicked color.
    Regions,
    /// Click to store the background, then replace it with the scenery image.
    Background,
    /// Catch fliers with anything of the clicked color.
    Catch,
    /// Bouncing agents paint a still image onto a blank canvas.
    Painting,
    /// A still image turned into wandering agents; click to grow them.
    Animated,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive frame lab", long_about = None)]
struct Cli {
    #[arg(value_enum)]
    mode: Mode,

    /// Camera index.
    #[arg(long, default_value_t = 0)]
    device: i32,

    #[arg(long, default_value_t = 300)]
    width: u32,

    #[arg(long, default_value_t = 300)]
    height: u32,

    /// Replacement background for `background` mode.
    #[arg(long)]
    scenery: Option<PathBuf>,

    /// Still image for `painting` and `animated` modes.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Per-channel tolerance for region membership.
    #[arg(long, default_value_t = 20)]
    tolerance: u8,

    #[arg(long, default_value_t = 50)]
    min_region: usize,

    /// Squared RGB distance below which a pixel counts as background.
    #[arg(long, default_value_t = 250)]
    bg_threshold: u32,

    /// Agent count for `painting` mode.
    #[arg(long, default_value_t = 100)]
    agents: usize,

    /// Use a simulated camera instead of a real device.
    #[arg(long)]
    synthetic: bool,

    /// Where `s` writes a snapshot of the current view.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Debug, Clone, Copy)]
enum Pointer {
    Down(i32, i32),
    Move(i32, i32),
    /// Right button.
    Clear,
}

fn main() -> Result<()> {
    // --- 1. Logging & Argument Parsing ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    // --- 2. Runtime & Window ---
    // HighGUI wants the main thread, so the main thread stays outside the
    // runtime and only enters it to spawn and to await shutdowns.
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let _guard = runtime.enter();
    highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)?;
    let pointer = install_pointer()?;

    // --- 3. Mode Dispatch ---
    let outcome = match cli.mode {
        Mode::Track | Mode::Regions | Mode::Background | Mode::Catch => run_capture(&cli, &runtime, pointer),
        Mode::Painting | Mode::Animated => run_agents(&cli, &runtime, pointer),
    };
    highgui::destroy_all_windows()?;
    outcome
}

fn install_pointer() -> Result<mpsc::UnboundedReceiver<Pointer>> {
    let (tx, rx) = mpsc::unbounded_channel();
    highgui::set_mouse_callback(
        WINDOW,
        Some(Box::new(move |event, x, y, _flags| {
            let pointer = match event {
                highgui::EVENT_LBUTTONDOWN => Pointer::Down(x, y),
                highgui::EVENT_MOUSEMOVE => Pointer::Move(x, y),
                highgui::EVENT_RBUTTONDOWN => Pointer::Clear,
                _ => return,
            };
            let _ = tx.send(pointer);
        })),
    )?;
    Ok(rx)
}

fn lab_config(cli: &Cli) -> LabConfig {
    let mut config = LabConfig {
        width: cli.width,
        height: cli.height,
        tolerance: cli.tolerance,
        min_region_size: cli.min_region,
        background_threshold: cli.bg_threshold,
        seed: cli.seed,
        ..LabConfig::default()
    };
    match cli.mode {
        Mode::Track => {}
        Mode::Regions | Mode::Catch => {
            config.track_enabled = false;
            config.regions_enabled = true;
            config.recolor_regions = true;
        }
        Mode::Background => {
            config.track_enabled = false;
            config.click_action = ClickAction::CaptureBackground;
        }
        Mode::Painting | Mode::Animated => {}
    }
    config
}

fn load_image(path: &Path) -> Result<Frame> {
    Frame::load(path).with_context(|| format!("failed to load image {}", path.display()))
}

/// A red square sliding across a grey room, for running without a camera.
fn synthetic_drivers(config: &LabConfig) -> Vec<Box<dyn CaptureDriver>> {
    let (width, height) = (config.width.max(1), config.height.max(1));
    let side = (width.min(height) / 5).max(1);
    let top = (height - side) / 2;
    let frames = (0..width.saturating_sub(side).max(1))
        .step_by(4)
        .map(|left| {
            let mut frame = Frame::filled(width, height, Pixel::new(90, 90, 90));
            for row in top..top + side {
                for col in left..left + side {
                    frame.set(row, col, Pixel::new(210, 30, 30));
                }
            }
            frame
        })
        .collect();
    vec![Box::new(SyntheticCamera::scripted(frames))]
}

/// Shows `mat` and polls the keyboard. Returns the key pressed, if any.
fn present(mat: &Mat) -> Result<Option<char>> {
    if !mat.empty() {
        highgui::imshow(WINDOW, mat)?;
    }
    let key = highgui::wait_key(10)?;
    Ok(u8::try_from(key).ok().map(char::from))
}

fn is_quit(key: Option<char>) -> bool {
    matches!(key, Some('q') | Some('\u{1b}'))
}

fn run_capture(cli: &Cli, runtime: &Runtime, pointer: mpsc::UnboundedReceiver<Pointer>) -> Result<()> {
    // --- 4. Capture & Pipeline Initialization ---
    let config = lab_config(cli);
    let scenery = match (cli.mode, &cli.scenery) {
        (Mode::Background, Some(path)) => Some(load_image(path)?),
        (Mode::Background, None) => bail!("background mode needs --scenery"),
        _ => None,
    };
    let drivers = if cli.synthetic {
        synthetic_drivers(&config)
    } else {
        opencv_driver::camera_drivers(cli.device)
    };
    let manager = CaptureSourceManager::new(drivers, config.pacing);
    let handle = spawn_capture_worker(manager, LabPipeline::new(config.clone(), scenery));

    // Shut down on every exit path, display errors included.
    let outcome = present_capture(cli, &config, &handle, pointer);
    runtime.block_on(handle.shutdown());
    outcome
}

fn present_capture(
    cli: &Cli,
    config: &LabConfig,
    handle: &CaptureHandle,
    mut pointer: mpsc::UnboundedReceiver<Pointer>,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut flier: Option<Flier> = None;
    let mut caught = 0u32;
    let mut last_frame_id = 0;

    // --- 5. Presentation Loop ---
    loop {
        while let Ok(event) = pointer.try_recv() {
            let interaction = match event {
                Pointer::Down(x, y) => Interaction::PointerDown { x: x as i64, y: y as i64 },
                Pointer::Move(x, y) => Interaction::PointerMove { x: x as i64, y: y as i64 },
                Pointer::Clear => Interaction::ClearBackground,
            };
            handle.send(interaction);
        }

        let Some(report) = handle.latest() else {
            let mut idle = display::to_mat(&Frame::new(config.width, config.height))?;
            let caption = match handle.state() {
                CaptureState::Disabled => "capture unavailable",
                _ => "waiting for camera",
            };
            display::draw_caption(&mut idle, caption)?;
            if is_quit(present(&idle)?) {
                break;
            }
            continue;
        };

        let mut mat = display::to_mat(&report.frame)?;
        if let (Some(point), Some(color)) = (report.tracked_point, report.track_color) {
            display::draw_tracked(&mut mat, point, color)?;
        }
        if let Some(color) = report.track_color {
            display::draw_regions(&mut mat, &report.regions, color)?;
        }

        let caption = if cli.mode == Mode::Catch {
            if report.frame_id != last_frame_id && report.track_color.is_some() {
                let bounds = Bounds::of_frame(&report.frame);
                let current = flier.get_or_insert_with(|| Flier::launch(bounds, FLIER_SPEED, FLIER_RADIUS, &mut rng));
                match current.advance(bounds, &report.regions) {
                    FlierStatus::Caught => {
                        caught += 1;
                        info!(caught, "flier caught");
                        flier = None;
                    }
                    FlierStatus::Escaped => flier = None,
                    FlierStatus::Flying => {}
                }
            }
            if let Some(current) = &flier {
                display::draw_flier(&mut mat, current)?;
            }
            Some(format!("caught {caught}"))
        } else if cli.mode == Mode::Regions && report.track_color.is_some() {
            let largest = region_detector::largest_region(&report.regions).map_or(0, |r| r.len());
            Some(format!("{} regions, largest {largest} px", report.regions.len()))
        } else {
            report.hover.map(display::hover_caption)
        };
        if let Some(caption) = caption {
            display::draw_caption(&mut mat, &caption)?;
        }
        last_frame_id = report.frame_id;

        let key = present(&mat)?;
        if is_quit(key) {
            break;
        }
        if let (Some('s'), Some(path)) = (key, &cli.snapshot) {
            handle.send(Interaction::SaveSnapshot(path.clone()));
        }
    }
    Ok(())
}

fn run_agents(cli: &Cli, runtime: &Runtime, pointer: mpsc::UnboundedReceiver<Pointer>) -> Result<()> {
    // --- 4. Image & Simulation Initialization ---
    let Some(path) = &cli.image else {
        bail!("{:?} mode needs --image", cli.mode);
    };
    let image = load_image(path)?;
    if image.is_empty() {
        bail!("image {} has no pixels", path.display());
    }

    let painting = cli.mode == Mode::Painting;
    let config = if painting {
        SimulationConfig {
            bounds: Bounds::of_frame(&image),
            sampling: ColorSampling::BeforeMove,
            seed: cli.seed,
            ..SimulationConfig::default()
        }
    } else {
        SimulationConfig {
            bounds: Bounds::new(
                image.width() as f64 * ANIMATION_SPACING,
                image.height() as f64 * ANIMATION_SPACING,
            ),
            tick_policy: TickPolicy::RandomSubset(ANIMATION_MOVES_PER_TICK),
            interval: Duration::from_millis(30),
            seed: cli.seed,
            ..SimulationConfig::default()
        }
    };
    let simulation = if painting {
        Simulation::scattered(
            cli.agents,
            config.bounds,
            PAINT_RADIUS,
            Population::Bouncers { speed: PAINT_SPEED },
            config.tick_policy,
            config.sampling,
            config.seed,
        )
    } else {
        Simulation::from_image(&image, ANIMATION_SPACING, config.tick_policy, config.seed)
    };
    info!(agents = simulation.agents().len(), mode = ?cli.mode, "simulation ready");
    let handle = spawn_simulation(simulation, &config, FrameSource::Still(Arc::new(image)), painting);
    let blank = Frame::new(config.bounds.width as u32, config.bounds.height as u32);

    let outcome = present_agents(cli, painting, &blank, &handle, pointer);
    runtime.block_on(handle.shutdown());
    outcome
}

fn present_agents(
    cli: &Cli,
    painting: bool,
    blank: &Frame,
    handle: &SimulationHandle,
    mut pointer: mpsc::UnboundedReceiver<Pointer>,
) -> Result<()> {
    // --- 5. Presentation Loop ---
    loop {
        while let Ok(event) = pointer.try_recv() {
            if let Pointer::Down(x, y) = event {
                handle.send(AgentCommand::PointerDown { x: x as f64, y: y as f64 });
            }
        }

        let snapshot = handle.latest();
        let view = match (&snapshot.canvas, painting) {
            (Some(canvas), true) => canvas,
            _ => blank,
        };
        // Canvas (or blank scene) first, agents on top.
        let mut mat = display::to_mat(view)?;
        display::draw_agents(&mut mat, &snapshot.agents)?;

        let key = present(&mat)?;
        if is_quit(key) {
            break;
        }
        if let (Some('s'), true, Some(path)) = (key, painting, &cli.snapshot) {
            match view.save_snapshot(path) {
                Ok(()) => info!(path = %path.display(), "snapshot saved"),
                Err(error) => warn!(%error, "snapshot failed"),
            }
        }
    }
    Ok(())
}
