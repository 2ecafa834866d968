// THEORY:
// Tunables for the frame lab, grouped the way they are consumed: `LabConfig`
// drives the capture worker and the per-frame analysis pipeline,
// `SimulationConfig` drives the agent ticker. Both are plain structs with public
// fields and sensible defaults; binaries fill them from command-line flags.

use crate::core_modules::agent::Bounds;
use crate::core_modules::background::DEFAULT_THRESHOLD;
use crate::core_modules::capture::DEFAULT_PACING;
use crate::core_modules::pixel::pixel::{DistanceSquared, Tolerance};
use crate::core_modules::simulation::{ColorSampling, TickPolicy};
use std::time::Duration;

/// What a pointer press on the video does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Sample the pressed pixel as the new track color.
    SelectColor,
    /// Store the current frame as the background reference.
    CaptureBackground,
}

/// Configuration for the capture worker and the `LabPipeline`.
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// Requested capture width in pixels.
    pub width: u32,
    /// Requested capture height in pixels.
    pub height: u32,
    /// Fixed delay between frame acquisitions.
    pub pacing: Duration,
    /// Per-channel tolerance for region membership.
    pub tolerance: Tolerance,
    /// Regions smaller than this many pixels are discarded.
    pub min_region_size: usize,
    /// Squared RGB distance below which a pixel counts as background.
    pub background_threshold: DistanceSquared,
    /// Report the single pixel closest to the track color.
    pub track_enabled: bool,
    /// Report connected regions of the track color.
    pub regions_enabled: bool,
    /// Paint detected regions a random color in the published frame.
    pub recolor_regions: bool,
    pub click_action: ClickAction,
    /// Seed for region recoloring.
    pub seed: u64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            pacing: DEFAULT_PACING,
            tolerance: 20,
            min_region_size: 50,
            background_threshold: DEFAULT_THRESHOLD,
            track_enabled: true,
            regions_enabled: false,
            recolor_regions: false,
            click_action: ClickAction::SelectColor,
            seed: 0,
        }
    }
}

/// Configuration for the agent ticker.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub bounds: Bounds,
    pub interval: Duration,
    pub tick_policy: TickPolicy,
    pub sampling: ColorSampling,
    /// Factor applied to the radius of agents hit by a pointer press.
    pub grow_factor: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(800.0, 600.0),
            interval: Duration::from_millis(100),
            tick_policy: TickPolicy::All,
            sampling: ColorSampling::Off,
            grow_factor: 2.0,
            seed: 0,
        }
    }
}
