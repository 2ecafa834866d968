// THEORY:
// The `pipeline` module is the top-level per-frame API of the frame lab. It
// strings the analysis components together behind one call so the capture
// worker (or a test) can hand over a frame and get back everything a
// presentation layer needs to draw.
//
// Per frame, in order, each stage skipped when its precondition is unmet:
// 1.  Background substitution (needs a scenery image and a captured reference).
// 2.  Color tracking (needs a track color and `track_enabled`).
// 3.  Region detection (needs a track color and `regions_enabled`), optionally
//     recoloring the regions in the frame.
//
// Pointer interactions are applied between frames against the raw captured
// frame: a press either selects the track color or captures the background
// reference, a move only updates the hover location that is reported back for
// display.

use crate::config::{ClickAction, LabConfig};
use crate::core_modules::background::{BackgroundSubtractor, Substitution};
use crate::core_modules::color_tracker::ColorTracker;
use crate::core_modules::frame::frame::{Frame, PixelCoord};
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::region::Region;
use crate::core_modules::region_detector::region_detector;
use crate::error::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Input events forwarded from the presentation layer, in frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    PointerDown { x: i64, y: i64 },
    PointerMove { x: i64, y: i64 },
    /// Forget the background reference so substitution stops until the next
    /// capture.
    ClearBackground,
    /// Write the next processed frame to this path.
    SaveSnapshot(PathBuf),
}

/// Everything produced for one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_id: u64,
    /// The processed frame. Owned, so it stays stable after publication.
    pub frame: Frame,
    pub tracked_point: Option<PixelCoord>,
    pub regions: Vec<Region>,
    pub track_color: Option<Pixel>,
    pub substitution: Option<Substitution>,
    /// Hover location (clamped into the frame) and the pixel shown there.
    pub hover: Option<(PixelCoord, Pixel)>,
}

pub struct LabPipeline {
    config: LabConfig,
    tracker: ColorTracker,
    subtractor: Option<BackgroundSubtractor>,
    hover: Option<(i64, i64)>,
    pending_snapshot: Option<PathBuf>,
    rng: StdRng,
    frame_count: u64,
}

impl LabPipeline {
    /// `scenery` enables background substitution when present.
    pub fn new(config: LabConfig, scenery: Option<Frame>) -> Self {
        let subtractor = scenery.map(|s| BackgroundSubtractor::new(s, config.background_threshold));
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            tracker: ColorTracker::new(),
            subtractor,
            hover: None,
            pending_snapshot: None,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn track_color(&self) -> Option<Pixel> {
        self.tracker.track_color()
    }

    pub fn set_track_color(&mut self, color: Pixel) {
        self.tracker.set_track_color(color);
    }

    pub fn has_background(&self) -> bool {
        self.subtractor.as_ref().is_some_and(|s| s.has_reference())
    }

    /// Applies one interaction against the raw frame it refers to.
    pub fn interact(&mut self, interaction: Interaction, frame: &Frame) {
        match interaction {
            Interaction::PointerDown { x, y } => match self.config.click_action {
                ClickAction::SelectColor => {
                    if let Some(color) = self.tracker.select_color(frame, x, y) {
                        info!(?color, "track color set");
                    }
                }
                ClickAction::CaptureBackground => match &mut self.subtractor {
                    Some(subtractor) => {
                        subtractor.capture_reference(frame);
                    }
                    None => warn!("background capture requested without a scenery image"),
                },
            },
            Interaction::PointerMove { x, y } => self.hover = Some((x, y)),
            Interaction::ClearBackground => {
                if let Some(subtractor) = &mut self.subtractor {
                    subtractor.clear_reference();
                    info!("background reference cleared");
                }
            }
            Interaction::SaveSnapshot(path) => self.pending_snapshot = Some(path),
        }
    }

    /// Runs the enabled analyses over `frame` and reports the results.
    pub fn process(&mut self, mut frame: Frame) -> FrameReport {
        self.frame_count += 1;

        let substitution = self.subtractor.as_ref().and_then(|s| match s.apply(&mut frame) {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                warn!(%error, "background substitution skipped");
                None
            }
        });

        let tracked_point = if self.config.track_enabled {
            self.tracker.update(&frame)
        } else {
            None
        };

        let regions = match (self.config.regions_enabled, self.tracker.track_color()) {
            (true, Some(color)) => {
                let regions = region_detector::find_regions(
                    &frame,
                    color,
                    self.config.tolerance,
                    self.config.min_region_size,
                );
                if self.config.recolor_regions {
                    region_detector::recolor_regions(&mut frame, &regions, &mut self.rng);
                }
                regions
            }
            _ => Vec::new(),
        };

        let hover = self.hover.and_then(|(x, y)| {
            let coord = frame.clamp_coord(y, x)?;
            Some((coord, *frame.at(coord)?))
        });

        if let Some(path) = self.pending_snapshot.take() {
            if let Err(error) = self.save(&frame, &path) {
                warn!(%error, path = %path.display(), "snapshot failed");
            }
        }

        debug!(
            frame = self.frame_count,
            regions = regions.len(),
            tracked = ?tracked_point,
            "frame processed"
        );

        FrameReport {
            frame_id: self.frame_count,
            frame,
            tracked_point,
            regions,
            track_color: self.tracker.track_color(),
            substitution,
            hover,
        }
    }

    fn save(&self, frame: &Frame, path: &Path) -> Result<()> {
        frame.save_snapshot(path)?;
        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}
