// THEORY:
// Background substitution swaps the static part of the scene for a replacement
// image ("scenery"). The user first captures a reference frame of the empty
// scene; afterwards every pixel of a live frame that still looks like the
// reference is replaced by the scenery pixel at the same coordinate.
//
// "Looks like" means the squared RGB distance to the reference is strictly below
// the threshold. Pixels at or above it are foreground and stay untouched.
//
// A pass is all or nothing: without a reference, with an empty frame, or with
// mismatched dimensions the frame is left exactly as it was.

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::pixel::pixel::DistanceSquared;
use crate::error::{LabError, Result};
use tracing::{info, warn};

pub const DEFAULT_THRESHOLD: DistanceSquared = 250;

/// What a substitution pass did to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// No reference has been captured yet; frame unchanged.
    NoReference,
    /// Nothing to process; frame unchanged.
    NoFrame,
    /// The pass ran and replaced this many pixels.
    Applied { replaced: usize },
}

#[derive(Debug, Clone)]
pub struct BackgroundSubtractor {
    reference: Option<Frame>,
    scenery: Frame,
    threshold: DistanceSquared,
}

impl BackgroundSubtractor {
    pub fn new(scenery: Frame, threshold: DistanceSquared) -> Self {
        Self {
            reference: None,
            scenery,
            threshold,
        }
    }

    pub fn threshold(&self) -> DistanceSquared {
        self.threshold
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference(&self) -> Option<&Frame> {
        self.reference.as_ref()
    }

    /// Stores a copy of `frame` as the background reference, replacing any earlier
    /// one. An empty frame is ignored.
    pub fn capture_reference(&mut self, frame: &Frame) -> bool {
        if frame.is_empty() {
            return false;
        }
        if !frame.same_dimensions(&self.scenery) {
            warn!(
                frame = ?frame.dimensions(),
                scenery = ?self.scenery.dimensions(),
                "background reference does not match scenery size"
            );
        }
        self.reference = Some(frame.clone());
        info!("background reference captured");
        true
    }

    pub fn clear_reference(&mut self) {
        self.reference = None;
    }

    /// Replaces every pixel of `frame` that is within the threshold of the
    /// reference with the matching scenery pixel.
    pub fn apply(&self, frame: &mut Frame) -> Result<Substitution> {
        let Some(reference) = &self.reference else {
            return Ok(Substitution::NoReference);
        };
        if frame.is_empty() {
            return Ok(Substitution::NoFrame);
        }
        if !frame.same_dimensions(reference) {
            return Err(LabError::DimensionMismatch {
                what: "background reference",
                expected: reference.dimensions(),
                actual: frame.dimensions(),
            });
        }
        if !frame.same_dimensions(&self.scenery) {
            return Err(LabError::DimensionMismatch {
                what: "scenery",
                expected: self.scenery.dimensions(),
                actual: frame.dimensions(),
            });
        }

        let mut replaced = 0;
        let live = frame.pixels_mut().iter_mut();
        for ((pixel, background), scenery) in live
            .zip(reference.pixels())
            .zip(self.scenery.pixels())
        {
            if pixel.distance_squared(background) < self.threshold {
                *pixel = *scenery;
                replaced += 1;
            }
        }
        Ok(Substitution::Applied { replaced })
    }
}
