// THEORY:
// The `CaptureSourceManager` is the only component that talks to a video device.
// It owns an ordered list of `CaptureDriver`s (for example a platform-native
// backend first, then a generic one) and a single reusable `Frame`.
//
// Key architectural principles:
// 1.  **Ordered fallback**: `start` walks the driver list once. A driver counts
//     as started only if it opens *and* delivers a first frame. A driver that
//     fails is released before the next one is tried. If every driver fails the
//     manager is `Disabled` for the rest of the run; `start` is never retried.
// 2.  **No copy on read**: `grab_frame` refills the manager's frame in place and
//     lends it out. The next grab overwrites it, so callers clone if they keep it.
// 3.  **Single release**: `stop` releases the active driver exactly once and
//     moves to `Stopped`; from then on no frame is ever returned.
// 4.  **Cooperative pacing**: the manager only carries the inter-frame delay.
//     The worker loop that drives it sleeps off the remainder of each interval.

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::CaptureError;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// One way of talking to a capture device.
pub trait CaptureDriver: Send {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Opens the device, asking for `width` x `height` frames.
    fn open(&mut self, width: u32, height: u32) -> Result<(), CaptureError>;

    /// Blocks until the next frame is available and writes it into `frame`.
    fn grab(&mut self, frame: &mut Frame) -> Result<(), CaptureError>;

    /// Releases the device. Must tolerate being called on a driver that only
    /// partially opened.
    fn release(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    /// `start` has not run yet.
    Idle,
    /// Frames are flowing from the named driver.
    Active { driver: String },
    /// Every driver failed; no frame will ever be produced.
    Disabled,
    /// The device was released by `stop`.
    Stopped,
}

pub struct CaptureSourceManager {
    pending: Vec<Box<dyn CaptureDriver>>,
    active: Option<Box<dyn CaptureDriver>>,
    state: CaptureState,
    frame: Frame,
    pacing: Duration,
}

impl CaptureSourceManager {
    pub fn new(drivers: Vec<Box<dyn CaptureDriver>>, pacing: Duration) -> Self {
        Self {
            pending: drivers,
            active: None,
            state: CaptureState::Idle,
            frame: Frame::empty(),
            pacing,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CaptureState::Active { .. })
    }

    /// Tries each driver in order until one opens and produces a first frame.
    /// Only the first call does anything; later calls return the current state.
    pub fn start(&mut self, width: u32, height: u32) -> &CaptureState {
        if self.state != CaptureState::Idle {
            return &self.state;
        }

        for mut driver in std::mem::take(&mut self.pending) {
            let attempt = driver
                .open(width, height)
                .and_then(|()| driver.grab(&mut self.frame));
            match attempt {
                Ok(()) => {
                    info!(driver = driver.name(), width, height, "capture started");
                    self.state = CaptureState::Active {
                        driver: driver.name().to_string(),
                    };
                    self.active = Some(driver);
                    return &self.state;
                }
                Err(error) => {
                    warn!(driver = driver.name(), %error, "capture driver failed, trying next");
                    driver.release();
                }
            }
        }

        warn!("no capture driver could be started; capture disabled");
        self.frame = Frame::empty();
        self.state = CaptureState::Disabled;
        &self.state
    }

    /// Blocks for the next frame and lends out the manager's internal frame.
    /// `None` unless capture is active and the grab succeeded.
    pub fn grab_frame(&mut self) -> Option<&Frame> {
        let driver = self.active.as_mut()?;
        match driver.grab(&mut self.frame) {
            Ok(()) => Some(&self.frame),
            Err(error) => {
                debug!(%error, "frame grab failed");
                None
            }
        }
    }

    /// The most recently grabbed frame, if capture is active.
    pub fn current_frame(&self) -> Option<&Frame> {
        match (&self.active, self.frame.is_empty()) {
            (Some(_), false) => Some(&self.frame),
            _ => None,
        }
    }

    /// Releases the device. Safe to call more than once; only the first call on
    /// an active manager touches the driver.
    pub fn stop(&mut self) {
        if let Some(mut driver) = self.active.take() {
            driver.release();
            info!(driver = driver.name(), "capture stopped");
        }
        self.pending.clear();
        if self.state != CaptureState::Disabled {
            self.state = CaptureState::Stopped;
        }
    }
}

impl Drop for CaptureSourceManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A simulated camera. It serves a scripted sequence of frames (looping
/// forever) or a single solid color, and can be told to fail on open.
pub struct SyntheticCamera {
    name: String,
    script: VecDeque<Frame>,
    fill: Pixel,
    fail_open: bool,
    opened: Option<(u32, u32)>,
}

impl SyntheticCamera {
    pub fn solid(fill: Pixel) -> Self {
        Self {
            name: "synthetic".to_string(),
            script: VecDeque::new(),
            fill,
            fail_open: false,
            opened: None,
        }
    }

    /// Plays `frames` in order, then starts over.
    pub fn scripted(frames: Vec<Frame>) -> Self {
        Self {
            script: frames.into(),
            ..Self::solid(Pixel::BLACK)
        }
    }

    /// A driver whose `open` always fails.
    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::solid(Pixel::BLACK)
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl CaptureDriver for SyntheticCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        if self.fail_open {
            return Err(CaptureError::OpenFailed {
                driver: self.name.clone(),
                reason: "simulated device unavailable".to_string(),
            });
        }
        self.opened = Some((width, height));
        Ok(())
    }

    fn grab(&mut self, frame: &mut Frame) -> Result<(), CaptureError> {
        let (width, height) = self.opened.ok_or(CaptureError::NotOpen)?;
        match self.script.pop_front() {
            Some(next) => {
                frame.clone_from(&next);
                self.script.push_back(next);
            }
            None => {
                if frame.dimensions() == (width, height) {
                    frame.pixels_mut().fill(self.fill);
                } else {
                    *frame = Frame::filled(width, height, self.fill);
                }
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.opened = None;
    }
}
