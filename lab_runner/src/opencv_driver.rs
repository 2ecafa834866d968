// Capture drivers backed by OpenCV's `videoio`. The runner tries the
// platform's native backend first and falls back to whatever backend OpenCV
// picks on its own.

use frame_lab::core_modules::capture::CaptureDriver;
use frame_lab::{CaptureError, Frame};
use opencv::{core, prelude::*, videoio};
use tracing::{debug, warn};

#[cfg(target_os = "linux")]
const NATIVE_BACKEND: (&str, i32) = ("opencv-v4l2", videoio::CAP_V4L2);
#[cfg(target_os = "windows")]
const NATIVE_BACKEND: (&str, i32) = ("opencv-dshow", videoio::CAP_DSHOW);
#[cfg(target_os = "macos")]
const NATIVE_BACKEND: (&str, i32) = ("opencv-avfoundation", videoio::CAP_AVFOUNDATION);
#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
const NATIVE_BACKEND: (&str, i32) = ("opencv-native", videoio::CAP_ANY);

pub struct OpenCvCamera {
    name: &'static str,
    device: i32,
    backend: i32,
    capture: Option<videoio::VideoCapture>,
    mat: Mat,
}

impl OpenCvCamera {
    pub fn native(device: i32) -> Self {
        Self::with_backend(NATIVE_BACKEND.0, device, NATIVE_BACKEND.1)
    }

    pub fn generic(device: i32) -> Self {
        Self::with_backend("opencv-any", device, videoio::CAP_ANY)
    }

    fn with_backend(name: &'static str, device: i32, backend: i32) -> Self {
        Self {
            name,
            device,
            backend,
            capture: None,
            mat: Mat::default(),
        }
    }

    fn grab_failed(&self, reason: impl ToString) -> CaptureError {
        CaptureError::GrabFailed {
            driver: self.name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Native backend first, then the generic one.
pub fn camera_drivers(device: i32) -> Vec<Box<dyn CaptureDriver>> {
    vec![Box::new(OpenCvCamera::native(device)), Box::new(OpenCvCamera::generic(device))]
}

impl CaptureDriver for OpenCvCamera {
    fn name(&self) -> &str {
        self.name
    }

    fn open(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        let open_failed = |reason: String| CaptureError::OpenFailed {
            driver: self.name.to_string(),
            reason,
        };
        let mut capture = videoio::VideoCapture::new(self.device, self.backend).map_err(|e| open_failed(e.to_string()))?;
        if !capture.is_opened().map_err(|e| open_failed(e.to_string()))? {
            return Err(open_failed(format!("device {} did not open", self.device)));
        }
        // Drivers are free to ignore the requested size; frames report their own.
        for (prop, value) in [(videoio::CAP_PROP_FRAME_WIDTH, width), (videoio::CAP_PROP_FRAME_HEIGHT, height)] {
            if let Err(error) = capture.set(prop, value as f64) {
                debug!(driver = self.name, %error, "capture size request rejected");
            }
        }
        self.capture = Some(capture);
        Ok(())
    }

    fn grab(&mut self, frame: &mut Frame) -> Result<(), CaptureError> {
        let capture = self.capture.as_mut().ok_or(CaptureError::NotOpen)?;
        match capture.read(&mut self.mat) {
            Ok(true) if !self.mat.empty() => {}
            Ok(_) => return Err(self.grab_failed("no frame delivered")),
            Err(error) => return Err(self.grab_failed(error)),
        }
        if self.mat.typ() != core::CV_8UC3 {
            return Err(self.grab_failed(format!("unsupported pixel type {}", self.mat.typ())));
        }
        let (width, height) = (self.mat.cols() as u32, self.mat.rows() as u32);
        let bytes = self.mat.data_bytes().map_err(|e| self.grab_failed(e))?;
        frame
            .refill_from_bgr(width, height, bytes)
            .map_err(|e| self.grab_failed(e))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(error) = capture.release() {
                warn!(driver = self.name, %error, "capture release failed");
            }
        }
    }
}
