// THEORY:
// Errors are split by layer. `CaptureError` belongs to the device drivers and
// never escapes the `CaptureSourceManager`: a failed driver is logged and the
// manager falls through to the next one, or ends up `Disabled`. `LabError` is
// what the rest of the library hands back to callers (image I/O, malformed
// buffers, frames whose dimensions disagree).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture driver `{driver}` could not open device: {reason}")]
    OpenFailed { driver: String, reason: String },
    #[error("capture driver `{driver}` failed to grab a frame: {reason}")]
    GrabFailed { driver: String, reason: String },
    #[error("capture device is not open")]
    NotOpen,
}

#[derive(Debug, Error)]
pub enum LabError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pixel buffer holds {actual} values, expected {expected} for {width}x{height}")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("frame is {actual:?} but {what} is {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

pub type Result<T> = std::result::Result<T, LabError>;
