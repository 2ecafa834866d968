// THEORY:
// A `Frame` is the unit every other component reads and writes: a row-major grid
// of `Pixel`s with the origin at the top-left, addressed as (row, column).
//
// Key principles:
// 1.  **Mutable in place**: analyses such as background substitution and region
//     recoloring rewrite the frame they are handed. Nothing copies implicitly;
//     a caller that needs a stable snapshot calls `clone()`.
// 2.  **Reusable storage**: `refill_from_bgr` overwrites the existing pixel
//     vector, so the capture manager can grab into the same allocation frame
//     after frame.
// 3.  **Explicit bounds policy**: `get` and `set` turn out-of-bounds access into
//     `None` / a no-op, while `get_clamped` snaps a (possibly stale or negative)
//     pointer coordinate onto the nearest edge pixel. No access ever panics.
// 4.  **Empty is a normal state**: a 0x0 frame stands for "capture never
//     produced anything" and every frame-dependent routine checks `is_empty`.

pub mod frame {
    use crate::core_modules::pixel::pixel::{Byte, CHANNELS, Pixel};
    use crate::error::{LabError, Result};
    use image::RgbImage;
    use std::path::Path;

    /// A (row, column) location inside a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct PixelCoord {
        pub row: u32,
        pub col: u32,
    }

    impl PixelCoord {
        pub const fn new(row: u32, col: u32) -> Self {
            Self { row, col }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Default)]
    pub struct Frame {
        width: u32,
        height: u32,
        pixels: Vec<Pixel>,
    }

    impl Frame {
        /// An all-black frame.
        pub fn new(width: u32, height: u32) -> Self {
            Self::filled(width, height, Pixel::BLACK)
        }

        pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
            Self {
                width,
                height,
                pixels: vec![pixel; (width as usize) * (height as usize)],
            }
        }

        /// The frame that stands in for "no capture yet".
        pub fn empty() -> Self {
            Self::default()
        }

        pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self> {
            let expected = (width as usize) * (height as usize);
            if pixels.len() != expected {
                return Err(LabError::InvalidBuffer {
                    width,
                    height,
                    expected,
                    actual: pixels.len(),
                });
            }
            Ok(Self {
                width,
                height,
                pixels,
            })
        }

        pub fn from_bgr_bytes(width: u32, height: u32, bytes: &[Byte]) -> Result<Self> {
            let mut frame = Self::empty();
            frame.refill_from_bgr(width, height, bytes)?;
            Ok(frame)
        }

        /// Overwrites this frame with packed BGR bytes, reusing the pixel storage.
        pub fn refill_from_bgr(&mut self, width: u32, height: u32, bytes: &[Byte]) -> Result<()> {
            let expected = (width as usize) * (height as usize);
            if bytes.len() != expected * CHANNELS {
                return Err(LabError::InvalidBuffer {
                    width,
                    height,
                    expected: expected * CHANNELS,
                    actual: bytes.len(),
                });
            }
            self.pixels.clear();
            self.pixels.extend(
                bytes
                    .chunks_exact(CHANNELS)
                    .map(|bgr| Pixel::new(bgr[2], bgr[1], bgr[0])),
            );
            self.width = width;
            self.height = height;
            Ok(())
        }

        /// Writes the frame as packed BGR bytes into `out`, which must be exactly
        /// `width * height * 3` long.
        pub fn write_bgr_bytes(&self, out: &mut [Byte]) -> Result<()> {
            if out.len() != self.pixels.len() * CHANNELS {
                return Err(LabError::InvalidBuffer {
                    width: self.width,
                    height: self.height,
                    expected: self.pixels.len() * CHANNELS,
                    actual: out.len(),
                });
            }
            for (dst, pixel) in out.chunks_exact_mut(CHANNELS).zip(&self.pixels) {
                dst.copy_from_slice(&pixel.to_bgr());
            }
            Ok(())
        }

        pub fn from_rgb_image(image: &RgbImage) -> Self {
            Self {
                width: image.width(),
                height: image.height(),
                pixels: image.pixels().map(|p| Pixel::from(*p)).collect(),
            }
        }

        pub fn to_rgb_image(&self) -> RgbImage {
            RgbImage::from_fn(self.width, self.height, |x, y| {
                self.pixels[self.index(y, x)].into()
            })
        }

        /// Loads a still image from disk. There is no fallback: callers treat an
        /// error here as fatal for the exercise that needed the image.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
            let image = image::open(path.as_ref())?.to_rgb8();
            Ok(Self::from_rgb_image(&image))
        }

        /// Writes the frame to `path` as a PNG.
        pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
            self.to_rgb_image()
                .save_with_format(path.as_ref(), image::ImageFormat::Png)?;
            Ok(())
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn rows(&self) -> u32 {
            self.height
        }

        pub fn cols(&self) -> u32 {
            self.width
        }

        pub fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        pub fn is_empty(&self) -> bool {
            self.pixels.is_empty()
        }

        pub fn same_dimensions(&self, other: &Frame) -> bool {
            self.dimensions() == other.dimensions()
        }

        pub fn len(&self) -> usize {
            self.pixels.len()
        }

        pub fn pixels(&self) -> &[Pixel] {
            &self.pixels
        }

        pub fn pixels_mut(&mut self) -> &mut [Pixel] {
            &mut self.pixels
        }

        #[inline]
        fn index(&self, row: u32, col: u32) -> usize {
            (row as usize) * (self.width as usize) + col as usize
        }

        pub fn in_bounds(&self, row: u32, col: u32) -> bool {
            row < self.height && col < self.width
        }

        pub fn get(&self, row: u32, col: u32) -> Option<&Pixel> {
            if self.in_bounds(row, col) {
                Some(&self.pixels[self.index(row, col)])
            } else {
                None
            }
        }

        pub fn at(&self, coord: PixelCoord) -> Option<&Pixel> {
            self.get(coord.row, coord.col)
        }

        /// Samples the pixel nearest to (row, col), clamping both coordinates into
        /// the frame. `None` only for an empty frame.
        pub fn get_clamped(&self, row: i64, col: i64) -> Option<Pixel> {
            let coord = self.clamp_coord(row, col)?;
            self.at(coord).copied()
        }

        pub fn clamp_coord(&self, row: i64, col: i64) -> Option<PixelCoord> {
            if self.is_empty() {
                return None;
            }
            let row = row.clamp(0, self.height as i64 - 1) as u32;
            let col = col.clamp(0, self.width as i64 - 1) as u32;
            Some(PixelCoord::new(row, col))
        }

        /// Writes a pixel; out-of-bounds writes are ignored and reported as `false`.
        pub fn set(&mut self, row: u32, col: u32, pixel: Pixel) -> bool {
            if !self.in_bounds(row, col) {
                return false;
            }
            let index = self.index(row, col);
            self.pixels[index] = pixel;
            true
        }

        /// Iterates every pixel with its coordinate, in row-major order.
        pub fn enumerate(&self) -> impl Iterator<Item = (PixelCoord, &Pixel)> + '_ {
            let width = self.width.max(1);
            self.pixels.iter().enumerate().map(move |(i, p)| {
                let i = i as u32;
                (PixelCoord::new(i / width, i % width), p)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::frame::*;
    use crate::core_modules::pixel::pixel::Pixel;

    #[test]
    fn out_of_bounds_access_is_a_no_op() {
        let mut frame = Frame::filled(3, 2, Pixel::WHITE);
        assert!(frame.get(2, 0).is_none());
        assert!(frame.get(0, 3).is_none());
        assert!(!frame.set(5, 5, Pixel::BLACK));
        assert!(frame.pixels().iter().all(|p| *p == Pixel::WHITE));
    }

    #[test]
    fn clamped_sampling_snaps_to_the_nearest_edge() {
        let mut frame = Frame::new(4, 4);
        frame.set(3, 3, Pixel::new(9, 9, 9));
        frame.set(0, 0, Pixel::new(1, 1, 1));
        assert_eq!(frame.get_clamped(100, 100), Some(Pixel::new(9, 9, 9)));
        assert_eq!(frame.get_clamped(-7, -1), Some(Pixel::new(1, 1, 1)));
        assert_eq!(Frame::empty().get_clamped(0, 0), None);
    }

    #[test]
    fn bgr_refill_reuses_storage_and_swaps_channels() {
        let mut frame = Frame::new(2, 1);
        frame
            .refill_from_bgr(2, 1, &[1, 2, 3, 4, 5, 6])
            .expect("buffer sized for 2x1");
        assert_eq!(frame.get(0, 0), Some(&Pixel::new(3, 2, 1)));
        assert_eq!(frame.get(0, 1), Some(&Pixel::new(6, 5, 4)));

        let mut out = vec![0u8; 6];
        frame.write_bgr_bytes(&mut out).expect("output sized for 2x1");
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
        assert!(frame.refill_from_bgr(2, 2, &[0; 6]).is_err());
    }

    #[test]
    fn from_pixels_rejects_wrong_length() {
        assert!(Frame::from_pixels(2, 2, vec![Pixel::BLACK; 3]).is_err());
        assert!(Frame::from_pixels(2, 2, vec![Pixel::BLACK; 4]).is_ok());
    }

    #[test]
    fn enumerate_walks_in_row_major_order() {
        let frame = Frame::new(2, 2);
        let coords: Vec<PixelCoord> = frame.enumerate().map(|(c, _)| c).collect();
        assert_eq!(
            coords,
            vec![
                PixelCoord::new(0, 0),
                PixelCoord::new(0, 1),
                PixelCoord::new(1, 0),
                PixelCoord::new(1, 1)
            ]
        );
    }

    #[test]
    fn rgb_image_uses_x_for_columns() {
        let mut frame = Frame::new(3, 2);
        frame.set(1, 2, Pixel::new(7, 8, 9));
        let image = frame.to_rgb_image();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [7, 8, 9]);
        assert_eq!(Frame::from_rgb_image(&image), frame);
    }

    #[test]
    fn snapshot_round_trips_through_png() {
        let mut frame = Frame::filled(5, 3, Pixel::new(10, 20, 30));
        frame.set(2, 4, Pixel::new(200, 100, 50));
        let path = std::env::temp_dir().join(format!("frame_lab_snapshot_{}.png", std::process::id()));

        frame.save_snapshot(&path).expect("Error Saving File.");
        let loaded = Frame::load(&path).expect("Error Loading File.");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, frame);
    }

    #[test]
    fn loading_a_missing_image_is_an_error() {
        assert!(Frame::load("/definitely/not/here.png").is_err());
    }
}
