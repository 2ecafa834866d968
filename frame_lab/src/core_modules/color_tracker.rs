// THEORY:
// The color tracker follows a single color through the video. Each frame it
// scans every pixel, measures the squared RGB distance to the current
// `TrackColor`, and reports the coordinate of the closest one.
//
// Key principles:
// 1.  **Global minimum, stable ties**: the comparison is a strict `<`, so among
//     equally close pixels the first one met in row-major order wins.
// 2.  **User-selected reference**: the reference color starts unset and is only
//     ever changed by an explicit selection (a pointer press sampling the
//     frame). It persists until the next selection.
// 3.  **No frame, no result**: an empty frame yields `None` and leaves the last
//     reported point untouched.

use crate::core_modules::frame::frame::{Frame, PixelCoord};
use crate::core_modules::pixel::pixel::Pixel;
use tracing::debug;

/// Returns the coordinate of the pixel closest in color to `color`.
pub fn track(frame: &Frame, color: Pixel) -> Option<PixelCoord> {
    let mut best: Option<(PixelCoord, u32)> = None;
    for (coord, pixel) in frame.enumerate() {
        let distance = pixel.distance_squared(&color);
        match best {
            Some((_, closest)) if distance >= closest => {}
            _ => best = Some((coord, distance)),
        }
    }
    best.map(|(coord, _)| coord)
}

/// Holds the tracked color and the most recent match.
#[derive(Debug, Clone, Default)]
pub struct ColorTracker {
    track_color: Option<Pixel>,
    last_point: Option<PixelCoord>,
}

impl ColorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(color: Pixel) -> Self {
        Self {
            track_color: Some(color),
            last_point: None,
        }
    }

    pub fn track_color(&self) -> Option<Pixel> {
        self.track_color
    }

    pub fn set_track_color(&mut self, color: Pixel) {
        self.track_color = Some(color);
    }

    /// Sets the tracked color to whatever the frame shows at (x, y). Coordinates
    /// outside the frame are clamped to its edge. Returns the selected color, or
    /// `None` when there is no frame to sample.
    pub fn select_color(&mut self, frame: &Frame, x: i64, y: i64) -> Option<Pixel> {
        let color = frame.get_clamped(y, x)?;
        debug!(?color, x, y, "track color selected");
        self.track_color = Some(color);
        Some(color)
    }

    pub fn last_point(&self) -> Option<PixelCoord> {
        self.last_point
    }

    /// Runs one tracking pass. Without a track color or a frame this is a no-op.
    pub fn update(&mut self, frame: &Frame) -> Option<PixelCoord> {
        let color = self.track_color?;
        let point = track(frame, color)?;
        self.last_point = Some(point);
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_frame_tracks_the_origin() {
        let color = Pixel::new(12, 34, 56);
        let frame = Frame::filled(7, 5, color);
        assert_eq!(track(&frame, color), Some(PixelCoord::new(0, 0)));
    }

    #[test]
    fn closest_pixel_wins_and_ties_go_to_scan_order() {
        let mut frame = Frame::filled(4, 4, Pixel::BLACK);
        let target = Pixel::new(250, 0, 0);
        frame.set(2, 3, Pixel::new(240, 0, 0));
        frame.set(1, 2, Pixel::new(200, 0, 0));
        assert_eq!(track(&frame, target), Some(PixelCoord::new(2, 3)));

        frame.set(3, 0, Pixel::new(240, 0, 0));
        frame.set(0, 3, Pixel::new(240, 0, 0));
        assert_eq!(track(&frame, target), Some(PixelCoord::new(0, 3)));
    }

    #[test]
    fn result_is_no_farther_than_any_other_pixel() {
        let pixels: Vec<Pixel> = (0..64u32)
            .map(|i| Pixel::new((i * 37 % 256) as u8, (i * 91 % 256) as u8, (i * 13 % 256) as u8))
            .collect();
        let frame = Frame::from_pixels(8, 8, pixels).expect("sized buffer");
        let target = Pixel::new(100, 150, 20);

        let best = track(&frame, target).expect("non-empty frame");
        let best_distance = frame.at(best).expect("in bounds").distance_squared(&target);
        for (coord, pixel) in frame.enumerate() {
            let d = pixel.distance_squared(&target);
            assert!(best_distance <= d);
            if d == best_distance {
                assert!(best <= coord);
            }
        }
    }

    #[test]
    fn empty_frame_has_no_result() {
        assert_eq!(track(&Frame::empty(), Pixel::WHITE), None);
        let mut tracker = ColorTracker::with_color(Pixel::WHITE);
        assert_eq!(tracker.update(&Frame::empty()), None);
        assert_eq!(tracker.last_point(), None);
    }

    #[test]
    fn selection_samples_the_frame_with_clamping() {
        let mut frame = Frame::new(3, 3);
        frame.set(2, 2, Pixel::new(1, 2, 3));
        let mut tracker = ColorTracker::new();
        assert_eq!(tracker.update(&frame), None);

        assert_eq!(tracker.select_color(&frame, 40, 40), Some(Pixel::new(1, 2, 3)));
        assert_eq!(tracker.update(&frame), Some(PixelCoord::new(2, 2)));
        assert_eq!(tracker.select_color(&Frame::empty(), 0, 0), None);
        assert_eq!(tracker.track_color(), Some(Pixel::new(1, 2, 3)));
    }
}
