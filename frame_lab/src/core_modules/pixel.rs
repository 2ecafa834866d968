// THEORY:
// The `Pixel` module is the smallest unit of the frame lab. It is a "dumb" data
// container for one three-channel color plus the handful of single-pixel
// comparisons the analysis layers need.
//
// Two different notions of "similar color" live here on purpose, because the
// layers above disagree about which one to use:
// - `within_tolerance`: every channel independently within `d` of the other.
//   This is the box-shaped test the region detector grows regions with.
// - `distance_squared`: summed squared channel difference (Euclidean distance
//   without the square root). The color tracker and background subtractor
//   compare against thresholds in this space.
//
// Capture devices hand us BGR byte triples while the `image` crate speaks RGB,
// so conversions for both orders are provided.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Tolerance = u8;
    pub type DistanceSquared = u32;

    pub const CHANNELS: usize = 3;

    /// A single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub const BLACK: Pixel = Pixel::new(0, 0, 0);
        pub const WHITE: Pixel = Pixel::new(255, 255, 255);

        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Builds a pixel from a BGR byte triple, the layout OpenCV uses.
        pub fn from_bgr(bytes: &[Byte]) -> Option<Self> {
            match bytes {
                [b, g, r, ..] => Some(Pixel::new(*r, *g, *b)),
                _ => None,
            }
        }

        pub fn to_bgr(self) -> [Byte; CHANNELS] {
            [self.blue, self.green, self.red]
        }

        pub fn to_rgb(self) -> [Byte; CHANNELS] {
            [self.red, self.green, self.blue]
        }

        /// True if every channel differs from `other` by at most `tolerance`.
        pub fn within_tolerance(&self, other: &Pixel, tolerance: Tolerance) -> bool {
            self.red.abs_diff(other.red) <= tolerance
                && self.green.abs_diff(other.green) <= tolerance
                && self.blue.abs_diff(other.blue) <= tolerance
        }

        /// Squared Euclidean distance in RGB space, summed over all three channels.
        pub fn distance_squared(&self, other: &Pixel) -> DistanceSquared {
            let dr = self.red.abs_diff(other.red) as DistanceSquared;
            let dg = self.green.abs_diff(other.green) as DistanceSquared;
            let db = self.blue.abs_diff(other.blue) as DistanceSquared;
            dr * dr + dg * dg + db * db
        }

        /// The complementary color, used to outline markers drawn in this color.
        pub fn inverse(&self) -> Pixel {
            Pixel::new(255 - self.red, 255 - self.green, 255 - self.blue)
        }
    }

    impl From<image::Rgb<u8>> for Pixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            let [red, green, blue] = rgb.0;
            Pixel::new(red, green, blue)
        }
    }

    impl From<Pixel> for image::Rgb<u8> {
        fn from(pixel: Pixel) -> Self {
            image::Rgb(pixel.to_rgb())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn tolerance_is_checked_per_channel() {
        let reference = Pixel::new(100, 100, 100);
        assert!(Pixel::new(120, 80, 100).within_tolerance(&reference, 20));
        assert!(!Pixel::new(121, 100, 100).within_tolerance(&reference, 20));
        // Far in Euclidean terms, still inside the per-channel box.
        assert!(Pixel::new(120, 120, 120).within_tolerance(&reference, 20));
    }

    #[test]
    fn distance_squared_sums_all_channels() {
        let a = Pixel::new(0, 0, 0);
        let b = Pixel::new(255, 255, 255);
        assert_eq!(a.distance_squared(&b), 3 * 255 * 255);
        assert_eq!(Pixel::new(10, 20, 30).distance_squared(&Pixel::new(13, 16, 30)), 25);
    }

    #[test]
    fn bgr_bytes_round_into_rgb_fields() {
        let pixel = Pixel::from_bgr(&[1, 2, 3]).expect("three bytes");
        assert_eq!(pixel, Pixel::new(3, 2, 1));
        assert_eq!(pixel.to_bgr(), [1, 2, 3]);
        assert!(Pixel::from_bgr(&[1, 2]).is_none());
    }

    #[test]
    fn inverse_flips_every_channel() {
        assert_eq!(Pixel::new(0, 128, 255).inverse(), Pixel::new(255, 127, 0));
    }
}
