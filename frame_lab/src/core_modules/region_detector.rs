// THEORY:
// The region detector is the spatial grouping layer of the frame lab. Given a
// frame and a reference color it finds every maximal, connected patch of pixels
// whose color is close to the reference.
//
// Algorithm:
// 1.  **Matching**: a pixel matches when each of its channels is within
//     `tolerance` of the reference channel (`Pixel::within_tolerance`). This is a
//     per-channel box test, not the Euclidean distance used by the tracker.
// 2.  **Seeding**: pixels are visited in row-major order. Any matching pixel not
//     yet claimed by a region seeds a new one.
// 3.  **Region growing**: an explicit-stack flood fill claims every matching
//     8-connected neighbour. A single `visited` grid shared by all fills makes
//     the regions disjoint by construction and keeps the pass O(rows x cols).
// 4.  **Filtering**: regions with fewer than `min_size` pixels are dropped.
//
// The detector is stateless; identical inputs always produce identical output.

use crate::core_modules::frame::frame::{Frame, PixelCoord};
use crate::core_modules::pixel::pixel::{Pixel, Tolerance};
use crate::core_modules::region::Region;
use rand::Rng;

pub mod region_detector {
    use super::*;

    const NEIGHBOURS: [(i64, i64); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];

    /// Finds all connected regions of pixels within `tolerance` (per channel) of
    /// `color` that contain at least `min_size` pixels.
    pub fn find_regions(
        frame: &Frame,
        color: Pixel,
        tolerance: Tolerance,
        min_size: usize,
    ) -> Vec<Region> {
        if frame.is_empty() {
            return Vec::new();
        }

        let width = frame.cols() as usize;
        let height = frame.rows() as usize;
        let pixels = frame.pixels();
        let matches = |index: usize| pixels[index].within_tolerance(&color, tolerance);

        let mut visited = vec![false; width * height];
        let mut regions = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for seed in 0..pixels.len() {
            if visited[seed] || !matches(seed) {
                continue;
            }

            visited[seed] = true;
            stack.push(seed);
            let mut points = Vec::new();

            while let Some(current) = stack.pop() {
                let row = (current / width) as i64;
                let col = (current % width) as i64;
                points.push(PixelCoord::new(row as u32, col as u32));

                for (dr, dc) in NEIGHBOURS {
                    let nr = row + dr;
                    let nc = col + dc;
                    if nr < 0 || nc < 0 || nr >= height as i64 || nc >= width as i64 {
                        continue;
                    }
                    let neighbour = nr as usize * width + nc as usize;
                    if !visited[neighbour] && matches(neighbour) {
                        visited[neighbour] = true;
                        stack.push(neighbour);
                    }
                }
            }

            if points.len() >= min_size {
                if let Some(region) = Region::from_points(points) {
                    regions.push(region);
                }
            }
        }

        regions
    }

    /// Paints each region a random uniform color so the detections are visible
    /// in the frame itself.
    pub fn recolor_regions<R: Rng + ?Sized>(frame: &mut Frame, regions: &[Region], rng: &mut R) {
        for region in regions {
            let paint = Pixel::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
            for p in region.points() {
                frame.set(p.row, p.col, paint);
            }
        }
    }

    /// The region with the most pixels; the first one wins a tie.
    pub fn largest_region(regions: &[Region]) -> Option<&Region> {
        regions
            .iter()
            .fold(None, |best: Option<&Region>, r| match best {
                Some(b) if b.len() >= r.len() => Some(b),
                _ => Some(r),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::region_detector::*;
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    const C: Pixel = Pixel::new(200, 40, 40);

    fn noisy_frame(seed: u64, width: u32, height: u32) -> Frame {
        let mut rng = StdRng::seed_from_u64(seed);
        let pixels = (0..width * height)
            .map(|_| {
                if rng.gen_bool(0.55) {
                    Pixel::new(
                        rng.gen_range(190..=210),
                        rng.gen_range(30..=50),
                        rng.gen_range(30..=50),
                    )
                } else {
                    Pixel::new(rng.r#gen(), rng.r#gen(), rng.r#gen())
                }
            })
            .collect();
        Frame::from_pixels(width, height, pixels).expect("sized buffer")
    }

    #[test]
    fn corner_outlier_leaves_one_region_of_fifteen() {
        let mut frame = Frame::filled(4, 4, C);
        frame.set(0, 0, Pixel::new(0, 0, 0));

        for min_size in [1, 10, 15] {
            let regions = find_regions(&frame, C, 20, min_size);
            assert_eq!(regions.len(), 1);
            assert_eq!(regions[0].len(), 15);
            assert!(!regions[0].contains(PixelCoord::new(0, 0)));
        }
        assert!(find_regions(&frame, C, 20, 16).is_empty());
    }

    #[test]
    fn regions_are_disjoint_and_large_enough() {
        for seed in 0..8 {
            let frame = noisy_frame(seed, 40, 30);
            let regions = find_regions(&frame, C, 10, 4);
            let mut seen = HashSet::new();
            for region in &regions {
                assert!(region.len() >= 4);
                for p in region.points() {
                    assert!(seen.insert(*p), "coordinate {p:?} claimed twice");
                    let pixel = frame.at(*p).expect("in bounds");
                    assert!(pixel.within_tolerance(&C, 10));
                }
            }
        }
    }

    #[test]
    fn detection_is_deterministic() {
        let frame = noisy_frame(42, 32, 24);
        let first = find_regions(&frame, C, 12, 3);
        let second = find_regions(&frame, C, 12, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn diagonal_neighbours_join_one_region() {
        let mut frame = Frame::new(3, 3);
        frame.set(0, 0, C);
        frame.set(1, 1, C);
        frame.set(2, 2, C);
        let regions = find_regions(&frame, C, 0, 1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].len(), 3);
    }

    #[test]
    fn separated_patches_become_separate_regions() {
        let mut frame = Frame::new(6, 2);
        for row in 0..2 {
            frame.set(row, 0, C);
            frame.set(row, 1, C);
            frame.set(row, 4, C);
            frame.set(row, 5, C);
        }
        let regions = find_regions(&frame, C, 5, 1);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bounding_box().0, PixelCoord::new(0, 0));
        assert_eq!(regions[1].bounding_box().0, PixelCoord::new(0, 4));
    }

    #[test]
    fn empty_frame_yields_no_regions() {
        assert!(find_regions(&Frame::empty(), C, 255, 0).is_empty());
    }

    #[test]
    fn recoloring_paints_each_region_uniformly() {
        let mut frame = Frame::filled(4, 4, C);
        frame.set(0, 0, Pixel::BLACK);
        let regions = find_regions(&frame, C, 20, 1);
        let mut rng = StdRng::seed_from_u64(7);
        recolor_regions(&mut frame, &regions, &mut rng);

        let painted: HashSet<Pixel> = regions[0]
            .points()
            .iter()
            .map(|p| *frame.at(*p).expect("in bounds"))
            .collect();
        assert_eq!(painted.len(), 1);
        assert_eq!(frame.get(0, 0), Some(&Pixel::BLACK));
    }

    #[test]
    fn largest_region_prefers_the_first_on_ties() {
        let mut frame = Frame::new(5, 1);
        frame.set(0, 0, C);
        frame.set(0, 2, C);
        frame.set(0, 4, C);
        let regions = find_regions(&frame, C, 0, 1);
        let largest = largest_region(&regions).expect("three regions");
        assert!(largest.contains(PixelCoord::new(0, 0)));
        assert!(largest_region(&[]).is_none());
    }
}
