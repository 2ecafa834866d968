// THEORY:
// A `Region` is the output of one region-detection pass: a maximal, connected set
// of pixel coordinates whose colors all resemble the reference color. Like the
// frame it came from, a region is a "dumb" data container. It is recomputed from
// scratch every pass and has no memory of earlier frames.
//
// Besides the raw coordinate list it caches the bounding box and centroid, which
// is what consumers (the flier, the presentation layer) mostly ask for.

use crate::core_modules::frame::frame::PixelCoord;
use std::collections::HashSet;

/// One connected component of matching pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Every pixel in the region, in the order the flood fill reached them.
    points: Vec<PixelCoord>,
    /// Membership index for `contains`.
    lookup: HashSet<PixelCoord>,
    /// Top-left and bottom-right corners, inclusive.
    bounding_box: (PixelCoord, PixelCoord),
    /// Mean (row, column) of all points.
    centroid: (f64, f64),
}

impl Region {
    /// Builds a region from the coordinates a flood fill collected.
    /// Returns `None` for an empty point list.
    pub fn from_points(points: Vec<PixelCoord>) -> Option<Self> {
        let first = *points.first()?;
        let mut min = first;
        let mut max = first;
        let mut sum_row = 0.0;
        let mut sum_col = 0.0;
        for p in &points {
            min.row = min.row.min(p.row);
            min.col = min.col.min(p.col);
            max.row = max.row.max(p.row);
            max.col = max.col.max(p.col);
            sum_row += p.row as f64;
            sum_col += p.col as f64;
        }
        let n = points.len() as f64;
        let lookup = points.iter().copied().collect();
        Some(Self {
            lookup,
            bounding_box: (min, max),
            centroid: (sum_row / n, sum_col / n),
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PixelCoord] {
        &self.points
    }

    pub fn contains(&self, coord: PixelCoord) -> bool {
        self.lookup.contains(&coord)
    }

    pub fn bounding_box(&self) -> (PixelCoord, PixelCoord) {
        self.bounding_box
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.centroid
    }
}
