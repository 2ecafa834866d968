// THEORY:
// An `Agent` is one member of the simulated population: a colored disc with a
// position, a radius, and a movement policy. Instead of one type per kind of
// agent, the policy is a tagged `Motion` value and a single `step` routine
// dispatches on it. Adding a policy means adding a variant and a match arm.
//
// Policies:
// - `Stationary`: never moves.
// - `RandomWalk`: each axis is perturbed by `radius * 2 * (U(0,1) - 0.5)`, so a
//   wanderer drifts by at most one radius per step. It is not confined.
// - `ElasticBounce`: moves by a fixed velocity. If a coordinate leaves
//   `[radius, bound - radius]` it is clamped back onto that edge and the
//   velocity component on that axis flips sign.
//
// Agents can also read the frame underneath them: `sample_color` adopts the
// pixel at the rounded center, and `paint` copies a small block of a source
// image onto a canvas so the population gradually reveals the picture.

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::pixel::pixel::Pixel;
use rand::Rng;

/// Width and height of the area agents live in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn of_frame(frame: &Frame) -> Self {
        Self::new(frame.width() as f64, frame.height() as f64)
    }
}

/// Movement policy of a single agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Stationary,
    RandomWalk,
    ElasticBounce { dx: f64, dy: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub x: f64,
    pub y: f64,
    /// Always positive.
    pub radius: f64,
    pub color: Pixel,
    pub motion: Motion,
}

impl Agent {
    pub fn new(x: f64, y: f64, radius: f64, color: Pixel, motion: Motion) -> Self {
        debug_assert!(radius > 0.0, "agent radius must be positive");
        Self {
            x,
            y,
            radius,
            color,
            motion,
        }
    }

    /// Is (px, py) inside or on the edge of this agent?
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let dx = self.x - px;
        let dy = self.y - py;
        dx * dx + dy * dy <= self.radius * self.radius
    }

    /// Advances the agent by one tick according to its motion policy.
    pub fn step<R: Rng + ?Sized>(&mut self, bounds: Bounds, rng: &mut R) {
        match &mut self.motion {
            Motion::Stationary => {}
            Motion::RandomWalk => {
                self.x += self.radius * 2.0 * (rng.r#gen::<f64>() - 0.5);
                self.y += self.radius * 2.0 * (rng.r#gen::<f64>() - 0.5);
            }
            Motion::ElasticBounce { dx, dy } => {
                self.x += *dx;
                self.y += *dy;
                bounce_axis(&mut self.x, dx, self.radius, bounds.width);
                bounce_axis(&mut self.y, dy, self.radius, bounds.height);
            }
        }
    }

    /// The frame coordinate (row, col) under the agent's center, rounded and
    /// clamped into the frame.
    fn center_in(&self, frame: &Frame) -> Option<(i64, i64)> {
        if frame.is_empty() {
            return None;
        }
        Some((self.y.round() as i64, self.x.round() as i64))
    }

    /// Adopts the color of the frame pixel under the agent's center. No-op on an
    /// empty frame.
    pub fn sample_color(&mut self, frame: &Frame) {
        if let Some((row, col)) = self.center_in(frame) {
            if let Some(pixel) = frame.get_clamped(row, col) {
                self.color = pixel;
            }
        }
    }

    /// Copies the `radius x radius` block of `source` whose top-left corner is the
    /// agent's truncated position onto `canvas`. Rows and columns past the image
    /// edge repeat the last row/column.
    pub fn paint(&self, source: &Frame, canvas: &mut Frame) {
        if source.is_empty() || !source.same_dimensions(canvas) {
            return;
        }
        let size = self.radius.max(1.0) as i64;
        let top = self.y as i64;
        let left = self.x as i64;
        for i in 0..size {
            for j in 0..size {
                if let Some(coord) = source.clamp_coord(top + i, left + j) {
                    if let Some(pixel) = source.at(coord) {
                        canvas.set(coord.row, coord.col, *pixel);
                    }
                }
            }
        }
    }
}

/// Clamps `position` into `[radius, bound - radius]`, flipping `velocity` when it
/// had to be moved back.
fn bounce_axis(position: &mut f64, velocity: &mut f64, radius: f64, bound: f64) {
    if *position > bound - radius {
        *position = bound - radius;
        *velocity = -*velocity;
    } else if *position < radius {
        *position = radius;
        *velocity = -*velocity;
    }
}
