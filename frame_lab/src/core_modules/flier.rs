// THEORY:
// The flier is the game piece of the "catch" exercise: a small object launched
// from a random edge of the scene that flies in a straight line. The player
// catches it by holding up something of the tracked color so that one of the
// detected regions engulfs the flier.
//
// Each advance moves the flier by its velocity and then checks, in order:
// 1.  whether its rounded center lies in any detected region (`Caught`);
// 2.  whether it has left the scene entirely (`Escaped`).
// Once it is caught or has escaped it stops moving until it is relaunched.

use crate::core_modules::agent::Bounds;
use crate::core_modules::frame::frame::PixelCoord;
use crate::core_modules::region::Region;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlierStatus {
    Flying,
    Caught,
    Escaped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flier {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub radius: f64,
    status: FlierStatus,
}

impl Flier {
    pub fn new(x: f64, y: f64, dx: f64, dy: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            dx,
            dy,
            radius,
            status: FlierStatus::Flying,
        }
    }

    /// Launches a flier from a random point on one of the four edges, heading into
    /// the scene with a per-axis step of up to `speed`.
    pub fn launch<R: Rng + ?Sized>(bounds: Bounds, speed: f64, radius: f64, rng: &mut R) -> Self {
        let along = rng.r#gen::<f64>();
        let drift = speed * (rng.r#gen::<f64>() - 0.5);
        let inward = speed * (0.5 + rng.r#gen::<f64>() / 2.0);
        match rng.gen_range(0..4) {
            0 => Self::new(along * bounds.width, 0.0, drift, inward, radius),
            1 => Self::new(along * bounds.width, bounds.height, drift, -inward, radius),
            2 => Self::new(0.0, along * bounds.height, inward, drift, radius),
            _ => Self::new(bounds.width, along * bounds.height, -inward, drift, radius),
        }
    }

    pub fn status(&self) -> FlierStatus {
        self.status
    }

    /// Moves one step and updates the status against the current regions.
    pub fn advance(&mut self, bounds: Bounds, regions: &[Region]) -> FlierStatus {
        if self.status != FlierStatus::Flying {
            return self.status;
        }
        self.x += self.dx;
        self.y += self.dy;

        if self.is_inside_any(regions) {
            self.status = FlierStatus::Caught;
        } else if self.x < 0.0 || self.y < 0.0 || self.x > bounds.width || self.y > bounds.height {
            self.status = FlierStatus::Escaped;
        }
        self.status
    }

    fn is_inside_any(&self, regions: &[Region]) -> bool {
        let (row, col) = (self.y.round(), self.x.round());
        if row < 0.0 || col < 0.0 {
            return false;
        }
        let here = PixelCoord::new(row as u32, col as u32);
        regions.iter().any(|r| r.contains(here))
    }
}
