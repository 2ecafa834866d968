// THEORY:
// The `Simulation` owns a fixed population of `Agent`s and advances them one
// tick at a time. It is the agent-side counterpart of the analysis pipeline and
// runs on its own clock (see `worker::spawn_simulation`).
//
// Per tick:
// 1.  **Selection**: `TickPolicy::All` moves every agent; `RandomSubset(k)` draws
//     `k` indices uniformly *with replacement* and moves only those, so an agent
//     can be picked several times and the population shimmers rather than
//     marching in lockstep.
// 2.  **Color sampling** (optional): each selected agent reads the latest frame
//     under its center, either before or after it moves. With no frame the
//     sampling step silently does nothing.
// 3.  **Movement**: `Agent::step`, dispatched on the agent's `Motion`.
//
// Agents are mutated in place and never removed. Pointer presses hit-test
// against every agent; hit agents grow.

use crate::core_modules::agent::{Agent, Bounds, Motion};
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::pixel::pixel::Pixel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Which agents move on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPolicy {
    All,
    /// Move this many randomly chosen agents (uniform, with replacement).
    RandomSubset(usize),
}

/// When agents repaint themselves from the frame underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSampling {
    Off,
    BeforeMove,
    AfterMove,
}

/// The starting motion handed to each agent by `Simulation::scattered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    Stationary,
    Wanderers,
    /// Bouncers with a random velocity in `[-speed/2, speed/2)` on each axis.
    Bouncers { speed: u32 },
}

pub struct Simulation {
    agents: Vec<Agent>,
    bounds: Bounds,
    tick_policy: TickPolicy,
    sampling: ColorSampling,
    rng: StdRng,
    ticks: u64,
}

impl Simulation {
    pub fn new(agents: Vec<Agent>, bounds: Bounds, tick_policy: TickPolicy, sampling: ColorSampling, seed: u64) -> Self {
        Self {
            agents,
            bounds,
            tick_policy,
            sampling,
            rng: StdRng::seed_from_u64(seed),
            ticks: 0,
        }
    }

    /// `count` agents at uniformly random positions inside `bounds`. Bouncers are
    /// placed inside `[radius, bound - radius]` so they start where they bounce.
    pub fn scattered(
        count: usize,
        bounds: Bounds,
        radius: f64,
        population: Population,
        tick_policy: TickPolicy,
        sampling: ColorSampling,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let agents = (0..count)
            .map(|_| {
                let margin = match population {
                    Population::Bouncers { .. } => radius,
                    Population::Stationary | Population::Wanderers => 0.0,
                };
                let x = place(&mut rng, bounds.width, margin);
                let y = place(&mut rng, bounds.height, margin);
                let motion = match population {
                    Population::Stationary => Motion::Stationary,
                    Population::Wanderers => Motion::RandomWalk,
                    Population::Bouncers { speed } => Motion::ElasticBounce {
                        dx: speed as f64 * (rng.r#gen::<f64>() - 0.5),
                        dy: speed as f64 * (rng.r#gen::<f64>() - 0.5),
                    },
                };
                Agent::new(x, y, radius, Pixel::BLACK, motion)
            })
            .collect();
        Self {
            agents,
            bounds,
            tick_policy,
            sampling,
            rng,
            ticks: 0,
        }
    }

    /// One wandering agent per image pixel, laid out on a grid `spacing` apart and
    /// colored like the pixel it stands for. The bounds grow with the spacing.
    pub fn from_image(image: &Frame, spacing: f64, tick_policy: TickPolicy, seed: u64) -> Self {
        let agents = image
            .enumerate()
            .map(|(coord, pixel)| {
                Agent::new(
                    coord.col as f64 * spacing,
                    coord.row as f64 * spacing,
                    spacing,
                    *pixel,
                    Motion::RandomWalk,
                )
            })
            .collect();
        let bounds = Bounds::new(image.width() as f64 * spacing, image.height() as f64 * spacing);
        Self::new(agents, bounds, tick_policy, ColorSampling::Off, seed)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances the simulation one tick. `frame` is only read, and only when color
    /// sampling is on; pass `None` when no frame is available.
    pub fn tick(&mut self, frame: Option<&Frame>) {
        self.ticks += 1;
        if self.agents.is_empty() {
            return;
        }
        match self.tick_policy {
            TickPolicy::All => {
                for index in 0..self.agents.len() {
                    self.advance(index, frame);
                }
            }
            TickPolicy::RandomSubset(count) => {
                for _ in 0..count {
                    let index = self.rng.gen_range(0..self.agents.len());
                    self.advance(index, frame);
                }
            }
        }
    }

    fn advance(&mut self, index: usize, frame: Option<&Frame>) {
        let bounds = self.bounds;
        let agent = &mut self.agents[index];
        if let (ColorSampling::BeforeMove, Some(frame)) = (self.sampling, frame) {
            agent.sample_color(frame);
        }
        agent.step(bounds, &mut self.rng);
        if let (ColorSampling::AfterMove, Some(frame)) = (self.sampling, frame) {
            agent.sample_color(frame);
        }
    }

    /// Indices of every agent containing (x, y).
    pub fn hit_test(&self, x: f64, y: f64) -> Vec<usize> {
        self.agents
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.contains(x, y))
            .map(|(i, _)| i)
            .collect()
    }

    /// Multiplies the radius of every agent containing (x, y) by `factor`.
    /// Returns how many agents grew.
    pub fn grow_hits(&mut self, x: f64, y: f64, factor: f64) -> usize {
        let hits = self.hit_test(x, y);
        for &i in &hits {
            self.agents[i].radius *= factor;
        }
        hits.len()
    }

    /// Lets every agent paint its patch of `source` onto `canvas`.
    pub fn paint_all(&self, source: &Frame, canvas: &mut Frame) {
        for agent in &self.agents {
            agent.paint(source, canvas);
        }
    }
}

/// Uniform in `[margin, bound - margin)`, or the midpoint when the margins meet.
fn place<R: Rng + ?Sized>(rng: &mut R, bound: f64, margin: f64) -> f64 {
    let span = bound - 2.0 * margin;
    if span > 0.0 {
        margin + rng.r#gen::<f64>() * span
    } else {
        bound / 2.0
    }
}
