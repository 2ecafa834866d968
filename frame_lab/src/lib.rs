// THEORY:
// This file is the main entry point for the `frame_lab` library crate. It
// defines the public API consumed by front ends such as `lab_runner`.
//
// The crate has two halves that meet in `worker`:
// 1.  **Analysis**: `LabPipeline` takes one captured frame at a time and runs
//     background substitution, color tracking and region detection over it.
// 2.  **Simulation**: `Simulation` advances a population of agents that may read
//     the latest frame but never write to it.
//
// `worker` runs capture and simulation on independent clocks and hands results
// to the presentation layer through single-slot "latest value" channels. The
// building blocks live in `core_modules` and stay usable on their own.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod worker;

pub use config::{ClickAction, LabConfig, SimulationConfig};
pub use core_modules::capture::{CaptureDriver, CaptureSourceManager, CaptureState, SyntheticCamera};
pub use core_modules::frame::frame::{Frame, PixelCoord};
pub use core_modules::pixel::pixel::Pixel;
pub use error::{CaptureError, LabError, Result};
pub use pipeline::{FrameReport, Interaction, LabPipeline};
pub use worker::{
    AgentCommand, AgentSnapshot, CaptureHandle, FrameSource, SimulationHandle, spawn_capture_worker, spawn_simulation,
};
