// The building blocks of the frame lab, from raw pixels up to the capture
// device and the agent simulation.

pub mod pixel;
pub mod frame;
pub mod region;
pub mod region_detector;
pub mod color_tracker;
pub mod background;
pub mod agent;
pub mod simulation;
pub mod flier;
pub mod capture;
