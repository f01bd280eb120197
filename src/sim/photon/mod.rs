//! Monte Carlo photon transport through a layer stack.
pub mod config;
pub mod result;
pub mod simulation;
pub mod walker;

pub use config::{GridGeometry, SimulationConfig};
pub use result::ResultGrid;
pub use simulation::Simulation;
pub use walker::{PhotonWalker, WalkParams};
