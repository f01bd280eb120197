pub mod geom;
pub mod io;
pub mod sim;

// Prelude
pub use geom::direction::Direction;
pub use geom::point::Point;
pub use sim::layers::{LayerKind, LayerSpec, LayerStack};
pub use sim::photon::{GridGeometry, PhotonWalker, ResultGrid, Simulation, SimulationConfig};
// Tissue models
pub use sim::tissue::{CardiacPhase, TissueLayer, Wavelength, ratio_of_ratios, tissue_stack};
