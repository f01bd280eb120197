pub mod absorption;
pub mod fresnel;
pub mod propagation;
pub mod roulette;
pub mod scattering;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geom::direction::Direction;
use crate::geom::point::Point;
use crate::sim::layers::LayerStack;

/// State of a single photon packet during its random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotonState {
    pub position: Point,
    pub direction: Direction,
    /// Fraction of the launched unit power still carried by the packet.
    pub weight: f64,
    /// Index of the layer the packet is in.
    pub layer: usize,
    pub alive: bool,
    /// Unconsumed step carried across a boundary, in optical path units
    /// (dimensionless, i.e. multiplied by the `mu_t` of the layer it was drawn in).
    pub residual: f64,
}

impl PhotonState {
    /// Packet entering the stack straight down with the specular part removed.
    pub fn launch(stack: &LayerStack) -> Self {
        let layer = stack.launch_layer();
        let z = stack.layer(layer).z_top;
        Self {
            position: Point::new(0.0, 0.0, z),
            direction: Direction::down(),
            weight: 1.0 - stack.specular(),
            layer,
            alive: true,
            residual: 0.0,
        }
    }
}

/// Weight handed over to the accumulation grids by a single transition.
///
/// Positions are physical; binning is left to the [`Tally`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Deposit {
    /// Weight absorbed at an interaction site.
    Absorbed { radius: f64, depth: f64, weight: f64 },
    /// Weight leaving through the top of the stack.
    Reflected {
        radius: f64,
        cos_exit: f64,
        weight: f64,
    },
    /// Weight leaving through the bottom of the stack.
    Transmitted {
        radius: f64,
        cos_exit: f64,
        weight: f64,
    },
}

impl Deposit {
    pub fn weight(&self) -> f64 {
        match self {
            Deposit::Absorbed { weight, .. }
            | Deposit::Reflected { weight, .. }
            | Deposit::Transmitted { weight, .. } => *weight,
        }
    }
}

/// Sink for deposited photon weight.
///
/// Accumulation is purely additive, so the order in which deposits arrive
/// does not affect the result.
pub trait Tally {
    fn record(&mut self, deposit: &Deposit);
}

/// Plain event log.
impl Tally for Vec<Deposit> {
    fn record(&mut self, deposit: &Deposit) {
        self.push(*deposit);
    }
}

/// Outcome of advancing a packet by one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: PhotonState,
    pub deposit: Option<Deposit>,
}

/// Uniform random number in the open interval (0, 1).
pub fn uniform_open<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.r#gen();
        if u > 0.0 {
            return u;
        }
    }
}
