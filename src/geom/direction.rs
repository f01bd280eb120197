use crate::geom::EPS;
use crate::geom::point::Displacement;
use std::fmt;
use std::ops::Mul;

use serde::{Deserialize, Serialize};

/// Direction cosines `(ux, uy, uz)` of a photon packet.
///
/// Invariant: `ux^2 + uy^2 + uz^2 = 1`. Positive `uz` means the packet travels
/// down (deeper into the tissue).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
}

impl Direction {
    /// Creates a direction from cosines that are already normalized.
    pub fn new(ux: f64, uy: f64, uz: f64) -> Self {
        Self { ux, uy, uz }
    }

    /// Straight down along +z (the incident beam).
    pub fn down() -> Self {
        Self::new(0., 0., 1.)
    }

    /// Normalizes arbitrary components. Returns None for a zero-length input.
    pub fn from_components(dx: f64, dy: f64, dz: f64) -> Option<Self> {
        let len = (dx * dx + dy * dy + dz * dz).sqrt();
        if len < EPS {
            None
        } else {
            Some(Self::new(dx / len, dy / len, dz / len))
        }
    }

    pub fn norm_squared(&self) -> f64 {
        self.ux * self.ux + self.uy * self.uy + self.uz * self.uz
    }

    pub fn is_unit(&self, tol: f64) -> bool {
        (self.norm_squared() - 1.0).abs() < tol
    }

    /// Travelling towards the top face of the current layer.
    pub fn is_upward(&self) -> bool {
        self.uz < 0.0
    }

    /// Mirror reflection on a plane parallel to the layers.
    pub fn flip_z(&self) -> Self {
        Self::new(self.ux, self.uy, -self.uz)
    }
}

impl Mul<f64> for Direction {
    type Output = Displacement;
    fn mul(self, s: f64) -> Displacement {
        Displacement {
            dx: self.ux * s,
            dy: self.uy * s,
            dz: self.uz * s,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        write!(
            f,
            "Direction({:.prec$}, {:.prec$}, {:.prec$})",
            self.ux,
            self.uy,
            self.uz,
            prec = prec
        )
    }
}
