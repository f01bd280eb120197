use std::f64::consts::PI;

use rand::Rng;

use crate::geom::direction::Direction;

use super::fresnel::COS_ZERO;

/// Distribution of the deflection angle at a scattering event.
pub trait PhaseFunction {
    /// Samples the cosine of the deflection angle from a uniform draw `u` in [0, 1).
    fn sample_cos(&self, u: f64) -> f64;
}

/// Henyey-Greenstein phase function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HenyeyGreenstein {
    /// Anisotropy: mean cosine of the deflection angle.
    pub g: f64,
}

impl HenyeyGreenstein {
    pub fn new(g: f64) -> Self {
        Self { g }
    }
}

impl PhaseFunction for HenyeyGreenstein {
    fn sample_cos(&self, u: f64) -> f64 {
        let g = self.g;
        if g == 0.0 {
            return 2.0 * u - 1.0;
        }
        let bracket = (1.0 - g * g) / (1.0 - g + 2.0 * g * u);
        let cos_theta = (1.0 + g * g - bracket * bracket) / (2.0 * g);
        cos_theta.clamp(-1.0, 1.0)
    }
}

/// Rotates `direction` by the deflection angle `theta` and azimuth `psi`.
///
/// Near-vertical directions use the closed form that avoids dividing by
/// `sqrt(1 - uz^2)`.
pub fn rotate(direction: Direction, cos_theta: f64, psi: f64) -> Direction {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let (sin_psi, cos_psi) = psi.sin_cos();
    let Direction { ux, uy, uz } = direction;

    if uz.abs() > COS_ZERO {
        Direction::new(
            sin_theta * cos_psi,
            sin_theta * sin_psi,
            cos_theta * uz.signum(),
        )
    } else {
        let temp = (1.0 - uz * uz).sqrt();
        Direction::new(
            sin_theta * (ux * uz * cos_psi - uy * sin_psi) / temp + ux * cos_theta,
            sin_theta * (uy * uz * cos_psi + ux * sin_psi) / temp + uy * cos_theta,
            -sin_theta * cos_psi * temp + uz * cos_theta,
        )
    }
}

/// Samples a new propagation direction after a scattering event.
pub fn spin<P: PhaseFunction, R: Rng + ?Sized>(
    direction: Direction,
    phase: &P,
    rng: &mut R,
) -> Direction {
    let cos_theta = phase.sample_cos(rng.r#gen());
    let psi = 2.0 * PI * rng.r#gen::<f64>();
    rotate(direction, cos_theta, psi)
}
