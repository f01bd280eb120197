use rand::Rng;

use crate::geom::direction::Direction;
use crate::sim::layers::Layer;

use super::uniform_open;

/// Samples a free path length `-ln(U) / mu_t` in a layer with total
/// interaction coefficient `mu_t`.
pub fn sample_step<R: Rng + ?Sized>(mu_t: f64, rng: &mut R) -> f64 {
    -uniform_open(rng).ln() / mu_t
}

/// Distance along `direction` from depth `z` to the face of `layer` the packet
/// is heading for.
///
/// Returns None for a horizontal packet, which never reaches either face.
pub fn distance_to_boundary(z: f64, direction: Direction, layer: &Layer) -> Option<f64> {
    let uz = direction.uz;
    if uz > 0.0 {
        Some((layer.z_bottom - z) / uz)
    } else if uz < 0.0 {
        Some((layer.z_top - z) / uz)
    } else {
        None
    }
}
