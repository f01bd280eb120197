pub mod direction;
pub mod point;

/// Geometric precision
const EPS: f64 = 1e-13;
