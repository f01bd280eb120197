use crate::geom::EPS;
use crate::geom::direction::Direction;
use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Position of a photon packet.
///
/// The z-axis points into the tissue: `z = 0` is the top tissue surface and
/// depth grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::new(0., 0., 0.)
    }

    /// Returns true if both points are very close to each other.
    pub fn is_close(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EPS
            && (self.y - other.y).abs() < EPS
            && (self.z - other.z).abs() < EPS
    }

    /// Distance from the z-axis (the axis of the incident beam).
    pub fn radius(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Moves the point by `step` along `direction`.
    pub fn hop(&self, direction: Direction, step: f64) -> Self {
        *self + direction * step
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        write!(
            f,
            "Point({:.prec$}, {:.prec$}, {:.prec$})",
            self.x,
            self.y,
            self.z,
            prec = prec
        )
    }
}

/// Displacement produced by scaling a direction with a path length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Add<Displacement> for Point {
    type Output = Point;
    fn add(self, other: Displacement) -> Self {
        Self {
            x: self.x + other.dx,
            y: self.y + other.dy,
            z: self.z + other.dz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_close() {
        let pa = Point::new(5., 5., 5.);
        let pb = Point::new(5.00000000000001, 5., 5.);
        let pc = Point::new(5.0001, 5., 5.);
        assert!(pa.is_close(&pb));
        assert!(!pa.is_close(&pc));
    }

    #[test]
    fn test_radius() {
        let p = Point::new(3., 4., 100.);
        assert!((p.radius() - 5.0).abs() < 1e-12);
        assert_eq!(Point::origin().radius(), 0.0);
    }

    #[test]
    fn test_hop() {
        let p = Point::new(1., 1., 0.);
        let d = Direction::new(0., 0.6, 0.8);
        let q = p.hop(d, 2.0);
        assert!(q.is_close(&Point::new(1.0, 2.2, 1.6)));
    }

    #[test]
    fn test_display_precision() {
        let p = Point::new(0.5, 0.26, 0.14);
        assert_eq!(format!("{:.1}", p), "Point(0.5, 0.3, 0.1)");
    }
}
