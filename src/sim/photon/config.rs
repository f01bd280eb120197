use std::f64::consts::PI;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Resolution of the accumulation grids.
///
/// Radial and depth bins share the length unit of the layer stack; angular bins
/// span the exit hemisphere `[0, pi/2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Radial bin width.
    pub dr: f64,
    /// Depth bin width.
    pub dz: f64,
    /// Exit-angle bin width in radians.
    pub da: f64,
    pub nr: usize,
    pub nz: usize,
    pub na: usize,
}

impl GridGeometry {
    /// Creates a geometry whose `na` angular bins cover the exit hemisphere.
    pub fn new(dr: f64, dz: f64, nr: usize, nz: usize, na: usize) -> Self {
        Self {
            dr,
            dz,
            da: 0.5 * PI / na.max(1) as f64,
            nr,
            nz,
            na,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("dr", self.dr), ("dz", self.dz), ("da", self.da)] {
            if !(value.is_finite() && value > 0.0) {
                bail!("Grid bin width {} must be positive, got {}", name, value);
            }
        }
        if self.nr == 0 || self.nz == 0 || self.na == 0 {
            bail!(
                "Grid bin counts must be non-zero, got nr={} nz={} na={}",
                self.nr,
                self.nz,
                self.na
            );
        }
        Ok(())
    }

    /// Radial bin of a distance from the beam axis. Over-range values fold
    /// into the last bin.
    pub fn radial_bin(&self, radius: f64) -> usize {
        ((radius / self.dr) as usize).min(self.nr - 1)
    }

    /// Depth bin of `z`, folded into the last bin past the grid.
    pub fn depth_bin(&self, z: f64) -> usize {
        ((z / self.dz) as usize).min(self.nz - 1)
    }

    /// Angular bin of an exit direction given the cosine of its angle to the
    /// surface normal.
    pub fn angle_bin(&self, cos_exit: f64) -> usize {
        let angle = cos_exit.abs().min(1.0).acos();
        ((angle / self.da) as usize).min(self.na - 1)
    }

    /// Area of the annulus of radial bin `ir`: `2 pi (ir + 0.5) dr^2`.
    pub fn ring_area(&self, ir: usize) -> f64 {
        2.0 * PI * (ir as f64 + 0.5) * self.dr * self.dr
    }

    /// Solid angle of angular bin `ia`: `4 pi sin((ia + 0.5) da) sin(0.5 da)`.
    pub fn solid_angle(&self, ia: usize) -> f64 {
        4.0 * PI * ((ia as f64 + 0.5) * self.da).sin() * (0.5 * self.da).sin()
    }

    /// Center angle of angular bin `ia`.
    pub fn bin_angle(&self, ia: usize) -> f64 {
        (ia as f64 + 0.5) * self.da
    }

    /// Center depth of depth bin `iz`.
    pub fn bin_depth(&self, iz: usize) -> f64 {
        (iz as f64 + 0.5) * self.dz
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        // 5 mm radius and 13 mm depth at 20 um resolution
        Self::new(2e-2, 2e-2, 250, 650, 30)
    }
}

/// Configuration of a photon-transport run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridGeometry,

    // Roulette
    /// Packets lighter than this play roulette.
    pub weight_threshold: f64,
    /// Probability of surviving roulette.
    pub survival_chance: f64,

    // Boundaries
    /// If `true`, a packet hitting the outer surfaces of the tissue splits:
    /// the Fresnel-transmitted fraction is recorded and the reflected fraction
    /// continues. If `false`, a single draw sends the whole packet one way.
    pub partial_reflection: bool,

    // Execution
    pub num_photons: usize,
    /// Photons per independent random stream. Results are reproducible for a
    /// fixed `(num_photons, batch_size, seed)` regardless of the thread count.
    pub batch_size: usize,
    pub seed: u64,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            grid: GridGeometry::default(),
            weight_threshold: 1e-4,
            survival_chance: 0.1,
            partial_reflection: false,
            num_photons: 100_000,
            batch_size: 10_000,
            seed: 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if !(self.weight_threshold > 0.0 && self.weight_threshold <= 1.0) {
            bail!(
                "Roulette weight threshold must be within (0, 1], got {}",
                self.weight_threshold
            );
        }
        if !(self.survival_chance > 0.0 && self.survival_chance <= 1.0) {
            bail!(
                "Roulette survival chance must be within (0, 1], got {}",
                self.survival_chance
            );
        }
        if self.batch_size == 0 {
            bail!("Batch size must be non-zero");
        }
        Ok(())
    }

    /// Number of independent batches the photons are split into.
    pub fn num_batches(&self) -> usize {
        self.num_photons.div_ceil(self.batch_size.max(1))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SimulationConfig::new();
        assert_eq!(config.grid.nr, 250);
        assert_eq!(config.grid.nz, 650);
        assert_eq!(config.grid.na, 30);
        assert!((config.grid.da - PI / 60.0).abs() < 1e-15);
        assert!((config.weight_threshold - 1e-4).abs() < 1e-18);
        assert!((config.survival_chance - 0.1).abs() < 1e-15);
        assert!(!config.partial_reflection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default_trait() {
        let config: SimulationConfig = Default::default();
        assert_eq!(config.num_photons, 100_000);
    }

    #[test]
    fn test_num_batches() {
        let mut config = SimulationConfig::new();
        config.num_photons = 25_001;
        config.batch_size = 5_000;
        assert_eq!(config.num_batches(), 6);
        config.num_photons = 0;
        assert_eq!(config.num_batches(), 0);
    }

    #[test]
    fn test_validation() {
        let mut config = SimulationConfig::new();
        config.survival_chance = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::new();
        config.weight_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::new();
        config.grid.nr = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::new();
        config.grid.dz = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::new();
        config.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bins_clamp_to_last() {
        let grid = GridGeometry::new(0.1, 0.1, 10, 5, 3);
        assert_eq!(grid.radial_bin(0.05), 0);
        assert_eq!(grid.radial_bin(0.35), 3);
        assert_eq!(grid.radial_bin(100.0), 9);
        assert_eq!(grid.depth_bin(0.49), 4);
        assert_eq!(grid.depth_bin(7.0), 4);
        assert_eq!(grid.angle_bin(1.0), 0);
        assert_eq!(grid.angle_bin(0.0), 2);
        assert_eq!(grid.angle_bin(-1.0), 0);
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{ "num_photons": 42, "partial_reflection": true }"#).unwrap();
        assert_eq!(config.num_photons, 42);
        assert!(config.partial_reflection);
        assert_eq!(config.batch_size, 10_000);
    }
}
