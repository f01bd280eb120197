//! JSON persistence of layer definitions, run configurations and results.
//!
//! Semi-infinite layer thicknesses are stored as `null`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sim::layers::LayerSpec;
use crate::sim::photon::{ResultGrid, SimulationConfig};

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, value)
        .with_context(|| format!("Failed to serialize {} to: {}", what, path.display()))?;

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize {} from: {}", what, path.display()))
}

/// Writes a (normalized or raw) result grid.
///
/// # Example
/// ```no_run
/// use pulse_mcml::io::write_result_json;
/// use pulse_mcml::{LayerSpec, LayerStack, Simulation, SimulationConfig};
/// use std::path::Path;
///
/// let stack = LayerStack::from_specs(&[
///     LayerSpec::ambient("air", 1.0),
///     LayerSpec::new("tissue", 1.4, 0.9, 0.1, 10.0, f64::INFINITY),
///     LayerSpec::ambient("air", 1.0),
/// ]).unwrap();
/// let result = Simulation::new(stack, SimulationConfig::new()).unwrap().run().unwrap();
/// write_result_json(Path::new("result.json"), &result).unwrap();
/// ```
pub fn write_result_json(path: &Path, result: &ResultGrid) -> Result<()> {
    write_json(path, result, "result grid")
}

pub fn read_result_json(path: &Path) -> Result<ResultGrid> {
    read_json(path, "result grid")
}

pub fn write_config_json(path: &Path, config: &SimulationConfig) -> Result<()> {
    write_json(path, config, "simulation config")
}

/// Reads a run configuration. Missing fields take their default values.
pub fn read_config_json(path: &Path) -> Result<SimulationConfig> {
    let config: SimulationConfig = read_json(path, "simulation config")?;
    config
        .validate()
        .with_context(|| format!("Invalid simulation config in: {}", path.display()))?;
    Ok(config)
}

pub fn write_layers_json(path: &Path, layers: &[LayerSpec]) -> Result<()> {
    write_json(path, &layers, "layers")
}

/// Reads the layer records of a stack, ambient media included, top to bottom.
pub fn read_layers_json(path: &Path) -> Result<Vec<LayerSpec>> {
    read_json(path, "layers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::engine::{Deposit, Tally};
    use crate::sim::layers::LayerStack;
    use crate::sim::photon::GridGeometry;
    use std::io::Write;
    use tempfile::tempdir;

    fn layers() -> Vec<LayerSpec> {
        vec![
            LayerSpec::ambient("air", 1.0),
            LayerSpec::new("epidermis", 1.34, 0.8, 2.7, 25.62, 0.25),
            LayerSpec::new("dermis", 1.4, 0.9, 0.08, 25.62, f64::INFINITY),
            LayerSpec::ambient("air", 1.0),
        ]
    }

    #[test]
    fn test_layers_roundtrip_keeps_infinite_thickness() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("layers.json");
        write_layers_json(&path, &layers())?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("null"));

        let loaded = read_layers_json(&path)?;
        assert_eq!(loaded, layers());
        assert!(LayerStack::from_specs(&loaded).is_ok());
        Ok(())
    }

    #[test]
    fn test_layers_missing_thickness_is_unbounded() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("layers.json");
        let mut file = File::create(&path)?;
        write!(
            file,
            r#"[
                {{ "name": "air", "n": 1.0, "g": 0.0, "mua": 0.0, "mus": 0.0 }},
                {{ "name": "tissue", "n": 1.4, "g": 0.9, "mua": 0.1, "mus": 10.0 }},
                {{ "name": "air", "n": 1.0, "g": 0.0, "mua": 0.0, "mus": 0.0 }}
            ]"#
        )?;
        drop(file);

        let loaded = read_layers_json(&path)?;
        assert!(loaded[1].thickness.is_infinite());
        let stack = LayerStack::from_specs(&loaded)?;
        assert!(stack.layer(1).z_bottom.is_infinite());
        Ok(())
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        let config = SimulationConfig {
            num_photons: 1234,
            partial_reflection: true,
            grid: GridGeometry::new(0.01, 0.05, 100, 200, 10),
            ..SimulationConfig::new()
        };
        write_config_json(&path, &config)?;
        assert_eq!(read_config_json(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "survival_chance": 0.0 }"#)?;
        assert!(read_config_json(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_result_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("result.json");
        let stack = LayerStack::from_specs(&layers())?;

        let mut grid = ResultGrid::new(GridGeometry::new(0.1, 0.1, 5, 5, 3), stack.len());
        grid.record(&Deposit::Reflected {
            radius: 0.12,
            cos_exit: 0.7,
            weight: 0.3,
        });
        grid.record(&Deposit::Absorbed {
            radius: 0.0,
            depth: 0.35,
            weight: 0.6,
        });
        grid.add_photons(1);
        grid.normalize(&stack)?;

        write_result_json(&path, &grid)?;
        let loaded = read_result_json(&path)?;
        assert!(loaded.is_normalized());
        assert_eq!(loaded.num_photons, 1);
        assert!((loaded.rd - grid.rd).abs() < 1e-15);
        assert!((loaded.a_layer[2] - grid.a_layer[2]).abs() < 1e-15);
        assert_eq!(loaded.rd_ra.dim(), (5, 3));
        Ok(())
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_layers_json(Path::new("/nonexistent/layers.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/layers.json"));
    }
}
