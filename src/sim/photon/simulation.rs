use anyhow::Result;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::sim::layers::LayerStack;

use super::config::SimulationConfig;
use super::result::ResultGrid;
use super::walker::{PhotonWalker, WalkParams};

/// Largest tolerated deviation of `Rsp + Rd + A + Tt` from 1 before warning.
const ENERGY_BALANCE_TOL: f64 = 0.01;

/// Traces photon packets through a layer stack in parallel batches.
///
/// Every batch owns a random stream derived from the configured seed and its
/// batch index, and accumulates into a private [`ResultGrid`]. Batches run in
/// waves of one batch per worker thread and are merged in batch order, so the
/// result only depends on the configuration.
pub struct Simulation {
    stack: LayerStack,
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(stack: LayerStack, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { stack, config })
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Traces all photons and returns the normalized result.
    pub fn run(&self) -> Result<ResultGrid> {
        info!(
            "Tracing {} photons in {} batches through {} tissue layers (Rsp = {:.5})",
            self.config.num_photons,
            self.config.num_batches(),
            self.stack.num_tissue_layers(),
            self.stack.specular()
        );

        let mut result = self.accumulate()?;
        result.normalize(&self.stack)?;

        info!(
            "Rd = {:.5}, A = {:.5}, Tt = {:.5}",
            result.rd, result.a, result.tt
        );
        let balance = result.energy_balance();
        if (balance - 1.0).abs() > ENERGY_BALANCE_TOL {
            warn!(
                "Energy balance Rsp + Rd + A + Tt = {:.5} deviates from 1 by more than {}",
                balance, ENERGY_BALANCE_TOL
            );
        }
        Ok(result)
    }

    /// Traces all photons into a raw, un-normalized grid.
    pub fn accumulate(&self) -> Result<ResultGrid> {
        let num_batches = self.config.num_batches();
        let wave = rayon::current_num_threads().max(1);
        let mut total = ResultGrid::new(self.config.grid, self.stack.len());

        let mut start = 0;
        while start < num_batches {
            let end = (start + wave).min(num_batches);
            let grids: Vec<ResultGrid> = (start..end)
                .into_par_iter()
                .map(|batch| self.run_batch(batch))
                .collect();
            for grid in &grids {
                total.merge(grid)?;
            }
            debug!(
                "Batches {}..{} done, {} photons traced",
                start, end, total.num_photons
            );
            start = end;
        }
        Ok(total)
    }

    fn run_batch(&self, batch: usize) -> ResultGrid {
        let first = batch * self.config.batch_size;
        let count = self
            .config
            .batch_size
            .min(self.config.num_photons.saturating_sub(first));

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(batch as u64);

        let walker = PhotonWalker::new(&self.stack, WalkParams::from_config(&self.config));
        let mut grid = ResultGrid::new(self.config.grid, self.stack.len());
        for _ in 0..count {
            walker.launch_photon(&mut rng, &mut grid);
        }
        grid.add_photons(count);
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::layers::LayerSpec;
    use crate::sim::photon::config::GridGeometry;

    fn stack() -> LayerStack {
        LayerStack::from_specs(&[
            LayerSpec::ambient("air", 1.0),
            LayerSpec::new("epidermis", 1.4, 0.8, 1.0, 20.0, 0.1),
            LayerSpec::new("dermis", 1.4, 0.9, 0.2, 10.0, f64::INFINITY),
            LayerSpec::ambient("air", 1.0),
        ])
        .unwrap()
    }

    fn config(num_photons: usize, seed: u64) -> SimulationConfig {
        SimulationConfig {
            grid: GridGeometry::new(0.05, 0.05, 40, 40, 5),
            num_photons,
            batch_size: 300,
            seed,
            ..SimulationConfig::new()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut cfg = config(100, 1);
        cfg.survival_chance = 2.0;
        assert!(Simulation::new(stack(), cfg).is_err());
    }

    #[test]
    fn test_counts_every_photon() -> Result<()> {
        let sim = Simulation::new(stack(), config(1_000, 1))?;
        let raw = sim.accumulate()?;
        assert_eq!(raw.num_photons, 1_000);
        assert!(!raw.is_normalized());
        Ok(())
    }

    #[test]
    fn test_run_is_normalized_and_balanced() -> Result<()> {
        let sim = Simulation::new(stack(), config(2_000, 7))?;
        let result = sim.run()?;
        assert!(result.is_normalized());
        let balance = result.energy_balance();
        assert!((balance - 1.0).abs() < 0.02, "energy balance {balance}");
        Ok(())
    }

    #[test]
    fn test_same_seed_same_result() -> Result<()> {
        let a = Simulation::new(stack(), config(1_000, 42))?.run()?;
        let b = Simulation::new(stack(), config(1_000, 42))?.run()?;
        assert_eq!(a, b);

        let c = Simulation::new(stack(), config(1_000, 43))?.run()?;
        assert_ne!(a.rd, c.rd);
        Ok(())
    }

    #[test]
    fn test_result_independent_of_thread_count() -> Result<()> {
        let sim = Simulation::new(stack(), config(1_500, 3))?;
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()?
            .install(|| sim.run())?;
        let multi = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()?
            .install(|| sim.run())?;
        assert_eq!(single, multi);
        Ok(())
    }

    #[test]
    fn test_no_photons_cannot_be_normalized() -> Result<()> {
        let sim = Simulation::new(stack(), config(0, 1))?;
        assert!(sim.run().is_err());
        Ok(())
    }
}
