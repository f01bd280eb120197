//! Finger model at the two pulse-oximetry wavelengths.
//!
//! ```bash
//! cargo run --release -- [config.json] [output_dir]
//! ```
//!
//! Traces photons through a five-layer finger in diastole and systole at
//! 660 nm and 940 nm, prints the reflectance budget of each run and the
//! resulting ratio of ratios. With `output_dir`, every result grid is also
//! written there as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use pulse_mcml::io::{read_config_json, write_result_json};
use pulse_mcml::sim::tissue::{Fat, Muscle, PulseSignal, Skin, SkinKind};
use pulse_mcml::{
    CardiacPhase, Simulation, SimulationConfig, TissueLayer, Wavelength, ratio_of_ratios,
    tissue_stack,
};

fn finger(saturation: f64) -> Vec<TissueLayer> {
    vec![
        TissueLayer::Skin(Skin::new(
            SkinKind::StratumCorneum,
            1.5,
            0.86,
            0.02,
            0.0,
            0.05,
            saturation,
        )),
        TissueLayer::Skin(Skin::new(
            SkinKind::Epidermis,
            1.34,
            0.8,
            0.25,
            0.0,
            0.2,
            saturation,
        )),
        TissueLayer::Skin(Skin::new(
            SkinKind::Dermis,
            1.4,
            0.9,
            1.8,
            0.2,
            0.65,
            saturation,
        )),
        TissueLayer::Fat(Fat {
            n: 1.44,
            g: 0.9,
            thickness: 2.0,
        }),
        TissueLayer::Muscle(Muscle {
            n: 1.37,
            g: 0.93,
            thickness: f64::INFINITY,
        }),
    ]
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => read_config_json(Path::new(path))?,
        None => SimulationConfig {
            num_photons: 20_000,
            batch_size: 2_000,
            ..SimulationConfig::new()
        },
    };
    let output_dir = args.get(2).map(PathBuf::from);
    if let Some(dir) = &output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let saturation = 0.98;
    let layers = finger(saturation);
    info!("Finger model with SaO2 = {}", saturation);

    println!(
        "{:>6} {:>9} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "nm", "phase", "Rsp", "Rd", "A", "Tt", "sum"
    );
    let mut signals = Vec::new();
    for wavelength in [Wavelength::Red660, Wavelength::Infrared940] {
        let mut rd = [0.0; 2];
        for (i, phase) in [CardiacPhase::Diastole, CardiacPhase::Systole]
            .into_iter()
            .enumerate()
        {
            let stack = tissue_stack(1.0, &layers, wavelength, phase)?;
            let result = Simulation::new(stack, config.clone())?.run()?;
            println!(
                "{:>6} {:>9} {:>8.5} {:>8.5} {:>8.5} {:>8.5} {:>8.5}",
                wavelength.nm(),
                format!("{:?}", phase),
                result.rsp,
                result.rd,
                result.a,
                result.tt,
                result.energy_balance()
            );
            if let Some(dir) = &output_dir {
                let name = format!("{:.0}nm_{:?}.json", wavelength.nm(), phase).to_lowercase();
                write_result_json(&dir.join(name), &result)?;
            }
            rd[i] = result.rd;
        }
        signals.push(PulseSignal {
            diastole: rd[0],
            systole: rd[1],
        });
    }

    let r = ratio_of_ratios(signals[0], signals[1])?;
    println!("\nRatio of ratios R = {:.4}", r);
    Ok(())
}
