//! Optical properties of finger tissue at the two pulse-oximetry wavelengths.
//!
//! Each tissue type turns into a [`LayerSpec`] for a given wavelength and
//! cardiac phase, so the transport core never sees physiology.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::sim::layers::{LayerSpec, LayerStack};

/// Melanin volume fraction of bloodless skin layers.
pub const MELANIN_VOLUME: f64 = 0.1;

/// Total blood volume in systole relative to diastole.
const SYSTOLIC_BLOOD_SCALE: f64 = 1.25;

/// Venous share of the diastolic blood volume (unchanged over the pulse).
const VENOUS_SHARE: f64 = 0.75;

/// Arterial minus venous oxygen saturation.
const SATURATION_DROP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wavelength {
    Red660,
    Infrared940,
}

impl Wavelength {
    /// Wavelength in nm.
    pub fn nm(&self) -> f64 {
        match self {
            Wavelength::Red660 => 660.0,
            Wavelength::Infrared940 => 940.0,
        }
    }

    fn spectra(&self) -> Spectra {
        match self {
            Wavelength::Red660 => Spectra {
                hbo2: 0.15,
                hb: 1.64,
                water: 0.0036,
                skin_mus: 25.62,
                fat_mua: 0.0104,
                fat_mus: 6.20,
                muscle_mua: 0.0816,
                muscle_mus: 8.61,
            },
            Wavelength::Infrared940 => Spectra {
                hbo2: 0.65,
                hb: 0.43,
                water: 0.2674,
                skin_mus: 15.68,
                fat_mua: 0.017,
                fat_mus: 5.42,
                muscle_mua: 0.0401,
                muscle_mus: 5.81,
            },
        }
    }

    /// Background absorption of bloodless tissue, 1/mm.
    fn baseline_mua(&self) -> f64 {
        7.84e7 * self.nm().powf(-3.255)
    }

    /// Absorption of pure melanin, 1/mm.
    fn melanin_mua(&self) -> f64 {
        6.6e10 * self.nm().powf(-3.33)
    }
}

/// Coefficients at one wavelength, all in 1/mm.
struct Spectra {
    hbo2: f64,
    hb: f64,
    water: f64,
    skin_mus: f64,
    fat_mua: f64,
    fat_mus: f64,
    muscle_mua: f64,
    muscle_mus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardiacPhase {
    Diastole,
    Systole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkinKind {
    StratumCorneum,
    Epidermis,
    Dermis,
}

impl SkinKind {
    pub fn name(&self) -> &'static str {
        match self {
            SkinKind::StratumCorneum => "stratum corneum",
            SkinKind::Epidermis => "epidermis",
            SkinKind::Dermis => "dermis",
        }
    }

    /// Whether the layer carries blood (and no melanin).
    pub fn is_perfused(&self) -> bool {
        matches!(self, SkinKind::Dermis)
    }
}

/// A skin layer described by its composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Skin {
    pub kind: SkinKind,
    pub n: f64,
    pub g: f64,
    /// Thickness in mm.
    pub thickness: f64,
    /// Diastolic blood volume fraction.
    pub blood_volume: f64,
    pub water_volume: f64,
    /// Arterial oxygen saturation in [0, 1].
    pub saturation: f64,
    pub melanin_volume: f64,
}

impl Skin {
    pub fn new(
        kind: SkinKind,
        n: f64,
        g: f64,
        thickness: f64,
        blood_volume: f64,
        water_volume: f64,
        saturation: f64,
    ) -> Self {
        Self {
            kind,
            n,
            g,
            thickness,
            blood_volume,
            water_volume,
            saturation,
            melanin_volume: MELANIN_VOLUME,
        }
    }

    /// Venous oxygen saturation, floored at 0.
    pub fn venous_saturation(&self) -> f64 {
        (self.saturation - SATURATION_DROP).max(0.0)
    }

    /// Arterial and venous volume fractions in the given phase.
    pub fn blood_fractions(&self, phase: CardiacPhase) -> (f64, f64) {
        let venous = VENOUS_SHARE * self.blood_volume;
        let total = match phase {
            CardiacPhase::Diastole => self.blood_volume,
            CardiacPhase::Systole => SYSTOLIC_BLOOD_SCALE * self.blood_volume,
        };
        (total - venous, venous)
    }

    /// Absorption coefficient in 1/mm.
    pub fn mua(&self, wavelength: Wavelength, phase: CardiacPhase) -> f64 {
        let s = wavelength.spectra();
        let baseline = wavelength.baseline_mua();
        let water = self.water_volume * s.water;

        if !self.kind.is_perfused() {
            let other = self.melanin_volume + self.water_volume;
            return self.melanin_volume * wavelength.melanin_mua() + water + (1.0 - other) * baseline;
        }

        let (arterial, venous) = self.blood_fractions(phase);
        let sa = self.saturation;
        let sv = self.venous_saturation();
        let arterial_mua = sa * s.hbo2 + (1.0 - sa) * s.hb;
        let venous_mua = sv * s.hbo2 + (1.0 - sv) * s.hb;
        arterial * arterial_mua
            + venous * venous_mua
            + water
            + (1.0 - (arterial + venous + self.water_volume)) * baseline
    }

    /// Scattering coefficient in 1/mm.
    pub fn mus(&self, wavelength: Wavelength) -> f64 {
        wavelength.spectra().skin_mus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fat {
    pub n: f64,
    pub g: f64,
    pub thickness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Muscle {
    pub n: f64,
    pub g: f64,
    pub thickness: f64,
}

/// One layer of a tissue model, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TissueLayer {
    Skin(Skin),
    Fat(Fat),
    Muscle(Muscle),
}

impl TissueLayer {
    pub fn name(&self) -> &'static str {
        match self {
            TissueLayer::Skin(skin) => skin.kind.name(),
            TissueLayer::Fat(_) => "fat",
            TissueLayer::Muscle(_) => "muscle",
        }
    }

    /// Layer record at the given wavelength and phase.
    pub fn to_spec(&self, wavelength: Wavelength, phase: CardiacPhase) -> LayerSpec {
        let s = wavelength.spectra();
        let name = self.name();
        match self {
            TissueLayer::Skin(skin) => LayerSpec::new(
                name,
                skin.n,
                skin.g,
                skin.mua(wavelength, phase),
                skin.mus(wavelength),
                skin.thickness,
            ),
            TissueLayer::Fat(fat) => {
                LayerSpec::new(name, fat.n, fat.g, s.fat_mua, s.fat_mus, fat.thickness)
            }
            TissueLayer::Muscle(muscle) => LayerSpec::new(
                name,
                muscle.n,
                muscle.g,
                s.muscle_mua,
                s.muscle_mus,
                muscle.thickness,
            ),
        }
    }
}

/// Builds a validated stack with the same ambient medium above and below.
pub fn tissue_stack(
    ambient_n: f64,
    layers: &[TissueLayer],
    wavelength: Wavelength,
    phase: CardiacPhase,
) -> Result<LayerStack> {
    let mut specs = Vec::with_capacity(layers.len() + 2);
    specs.push(LayerSpec::ambient("ambient", ambient_n));
    specs.extend(layers.iter().map(|l| l.to_spec(wavelength, phase)));
    specs.push(LayerSpec::ambient("ambient", ambient_n));
    LayerStack::from_specs(&specs)
}

/// Diffuse reflectance over one cardiac cycle at a single wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseSignal {
    pub diastole: f64,
    pub systole: f64,
}

impl PulseSignal {
    /// Pulsatile over mean signal.
    pub fn modulation(&self) -> f64 {
        let ac = self.diastole - self.systole;
        let dc = 0.5 * (self.diastole + self.systole);
        ac / dc
    }
}

/// Pulse-oximetry ratio `R = (AC/DC)_red / (AC/DC)_ir`.
pub fn ratio_of_ratios(red: PulseSignal, infrared: PulseSignal) -> Result<f64> {
    let dc_sum = red.diastole + red.systole;
    if !(dc_sum > 0.0 && infrared.diastole + infrared.systole > 0.0) {
        bail!("Pulse signals must have a positive mean");
    }
    let ir = infrared.modulation();
    if ir == 0.0 {
        bail!("Infrared signal has no pulsatile component");
    }
    Ok(red.modulation() / ir)
}
