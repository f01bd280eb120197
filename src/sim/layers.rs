use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Optical description of one layer as supplied by the caller.
///
/// Coefficients are in 1/length and the thickness in the same length unit
/// (the tissue tables in [`crate::sim::tissue`] use millimeters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    /// Refractive index.
    pub n: f64,
    /// Scattering anisotropy in [-1, 1].
    pub g: f64,
    /// Absorption coefficient.
    pub mua: f64,
    /// Scattering coefficient.
    pub mus: f64,
    /// Thickness. Ignored for the two ambient media; may be `+inf` for a
    /// semi-infinite last tissue layer.
    #[serde(with = "unbounded", default = "unbounded::infinite")]
    pub thickness: f64,
}

/// JSON has no infinity: an unbounded thickness is written as `null`, and a
/// `null` or missing one reads back as `+inf`.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn infinite() -> f64 {
        f64::INFINITY
    }

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            s.serialize_none()
        } else {
            s.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

impl LayerSpec {
    pub fn new(name: &str, n: f64, g: f64, mua: f64, mus: f64, thickness: f64) -> Self {
        Self {
            name: name.to_string(),
            n,
            g,
            mua,
            mus,
            thickness,
        }
    }

    /// Non-absorbing, non-scattering medium bounding the stack (air, glass).
    pub fn ambient(name: &str, n: f64) -> Self {
        Self::new(name, n, 0.0, 0.0, 0.0, 0.0)
    }
}

/// Role of a layer, resolved once when the stack is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Semi-infinite medium above or below the tissue.
    Ambient,
    /// Interior layer with `mua = mus = 0`: packets cross it without interacting.
    Clear,
    /// Interior layer that absorbs and/or scatters.
    Turbid,
}

/// A layer of the stack with its depth interval and critical-angle cosines.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub n: f64,
    pub g: f64,
    pub mua: f64,
    pub mus: f64,
    pub z_top: f64,
    pub z_bottom: f64,
    /// Cosine of the critical angle at the top face (0 when no total internal
    /// reflection is possible there).
    pub cos_crit_top: f64,
    /// Cosine of the critical angle at the bottom face.
    pub cos_crit_bottom: f64,
}

impl Layer {
    /// Total interaction coefficient `mua + mus`.
    pub fn mu_t(&self) -> f64 {
        self.mua + self.mus
    }

    pub fn albedo(&self) -> f64 {
        let mu_t = self.mu_t();
        if mu_t > 0.0 { self.mus / mu_t } else { 0.0 }
    }

    fn is_clear(&self) -> bool {
        self.mua == 0.0 && self.mus == 0.0
    }
}

/// Immutable description of the layered medium.
///
/// Index 0 and the last index are the ambient media; tissue layers are
/// `1..=num_tissue_layers()`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStack {
    layers: Vec<Layer>,
    specular: f64,
}

impl LayerStack {
    /// Builds the stack from layer specs ordered top to bottom, including the
    /// two ambient media.
    pub fn from_specs(specs: &[LayerSpec]) -> Result<Self> {
        if specs.len() < 3 {
            bail!(
                "A layer stack needs two ambient media and at least one tissue layer, got {} layers",
                specs.len()
            );
        }
        let last = specs.len() - 1;
        let mut layers = Vec::with_capacity(specs.len());
        let mut z = 0.0;
        for (i, spec) in specs.iter().enumerate() {
            let (z_top, z_bottom) = if i == 0 {
                (f64::NEG_INFINITY, 0.0)
            } else if i == last {
                (z, f64::INFINITY)
            } else {
                if spec.thickness.is_nan() || spec.thickness <= 0.0 {
                    bail!(
                        "Layer '{}' must have a positive thickness, got {}",
                        spec.name,
                        spec.thickness
                    );
                }
                (z, z + spec.thickness)
            };
            z = z_bottom;
            layers.push(Layer {
                name: spec.name.clone(),
                kind: LayerKind::Turbid,
                n: spec.n,
                g: spec.g,
                mua: spec.mua,
                mus: spec.mus,
                z_top,
                z_bottom,
                cos_crit_top: 0.0,
                cos_crit_bottom: 0.0,
            });
        }
        Self::new(layers)
    }

    /// Validates explicitly placed layers and precomputes the critical-angle
    /// table and the specular reflectance.
    ///
    /// The `kind` and critical cosines of the input are ignored and derived here.
    pub fn new(mut layers: Vec<Layer>) -> Result<Self> {
        if layers.len() < 3 {
            bail!(
                "A layer stack needs two ambient media and at least one tissue layer, got {} layers",
                layers.len()
            );
        }
        let last = layers.len() - 1;

        for (i, layer) in layers.iter().enumerate() {
            if !(layer.n.is_finite() && layer.n > 0.0) {
                bail!(
                    "Layer {} ('{}'): refractive index must be positive, got {}",
                    i,
                    layer.name,
                    layer.n
                );
            }
            if !(layer.mua.is_finite() && layer.mua >= 0.0) {
                bail!(
                    "Layer {} ('{}'): absorption coefficient must be non-negative, got {}",
                    i,
                    layer.name,
                    layer.mua
                );
            }
            if !(layer.mus.is_finite() && layer.mus >= 0.0) {
                bail!(
                    "Layer {} ('{}'): scattering coefficient must be non-negative, got {}",
                    i,
                    layer.name,
                    layer.mus
                );
            }
            if !(-1.0..=1.0).contains(&layer.g) {
                bail!(
                    "Layer {} ('{}'): anisotropy must be within [-1, 1], got {}",
                    i,
                    layer.name,
                    layer.g
                );
            }
            if layer.z_top.is_nan() || layer.z_bottom.is_nan() {
                bail!("Layer {} ('{}'): depth is NaN", i, layer.name);
            }
            if i > 0 && i < last && layer.z_bottom <= layer.z_top {
                bail!(
                    "Layer {} ('{}'): bottom depth {} must lie below top depth {}",
                    i,
                    layer.name,
                    layer.z_bottom,
                    layer.z_top
                );
            }
            if i > 0 {
                let above = &layers[i - 1];
                if layer.z_top != above.z_bottom {
                    bail!(
                        "Layers are not contiguous: '{}' ends at {} but '{}' starts at {}",
                        above.name,
                        above.z_bottom,
                        layer.name,
                        layer.z_top
                    );
                }
                if layer.z_bottom < above.z_bottom {
                    bail!(
                        "Layer depths must increase downwards: '{}' ends above '{}'",
                        layer.name,
                        above.name
                    );
                }
            }
        }
        if layers[0].z_bottom != 0.0 {
            bail!(
                "The tissue surface must be at z = 0, got {}",
                layers[0].z_bottom
            );
        }

        for i in 0..layers.len() {
            let kind = if i == 0 || i == last {
                LayerKind::Ambient
            } else if layers[i].is_clear() {
                LayerKind::Clear
            } else {
                LayerKind::Turbid
            };
            layers[i].kind = kind;

            if kind == LayerKind::Ambient {
                layers[i].cos_crit_top = 0.0;
                layers[i].cos_crit_bottom = 0.0;
            } else {
                let n_i = layers[i].n;
                layers[i].cos_crit_top = critical_cosine(n_i, layers[i - 1].n);
                layers[i].cos_crit_bottom = critical_cosine(n_i, layers[i + 1].n);
            }
        }

        let specular = specular_reflectance(&layers);
        Ok(Self { layers, specular })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> &Layer {
        &self.layers[index]
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Number of layers between the two ambient media.
    pub fn num_tissue_layers(&self) -> usize {
        self.layers.len() - 2
    }

    /// Specular reflectance `Rsp` at the top of the stack.
    pub fn specular(&self) -> f64 {
        self.specular
    }

    /// Whether `index` is one of the two ambient media.
    pub fn is_exit(&self, index: usize) -> bool {
        index == 0 || index == self.layers.len() - 1
    }

    /// Layer in which a packet starts its walk.
    ///
    /// A clear first layer is skipped because the specular reflectance already
    /// accounts for the multiple reflections inside it.
    pub fn launch_layer(&self) -> usize {
        if self.layers[1].kind == LayerKind::Clear {
            2
        } else {
            1
        }
    }

    /// Tissue layer that owns depth `z`. Depths past the last tissue layer map
    /// onto it.
    pub fn layer_at_depth(&self, z: f64) -> usize {
        let num_tissue = self.num_tissue_layers();
        let mut i = 1;
        while z >= self.layers[i].z_bottom && i < num_tissue {
            i += 1;
        }
        i
    }
}

/// Cosine of the critical angle when going from index `n_i` into `n_t`.
///
/// Zero when `n_t > n_i`, since no total internal reflection exists then.
pub fn critical_cosine(n_i: f64, n_t: f64) -> f64 {
    if n_i >= n_t {
        (1.0 - (n_t * n_t) / (n_i * n_i)).sqrt()
    } else {
        0.0
    }
}

/// Normal-incidence Fresnel reflectance of a single interface.
pub fn normal_reflectance(n1: f64, n2: f64) -> f64 {
    let r = (n1 - n2) / (n1 + n2);
    r * r
}

fn specular_reflectance(layers: &[Layer]) -> f64 {
    let r1 = normal_reflectance(layers[0].n, layers[1].n);
    if layers[1].kind == LayerKind::Clear {
        // Geometric series of reflections bouncing inside the clear layer
        let r2 = normal_reflectance(layers[1].n, layers[2].n);
        r1 + (1.0 - r1) * (1.0 - r1) * r2 / (1.0 - r1 * r2)
    } else {
        r1
    }
}
