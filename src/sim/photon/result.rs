use anyhow::{Result, bail};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::sim::engine::{Deposit, Tally};
use crate::sim::layers::LayerStack;

use super::config::GridGeometry;

/// Accumulated and normalized output of a photon-transport run.
///
/// While photons are being traced only the raw 2D grids (`rd_ra`, `tt_ra`,
/// `a_rz`) receive weight. [`ResultGrid::normalize`] derives the projections
/// and scalar totals from them and converts everything to physical units:
///
/// | quantity | unit |
/// |---|---|
/// | `rsp`, `rd`, `a`, `tt`, `a_layer` | fraction of launched power |
/// | `rd_r`, `tt_r` | 1/mm^2 |
/// | `rd_a`, `tt_a` | 1/sr |
/// | `rd_ra`, `tt_ra` | 1/(mm^2 sr) |
/// | `a_z` | 1/mm |
/// | `a_rz` | 1/mm^3 |
/// | `phi_z` | dimensionless (per unit incident power) |
/// | `phi_rz` | 1/mm^2 |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGrid {
    pub geometry: GridGeometry,
    /// Photons traced into this grid.
    pub num_photons: usize,

    /// Specular reflectance. With a clear first layer this is the composed
    /// reflection of both its faces, so such a stack reports it here and not in `rd`.
    pub rsp: f64,
    pub rd: f64,
    pub a: f64,
    pub tt: f64,

    /// Diffuse reflectance `[nr, na]`.
    pub rd_ra: Array2<f64>,
    /// Transmittance `[nr, na]`.
    pub tt_ra: Array2<f64>,
    /// Absorption `[nr, nz]`.
    pub a_rz: Array2<f64>,

    pub rd_r: Array1<f64>,
    pub rd_a: Array1<f64>,
    pub tt_r: Array1<f64>,
    pub tt_a: Array1<f64>,
    pub a_z: Array1<f64>,
    /// Absorption per layer of the stack, ambient layers included (always 0).
    pub a_layer: Array1<f64>,

    pub phi_rz: Array2<f64>,
    pub phi_z: Array1<f64>,

    normalized: bool,
}

impl ResultGrid {
    pub fn new(geometry: GridGeometry, num_layers: usize) -> Self {
        let GridGeometry { nr, nz, na, .. } = geometry;
        Self {
            geometry,
            num_photons: 0,
            rsp: 0.0,
            rd: 0.0,
            a: 0.0,
            tt: 0.0,
            rd_ra: Array2::zeros((nr, na)),
            tt_ra: Array2::zeros((nr, na)),
            a_rz: Array2::zeros((nr, nz)),
            rd_r: Array1::zeros(nr),
            rd_a: Array1::zeros(na),
            tt_r: Array1::zeros(nr),
            tt_a: Array1::zeros(na),
            a_z: Array1::zeros(nz),
            a_layer: Array1::zeros(num_layers),
            phi_rz: Array2::zeros((nr, nz)),
            phi_z: Array1::zeros(nz),
            normalized: false,
        }
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Counts `n` more photons as traced into this grid.
    pub fn add_photons(&mut self, n: usize) {
        self.num_photons += n;
    }

    /// Adds the raw accumulations of another grid to this one.
    pub fn merge(&mut self, other: &ResultGrid) -> Result<()> {
        if self.normalized || other.normalized {
            bail!("Cannot merge normalized result grids");
        }
        if self.geometry != other.geometry {
            bail!("Cannot merge result grids with different geometries");
        }
        if self.a_layer.len() != other.a_layer.len() {
            bail!(
                "Cannot merge result grids for {} and {} layers",
                self.a_layer.len(),
                other.a_layer.len()
            );
        }
        self.num_photons += other.num_photons;
        self.rd_ra += &other.rd_ra;
        self.tt_ra += &other.tt_ra;
        self.a_rz += &other.a_rz;
        Ok(())
    }

    /// Converts the raw accumulations into physical quantities.
    ///
    /// May only be called once per grid.
    pub fn normalize(&mut self, stack: &LayerStack) -> Result<()> {
        if self.normalized {
            bail!("Result grid is already normalized");
        }
        if self.num_photons == 0 {
            bail!("Cannot normalize a result grid with no photons");
        }
        if stack.len() != self.a_layer.len() {
            bail!(
                "Result grid has {} layers but the stack has {}",
                self.a_layer.len(),
                stack.len()
            );
        }
        self.rsp = stack.specular();
        self.project(stack);
        self.apply_scaling();
        self.fluence(stack);
        self.normalized = true;
        Ok(())
    }

    /// `Rsp + Rd + A + Tt`, which is 1 up to roulette noise once normalized.
    pub fn energy_balance(&self) -> f64 {
        self.rsp + self.rd + self.a + self.tt
    }

    /// Sums the raw 2D grids into their 1D projections and scalar totals.
    fn project(&mut self, stack: &LayerStack) {
        self.rd_r = self.rd_ra.sum_axis(Axis(1));
        self.rd_a = self.rd_ra.sum_axis(Axis(0));
        self.tt_r = self.tt_ra.sum_axis(Axis(1));
        self.tt_a = self.tt_ra.sum_axis(Axis(0));
        self.rd = self.rd_r.sum();
        self.tt = self.tt_r.sum();

        self.a_z = self.a_rz.sum_axis(Axis(0));
        self.a_layer.fill(0.0);
        for (iz, &a) in self.a_z.iter().enumerate() {
            let layer = stack.layer_at_depth(self.geometry.bin_depth(iz));
            self.a_layer[layer] += a;
        }
        self.a = self.a_z.sum();
    }

    /// Divides every quantity by its bin measure and the photon count.
    fn apply_scaling(&mut self) {
        let g = self.geometry;
        let n = self.num_photons as f64;

        for grid in [&mut self.rd_ra, &mut self.tt_ra] {
            for ((ir, ia), v) in grid.indexed_iter_mut() {
                *v /= g.ring_area(ir) * g.bin_angle(ia).cos() * g.solid_angle(ia) * n;
            }
        }
        for radial in [&mut self.rd_r, &mut self.tt_r] {
            for (ir, v) in radial.iter_mut().enumerate() {
                *v /= g.ring_area(ir) * n;
            }
        }
        for angular in [&mut self.rd_a, &mut self.tt_a] {
            for (ia, v) in angular.iter_mut().enumerate() {
                *v /= g.solid_angle(ia) * n;
            }
        }
        self.rd /= n;
        self.tt /= n;

        for ((ir, _), v) in self.a_rz.indexed_iter_mut() {
            *v /= g.ring_area(ir) * g.dz * n;
        }
        self.a_z /= g.dz * n;
        self.a_layer /= n;
        self.a /= n;
    }

    /// Fluence is absorption over the local absorption coefficient.
    /// Bins in non-absorbing layers report 0.
    fn fluence(&mut self, stack: &LayerStack) {
        for iz in 0..self.geometry.nz {
            let mua = stack
                .layer(stack.layer_at_depth(self.geometry.bin_depth(iz)))
                .mua;
            if mua > 0.0 {
                self.phi_z[iz] = self.a_z[iz] / mua;
                let column = self.a_rz.column(iz).mapv(|a| a / mua);
                self.phi_rz.column_mut(iz).assign(&column);
            } else {
                self.phi_z[iz] = 0.0;
                self.phi_rz.column_mut(iz).fill(0.0);
            }
        }
    }
}

impl Tally for ResultGrid {
    fn record(&mut self, deposit: &Deposit) {
        let g = self.geometry;
        match *deposit {
            Deposit::Absorbed {
                radius,
                depth,
                weight,
            } => self.a_rz[[g.radial_bin(radius), g.depth_bin(depth)]] += weight,
            Deposit::Reflected {
                radius,
                cos_exit,
                weight,
            } => self.rd_ra[[g.radial_bin(radius), g.angle_bin(cos_exit)]] += weight,
            Deposit::Transmitted {
                radius,
                cos_exit,
                weight,
            } => self.tt_ra[[g.radial_bin(radius), g.angle_bin(cos_exit)]] += weight,
        }
    }
}
