use rand::Rng;

use crate::geom::direction::Direction;
use crate::sim::engine::absorption::drop_weight;
use crate::sim::engine::fresnel::{COS_90, fresnel};
use crate::sim::engine::propagation::{distance_to_boundary, sample_step};
use crate::sim::engine::roulette::roulette;
use crate::sim::engine::scattering::{HenyeyGreenstein, spin};
use crate::sim::engine::{Deposit, PhotonState, Tally, Transition};
use crate::sim::layers::{LayerKind, LayerStack};

use super::config::SimulationConfig;

/// Per-run constants of the random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkParams {
    pub weight_threshold: f64,
    pub survival_chance: f64,
    pub partial_reflection: bool,
}

impl WalkParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            weight_threshold: config.weight_threshold,
            survival_chance: config.survival_chance,
            partial_reflection: config.partial_reflection,
        }
    }
}

impl Default for WalkParams {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

/// Advances photon packets through a [`LayerStack`].
///
/// The walker holds no per-photon state: [`PhotonWalker::step`] is a pure
/// transition from one [`PhotonState`] to the next, and
/// [`PhotonWalker::launch_photon`] chains transitions until the packet dies.
pub struct PhotonWalker<'a> {
    stack: &'a LayerStack,
    params: WalkParams,
}

impl<'a> PhotonWalker<'a> {
    pub fn new(stack: &'a LayerStack, params: WalkParams) -> Self {
        Self { stack, params }
    }

    /// Runs one packet from launch to termination, recording every deposit.
    ///
    /// Returns the number of transitions taken.
    pub fn launch_photon<R, T>(&self, rng: &mut R, tally: &mut T) -> usize
    where
        R: Rng + ?Sized,
        T: Tally + ?Sized,
    {
        let mut state = PhotonState::launch(self.stack);
        let mut steps = 0;
        while state.alive {
            let transition = self.step(&state, rng);
            if let Some(deposit) = transition.deposit {
                tally.record(&deposit);
            }
            state = transition.state;
            steps += 1;
        }
        steps
    }

    /// One iteration of the walk: move, then either resolve the boundary that
    /// was hit or absorb and scatter at the interaction site, then play
    /// roulette if the packet became too light.
    pub fn step<R: Rng + ?Sized>(&self, state: &PhotonState, rng: &mut R) -> Transition {
        let mut next = *state;
        if !next.alive {
            return Transition {
                state: next,
                deposit: None,
            };
        }

        let deposit = match self.stack.layer(next.layer).kind {
            LayerKind::Ambient => Some(self.leave_stack(&mut next)),
            LayerKind::Clear => self.cross_clear_layer(&mut next, rng),
            LayerKind::Turbid => self.hop_drop_spin(&mut next, rng),
        };

        if next.alive && next.weight < self.params.weight_threshold {
            match roulette(next.weight, self.params.survival_chance, rng) {
                Some(weight) => next.weight = weight,
                None => next.alive = false,
            }
        }

        Transition {
            state: next,
            deposit,
        }
    }

    /// A packet launched straight into an ambient medium (an all-clear stack)
    /// leaves immediately with its whole weight.
    fn leave_stack(&self, s: &mut PhotonState) -> Deposit {
        let upward = s.layer == 0;
        let deposit = exit_deposit(s, upward, s.direction.uz.abs(), s.weight);
        s.weight = 0.0;
        s.alive = false;
        deposit
    }

    /// Uninterrupted flight to the next face of a non-interacting layer.
    fn cross_clear_layer<R: Rng + ?Sized>(
        &self,
        s: &mut PhotonState,
        rng: &mut R,
    ) -> Option<Deposit> {
        // A (nearly) horizontal packet never reaches a face: it is lost
        if s.direction.uz.abs() < COS_90 {
            s.alive = false;
            return None;
        }
        let layer = self.stack.layer(s.layer);
        let distance = distance_to_boundary(s.position.z, s.direction, layer)?;
        s.position = s.position.hop(s.direction, distance);
        self.cross_boundary(s, rng)
    }

    fn hop_drop_spin<R: Rng + ?Sized>(&self, s: &mut PhotonState, rng: &mut R) -> Option<Deposit> {
        let layer = self.stack.layer(s.layer);
        let mu_t = layer.mu_t();

        let step = if s.residual == 0.0 {
            sample_step(mu_t, rng)
        } else {
            let step = s.residual / mu_t;
            s.residual = 0.0;
            step
        };

        if let Some(d_b) = distance_to_boundary(s.position.z, s.direction, layer)
            && step > d_b
        {
            // The rest of the step is kept in optical units so the next
            // layer's mu_t sets its physical length.
            s.residual = (step - d_b) * mu_t;
            s.position = s.position.hop(s.direction, d_b);
            return self.cross_boundary(s, rng);
        }

        s.position = s.position.hop(s.direction, step);
        let (remaining, absorbed) = drop_weight(s.weight, layer);
        s.weight = remaining;
        s.direction = spin(s.direction, &HenyeyGreenstein::new(layer.g), rng);

        (absorbed > 0.0).then(|| Deposit::Absorbed {
            radius: s.position.radius(),
            depth: s.position.z,
            weight: absorbed,
        })
    }

    /// Decides whether a packet sitting on a face of its layer is reflected
    /// back or transmitted into the neighbour.
    fn cross_boundary<R: Rng + ?Sized>(&self, s: &mut PhotonState, rng: &mut R) -> Option<Deposit> {
        let layer = self.stack.layer(s.layer);
        let upward = s.direction.is_upward();
        let (neighbor, cos_crit) = if upward {
            (s.layer - 1, layer.cos_crit_top)
        } else {
            (s.layer + 1, layer.cos_crit_bottom)
        };
        let next = self.stack.layer(neighbor);
        let cos_i = s.direction.uz.abs();

        let (reflectance, cos_t) = if cos_i <= cos_crit {
            (1.0, 0.0)
        } else {
            let f = fresnel(layer.n, next.n, cos_i);
            (f.reflectance, f.cos_transmitted)
        };
        let leaves_stack = self.stack.is_exit(neighbor);

        if leaves_stack && self.params.partial_reflection && reflectance < 1.0 {
            let deposit = exit_deposit(s, upward, cos_t, s.weight * (1.0 - reflectance));
            s.weight *= reflectance;
            s.direction = s.direction.flip_z();
            return Some(deposit);
        }

        if rng.r#gen::<f64>() > reflectance {
            if leaves_stack {
                let deposit = exit_deposit(s, upward, cos_t, s.weight);
                s.weight = 0.0;
                s.alive = false;
                return Some(deposit);
            }
            let ratio = layer.n / next.n;
            let uz = if upward { -cos_t } else { cos_t };
            s.direction = Direction::new(s.direction.ux * ratio, s.direction.uy * ratio, uz);
            s.layer = neighbor;
        } else {
            s.direction = s.direction.flip_z();
        }
        None
    }
}

/// Weight escaping through the top (reflectance) or bottom (transmittance).
fn exit_deposit(s: &PhotonState, upward: bool, cos_exit: f64, weight: f64) -> Deposit {
    let radius = s.position.radius();
    if upward {
        Deposit::Reflected {
            radius,
            cos_exit,
            weight,
        }
    } else {
        Deposit::Transmitted {
            radius,
            cos_exit,
            weight,
        }
    }
}
