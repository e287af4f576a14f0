//! Transports a [`TrackState`] from its current surface to a target
//! barrel radius or endcap z, carrying the covariance along via a
//! numerically-differentiated Jacobian.

use crate::error::PropagationError;
use crate::surface::Surface;
use std::f64::consts::PI;
use tracing::{instrument, trace};
use trackforge_linalg::{Matrix6, Vector6};
use trackforge_model::config::PropagationFlags;
use trackforge_model::track_state::TrackState;

/// Small diagonal covariance inflation applied at a layer boundary when
/// `APPLY_MATERIAL` is set, standing in for multiple-scattering and
/// energy-loss growth. A fixed constant rather than a thickness-dependent
/// budget — the per-layer material map is one of the out-of-scope external
/// geometry tables (spec §1).
const MATERIAL_INFLATION_PHI_THETA: f64 = 1.0e-6;
const MATERIAL_INFLATION_INV_PT: f64 = 1.0e-8;

/// Step sizes for the central-difference Jacobian, one per curvilinear
/// parameter (position in cm, 1/pT in 1/GeV, angles in radians).
const JACOBIAN_STEP: [f64; 6] = [1.0e-4, 1.0e-4, 1.0e-4, 1.0e-7, 1.0e-7, 1.0e-7];

/// Fractional drop in field strength per cm of transverse radius applied
/// under `USE_PARAM_B_FIELD`, standing in for the real radial field map
/// (one of the out-of-scope external geometry tables, spec §1). Chosen
/// small enough to be a second-order correction, not a replacement for a
/// real map.
const PARAM_B_FIELD_RADIAL_FALLOFF: f64 = 2.0e-4;

fn normalize_phi(phi: f64) -> f64 {
    let mut wrapped = phi;
    while wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    while wrapped <= -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// Transports `(x, y, phi)` forward by `transverse_arc_length` along the
/// circle of the given field (or a straight line at `b_field_tesla == 0`).
/// `z` and `theta` are handled by the caller, since they depend on which
/// kind of surface is being targeted.
fn advance_transverse(params: Vector6, transverse_arc_length: f64, b_field_tesla: f64) -> (f64, f64, f64) {
    if b_field_tesla == 0.0 {
        let new_x = params.x() + transverse_arc_length * params.phi().cos();
        let new_y = params.y() + transverse_arc_length * params.phi().sin();
        return (new_x, new_y, params.phi());
    }

    let state = TrackState::new(params, trackforge_linalg::SymMatrix6::zero());
    let r = state.helix_radius(b_field_tesla);
    let charge = f64::from(params.charge());
    let (cx, cy) = state.circle_center(b_field_tesla);
    let theta0 = (params.y() - cy).atan2(params.x() - cx);
    let delta_theta = -charge * transverse_arc_length / r;
    let theta_new = theta0 + delta_theta;

    let new_x = cx + r * theta_new.cos();
    let new_y = cy + r * theta_new.sin();
    let new_phi = normalize_phi(params.phi() + delta_theta);
    (new_x, new_y, new_phi)
}

fn propagate_params(
    params: Vector6,
    surface: Surface,
    b_field_tesla: f64,
) -> Result<Vector6, PropagationError> {
    let state = TrackState::new(params, trackforge_linalg::SymMatrix6::zero());

    let (transverse_arc_length, z_new) = match surface {
        Surface::Barrel { radius } => {
            let arc_length = state
                .transverse_arc_length_to_radius(radius, b_field_tesla)
                .ok_or(PropagationError::SurfaceUnreachable)?;
            let z_new = state.z_at_r(radius, b_field_tesla).ok_or(PropagationError::NonConvergent)?;
            (arc_length, z_new)
        }
        Surface::Endcap { z } => {
            let cos_theta = params.theta().cos();
            if cos_theta.abs() < 1.0e-12 {
                return Err(PropagationError::SurfaceUnreachable);
            }
            let path_length = (z - params.z()) / cos_theta;
            if path_length < 0.0 {
                return Err(PropagationError::SurfaceUnreachable);
            }
            (path_length * params.theta().sin(), z)
        }
    };

    let (x_new, y_new, phi_new) = advance_transverse(params, transverse_arc_length, b_field_tesla);
    Ok(Vector6::new(x_new, y_new, z_new, params.inv_pt(), phi_new, params.theta()))
}

/// Propagates a state to a target surface, transporting covariance through
/// a numerically-differentiated Jacobian of the transport map. Configured
/// with a flat [`PropagationFlags`] bitfield (spec §9: a flag enum, not a
/// class hierarchy) and a field strength.
#[derive(Debug, Clone, Copy)]
pub struct Propagator {
    pub flags: PropagationFlags,
    pub b_field_tesla: f64,
}

impl Propagator {
    #[must_use]
    pub fn new(flags: PropagationFlags, b_field_tesla: f64) -> Self {
        Self { flags, b_field_tesla }
    }

    /// Field strength to propagate with at `surface`. Under
    /// `USE_PARAM_B_FIELD` the nominal field is scaled down slightly with
    /// transverse radius (`PARAM_B_FIELD_RADIAL_FALLOFF`), the one
    /// dimension a real parameterized map this engine doesn't have would
    /// vary along; without the flag the nominal field is uniform.
    fn effective_b_field(&self, surface: Surface) -> f64 {
        if !self.flags.contains(PropagationFlags::USE_PARAM_B_FIELD) {
            return self.b_field_tesla;
        }
        let radius = match surface {
            Surface::Barrel { radius } => radius,
            Surface::Endcap { z } => z.abs(),
        };
        (self.b_field_tesla * (1.0 - PARAM_B_FIELD_RADIAL_FALLOFF * radius)).max(0.0)
    }

    /// Propagates `state` to `surface`. Returns `Err` on non-convergence or
    /// an unreachable surface — callers kill the candidate branch on `Err`
    /// and never bubble it further (spec §7).
    #[instrument(skip(self, state), fields(b_field = self.b_field_tesla))]
    pub fn propagate(&self, state: &TrackState, surface: Surface) -> Result<TrackState, PropagationError> {
        debug_assert!(state.valid, "propagator input state must be valid");
        let b_field = self.effective_b_field(surface);

        let new_params = propagate_params(state.params, surface, b_field)?;
        let jacobian = self.numerical_jacobian(state.params, surface, b_field)?;
        let mut new_errors = jacobian.transport_covariance(&state.errors);

        if self.flags.contains(PropagationFlags::APPLY_MATERIAL) {
            new_errors = Self::inflate_for_material(new_errors);
        }

        trace!(x = new_params.x(), y = new_params.y(), z = new_params.z(), "propagated state");
        Ok(TrackState::new(new_params, new_errors))
    }

    fn inflate_for_material(mut errors: trackforge_linalg::SymMatrix6) -> trackforge_linalg::SymMatrix6 {
        use trackforge_linalg::{IDX_INV_PT, IDX_PHI, IDX_THETA};
        let inflated_phi = errors.at(IDX_PHI, IDX_PHI) + MATERIAL_INFLATION_PHI_THETA;
        let inflated_theta = errors.at(IDX_THETA, IDX_THETA) + MATERIAL_INFLATION_PHI_THETA;
        let inflated_inv_pt = errors.at(IDX_INV_PT, IDX_INV_PT) + MATERIAL_INFLATION_INV_PT;
        errors.set_sym(IDX_PHI, IDX_PHI, inflated_phi);
        errors.set_sym(IDX_THETA, IDX_THETA, inflated_theta);
        errors.set_sym(IDX_INV_PT, IDX_INV_PT, inflated_inv_pt);
        errors
    }

    /// Central-difference Jacobian of the transport map at `params`. A
    /// perturbation that itself fails to reach the surface falls back to a
    /// one-sided difference so a single marginal direction never aborts
    /// the whole propagation.
    fn numerical_jacobian(
        &self,
        params: Vector6,
        surface: Surface,
        b_field: f64,
    ) -> Result<Matrix6, PropagationError> {
        let base = propagate_params(params, surface, b_field)?;
        let mut jacobian = Matrix6::zero();

        for column in 0..6 {
            let step = JACOBIAN_STEP[column];
            let mut plus = params.as_array();
            plus[column] += step;
            let mut minus = params.as_array();
            minus[column] -= step;

            let forward = propagate_params(Vector6::from_array(plus), surface, b_field);
            let backward = propagate_params(Vector6::from_array(minus), surface, b_field);

            let (derivative, denom) = match (forward, backward) {
                (Ok(f), Ok(b)) => (Self::diff(f, b), 2.0 * step),
                (Ok(f), Err(_)) => (Self::diff(f, base), step),
                (Err(_), Ok(b)) => (Self::diff(base, b), step),
                (Err(_), Err(_)) => continue,
            };

            for row in 0..6 {
                jacobian.set(row, column, derivative[row] / denom);
            }
        }

        Ok(jacobian)
    }

    fn diff(a: Vector6, b: Vector6) -> [f64; 6] {
        let a = a.as_array();
        let b = b.as_array();
        let mut out = [0.0; 6];
        for i in 0..6 {
            out[i] = a[i] - b[i];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackforge_linalg::SymMatrix6;

    fn forward_state() -> TrackState {
        TrackState::new(Vector6::new(5.0, 0.0, 0.0, 0.2, 0.1, 1.2), SymMatrix6::identity())
    }

    #[test]
    fn barrel_propagation_lands_on_the_target_radius() {
        let propagator = Propagator::new(PropagationFlags::empty(), 3.8);
        let state = forward_state();
        let target = state.max_reach_radius(3.8) * 0.5;
        let propagated = propagator.propagate(&state, Surface::Barrel { radius: target }).expect("reachable");
        assert!((propagated.params.rho() - target).abs() < 1.0e-4);
    }

    #[test]
    fn unreachable_barrel_radius_is_an_error() {
        let propagator = Propagator::new(PropagationFlags::empty(), 3.8);
        let state = forward_state();
        let unreachable = state.max_reach_radius(3.8) * 10.0;
        assert!(propagator.propagate(&state, Surface::Barrel { radius: unreachable }).is_err());
    }

    #[test]
    fn endcap_propagation_lands_on_the_target_z() {
        let propagator = Propagator::new(PropagationFlags::empty(), 3.8);
        let state = forward_state();
        let propagated = propagator.propagate(&state, Surface::Endcap { z: 40.0 }).expect("forward in z");
        assert!((propagated.params.z() - 40.0).abs() < 1.0e-6);
    }

    #[test]
    fn param_b_field_flag_softens_the_field_with_radius() {
        let nominal = Propagator::new(PropagationFlags::empty(), 3.8);
        let parameterized = Propagator::new(PropagationFlags::USE_PARAM_B_FIELD, 3.8);
        let target = Surface::Barrel { radius: 40.0 };
        assert!(parameterized.effective_b_field(target) < nominal.effective_b_field(target));
        assert!((nominal.effective_b_field(target) - 3.8).abs() < 1.0e-12);
    }

    #[test]
    fn material_flag_inflates_the_propagated_covariance() {
        let with_material = Propagator::new(PropagationFlags::APPLY_MATERIAL, 3.8);
        let without_material = Propagator::new(PropagationFlags::empty(), 3.8);
        let state = forward_state();
        let target = state.max_reach_radius(3.8) * 0.5;

        let a = with_material.propagate(&state, Surface::Barrel { radius: target }).unwrap();
        let b = without_material.propagate(&state, Surface::Barrel { radius: target }).unwrap();
        assert!(a.errors.at(4, 4) > b.errors.at(4, 4));
    }

    #[test]
    fn propagated_covariance_stays_positive_semidefinite() {
        let propagator = Propagator::new(PropagationFlags::APPLY_MATERIAL, 3.8);
        let state = forward_state();
        let target = state.max_reach_radius(3.8) * 0.5;
        let propagated = propagator.propagate(&state, Surface::Barrel { radius: target }).unwrap();
        assert!(propagated.errors.is_positive_semidefinite(1.0e-6));
    }
}
