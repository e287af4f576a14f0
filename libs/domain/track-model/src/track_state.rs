//! The fixed-size curvilinear track state and its helix predicates.

use serde::{Deserialize, Serialize};
use trackforge_linalg::{SymMatrix6, Vector6};

/// Converts `pT [GeV]` and a magnetic field `B [T]` into a transverse
/// radius of curvature in centimetres: `R = pT / (K * |B|)`.
const CURVATURE_CONSTANT: f64 = 0.003;

/// The curvilinear state: 6 parameters, their 6x6 covariance, charge, and a
/// validity flag. Invariant: `errors` is positive-semidefinite after every
/// successful update; when an update fails numerically, `valid` is cleared
/// and the state is never propagated further (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    pub params: Vector6,
    pub errors: SymMatrix6,
    pub charge: i32,
    pub valid: bool,
}

impl TrackState {
    #[must_use]
    pub fn new(params: Vector6, errors: SymMatrix6) -> Self {
        let charge = params.charge();
        Self { params, errors, charge, valid: true }
    }

    #[must_use]
    pub fn invalid() -> Self {
        Self {
            params: Vector6::default(),
            errors: SymMatrix6::zero(),
            charge: 1,
            valid: false,
        }
    }

    /// Transverse radius of the helix circle under field `b_field_tesla`.
    /// A zero field degenerates to a straight line (infinite radius).
    #[must_use]
    pub fn helix_radius(&self, b_field_tesla: f64) -> f64 {
        if b_field_tesla == 0.0 {
            return f64::INFINITY;
        }
        self.params.pt() / (CURVATURE_CONSTANT * b_field_tesla.abs())
    }

    /// Centre of the transverse circle the state travels along.
    #[must_use]
    pub fn circle_center(&self, b_field_tesla: f64) -> (f64, f64) {
        let r = self.helix_radius(b_field_tesla);
        let charge = f64::from(self.charge);
        let cx = self.params.x() - charge * r * self.params.phi().sin();
        let cy = self.params.y() + charge * r * self.params.phi().cos();
        (cx, cy)
    }

    /// Radius of the apex of the helix — the farthest transverse distance
    /// from the beamline this trajectory can ever reach.
    #[must_use]
    pub fn max_reach_radius(&self, b_field_tesla: f64) -> f64 {
        if b_field_tesla == 0.0 {
            return f64::INFINITY;
        }
        let r = self.helix_radius(b_field_tesla);
        let (cx, cy) = self.circle_center(b_field_tesla);
        (cx * cx + cy * cy).sqrt() + r
    }

    fn min_reach_radius(&self, b_field_tesla: f64) -> f64 {
        let r = self.helix_radius(b_field_tesla);
        let (cx, cy) = self.circle_center(b_field_tesla);
        ((cx * cx + cy * cy).sqrt() - r).abs()
    }

    /// Algebraic test of whether this helix ever touches radius `target_r`.
    #[must_use]
    pub fn can_reach_radius(&self, target_r: f64, b_field_tesla: f64) -> bool {
        if b_field_tesla == 0.0 {
            return target_r >= self.params.rho();
        }
        target_r >= self.min_reach_radius(b_field_tesla)
            && target_r <= self.max_reach_radius(b_field_tesla)
    }

    /// Transverse arc length (along the helix, not a chord) to the first
    /// outward intersection with radius `target_r`, or `None` if
    /// unreachable. Shared by [`Self::z_at_r`] and by the propagator, which
    /// also needs this magnitude to place the (x, y) intersection point.
    #[must_use]
    pub fn transverse_arc_length_to_radius(&self, target_r: f64, b_field_tesla: f64) -> Option<f64> {
        if !self.can_reach_radius(target_r, b_field_tesla) {
            return None;
        }
        if b_field_tesla == 0.0 {
            return Some(target_r - self.params.rho());
        }

        let r = self.helix_radius(b_field_tesla);
        let (cx, cy) = self.circle_center(b_field_tesla);
        let d0 = (cx * cx + cy * cy).sqrt();
        if d0 < 1.0e-9 {
            return None;
        }

        let cos_beta = ((d0 * d0 + r * r - target_r * target_r) / (2.0 * d0 * r)).clamp(-1.0, 1.0);
        let beta = cos_beta.acos();
        Some(r * beta)
    }

    /// `z` at the first outward intersection of this helix with the
    /// cylinder of radius `target_r`, or `None` if the helix never reaches
    /// it (callers should check [`Self::can_reach_radius`] first, or treat
    /// `None` as equivalent to an unreachable surface).
    #[must_use]
    pub fn z_at_r(&self, target_r: f64, b_field_tesla: f64) -> Option<f64> {
        let arc_length = self.transverse_arc_length_to_radius(target_r, b_field_tesla)?;
        if b_field_tesla == 0.0 {
            let s = arc_length / self.params.theta().sin();
            return Some(self.params.z() + s * self.params.theta().cos());
        }
        Some(self.params.z() + arc_length / self.params.theta().tan())
    }
}
