//! Chi-squared gating and the Kalman state update.
//!
//! The measurement model only observes position: `H` is the 3x6 matrix
//! that picks out `(x, y, z)` from the curvilinear state, so the residual
//! covariance `S = H*P*H^T + V` is just the top-left 3x3 block of the
//! state covariance plus the hit's own position covariance.

use crate::error::KalmanError;
use trackforge_linalg::SymMatrix6;
use trackforge_model::hit::Hit;
use trackforge_model::track_state::TrackState;

/// Sentinel returned by [`KalmanUpdater::compute_chi2`] when `S` is
/// singular — gating always rejects it since every real chi-squared cut is
/// finite (spec §4.5).
pub const SINGULAR_CHI2_SENTINEL: f64 = f64::INFINITY;

fn position_covariance_block(m: &SymMatrix6) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = m.at(i, j);
        }
    }
    out
}

fn add3(a: [[f64; 3]; 3], b: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][j] + b[i][j];
        }
    }
    out
}

fn determinant3(m: [[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn invert3(m: [[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = determinant3(m);
    if det.abs() < 1.0e-18 {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut adj = [[0.0; 3]; 3];
    adj[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    adj[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    adj[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
    adj[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    adj[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    adj[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
    adj[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    adj[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    adj[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;
    Some(adj)
}

/// Computes chi-squared and the Kalman-updated state for a propagated
/// state against a hit measurement. Both functions are pure and must stay
/// bit-stable under the same inputs across threads (spec §4.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct KalmanUpdater;

impl KalmanUpdater {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Forms the residual `r = m - H*x` and its covariance
    /// `S = H*P*H^T + V`, returns `r^T * S^-1 * r`, or the `+inf` sentinel
    /// if `S` is singular.
    #[must_use]
    pub fn compute_chi2(&self, propagated: &TrackState, hit: &Hit) -> f64 {
        let residual = [
            hit.position.x - propagated.params.x(),
            hit.position.y - propagated.params.y(),
            hit.position.z - propagated.params.z(),
        ];
        let s = add3(position_covariance_block(&propagated.errors), position_covariance_block(&hit.covariance));
        let Some(s_inv) = invert3(s) else {
            return SINGULAR_CHI2_SENTINEL;
        };

        let mut chi2 = 0.0;
        for i in 0..3 {
            let mut s_inv_r_i = 0.0;
            for j in 0..3 {
                s_inv_r_i += s_inv[i][j] * residual[j];
            }
            chi2 += residual[i] * s_inv_r_i;
        }
        chi2
    }

    /// Returns the Kalman-updated state and covariance. When `S` is
    /// singular, returns the input state unchanged (the caller has already
    /// rejected the branch via the `+inf` chi-squared sentinel).
    #[must_use]
    pub fn update_parameters(&self, propagated: &TrackState, hit: &Hit) -> Result<TrackState, KalmanError> {
        let p = propagated.errors;
        let residual = [
            hit.position.x - propagated.params.x(),
            hit.position.y - propagated.params.y(),
            hit.position.z - propagated.params.z(),
        ];
        let s = add3(position_covariance_block(&p), position_covariance_block(&hit.covariance));
        let s_inv = invert3(s).ok_or(KalmanError::SingularResidualCovariance)?;

        // K = P * H^T * S^-1, a 6x3 matrix: row i is P's i-th row restricted
        // to the first 3 columns, times S^-1.
        let mut gain = [[0.0; 3]; 6];
        for i in 0..6 {
            for j in 0..3 {
                let mut acc = 0.0;
                for k in 0..3 {
                    acc += p.at(i, k) * s_inv[k][j];
                }
                gain[i][j] = acc;
            }
        }

        let mut new_params = propagated.params.as_array();
        for (i, param) in new_params.iter_mut().enumerate() {
            *param += gain[i][0] * residual[0] + gain[i][1] * residual[1] + gain[i][2] * residual[2];
        }

        // P' = P - K*H*P. (K*H*P)[i][j] = sum_k gain[i][k] * P[k][j], since
        // H*P is just P's first 3 rows.
        let mut new_errors = SymMatrix6::zero();
        for i in 0..6 {
            for j in i..6 {
                let mut correction = 0.0;
                for k in 0..3 {
                    correction += gain[i][k] * p.at(k, j);
                }
                new_errors.set_sym(i, j, p.at(i, j) - correction);
            }
        }

        Ok(TrackState::new(trackforge_linalg::Vector6::from_array(new_params), new_errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackforge_linalg::Vector3;
    use trackforge_linalg::Vector6;

    fn state_at_origin() -> TrackState {
        TrackState::new(Vector6::new(1.0, 2.0, 3.0, 0.3, 0.1, 1.2), SymMatrix6::identity())
    }

    fn hit_at(x: f64, y: f64, z: f64) -> Hit {
        Hit::new(Vector3::new(x, y, z), SymMatrix6::identity(), 0, 0)
    }

    #[test]
    fn exact_hit_on_the_helix_gives_zero_chi2() {
        let updater = KalmanUpdater::new();
        let state = state_at_origin();
        let hit = hit_at(1.0, 2.0, 3.0);
        assert!(updater.compute_chi2(&state, &hit).abs() < 1.0e-9);
    }

    #[test]
    fn offset_hit_gives_positive_chi2() {
        let updater = KalmanUpdater::new();
        let state = state_at_origin();
        let hit = hit_at(2.0, 2.0, 3.0);
        assert!(updater.compute_chi2(&state, &hit) > 0.0);
    }

    #[test]
    fn update_moves_state_toward_the_hit() {
        let updater = KalmanUpdater::new();
        let state = state_at_origin();
        let hit = hit_at(2.0, 2.0, 3.0);
        let updated = updater.update_parameters(&state, &hit).expect("S is invertible");
        assert!(updated.params.x() > state.params.x());
        assert!(updated.params.x() < hit.position.x);
    }

    #[test]
    fn updated_covariance_stays_positive_semidefinite() {
        let updater = KalmanUpdater::new();
        let state = state_at_origin();
        let hit = hit_at(1.2, 1.8, 3.1);
        let updated = updater.update_parameters(&state, &hit).expect("S is invertible");
        assert!(updated.errors.is_positive_semidefinite(1.0e-6));
    }
}
