//! Symmetric 6x6 matrix — the track state's error (covariance) matrix.

use crate::Matrix6;
use serde::{Deserialize, Serialize};

/// A symmetric 6x6 matrix, stored as a full array for simple indexing but
/// always written through [`Self::set_sym`] so both triangles stay in sync.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymMatrix6 {
    rows: [[f64; 6]; 6],
}

impl Default for SymMatrix6 {
    fn default() -> Self {
        Self::zero()
    }
}

impl SymMatrix6 {
    #[must_use]
    pub const fn zero() -> Self {
        Self { rows: [[0.0; 6]; 6] }
    }

    #[must_use]
    pub fn identity() -> Self {
        let mut m = Self::zero();
        for i in 0..6 {
            m.rows[i][i] = 1.0;
        }
        m
    }

    #[must_use]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    /// Writes `value` into both `(row, col)` and `(col, row)`, keeping the
    /// matrix symmetric by construction.
    pub fn set_sym(&mut self, row: usize, col: usize, value: f64) {
        self.rows[row][col] = value;
        self.rows[col][row] = value;
    }

    #[must_use]
    pub fn to_matrix6(&self) -> Matrix6 {
        let mut out = Matrix6::zero();
        for i in 0..6 {
            for j in 0..6 {
                out.set(i, j, self.rows[i][j]);
            }
        }
        out
    }

    /// Builds a `SymMatrix6` from a general matrix by averaging it with its
    /// transpose, discarding the antisymmetric part that floating-point
    /// round-off introduces during a `J * P * J^T` congruence transport.
    #[must_use]
    pub fn from_matrix6_symmetrized(m: &Matrix6) -> Self {
        let mut out = Self::zero();
        for i in 0..6 {
            for j in i..6 {
                let value = 0.5 * (m.at(i, j) + m.at(j, i));
                out.set_sym(i, j, value);
            }
        }
        out
    }

    /// Adds another symmetric matrix element-wise, used to fold in
    /// multiple-scattering/energy-loss inflation at a layer boundary.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut out = Self::zero();
        for i in 0..6 {
            for j in 0..6 {
                out.rows[i][j] = self.rows[i][j] + other.rows[i][j];
            }
        }
        out
    }

    /// Extracts the 2x2 sub-block for a given pair of parameter indices,
    /// used by the (eta, phi) search-window projection formulas.
    #[must_use]
    pub fn block2(&self, i0: usize, i1: usize) -> [[f64; 2]; 2] {
        [
            [self.rows[i0][i0], self.rows[i0][i1]],
            [self.rows[i1][i0], self.rows[i1][i1]],
        ]
    }

    /// Eigenvalues via the cyclic Jacobi rotation algorithm. Used only for
    /// positive-semidefiniteness checks in tests/debug assertions (spec §7:
    /// "Invariants are enforced via assertions in debug builds only, never
    /// at runtime hot paths") — never on the hot propagate/update path.
    #[must_use]
    pub fn eigenvalues_jacobi(&self) -> [f64; 6] {
        let mut a = self.rows;
        const MAX_SWEEPS: usize = 100;

        for _ in 0..MAX_SWEEPS {
            let mut off_diagonal_sum = 0.0;
            for p in 0..6 {
                for q in (p + 1)..6 {
                    off_diagonal_sum += a[p][q] * a[p][q];
                }
            }
            if off_diagonal_sum < 1.0e-24 {
                break;
            }

            for p in 0..6 {
                for q in (p + 1)..6 {
                    if a[p][q].abs() < 1.0e-300 {
                        continue;
                    }
                    let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                    let t = theta.signum() / (theta.abs() + (1.0 + theta * theta).sqrt());
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = t * c;

                    let a_pp = a[p][p];
                    let a_qq = a[q][q];
                    let a_pq = a[p][q];

                    a[p][p] = c * c * a_pp - 2.0 * s * c * a_pq + s * s * a_qq;
                    a[q][q] = s * s * a_pp + 2.0 * s * c * a_pq + c * c * a_qq;
                    a[p][q] = 0.0;
                    a[q][p] = 0.0;

                    for k in 0..6 {
                        if k != p && k != q {
                            let a_kp = a[k][p];
                            let a_kq = a[k][q];
                            a[k][p] = c * a_kp - s * a_kq;
                            a[p][k] = a[k][p];
                            a[k][q] = s * a_kp + c * a_kq;
                            a[q][k] = a[k][q];
                        }
                    }
                }
            }
        }

        let mut eigenvalues = [0.0; 6];
        for (i, eigenvalue) in eigenvalues.iter_mut().enumerate() {
            *eigenvalue = a[i][i];
        }
        eigenvalues
    }

    /// Spec §8 invariant 5: `c.state.errors` must be positive-semidefinite
    /// (eigenvalues >= -eps) after every successful update.
    #[must_use]
    pub fn is_positive_semidefinite(&self, eps: f64) -> bool {
        self.eigenvalues_jacobi().iter().all(|&eigenvalue| eigenvalue >= -eps)
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A diagonal matrix built entirely from non-negative entries is
        /// positive-semidefinite by construction (its eigenvalues are its
        /// diagonal entries) — exercises the spec §8 invariant-5 check
        /// itself (`is_positive_semidefinite`) over generated diagonals.
        #[test]
        fn nonnegative_diagonal_is_always_positive_semidefinite(
            diag in prop::array::uniform6(0.0f64..1.0e6),
        ) {
            let mut m = SymMatrix6::zero();
            for (i, value) in diag.into_iter().enumerate() {
                m.set_sym(i, i, value);
            }
            prop_assert!(m.is_positive_semidefinite(1.0e-6));
        }

        /// `add` sums corresponding diagonal entries, the path used to
        /// fold material-inflation terms into a propagated covariance.
        #[test]
        fn add_sums_diagonal_entries(
            a in 0.0f64..1.0e3,
            b in 0.0f64..1.0e3,
        ) {
            let mut m1 = SymMatrix6::zero();
            m1.set_sym(0, 0, a);
            let mut m2 = SymMatrix6::zero();
            m2.set_sym(0, 0, b);
            let summed = m1.add(&m2);
            prop_assert!((summed.at(0, 0) - (a + b)).abs() < 1.0e-9);
        }
    }
}
