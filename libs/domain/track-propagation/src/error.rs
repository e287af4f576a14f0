//! Error kinds for propagation and update.
//!
//! Per spec §7, neither of these ever bubbles out of the finding loop: a
//! propagation failure kills the current candidate branch, and a Kalman
//! degeneracy is signalled through the `chi2 = +inf` sentinel so gating
//! rejects the branch on its own. They exist as typed `Result`s anyway so
//! the call sites that decide "kill this branch" stay a single, explicit
//! match rather than a silently-ignored `bool`.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PropagationError {
    #[error("helix cannot reach the requested surface")]
    SurfaceUnreachable,

    #[error("Newton iteration for the endcap intersection did not converge")]
    NonConvergent,

    #[error("curvature exceeds the configured limit")]
    CurvatureLimitExceeded,
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum KalmanError {
    #[error("residual covariance S is singular")]
    SingularResidualCovariance,
}
