//! Fixed-size linear algebra for the curvilinear track state.
//!
//! # Core math
//!
//! The track-finding engine works exclusively with a 6-parameter state
//! vector `(x, y, z, q/pT, phi, theta)` and its 6x6 error (covariance)
//! matrix. Pulling in a general-purpose linear algebra crate for a fixed,
//! never-resized 6x6 problem would trade a predictable, inlinable hot path
//! for dynamic dispatch we don't need — so, as with the rest of this
//! workspace's numerical core, the handful of operations actually used
//! (symmetric storage, Jacobian congruence transport, a positive-semidefinite
//! check) are hand-rolled here.
//!
//! Nothing in this crate allocates on the heap; every type is `Copy`.

pub mod matrix6;
pub mod sym_matrix6;
pub mod vector3;
pub mod vector6;

pub use matrix6::Matrix6;
pub use sym_matrix6::SymMatrix6;
pub use vector3::Vector3;
pub use vector6::Vector6;

/// Curvilinear state vector index of the x coordinate.
pub const IDX_X: usize = 0;
/// Curvilinear state vector index of the y coordinate.
pub const IDX_Y: usize = 1;
/// Curvilinear state vector index of the z coordinate.
pub const IDX_Z: usize = 2;
/// Curvilinear state vector index of q/pT (signed inverse transverse momentum).
pub const IDX_INV_PT: usize = 3;
/// Curvilinear state vector index of the azimuthal angle phi.
pub const IDX_PHI: usize = 4;
/// Curvilinear state vector index of the polar angle theta.
pub const IDX_THETA: usize = 5;
