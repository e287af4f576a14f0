//! A single position measurement.

use serde::{Deserialize, Serialize};
use trackforge_linalg::{SymMatrix6, Vector3};

/// An immutable 3D measurement with its own 3x3 position covariance,
/// embedded as the top-left block of a [`SymMatrix6`] so it composes
/// directly with the curvilinear state's error matrix during gating.
///
/// Identity within a layer is positional: a `Hit`'s index is its position
/// in that layer's `Vec<Hit>`, never a field on the struct itself (spec
/// §3: "Identity within a layer is its position in that sequence").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub position: Vector3,
    pub covariance: SymMatrix6,
    pub layer_id: usize,
    /// Opaque detector identifier, passed through untouched.
    pub detector_id: u64,
}

impl Hit {
    #[must_use]
    pub fn new(position: Vector3, covariance: SymMatrix6, layer_id: usize, detector_id: u64) -> Self {
        Self { position, covariance, layer_id, detector_id }
    }

    #[must_use]
    pub fn eta(&self) -> f64 {
        self.position.eta()
    }

    #[must_use]
    pub fn phi(&self) -> f64 {
        self.position.phi()
    }
}
