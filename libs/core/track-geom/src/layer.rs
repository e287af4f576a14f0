//! A single detector surface: a barrel cylinder or an endcap disk.

use serde::{Deserialize, Serialize};

/// One measurement surface in the tracker.
///
/// Barrel layers are cylinders of fixed radius spanning `[zmin, zmax]`;
/// endcap layers are disks of fixed z spanning `[rin, rout]`. Which fields
/// are the "active" surface bound is determined by `is_barrel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub layer_id: usize,
    pub rin: f64,
    pub rout: f64,
    pub zmin: f64,
    pub zmax: f64,
    pub is_barrel: bool,
    /// True for the outermost layer of its kind (barrel or one endcap arm).
    pub is_outer: bool,
    pub neighbour_ids: Vec<usize>,
}

impl LayerInfo {
    #[must_use]
    pub fn new(
        layer_id: usize,
        rin: f64,
        rout: f64,
        zmin: f64,
        zmax: f64,
        is_barrel: bool,
    ) -> Self {
        Self {
            layer_id,
            rin,
            rout,
            zmin,
            zmax,
            is_barrel,
            is_outer: false,
            neighbour_ids: Vec::new(),
        }
    }

    /// The radius a barrel-step propagation targets.
    #[must_use]
    pub fn nominal_radius(&self) -> f64 {
        0.5 * (self.rin + self.rout)
    }

    /// Whether `z` lies within this layer's active z-extent. For a barrel
    /// layer this bounds the sensitive length of the cylinder; for an
    /// endcap layer it is the disk's own thin z-window.
    #[must_use]
    pub fn is_within_z_limits(&self, z: f64) -> bool {
        z >= self.zmin && z <= self.zmax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_within_limits_is_inclusive_of_bounds() {
        let layer = LayerInfo::new(0, 10.0, 11.0, -100.0, 100.0, true);
        assert!(layer.is_within_z_limits(-100.0));
        assert!(layer.is_within_z_limits(100.0));
        assert!(!layer.is_within_z_limits(100.1));
    }

    #[test]
    fn nominal_radius_is_midpoint_of_rin_rout() {
        let layer = LayerInfo::new(0, 10.0, 12.0, -1.0, 1.0, true);
        assert!((layer.nominal_radius() - 11.0).abs() < 1.0e-9);
    }
}
