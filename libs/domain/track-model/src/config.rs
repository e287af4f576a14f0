//! Process-wide configuration: fixed per-iteration and per-geometry,
//! never mutated by the finding engine itself.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Propagation behaviour flags. A flat bitfield rather than a class
    /// hierarchy so plans and per-iteration configs can compose them by OR
    /// (spec §9).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PropagationFlags: u32 {
        /// Use a layer-dependent parameterized B field instead of a uniform one.
        const USE_PARAM_B_FIELD = 1 << 0;
        /// Add multiple-scattering + energy-loss covariance inflation at the
        /// layer boundary.
        const APPLY_MATERIAL = 1 << 1;
    }
}

impl Default for PropagationFlags {
    fn default() -> Self {
        PropagationFlags::empty()
    }
}

/// The six named propagation-flag sets a finding pass selects among,
/// grouped the way `Create_CMS_2017` assigns them once per geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationFlagSets {
    pub finding_inter_layer: PropagationFlags,
    pub finding_intra_layer: PropagationFlags,
    pub backward_fit: PropagationFlags,
    pub forward_fit: PropagationFlags,
    pub seed_fit: PropagationFlags,
    pub pca_prop: PropagationFlags,
}

impl Default for PropagationFlagSets {
    fn default() -> Self {
        Self {
            finding_inter_layer: PropagationFlags::APPLY_MATERIAL,
            finding_intra_layer: PropagationFlags::empty(),
            backward_fit: PropagationFlags::APPLY_MATERIAL,
            forward_fit: PropagationFlags::USE_PARAM_B_FIELD | PropagationFlags::APPLY_MATERIAL,
            seed_fit: PropagationFlags::empty(),
            pca_prop: PropagationFlags::empty(),
        }
    }
}

/// The recognized configuration surface (spec §6.3). Values are fixed per
/// iteration and per geometry; the finding engine only ever reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    pub nlayers_per_seed: usize,
    pub max_cand: usize,
    pub max_cands_per_seed: usize,
    pub max_holes_per_cand: usize,
    pub max_consec_holes: usize,
    pub chi2_cut: f64,
    pub chi2_cut_overlap: f64,
    pub pt_cut_overlap: f64,
    pub max_chi2_for_ranking: f64,
    pub valid_hit_bonus: f64,
    pub missing_hit_penalty: f64,
    pub n_sigma: f64,
    pub min_d_eta: f64,
    pub max_d_eta: f64,
    pub min_d_phi: f64,
    pub max_d_phi: f64,
    pub n_phi_part: usize,
    pub propagation_flags: PropagationFlagSets,
    pub b_field_tesla: f64,
}

impl Default for FinderConfig {
    /// CMS-2017-like values, matching the constants `Create_CMS_2017` sets
    /// once per geometry before the bulk of the remaining knobs moved to
    /// per-iteration configuration.
    fn default() -> Self {
        Self {
            nlayers_per_seed: 4,
            max_cand: 5,
            max_cands_per_seed: 5,
            max_holes_per_cand: 4,
            max_consec_holes: 1,
            chi2_cut: 30.0,
            chi2_cut_overlap: 3.0,
            pt_cut_overlap: 0.12,
            max_chi2_for_ranking: 100.0,
            valid_hit_bonus: 10.0,
            missing_hit_penalty: 5.0,
            n_sigma: 3.0,
            min_d_eta: 0.0,
            max_d_eta: 0.1,
            min_d_phi: 0.0,
            max_d_phi: 0.3,
            n_phi_part: 63,
            propagation_flags: PropagationFlagSets::default(),
            b_field_tesla: 3.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_cms_2017_documented_constants() {
        let config = FinderConfig::default();
        assert_eq!(config.nlayers_per_seed, 4);
        assert_eq!(config.max_cand, 5);
        assert_eq!(config.max_holes_per_cand, 4);
        assert_eq!(config.max_consec_holes, 1);
        assert!((config.chi2_cut - 30.0).abs() < 1.0e-12);
    }

    #[test]
    fn forward_fit_flags_combine_both_named_bits() {
        let flags = PropagationFlagSets::default().forward_fit;
        assert!(flags.contains(PropagationFlags::USE_PARAM_B_FIELD));
        assert!(flags.contains(PropagationFlags::APPLY_MATERIAL));
    }
}
