//! Aggregates a [`BinInfo`] for every layer in an event.

use crate::bin_info::BinInfo;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Default bucket counts; overridable via [`HitIndex::build_with_bins`] for
/// geometries or configs that want finer or coarser binning.
pub const DEFAULT_N_ETA_BINS: usize = 64;
pub const DEFAULT_N_PHI_BINS: usize = 64;

/// Per-event, per-layer hit index. Built once after a layer's hits are
/// known, then shared read-only across every candidate-finding task for
/// that event.
#[derive(Debug, Clone)]
pub struct HitIndex {
    per_layer: Vec<BinInfo>,
}

impl HitIndex {
    /// Builds the index for every layer concurrently: each layer's bucket
    /// structure depends only on that layer's own hits, so there is no
    /// cross-layer coordination needed during the build (mirrors the
    /// embarrassingly-parallel per-shard build this workspace's other
    /// indexing structures use).
    #[instrument(skip(layer_positions))]
    pub fn build(layer_positions: &[Vec<(f64, f64)>], eta_min: f64, eta_max: f64) -> Self {
        Self::build_with_bins(
            layer_positions,
            eta_min,
            eta_max,
            DEFAULT_N_ETA_BINS,
            DEFAULT_N_PHI_BINS,
        )
    }

    #[instrument(skip(layer_positions))]
    pub fn build_with_bins(
        layer_positions: &[Vec<(f64, f64)>],
        eta_min: f64,
        eta_max: f64,
        n_eta_bins: usize,
        n_phi_bins: usize,
    ) -> Self {
        debug!(n_layers = layer_positions.len(), "building per-layer hit index");
        let per_layer = layer_positions
            .par_iter()
            .map(|positions| BinInfo::build(positions, n_eta_bins, n_phi_bins, eta_min, eta_max))
            .collect();
        Self { per_layer }
    }

    #[must_use]
    pub fn layer(&self, layer_id: usize) -> Option<&BinInfo> {
        self.per_layer.get(layer_id)
    }

    #[must_use]
    pub fn get_cand_hit_indices(
        &self,
        layer_id: usize,
        eta_lo: f64,
        eta_hi: f64,
        phi_lo: f64,
        phi_hi: f64,
    ) -> Vec<u32> {
        self.layer(layer_id)
            .map(|bin_info| bin_info.get_cand_hit_indices(eta_lo, eta_hi, phi_lo, phi_hi))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_indexes_every_layer_independently() {
        let layers = vec![vec![(0.0, 0.0)], vec![(0.5, 1.0), (-0.5, -1.0)]];
        let index = HitIndex::build(&layers, -2.5, 2.5);
        assert_eq!(index.get_cand_hit_indices(0, -2.5, 2.5, -3.2, 3.2).len(), 1);
        assert_eq!(index.get_cand_hit_indices(1, -2.5, 2.5, -3.2, 3.2).len(), 2);
    }

    #[test]
    fn unknown_layer_returns_no_hits_rather_than_panicking() {
        let layers = vec![vec![(0.0, 0.0)]];
        let index = HitIndex::build(&layers, -2.5, 2.5);
        assert!(index.get_cand_hit_indices(5, -2.5, 2.5, -3.2, 3.2).is_empty());
    }
}
