//! A single layer's (eta, phi) hit index.

use std::f64::consts::PI;

/// A 2-D bucket index over one layer's hits, keyed by (eta, phi).
///
/// `getCandHitIndices` is the only query this type supports: given a
/// rectangular (eta, phi) window, return every hit index whose bucket falls
/// inside it. The returned order is unspecified — callers must not rely on
/// it (spec §4.2). `phi` wrap-around (when `phi_lo > phi_hi`, meaning the
/// window straddles the -pi/pi seam) is handled by querying two ranges and
/// concatenating them.
#[derive(Debug, Clone)]
pub struct BinInfo {
    n_eta_bins: usize,
    n_phi_bins: usize,
    eta_min: f64,
    eta_max: f64,
    /// Flattened `[eta_bin * n_phi_bins + phi_bin]` buckets of hit indices.
    buckets: Vec<Vec<u32>>,
}

impl BinInfo {
    /// Builds the index for one layer from `(eta, phi)` pairs, one per hit,
    /// in hit-index order — the hit's position in the input slice becomes
    /// its index in the returned query results.
    #[must_use]
    pub fn build(
        positions: &[(f64, f64)],
        n_eta_bins: usize,
        n_phi_bins: usize,
        eta_min: f64,
        eta_max: f64,
    ) -> Self {
        let mut buckets = vec![Vec::new(); n_eta_bins.max(1) * n_phi_bins.max(1)];
        let n_eta_bins = n_eta_bins.max(1);
        let n_phi_bins = n_phi_bins.max(1);

        for (hit_index, &(eta, phi)) in positions.iter().enumerate() {
            let eta_bin = Self::eta_bin_of(eta, eta_min, eta_max, n_eta_bins);
            let phi_bin = Self::phi_bin_of(phi, n_phi_bins);
            buckets[eta_bin * n_phi_bins + phi_bin].push(hit_index as u32);
        }

        Self { n_eta_bins, n_phi_bins, eta_min, eta_max, buckets }
    }

    fn eta_bin_of(eta: f64, eta_min: f64, eta_max: f64, n_eta_bins: usize) -> usize {
        let clamped = eta.clamp(eta_min, eta_max);
        let span = (eta_max - eta_min).max(f64::EPSILON);
        let fraction = (clamped - eta_min) / span;
        ((fraction * n_eta_bins as f64) as usize).min(n_eta_bins - 1)
    }

    fn phi_bin_of(phi: f64, n_phi_bins: usize) -> usize {
        let wrapped = (phi + PI).rem_euclid(2.0 * PI);
        let fraction = wrapped / (2.0 * PI);
        ((fraction * n_phi_bins as f64) as usize).min(n_phi_bins - 1)
    }

    /// Returns every hit index whose bucket lies within `[eta_lo, eta_hi]`
    /// crossed with the phi window `[phi_lo, phi_hi]` (wrapping when
    /// `phi_hi < phi_lo`, per spec §4.2).
    #[must_use]
    pub fn get_cand_hit_indices(
        &self,
        eta_lo: f64,
        eta_hi: f64,
        phi_lo: f64,
        phi_hi: f64,
    ) -> Vec<u32> {
        let eta_bin_lo = Self::eta_bin_of(eta_lo, self.eta_min, self.eta_max, self.n_eta_bins);
        let eta_bin_hi = Self::eta_bin_of(eta_hi, self.eta_min, self.eta_max, self.n_eta_bins);
        let phi_bin_lo = Self::phi_bin_of(phi_lo, self.n_phi_bins);
        let phi_bin_hi = Self::phi_bin_of(phi_hi, self.n_phi_bins);

        let mut out = Vec::new();
        if phi_bin_lo <= phi_bin_hi {
            self.collect_range(eta_bin_lo, eta_bin_hi, phi_bin_lo, phi_bin_hi, &mut out);
        } else {
            self.collect_range(eta_bin_lo, eta_bin_hi, phi_bin_lo, self.n_phi_bins - 1, &mut out);
            self.collect_range(eta_bin_lo, eta_bin_hi, 0, phi_bin_hi, &mut out);
        }
        out
    }

    fn collect_range(
        &self,
        eta_bin_lo: usize,
        eta_bin_hi: usize,
        phi_bin_lo: usize,
        phi_bin_hi: usize,
        out: &mut Vec<u32>,
    ) {
        for eta_bin in eta_bin_lo..=eta_bin_hi {
            for phi_bin in phi_bin_lo..=phi_bin_hi {
                out.extend_from_slice(&self.buckets[eta_bin * self.n_phi_bins + phi_bin]);
            }
        }
    }
}
