//! Transient sortable surrogate used during one layer's branching step.

use crate::status::SeedType;
use std::cmp::Ordering;

/// A lightweight stand-in for a candidate, used only while pruning one
/// layer's newly-branched beam (spec §3: "Exists transiently within one
/// layer step; not persisted"). Orders by `nhits` descending, then `chi2`
/// ascending — the tiebreak [`SteeringPlan`]-independent rule spec §4.8.2
/// prescribes for pruning.
///
/// [`SteeringPlan`]: trackforge_geom::SteeringPlan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdxChi2List {
    pub cand_idx: usize,
    pub hit_idx: i32,
    pub n_hits: usize,
    pub n_holes: usize,
    pub seed_type: SeedType,
    pub pt: f64,
    pub chi2: f64,
    pub score: f64,
}

impl Eq for IdxChi2List {}

impl PartialOrd for IdxChi2List {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdxChi2List {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .n_hits
            .cmp(&self.n_hits)
            .then_with(|| self.chi2.partial_cmp(&other.chi2).unwrap_or(Ordering::Equal))
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn entry(n_hits: usize, chi2: f64) -> IdxChi2List {
        IdxChi2List { cand_idx: 0, hit_idx: 0, n_hits, n_holes: 0, seed_type: SeedType::Other, pt: 1.0, chi2, score: 0.0 }
    }

    proptest! {
        /// Spec §4.8.2's pruning tiebreak: sorted `IdxChi2List`s are never
        /// followed by one with strictly more hits, and among equal hit
        /// counts never followed by one with strictly lower chi2.
        #[test]
        fn sorted_order_never_regresses_on_hits_then_chi2(
            counts in prop::collection::vec((0usize..20, 0.0f64..500.0), 2..16),
        ) {
            let mut entries: Vec<IdxChi2List> = counts.into_iter().map(|(n, chi2)| entry(n, chi2)).collect();
            entries.sort();
            for pair in entries.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(a.n_hits >= b.n_hits);
                if a.n_hits == b.n_hits {
                    prop_assert!(a.chi2 <= b.chi2);
                }
            }
        }
    }
}
