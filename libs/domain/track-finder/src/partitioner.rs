//! Classifies each seed into one of the five eta-regions (spec §4.7).

use trackforge_geom::{EtaRegion, TrackerInfo};
use trackforge_model::track_state::TrackState;

/// Index of the barrel layer conventionally treated as the innermost TIB
/// probe in the transition-region test.
const INNER_TIB_BARREL_INDEX: usize = 4;
/// Index of the barrel layer conventionally treated as the innermost TOB
/// probe in the transition-region test.
const INNER_TOB_BARREL_INDEX: usize = 10;

/// Classifies seeds against a fixed geometry and field. Stateless beyond
/// those two read-only references, so a single instance is shared across
/// every partitioning call in an event.
pub struct SeedPartitioner<'a> {
    tracker: &'a TrackerInfo,
    b_field_tesla: f64,
}

impl<'a> SeedPartitioner<'a> {
    #[must_use]
    pub fn new(tracker: &'a TrackerInfo, b_field_tesla: f64) -> Self {
        Self { tracker, b_field_tesla }
    }

    /// Classifies one seed, given its state and the eta of its outermost
    /// hit (deliberately not the momentum eta — spec §4.7 point 2: the
    /// seed is short and curved, so the outermost-hit eta is the more
    /// reliable region signal).
    ///
    /// Returns `(region, sort_score)`, where `sort_score = 5*(region-2) +
    /// eta` packs seeds by region and then by eta within a region.
    #[must_use]
    pub fn classify(&self, seed_state: &TrackState, outermost_hit_eta: f64) -> (EtaRegion, f64) {
        let (_, _, pz) = seed_state.params.momentum_cartesian();
        let z_dir_pos = pz > 0.0;

        let region = self.classify_region(seed_state, z_dir_pos);
        let sort_score = 5.0 * f64::from(region.ordinal() - 2) + outermost_hit_eta;
        (region, sort_score)
    }

    fn classify_region(&self, state: &TrackState, z_dir_pos: bool) -> EtaRegion {
        let misses_first_tec = self.misses_first_tec(state, z_dir_pos);
        if misses_first_tec {
            return EtaRegion::Barrel;
        }

        if self.reaches_innermost_transition_layer(state, INNER_TIB_BARREL_INDEX, z_dir_pos)
            || self.reaches_innermost_transition_layer(state, INNER_TOB_BARREL_INDEX, z_dir_pos)
        {
            return if z_dir_pos { EtaRegion::TransitionPos } else { EtaRegion::TransitionNeg };
        }

        if z_dir_pos { EtaRegion::EndcapPos } else { EtaRegion::EndcapNeg }
    }

    fn misses_first_tec(&self, state: &TrackState, z_dir_pos: bool) -> bool {
        let Some(tec_first) = self.tracker.first_endcap_layer(z_dir_pos) else {
            return true;
        };

        let probe_radius = match self.tracker.outer_barrel_layer() {
            Some(outer_brl) if state.can_reach_radius(outer_brl.rout, self.b_field_tesla) => outer_brl.rout,
            _ => state.max_reach_radius(self.b_field_tesla),
        };

        let Some(z_at_probe) = state.z_at_r(probe_radius, self.b_field_tesla) else {
            return true;
        };

        if z_dir_pos {
            z_at_probe < tec_first.zmin
        } else {
            z_at_probe > tec_first.zmax
        }
    }

    fn reaches_innermost_transition_layer(&self, state: &TrackState, barrel_index: usize, z_dir_pos: bool) -> bool {
        let Some(layer) = self.tracker.barrel_layer_by_index(barrel_index) else {
            return false;
        };
        if !state.can_reach_radius(layer.rout, self.b_field_tesla) {
            return false;
        }
        match state.z_at_r(layer.rout, self.b_field_tesla) {
            Some(z) if z_dir_pos => z <= layer.zmax,
            Some(z) => z >= layer.zmin,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackforge_linalg::{SymMatrix6, Vector6};

    fn central_high_pt_seed() -> TrackState {
        TrackState::new(
            Vector6::new(2.0, 0.0, 0.0, 0.2, 0.1, std::f64::consts::FRAC_PI_2),
            SymMatrix6::identity(),
        )
    }

    fn shallow_forward_seed() -> TrackState {
        TrackState::new(Vector6::new(2.0, 0.0, 1.0, 1.5, 0.1, 0.2), SymMatrix6::identity())
    }

    #[test]
    fn central_seed_lands_in_the_barrel() {
        let tracker = TrackerInfo::synthetic_default(18, 27);
        let partitioner = SeedPartitioner::new(&tracker, 3.8);
        let (region, _) = partitioner.classify(&central_high_pt_seed(), 0.1);
        assert_eq!(region, EtaRegion::Barrel);
    }

    #[test]
    fn shallow_forward_seed_lands_on_the_positive_z_side() {
        let tracker = TrackerInfo::synthetic_default(18, 27);
        let partitioner = SeedPartitioner::new(&tracker, 3.8);
        let (region, _) = partitioner.classify(&shallow_forward_seed(), 2.0);
        assert!(matches!(region, EtaRegion::EndcapPos | EtaRegion::TransitionPos));
    }

    #[test]
    fn sort_score_orders_regions_before_eta_within_region() {
        let tracker = TrackerInfo::synthetic_default(18, 27);
        let partitioner = SeedPartitioner::new(&tracker, 3.8);
        let (_, barrel_score) = partitioner.classify(&central_high_pt_seed(), 0.1);
        let (_, forward_score) = partitioner.classify(&shallow_forward_seed(), 2.0);
        assert!(forward_score > barrel_score);
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;
    use trackforge_linalg::{SymMatrix6, Vector6};

    proptest! {
        /// Spec §8 invariant 6: the partitioner is total and disjoint —
        /// every seed gets exactly one region. `classify`'s return type
        /// already makes disjointness structural (it returns a single
        /// `EtaRegion`, never a set); this checks totality by generating
        /// seeds across a wide sweep of the parameter space and confirming
        /// every one lands in `EtaRegion::ALL` without panicking.
        #[test]
        fn every_seed_classifies_into_exactly_one_known_region(
            rho0 in -5.0f64..5.0,
            z0 in -10.0f64..10.0,
            inv_pt in -2.0f64..2.0,
            phi in -3.0f64..3.0,
            theta in 0.05f64..3.05,
            outermost_hit_eta in -3.0f64..3.0,
        ) {
            let tracker = TrackerInfo::synthetic_default(18, 27);
            let partitioner = SeedPartitioner::new(&tracker, 3.8);
            let state = TrackState::new(Vector6::new(rho0, 0.0, z0, inv_pt, phi, theta), SymMatrix6::identity());

            let (region, _sort_score) = partitioner.classify(&state, outermost_hit_eta);
            prop_assert!(EtaRegion::ALL.contains(&region));
        }
    }
}
