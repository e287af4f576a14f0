//! A candidate/finished track: state, bookkeeping, and its hit sequence.

use crate::status::{SeedType, TrackStatus};
use crate::track_state::TrackState;
use serde::{Deserialize, Serialize};

/// Sentinel meaning "this plan step found no hit" (spec §3).
pub const HIT_MISSED: i32 = -1;
/// Sentinel meaning "finding stopped at this step".
pub const HIT_STOPPED: i32 = -2;
/// Sentinel meaning "invalid layer, still counts as found" — a pass-through
/// value from upstream seed construction; never synthesised here (spec §9
/// open question: its precise provenance is out of scope for this engine).
pub const HIT_INVALID_LAYER_COUNTS_AS_FOUND: i32 = -9;

/// One entry in a track's hit sequence: which layer was visited, and which
/// hit on it was taken (or a sentinel outcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitOnTrack {
    pub layer: usize,
    pub index: i32,
}

impl HitOnTrack {
    #[must_use]
    pub const fn found(layer: usize, index: u32) -> Self {
        Self { layer, index: index as i32 }
    }

    #[must_use]
    pub const fn missed(layer: usize) -> Self {
        Self { layer, index: HIT_MISSED }
    }

    #[must_use]
    pub const fn stopped(layer: usize) -> Self {
        Self { layer, index: HIT_STOPPED }
    }

    /// Whether this entry counts toward `nFoundHits` — a real hit index, or
    /// the pass-through "invalid layer, still counts as found" sentinel.
    #[must_use]
    pub fn counts_as_found(&self) -> bool {
        self.index >= 0 || self.index == HIT_INVALID_LAYER_COUNTS_AS_FOUND
    }

    #[must_use]
    pub fn is_miss(&self) -> bool {
        self.index == HIT_MISSED
    }

    #[must_use]
    pub fn hit_index(&self) -> Option<u32> {
        if self.index >= 0 {
            Some(self.index as u32)
        } else {
            None
        }
    }
}

/// A track state plus its running bookkeeping: chi-squared, score, label,
/// status bits, seed type, and the ordered hit sequence that produced it.
///
/// Invariants (spec §3): `hits` is monotonic in planned-layer order for its
/// seed's region; `nFoundHits <= lastHitIdx + 1`; `chi2` is the sum of
/// per-hit chi-squared contributions at the time each hit was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub state: TrackState,
    pub chi2: f64,
    pub score: f64,
    pub label: i32,
    pub status: TrackStatus,
    pub seed_type: SeedType,
    pub hits: Vec<HitOnTrack>,
}

impl Track {
    #[must_use]
    pub fn seed(state: TrackState, label: i32, seed_type: SeedType) -> Self {
        Self {
            state,
            chi2: 0.0,
            score: 0.0,
            label,
            status: TrackStatus::empty(),
            seed_type,
            hits: Vec::new(),
        }
    }

    /// Index of the last planned step this track has an entry for, or
    /// `None` before any step has been walked.
    #[must_use]
    pub fn last_hit_idx(&self) -> Option<usize> {
        self.hits.len().checked_sub(1)
    }

    #[must_use]
    pub fn n_found_hits(&self) -> usize {
        self.hits.iter().filter(|h| h.counts_as_found()).count()
    }

    #[must_use]
    pub fn n_holes(&self) -> usize {
        self.hits.iter().filter(|h| h.is_miss()).count()
    }

    /// Longest run of consecutive misses anywhere in the sequence, used to
    /// enforce `maxConsecHoles`.
    #[must_use]
    pub fn longest_consecutive_miss_run(&self) -> usize {
        let mut longest = 0;
        let mut current = 0;
        for hit in &self.hits {
            if hit.is_miss() {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    /// Appends a hit outcome without touching `chi2` — callers add the
    /// chi-squared contribution separately, only for accepted hits.
    pub fn push_hit(&mut self, hit: HitOnTrack) {
        self.hits.push(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackforge_linalg::{SymMatrix6, Vector6};

    fn dummy_state() -> TrackState {
        TrackState::new(Vector6::new(0.0, 0.0, 0.0, 0.5, 0.0, 1.0), SymMatrix6::identity())
    }

    #[test]
    fn n_found_hits_counts_real_and_sentinel_found_entries() {
        let mut track = Track::seed(dummy_state(), 0, SeedType::Other);
        track.push_hit(HitOnTrack::found(0, 3));
        track.push_hit(HitOnTrack::missed(1));
        track.push_hit(HitOnTrack { layer: 2, index: HIT_INVALID_LAYER_COUNTS_AS_FOUND });
        assert_eq!(track.n_found_hits(), 2);
        assert_eq!(track.n_holes(), 1);
    }

    #[test]
    fn longest_consecutive_miss_run_tracks_the_longest_gap() {
        let mut track = Track::seed(dummy_state(), 0, SeedType::Other);
        track.push_hit(HitOnTrack::found(0, 0));
        track.push_hit(HitOnTrack::missed(1));
        track.push_hit(HitOnTrack::missed(2));
        track.push_hit(HitOnTrack::found(3, 1));
        track.push_hit(HitOnTrack::missed(4));
        assert_eq!(track.longest_consecutive_miss_run(), 2);
    }

    #[test]
    fn last_hit_idx_is_none_before_any_step() {
        let track = Track::seed(dummy_state(), 0, SeedType::Other);
        assert_eq!(track.last_hit_idx(), None);
    }
}
