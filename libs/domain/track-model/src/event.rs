//! The per-event arena: hit storage, track vectors, and the shared-growth
//! counters the finding engine touches from multiple threads.

use crate::error::ModelError;
use crate::hit::Hit;
use crate::track::Track;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Owns all hit storage for one event's lifetime; tracks hold only indices
/// into it (spec §9: "The Event is the arena; Tracks and HitOnTrack carry
/// only integer indices. No back-pointers.").
///
/// `candidate_tracks` is the one piece of state finder tasks mutate
/// concurrently: it is append-only, and the lock is taken only once per
/// seed at commit time, not per hit (spec §5).
pub struct Event {
    pub event_id: u64,
    layer_hits: Vec<Vec<Hit>>,
    pub seed_tracks: Vec<Track>,
    candidate_tracks: Mutex<Vec<Track>>,
    pub fit_tracks: Vec<Track>,
    mc_hit_id_counter: AtomicU64,
    bad_candidate_counts: Vec<AtomicU64>,
}

impl Event {
    #[must_use]
    pub fn new(event_id: u64, n_layers: usize) -> Self {
        Self {
            event_id,
            layer_hits: vec![Vec::new(); n_layers],
            seed_tracks: Vec::new(),
            candidate_tracks: Mutex::new(Vec::new()),
            fit_tracks: Vec::new(),
            mc_hit_id_counter: AtomicU64::new(0),
            bad_candidate_counts: (0..n_layers).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    #[must_use]
    pub fn layer_hits(&self, layer_id: usize) -> Option<&[Hit]> {
        self.layer_hits.get(layer_id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn n_layers(&self) -> usize {
        self.layer_hits.len()
    }

    pub fn set_layer_hits(&mut self, layer_id: usize, hits: Vec<Hit>) -> Result<(), ModelError> {
        let slot = self
            .layer_hits
            .get_mut(layer_id)
            .ok_or(ModelError::LayerOutOfRange { layer_id })?;
        *slot = hits;
        Ok(())
    }

    /// (eta, phi) pairs for every hit on `layer_id`, in hit-index order —
    /// the shape `trackforge_index::HitIndex::build` expects.
    #[must_use]
    pub fn layer_eta_phi(&self, layer_id: usize) -> Vec<(f64, f64)> {
        self.layer_hits
            .get(layer_id)
            .map(|hits| hits.iter().map(|h| (h.eta(), h.phi())).collect())
            .unwrap_or_default()
    }

    /// Appends a finished candidate to the shared final vector. Locks are
    /// taken only here, once per seed, never inside a seed's per-layer loop.
    pub fn commit_candidate(&self, track: Track) {
        let mut guard = self.candidate_tracks.lock().expect("candidate_tracks mutex poisoned");
        guard.push(track);
    }

    /// Drains the committed candidates, sorted by `(label, score descending)`
    /// so the result is deterministic regardless of which finder task
    /// finished first (spec §5: "all downstream consumers sort by (seedID,
    /// score) before further processing").
    pub fn take_sorted_candidates(&self) -> Vec<Track> {
        let mut tracks = std::mem::take(&mut *self.candidate_tracks.lock().expect("candidate_tracks mutex poisoned"));
        tracks.sort_by(|a, b| {
            a.label
                .cmp(&b.label)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
        });
        debug!(n_candidates = tracks.len(), event_id = self.event_id, "drained final candidates");
        tracks
    }

    pub fn next_mc_hit_id(&self) -> u64 {
        self.mc_hit_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_bad_candidate(&self, layer_id: usize) {
        if let Some(counter) = self.bad_candidate_counts.get(layer_id) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn bad_candidate_count(&self, layer_id: usize) -> u64 {
        self.bad_candidate_counts.get(layer_id).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SeedType;
    use crate::track_state::TrackState;
    use trackforge_linalg::{SymMatrix6, Vector6};

    fn dummy_track(label: i32, score: f64) -> Track {
        let state = TrackState::new(Vector6::new(0.0, 0.0, 0.0, 0.5, 0.0, 1.0), SymMatrix6::identity());
        let mut track = Track::seed(state, label, SeedType::Other);
        track.score = score;
        track
    }

    #[test]
    fn take_sorted_candidates_orders_by_label_then_descending_score() {
        let event = Event::new(0, 4);
        event.commit_candidate(dummy_track(1, 5.0));
        event.commit_candidate(dummy_track(0, 1.0));
        event.commit_candidate(dummy_track(1, 9.0));

        let sorted = event.take_sorted_candidates();
        let keys: Vec<(i32, f64)> = sorted.iter().map(|t| (t.label, t.score)).collect();
        assert_eq!(keys, vec![(0, 1.0), (1, 9.0), (1, 5.0)]);
    }

    #[test]
    fn take_sorted_candidates_drains_the_shared_vector() {
        let event = Event::new(0, 4);
        event.commit_candidate(dummy_track(0, 1.0));
        assert_eq!(event.take_sorted_candidates().len(), 1);
        assert_eq!(event.take_sorted_candidates().len(), 0);
    }

    #[test]
    fn bad_candidate_counts_are_per_layer_and_relaxed() {
        let event = Event::new(0, 3);
        event.record_bad_candidate(1);
        event.record_bad_candidate(1);
        assert_eq!(event.bad_candidate_count(1), 2);
        assert_eq!(event.bad_candidate_count(0), 0);
    }
}
