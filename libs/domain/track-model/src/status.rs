//! Track status bits and the seed-type classification used by scoring.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-track status bits. A flat bitfield, not a class hierarchy,
    /// matching the propagation-flags design rule in spec §9 — behavior
    /// composes by OR rather than by a type per combination.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TrackStatus: u32 {
        /// Survived to the end of its region's plan without being dropped.
        const FINDABLE = 1 << 0;
        /// Finding was stopped early for this candidate (cap exceeded, etc).
        const STOPPED = 1 << 1;
        /// Produced by the forward-finding pass rather than a refit.
        const FORWARD_PRODUCED = 1 << 2;
        /// Has been identified as a duplicate of another emitted track.
        const DUPLICATE = 1 << 3;
    }
}

impl Default for TrackStatus {
    fn default() -> Self {
        TrackStatus::empty()
    }
}

/// Seed classification used by scoring and by per-iteration configuration
/// (spec §4.8.5). Assigned once per seed before finding starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedType {
    /// `pT > 2.0 && |eta| < 1.5`.
    HighPtCentral,
    /// `pT < 0.9 && |eta| > 0.9`.
    LowPtEndcap,
    /// `pT < 0.9 && |eta| <= 0.9`.
    LowPtBarrel,
    /// Everything else.
    Other,
}

impl SeedType {
    #[must_use]
    pub fn classify(pt: f64, eta: f64) -> Self {
        let abs_eta = eta.abs();
        if pt > 2.0 && abs_eta < 1.5 {
            SeedType::HighPtCentral
        } else if pt < 0.9 && abs_eta > 0.9 {
            SeedType::LowPtEndcap
        } else if pt < 0.9 && abs_eta <= 0.9 {
            SeedType::LowPtBarrel
        } else {
            SeedType::Other
        }
    }
}
