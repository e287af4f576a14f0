//! The five eta-regions a seed is classified into.

use serde::{Deserialize, Serialize};

/// One of the five regions the partitioner assigns a seed to, each with
/// its own [`crate::SteeringPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EtaRegion {
    Barrel,
    TransitionPos,
    TransitionNeg,
    EndcapPos,
    EndcapNeg,
}

impl EtaRegion {
    /// All five variants, in the fixed order used to index per-region plans
    /// and to compute the partitioner's sort score (`5*(region-2) + eta`).
    pub const ALL: [EtaRegion; 5] = [
        EtaRegion::EndcapNeg,
        EtaRegion::TransitionNeg,
        EtaRegion::Barrel,
        EtaRegion::TransitionPos,
        EtaRegion::EndcapPos,
    ];

    /// Position of this region within [`Self::ALL`], i.e. the `region` term
    /// in the partitioner's sort-score formula `5*(region-2) + eta`.
    #[must_use]
    pub fn ordinal(self) -> i32 {
        Self::ALL.iter().position(|&r| r == self).expect("EtaRegion::ALL is exhaustive") as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barrel_is_the_centre_ordinal() {
        assert_eq!(EtaRegion::Barrel.ordinal(), 2);
    }

    #[test]
    fn endcap_arms_are_at_the_extremes() {
        assert_eq!(EtaRegion::EndcapNeg.ordinal(), 0);
        assert_eq!(EtaRegion::EndcapPos.ordinal(), 4);
    }
}
