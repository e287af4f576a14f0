//! Per-layer spatial index of hits, bucketed by (eta, phi).
//!
//! Built once per event, after all hits for that event are known, and then
//! queried many times (once per candidate per layer step) without mutation —
//! the same read-after-build-once-then-share discipline the rest of this
//! workspace's geometry data follows.

pub mod bin_info;
pub mod hit_index;

pub use bin_info::BinInfo;
pub use hit_index::HitIndex;
