//! The combinatorial finding engine: seed classification, the scoring
//! function, and the per-seed beam search that is the heart of this
//! workspace (spec §4.8: "CandidateFinder -- the heart").

pub mod candidate_finder;
pub mod partitioner;
pub mod scoring;

pub use candidate_finder::CandidateFinder;
pub use partitioner::SeedPartitioner;
pub use scoring::score;
