//! Domain types shared by the geometry, propagation and finding crates:
//! hits, track states, the running candidate record, per-event storage,
//! and the process-wide configuration the finder reads but never mutates.

pub mod config;
pub mod error;
pub mod event;
pub mod hit;
pub mod idx_chi2_list;
pub mod status;
pub mod track;
pub mod track_state;

pub use config::{FinderConfig, PropagationFlags};
pub use error::ModelError;
pub use event::Event;
pub use hit::Hit;
pub use idx_chi2_list::IdxChi2List;
pub use status::{SeedType, TrackStatus};
pub use track::{HitOnTrack, Track};
pub use track_state::TrackState;
