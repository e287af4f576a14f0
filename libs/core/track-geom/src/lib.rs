//! Static detector description: layers, per-layer surfaces, and the
//! per-eta-region steering plans derived from them once at startup.
//!
//! Everything in this crate is built once, during geometry initialization,
//! and is read-only for the remainder of a run — it is shared across finder
//! threads without any synchronization (spec: "Geometry, SteeringPlans...
//! safe to share across threads without synchronization").

pub mod layer;
pub mod region;
pub mod steering_plan;
pub mod tracker_info;

pub use layer::LayerInfo;
pub use region::EtaRegion;
pub use steering_plan::{PlanStep, SteeringPlan};
pub use tracker_info::TrackerInfo;
