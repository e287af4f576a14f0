//! The propagator (state transport between surfaces) and the Kalman
//! updater (chi-squared gating and state update). Together these consume
//! the bulk of the CPU time in the finding loop.

pub mod error;
pub mod kalman;
pub mod propagator;
pub mod surface;

pub use error::{KalmanError, PropagationError};
pub use kalman::KalmanUpdater;
pub use propagator::Propagator;
pub use surface::Surface;
