//! Errors raised by the domain model layer itself (not by propagation or
//! I/O, which define their own error types in their own crates).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("layer {layer_id} has no entry in this event's per-layer storage")]
    LayerOutOfRange { layer_id: usize },

    #[error("seed index {seed_index} is out of range for {n_seeds} seed tracks")]
    SeedOutOfRange { seed_index: usize, n_seeds: usize },
}
