//! Errors from reading or writing an event stream.
//!
//! Every variant here is fatal (spec §7: "Format mismatch on read: fatal,
//! abort the process with a diagnostic; no partial events are delivered to
//! the finder") — callers surface these at the CLI boundary, never recover
//! from them mid-stream.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic: expected {expected:#x}, found {found:#x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("unsupported format version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u32, found: u32 },

    #[error("record size mismatch for {field}: expected {expected}, found {found}")]
    SizeMismatch { field: &'static str, expected: u32, found: u32 },

    #[error("layer index {layer_id} out of range for a header declaring {n_layers} layers")]
    LayerOutOfRange { layer_id: usize, n_layers: i32 },
}
