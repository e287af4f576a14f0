//! The event data file format: a little-endian binary stream of hits and
//! tracks, read and written with a mutex-serialized position advance (spec
//! §6.1). The only crate in this workspace that touches a filesystem.

pub mod data_file;
pub mod error;

pub use data_file::{DataFileHeader, DataFileReader, DataFileWriter, EventRecord, ExtraSections, McHitInfo};
pub use error::TrackIoError;
