//! The little-endian event-stream format: one header, then `n_events`
//! records of per-layer hits followed by the track vectors (spec §6).

use crate::error::TrackIoError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};
use trackforge_linalg::{SymMatrix6, Vector3, Vector6};
use trackforge_model::hit::Hit;
use trackforge_model::status::{SeedType, TrackStatus};
use trackforge_model::track::{HitOnTrack, Track};
use trackforge_model::track_state::TrackState;

pub const MAGIC: u32 = 0xBEEF;
pub const FORMAT_VERSION: u32 = 5;

/// One 6x6 symmetric matrix's upper triangle, row-major: 21 values.
const SYM6_UPPER_TRIANGLE_LEN: usize = 21;
const HIT_WIRE_LEN: u32 = (3 + SYM6_UPPER_TRIANGLE_LEN as u32) * 8 + 8 + 8;
const HOT_WIRE_LEN: u32 = 8 + 4;
const TRACK_HEADER_WIRE_LEN: u32 = (6 + SYM6_UPPER_TRIANGLE_LEN as u32) * 8 + 4 + 1 + 8 + 8 + 4 + 4 + 1;

bitflags::bitflags! {
    /// `extra_sections` bitmask from the header (spec §6.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExtraSections: u32 {
        const SIM_TRACK_STATES = 1 << 0;
        const SEEDS = 1 << 1;
        const CMSSW_TRACKS = 1 << 2;
        const HIT_ITER_MASKS = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataFileHeader {
    pub sizeof_track: u32,
    pub sizeof_hit: u32,
    pub sizeof_hot: u32,
    pub n_layers: i32,
    pub n_events: i32,
    pub extra_sections: ExtraSections,
}

impl DataFileHeader {
    #[must_use]
    pub fn new(n_layers: i32, extra_sections: ExtraSections) -> Self {
        Self {
            sizeof_track: TRACK_HEADER_WIRE_LEN,
            sizeof_hit: HIT_WIRE_LEN,
            sizeof_hot: HOT_WIRE_LEN,
            n_layers,
            n_events: 0,
            extra_sections,
        }
    }

    fn write(&self, w: &mut impl Write) -> Result<(), TrackIoError> {
        w.write_u32::<LittleEndian>(MAGIC)?;
        w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        w.write_u32::<LittleEndian>(self.sizeof_track)?;
        w.write_u32::<LittleEndian>(self.sizeof_hit)?;
        w.write_u32::<LittleEndian>(self.sizeof_hot)?;
        w.write_i32::<LittleEndian>(self.n_layers)?;
        w.write_i32::<LittleEndian>(self.n_events)?;
        w.write_u32::<LittleEndian>(self.extra_sections.bits())?;
        Ok(())
    }

    fn read(r: &mut impl Read) -> Result<Self, TrackIoError> {
        let magic = r.read_u32::<LittleEndian>()?;
        if magic != MAGIC {
            return Err(TrackIoError::BadMagic { expected: MAGIC, found: magic });
        }
        let format_version = r.read_u32::<LittleEndian>()?;
        if format_version != FORMAT_VERSION {
            return Err(TrackIoError::UnsupportedVersion { expected: FORMAT_VERSION, found: format_version });
        }
        let sizeof_track = r.read_u32::<LittleEndian>()?;
        if sizeof_track != TRACK_HEADER_WIRE_LEN {
            return Err(TrackIoError::SizeMismatch {
                field: "sizeof_track",
                expected: TRACK_HEADER_WIRE_LEN,
                found: sizeof_track,
            });
        }
        let sizeof_hit = r.read_u32::<LittleEndian>()?;
        if sizeof_hit != HIT_WIRE_LEN {
            return Err(TrackIoError::SizeMismatch { field: "sizeof_hit", expected: HIT_WIRE_LEN, found: sizeof_hit });
        }
        let sizeof_hot = r.read_u32::<LittleEndian>()?;
        if sizeof_hot != HOT_WIRE_LEN {
            return Err(TrackIoError::SizeMismatch { field: "sizeof_hot", expected: HOT_WIRE_LEN, found: sizeof_hot });
        }
        let n_layers = r.read_i32::<LittleEndian>()?;
        let n_events = r.read_i32::<LittleEndian>()?;
        let extra_sections = ExtraSections::from_bits_truncate(r.read_u32::<LittleEndian>()?);
        Ok(Self { sizeof_track, sizeof_hit, sizeof_hot, n_layers, n_events, extra_sections })
    }
}

/// Minimal truth-matching record: which simulated track (if any) produced a
/// hit. The original format's richer MC truth payload is out of scope (spec
/// §1's external-geometry/truth carve-out); this preserves just enough to
/// round-trip the `n_sim_hit_infos` section without inventing fields nothing
/// in this workspace consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McHitInfo {
    pub mc_track_id: i32,
}

/// One event's worth of everything a [`DataFileReader`]/[`DataFileWriter`]
/// round-trips. Deliberately decoupled from `trackforge_model::Event`
/// (which guards its candidate vector behind a mutex for concurrent finder
/// access) — callers translate between the two at the edges.
#[derive(Debug, Clone, Default)]
pub struct EventRecord {
    pub layer_hits: Vec<Vec<Hit>>,
    pub hit_iter_masks: Vec<Vec<u64>>,
    pub sim_hit_infos: Vec<McHitInfo>,
    pub sim_tracks: Vec<Track>,
    pub seed_tracks: Vec<Track>,
    pub candidate_tracks: Vec<Track>,
    pub fit_tracks: Vec<Track>,
    pub cmssw_tracks: Vec<Track>,
    pub sim_track_states: Vec<TrackState>,
}

fn write_sym6_upper(w: &mut impl Write, m: &SymMatrix6) -> Result<(), TrackIoError> {
    for i in 0..6 {
        for j in i..6 {
            w.write_f64::<LittleEndian>(m.at(i, j))?;
        }
    }
    Ok(())
}

fn read_sym6_upper(r: &mut impl Read) -> Result<SymMatrix6, TrackIoError> {
    let mut m = SymMatrix6::zero();
    for i in 0..6 {
        for j in i..6 {
            m.set_sym(i, j, r.read_f64::<LittleEndian>()?);
        }
    }
    Ok(m)
}

fn write_hit(w: &mut impl Write, hit: &Hit) -> Result<(), TrackIoError> {
    w.write_f64::<LittleEndian>(hit.position.x)?;
    w.write_f64::<LittleEndian>(hit.position.y)?;
    w.write_f64::<LittleEndian>(hit.position.z)?;
    write_sym6_upper(w, &hit.covariance)?;
    w.write_u64::<LittleEndian>(hit.layer_id as u64)?;
    w.write_u64::<LittleEndian>(hit.detector_id)?;
    Ok(())
}

fn read_hit(r: &mut impl Read) -> Result<Hit, TrackIoError> {
    let x = r.read_f64::<LittleEndian>()?;
    let y = r.read_f64::<LittleEndian>()?;
    let z = r.read_f64::<LittleEndian>()?;
    let covariance = read_sym6_upper(r)?;
    let layer_id = r.read_u64::<LittleEndian>()? as usize;
    let detector_id = r.read_u64::<LittleEndian>()?;
    Ok(Hit::new(Vector3::new(x, y, z), covariance, layer_id, detector_id))
}

fn write_hit_on_track(w: &mut impl Write, hot: &HitOnTrack) -> Result<(), TrackIoError> {
    w.write_u64::<LittleEndian>(hot.layer as u64)?;
    w.write_i32::<LittleEndian>(hot.index)?;
    Ok(())
}

fn read_hit_on_track(r: &mut impl Read) -> Result<HitOnTrack, TrackIoError> {
    let layer = r.read_u64::<LittleEndian>()? as usize;
    let index = r.read_i32::<LittleEndian>()?;
    Ok(HitOnTrack { layer, index })
}

fn write_track(w: &mut impl Write, track: &Track) -> Result<(), TrackIoError> {
    let params = track.state.params.as_array();
    for value in params {
        w.write_f64::<LittleEndian>(value)?;
    }
    write_sym6_upper(w, &track.state.errors)?;
    w.write_i32::<LittleEndian>(track.state.charge)?;
    w.write_u8(u8::from(track.state.valid))?;
    w.write_f64::<LittleEndian>(track.chi2)?;
    w.write_f64::<LittleEndian>(track.score)?;
    w.write_i32::<LittleEndian>(track.label)?;
    w.write_u32::<LittleEndian>(track.status.bits())?;
    w.write_u8(seed_type_to_wire(track.seed_type))?;

    w.write_u32::<LittleEndian>(track.hits.len() as u32)?;
    for hot in &track.hits {
        write_hit_on_track(w, hot)?;
    }
    Ok(())
}

fn read_track(r: &mut impl Read) -> Result<Track, TrackIoError> {
    let mut params = [0.0_f64; 6];
    for value in &mut params {
        *value = r.read_f64::<LittleEndian>()?;
    }
    let errors = read_sym6_upper(r)?;
    let charge = r.read_i32::<LittleEndian>()?;
    let valid = r.read_u8()? != 0;
    let chi2 = r.read_f64::<LittleEndian>()?;
    let score = r.read_f64::<LittleEndian>()?;
    let label = r.read_i32::<LittleEndian>()?;
    let status = TrackStatus::from_bits_truncate(r.read_u32::<LittleEndian>()?);
    let seed_type = seed_type_from_wire(r.read_u8()?);

    let state = TrackState { params: Vector6::from_array(params), errors, charge, valid };

    let n_hots = r.read_u32::<LittleEndian>()?;
    let mut hits = Vec::with_capacity(n_hots as usize);
    for _ in 0..n_hots {
        hits.push(read_hit_on_track(r)?);
    }

    Ok(Track { state, chi2, score, label, status, seed_type, hits })
}

fn seed_type_to_wire(seed_type: SeedType) -> u8 {
    match seed_type {
        SeedType::HighPtCentral => 1,
        SeedType::LowPtEndcap => 2,
        SeedType::LowPtBarrel => 3,
        SeedType::Other => 4,
    }
}

fn seed_type_from_wire(value: u8) -> SeedType {
    match value {
        1 => SeedType::HighPtCentral,
        2 => SeedType::LowPtEndcap,
        3 => SeedType::LowPtBarrel,
        _ => SeedType::Other,
    }
}

fn write_track_vector(w: &mut impl Write, tracks: &[Track]) -> Result<(), TrackIoError> {
    w.write_u32::<LittleEndian>(tracks.len() as u32)?;
    for track in tracks {
        write_track(w, track)?;
    }
    Ok(())
}

fn read_track_vector(r: &mut impl Read) -> Result<Vec<Track>, TrackIoError> {
    let n = r.read_u32::<LittleEndian>()?;
    let mut out = Vec::with_capacity(n as usize);
    for _ in 0..n {
        out.push(read_track(r)?);
    }
    Ok(out)
}

/// Sequential writer. `n_events` in the header is a placeholder until
/// [`Self::finish`] seeks back and backpatches it, mirroring the teacher's
/// policy of a single authoritative writer per file with no concurrent
/// writers to coordinate.
pub struct DataFileWriter {
    inner: BufWriter<File>,
    header: DataFileHeader,
    n_events_written: i32,
}

impl DataFileWriter {
    pub fn create(path: impl AsRef<Path>, n_layers: i32, extra_sections: ExtraSections) -> Result<Self, TrackIoError> {
        let file = File::create(path)?;
        let mut inner = BufWriter::new(file);
        let header = DataFileHeader::new(n_layers, extra_sections);
        header.write(&mut inner)?;
        Ok(Self { inner, header, n_events_written: 0 })
    }

    #[instrument(skip(self, record))]
    pub fn write_event(&mut self, record: &EventRecord) -> Result<(), TrackIoError> {
        for hits in &record.layer_hits {
            self.inner.write_u32::<LittleEndian>(hits.len() as u32)?;
            for hit in hits {
                write_hit(&mut self.inner, hit)?;
            }
        }
        if self.header.extra_sections.contains(ExtraSections::HIT_ITER_MASKS) {
            for mask in &record.hit_iter_masks {
                for &value in mask {
                    self.inner.write_u64::<LittleEndian>(value)?;
                }
            }
        }

        self.inner.write_u32::<LittleEndian>(record.sim_hit_infos.len() as u32)?;
        for info in &record.sim_hit_infos {
            self.inner.write_i32::<LittleEndian>(info.mc_track_id)?;
        }

        write_track_vector(&mut self.inner, &record.sim_tracks)?;
        if self.header.extra_sections.contains(ExtraSections::SEEDS) {
            write_track_vector(&mut self.inner, &record.seed_tracks)?;
        }
        write_track_vector(&mut self.inner, &record.candidate_tracks)?;
        write_track_vector(&mut self.inner, &record.fit_tracks)?;
        if self.header.extra_sections.contains(ExtraSections::CMSSW_TRACKS) {
            write_track_vector(&mut self.inner, &record.cmssw_tracks)?;
        }

        if self.header.extra_sections.contains(ExtraSections::SIM_TRACK_STATES) {
            for state in &record.sim_track_states {
                for value in state.params.as_array() {
                    self.inner.write_f64::<LittleEndian>(value)?;
                }
                write_sym6_upper(&mut self.inner, &state.errors)?;
            }
        }

        self.n_events_written += 1;
        Ok(())
    }

    /// Flushes, backpatches `n_events`, and closes the file.
    pub fn finish(mut self) -> Result<(), TrackIoError> {
        self.inner.flush()?;
        // magic + format_version + 3 sizeof_* fields + n_layers = 6 u32/i32 fields = 24 bytes; n_events starts there.
        self.inner.seek(SeekFrom::Start(24))?;
        self.inner.write_i32::<LittleEndian>(self.n_events_written)?;
        self.inner.flush()?;
        debug!(n_events = self.n_events_written, "closed event data file");
        Ok(())
    }
}

/// Mutex-serialized reader: `read_next_event` holds the lock for the whole
/// parse of one event rather than just the position advance, trading a
/// sliver of inter-reader parallelism for a single, simple critical section
/// (spec §5 only requires the position advance itself be serialized).
pub struct DataFileReader {
    inner: Mutex<BufReader<File>>,
    header: DataFileHeader,
}

impl DataFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackIoError> {
        let file = File::open(path)?;
        let mut inner = BufReader::new(file);
        let header = DataFileHeader::read(&mut inner)?;
        Ok(Self { inner: Mutex::new(inner), header })
    }

    #[must_use]
    pub fn header(&self) -> &DataFileHeader {
        &self.header
    }

    #[instrument(skip(self))]
    pub fn read_next_event(&self) -> Result<Option<EventRecord>, TrackIoError> {
        let mut guard = self.inner.lock().expect("data file reader mutex poisoned");
        let n_layers = self.header.n_layers.max(0) as usize;

        let mut layer_hits = Vec::with_capacity(n_layers);
        for _ in 0..n_layers {
            let n_hits = match guard.read_u32::<LittleEndian>() {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let mut hits = Vec::with_capacity(n_hits as usize);
            for _ in 0..n_hits {
                hits.push(read_hit(&mut *guard)?);
            }
            layer_hits.push(hits);
        }

        let mut hit_iter_masks = Vec::new();
        if self.header.extra_sections.contains(ExtraSections::HIT_ITER_MASKS) {
            for hits in &layer_hits {
                let mut mask = Vec::with_capacity(hits.len());
                for _ in hits {
                    mask.push(guard.read_u64::<LittleEndian>()?);
                }
                hit_iter_masks.push(mask);
            }
        }

        let n_sim_hit_infos = guard.read_u32::<LittleEndian>()?;
        let mut sim_hit_infos = Vec::with_capacity(n_sim_hit_infos as usize);
        for _ in 0..n_sim_hit_infos {
            sim_hit_infos.push(McHitInfo { mc_track_id: guard.read_i32::<LittleEndian>()? });
        }

        let sim_tracks = read_track_vector(&mut *guard)?;
        let seed_tracks = if self.header.extra_sections.contains(ExtraSections::SEEDS) {
            read_track_vector(&mut *guard)?
        } else {
            Vec::new()
        };
        let candidate_tracks = read_track_vector(&mut *guard)?;
        let fit_tracks = read_track_vector(&mut *guard)?;
        let cmssw_tracks = if self.header.extra_sections.contains(ExtraSections::CMSSW_TRACKS) {
            read_track_vector(&mut *guard)?
        } else {
            Vec::new()
        };

        let mut sim_track_states = Vec::new();
        if self.header.extra_sections.contains(ExtraSections::SIM_TRACK_STATES) {
            for _ in 0..sim_tracks.len() {
                let mut params = [0.0_f64; 6];
                for value in &mut params {
                    *value = guard.read_f64::<LittleEndian>()?;
                }
                let errors = read_sym6_upper(&mut *guard)?;
                sim_track_states.push(TrackState::new(Vector6::from_array(params), errors));
            }
        }

        Ok(Some(EventRecord {
            layer_hits,
            hit_iter_masks,
            sim_hit_infos,
            sim_tracks,
            seed_tracks,
            candidate_tracks,
            fit_tracks,
            cmssw_tracks,
            sim_track_states,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackforge_model::status::SeedType;

    fn sample_hit() -> Hit {
        Hit::new(Vector3::new(1.0, 2.0, 3.0), SymMatrix6::identity(), 0, 42)
    }

    fn sample_track() -> Track {
        let state = TrackState::new(Vector6::new(1.0, 0.0, 0.0, 0.3, 0.1, 1.2), SymMatrix6::identity());
        let mut track = Track::seed(state, 5, SeedType::HighPtCentral);
        track.push_hit(HitOnTrack::found(0, 0));
        track.push_hit(HitOnTrack::missed(1));
        track.chi2 = 3.5;
        track.score = 12.0;
        track
    }

    #[test]
    fn header_round_trips_through_a_byte_buffer() {
        let header = DataFileHeader::new(3, ExtraSections::SEEDS | ExtraSections::HIT_ITER_MASKS);
        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        let read_back = DataFileHeader::read(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_back, header);
    }

    #[test]
    fn bad_magic_is_a_fatal_format_error() {
        let mut buffer = vec![0u8; 4];
        buffer[0] = 0xAB;
        assert!(matches!(DataFileHeader::read(&mut buffer.as_slice()), Err(TrackIoError::BadMagic { .. })));
    }

    #[test]
    fn hit_and_track_round_trip_through_a_byte_buffer() {
        let mut buffer = Vec::new();
        write_hit(&mut buffer, &sample_hit()).unwrap();
        write_track(&mut buffer, &sample_track()).unwrap();

        let mut cursor = buffer.as_slice();
        let hit = read_hit(&mut cursor).unwrap();
        let track = read_track(&mut cursor).unwrap();

        assert_eq!(hit.position, sample_hit().position);
        assert_eq!(track.label, 5);
        assert_eq!(track.hits.len(), 2);
        assert!((track.chi2 - 3.5).abs() < 1.0e-12);
    }

    #[test]
    fn a_full_event_round_trips_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.bin");

        let mut writer = DataFileWriter::create(&path, 2, ExtraSections::SEEDS).unwrap();
        let record = EventRecord {
            layer_hits: vec![vec![sample_hit()], vec![]],
            seed_tracks: vec![sample_track()],
            candidate_tracks: vec![sample_track(), sample_track()],
            ..EventRecord::default()
        };
        writer.write_event(&record).unwrap();
        writer.finish().unwrap();

        let reader = DataFileReader::open(&path).unwrap();
        assert_eq!(reader.header().n_events, 1);
        let read_back = reader.read_next_event().unwrap().expect("one event");
        assert_eq!(read_back.layer_hits[0].len(), 1);
        assert_eq!(read_back.seed_tracks.len(), 1);
        assert_eq!(read_back.candidate_tracks.len(), 2);
        assert!(reader.read_next_event().unwrap().is_none());
    }
}
