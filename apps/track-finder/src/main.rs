//! Batch driver: reads an event file, runs the finder over every event's
//! seeds, and writes the candidates back out (spec §6.4).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, instrument, warn};

use trackforge_finder::{CandidateFinder, SeedPartitioner};
use trackforge_geom::TrackerInfo;
use trackforge_index::HitIndex;
use trackforge_io::{DataFileReader, DataFileWriter, EventRecord, ExtraSections};
use trackforge_linalg::Vector3;
use trackforge_model::config::FinderConfig;
use trackforge_model::event::Event;

/// The acceptance this workspace's synthetic geometry and hit index are
/// built over; matches `EtaRegionBoundaries`'s widest named cut.
const ETA_ACCEPTANCE: f64 = 3.0;

#[derive(Debug, Parser)]
#[command(name = "track-finder", about = "Runs combinatorial Kalman-filter track finding over an event file")]
struct Args {
    /// Input event data file.
    #[arg(long)]
    input: PathBuf,

    /// Output event data file; candidates are written alongside the
    /// passed-through hits, seeds, and truth sections.
    #[arg(long)]
    output: PathBuf,

    /// Iteration config (TOML or JSON, by extension). Falls back to the
    /// CMS-2017-like defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Barrel layer count for the synthetic geometry this run's events
    /// are assumed to have been digitized against.
    #[arg(long, default_value_t = 18)]
    n_barrel: usize,

    /// Endcap disk count per side for the synthetic geometry.
    #[arg(long, default_value_t = 27)]
    n_endcap: usize,

    /// Best-effort pin the rayon global pool to one thread per physical
    /// core, mirroring the worker engine's hardware-pinning step. A
    /// platform that can't enumerate cores just runs unpinned.
    #[arg(long, default_value_t = false)]
    pin_cores: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<FinderConfig> {
    let Some(path) = path else {
        return Ok(FinderConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text).with_context(|| "parsing JSON config".to_string()),
        _ => toml::from_str(&text).with_context(|| "parsing TOML config".to_string()),
    }
}

/// Pins the rayon global pool to one worker per detected physical core.
/// Failure to enumerate or pin is logged and otherwise ignored — this is a
/// cache-locality optimization, not a correctness requirement.
fn pin_rayon_pool_to_cores() {
    let Some(core_ids) = core_affinity::get_core_ids() else {
        warn!("core enumeration unavailable; running unpinned");
        return;
    };
    info!(cores = core_ids.len(), "pinning rayon pool to physical cores");
    let build = rayon::ThreadPoolBuilder::new()
        .num_threads(core_ids.len().max(1))
        .start_handler(move |thread_index| {
            if let Some(id) = core_ids.get(thread_index % core_ids.len().max(1)) {
                core_affinity::set_for_current(*id);
            }
        })
        .build_global();
    if let Err(error) = build {
        warn!(%error, "failed to install pinned rayon pool; using default pool");
    }
}

/// Eta of a seed's outermost accepted hit, or the seed's own position if it
/// has none (spec §4.7 point 2: the outermost-hit eta is the more reliable
/// region signal, but a seed with no resolvable hit still needs a fallback).
fn outermost_hit_eta(event: &Event, seed: &trackforge_model::track::Track) -> f64 {
    for hot in seed.hits.iter().rev() {
        if let Some(index) = hot.hit_index() {
            if let Some(hit) = event.layer_hits(hot.layer).and_then(|hits| hits.get(index as usize)) {
                return hit.eta();
            }
        }
    }
    let params = &seed.state.params;
    Vector3::new(params.x(), params.y(), params.z()).eta()
}

#[instrument(skip(tracker, config, record))]
fn process_event(event_id: u64, tracker: &TrackerInfo, config: &FinderConfig, record: EventRecord) -> EventRecord {
    let n_layers = tracker.layers().len();
    let mut event = Event::new(event_id, n_layers);
    for (layer_id, hits) in record.layer_hits.iter().enumerate() {
        if let Err(error) = event.set_layer_hits(layer_id, hits.clone()) {
            warn!(layer_id, %error, "dropping out-of-range layer from input event");
        }
    }

    let layer_positions: Vec<Vec<(f64, f64)>> =
        (0..n_layers).map(|layer_id| event.layer_eta_phi(layer_id)).collect();
    let hit_index = HitIndex::build(&layer_positions, -ETA_ACCEPTANCE, ETA_ACCEPTANCE);

    let partitioner = SeedPartitioner::new(tracker, config.b_field_tesla);
    let mut scored_seeds: Vec<_> = record
        .seed_tracks
        .iter()
        .map(|seed| {
            let eta = outermost_hit_eta(&event, seed);
            let (region, sort_score) = partitioner.classify(&seed.state, eta);
            (sort_score, seed.clone(), region)
        })
        .collect();
    // Sort by the partitioner's own region-then-eta score so seeds in the
    // same region are processed together (spec.md:21,96,98), not by
    // arbitrary seed-vector order.
    scored_seeds.sort_by(|a, b| a.0.total_cmp(&b.0));
    let classified_seeds: Vec<_> = scored_seeds.into_iter().map(|(_, seed, region)| (seed, region)).collect();

    let finder = CandidateFinder::new(tracker, &hit_index, config);
    finder.run(&event, &classified_seeds);

    EventRecord { candidate_tracks: event.take_sorted_candidates(), ..record }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!(cpu_cores = num_cpus::get(), "worker starting");

    if args.pin_cores {
        pin_rayon_pool_to_cores();
    }

    let config = load_config(args.config.as_ref())?;
    let tracker = TrackerInfo::synthetic_default(args.n_barrel, args.n_endcap);

    let reader = DataFileReader::open(&args.input)
        .with_context(|| format!("opening event file {}", args.input.display()))?;
    let mut writer = DataFileWriter::create(&args.output, reader.header().n_layers, reader.header().extra_sections)
        .with_context(|| format!("creating output event file {}", args.output.display()))?;

    let mut event_id: u64 = 0;
    while let Some(record) = reader.read_next_event().context("reading event record")? {
        info!(event_id, n_seeds = record.seed_tracks.len(), "processing event");
        let processed = process_event(event_id, &tracker, &config, record);
        writer.write_event(&processed).context("writing event record")?;
        event_id += 1;
    }

    writer.finish().context("finalizing output event file")?;
    info!(n_events = event_id, "done");
    Ok(())
}
