//! mobility-pipeline - batch cleaning and presence inference over mobility legs
//!
//! Reads a raw movement CSV, resolves places, runs the cleaning / chaining /
//! occupancy / slot-binning pipeline and writes the run outputs.
//!
//! Module structure:
//! - `domain/` - Core data types (Leg, TransportMode, PresenceInterval, slots)
//! - `io/` - Ingestion, geocoding seam, egress writers
//! - `services/` - Pipeline stages (cleaner, chainer, occupancy, binner, stats)
//! - `infra/` - Configuration and run reporting

use clap::Parser;
use mobility_pipeline::infra::Config;
use mobility_pipeline::io::{read_raw_legs, resolve_legs, Egress, TableResolver};
use mobility_pipeline::services::Pipeline;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Batch transform of raw mobility legs into journeys and presence tables
#[derive(Parser, Debug)]
#[command(name = "mobility-pipeline", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Input CSV of raw legs, overrides ingest.input_file
    #[arg(short, long)]
    input: Option<String>,

    /// Pre-resolved geohash->place JSON table, overrides ingest.places_file
    #[arg(short, long)]
    places: Option<String>,

    /// Output directory, overrides egress.dir
    #[arg(short, long)]
    out_dir: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Structured logging, level via RUST_LOG (default: info)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "mobility_pipeline_starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let input_file = args.input.unwrap_or_else(|| config.input_file().to_string());
    let places_file = args.places.unwrap_or_else(|| config.places_file().to_string());
    let out_dir = args.out_dir.unwrap_or_else(|| config.egress_dir().to_string());

    let run_id = Uuid::now_v7().to_string();
    info!(
        run_id = %run_id,
        config_file = %config.config_file(),
        input_file = %input_file,
        places_file = %places_file,
        out_dir = %out_dir,
        excluded_modes = ?config.excluded_modes(),
        max_intra_place_km = %config.max_intra_place_km(),
        max_intra_place_hours = %config.max_intra_place_hours(),
        max_gap_minutes = %config.max_gap_minutes(),
        gap_cap_hours = %config.gap_cap_hours(),
        top_places = %config.top_places(),
        "config_loaded"
    );

    let rows = read_raw_legs(&input_file, config.csv_delimiter())?;
    let mut resolver = TableResolver::from_json_file(&places_file)?;
    let (legs, ingest_stats) = resolve_legs(rows, &mut resolver, &config)?;

    let pipeline = Pipeline::new(&config)?;
    let mut output = pipeline.run(legs);
    output.summary.rows_read = ingest_stats.rows_read;
    output.summary.rows_unresolved = ingest_stats.rows_unresolved;
    output.summary.rows_excluded_mode = ingest_stats.rows_excluded_mode;
    output.summary.log();

    let egress = Egress::new(&out_dir);
    egress.write_legs(&output.legs)?;
    egress.write_presence(&output.intervals)?;
    egress.write_slot_grid(&output.grid)?;
    egress.write_stats(&run_id, &output.legs, config.top_places())?;

    info!(run_id = %run_id, "mobility_pipeline_done");
    Ok(())
}
