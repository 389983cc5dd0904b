//! IO modules - everything that touches files or external collaborators
//!
//! This module contains all ingestion and output surfaces:
//! - `ingest` - CSV reading and place resolution of raw legs
//! - `geocode` - The geocoding collaborator seam (resolver + cache traits)
//! - `egress` - Run output writers (JSONL, CSV, stats.json)

pub mod egress;
pub mod geocode;
pub mod ingest;

// Re-export commonly used types
pub use egress::Egress;
pub use geocode::{CachedResolver, InMemoryCache, LookupCache, PlaceResolver, TableResolver};
pub use ingest::{read_raw_legs, resolve_legs, IngestStats, RawLegRecord};
