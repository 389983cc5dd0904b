//! Services - the batch transform stages
//!
//! This module contains the core pipeline logic:
//! - `cleaner` - Drops implausible legs and resolves overlaps
//! - `chainer` - Assigns journey ids by spatio-temporal continuity
//! - `occupancy` - Infers per-day presence intervals between legs
//! - `binner` - Aggregates presence into the time-of-day slot grid
//! - `stats` - Aggregate tables over the cleaned leg set
//! - `pipeline` - Runs the stages in order

pub mod binner;
pub mod chainer;
pub mod cleaner;
pub mod occupancy;
pub mod pipeline;
pub mod stats;

// Re-export commonly used types
pub use binner::{SlotBinner, SlotCount, SlotGrid};
pub use chainer::JourneyChainer;
pub use cleaner::TraceCleaner;
pub use occupancy::OccupancyInferrer;
pub use pipeline::{Pipeline, PipelineOutput};
