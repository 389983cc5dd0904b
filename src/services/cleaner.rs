//! Trace cleaning - drops physically implausible legs and resolves overlaps
//!
//! Three independent predicate filters run left to right over the record
//! stream (valid extent, plausible speed, plausible same-place trip), then
//! overlap resolution runs per participant over the pruned set. Filtered
//! legs are counted, never reported as errors.
//!
//! Overlap resolution is a single left-to-right pass with one unit of
//! lookback, not a fixed-point iteration: a discarded leg is never used as a
//! comparand again, so three or more mutually overlapping legs can leave a
//! residual overlap. That behavior is load-bearing for downstream outputs
//! and must not be changed without product signoff.

use crate::domain::types::{Leg, ParticipantId};
use crate::infra::Config;
use chrono::Duration;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Per-criterion drop counters for one cleaning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub dropped_invalid: usize,
    pub dropped_speed: usize,
    pub dropped_intra: usize,
    pub dropped_overlap: usize,
}

/// Rejects implausible legs and resolves temporally overlapping ones
pub struct TraceCleaner {
    config: Config,
}

impl TraceCleaner {
    pub fn new(config: &Config) -> Self {
        Self { config: config.clone() }
    }

    /// Run all filters; returns the surviving legs sorted by
    /// (participant, start time) plus the per-criterion drop counts
    pub fn clean(&self, legs: Vec<Leg>) -> (Vec<Leg>, CleanStats) {
        let mut stats = CleanStats::default();

        let mut surviving = Vec::with_capacity(legs.len());
        for leg in legs {
            if !Self::has_valid_extent(&leg) {
                stats.dropped_invalid += 1;
                continue;
            }
            if !self.has_plausible_speed(&leg) {
                stats.dropped_speed += 1;
                continue;
            }
            if !self.is_plausible_intra(&leg) {
                stats.dropped_intra += 1;
                continue;
            }
            surviving.push(leg);
        }

        // Overlap resolution needs per-participant sorted context
        let mut by_participant: FxHashMap<ParticipantId, Vec<Leg>> = FxHashMap::default();
        for leg in surviving {
            by_participant.entry(leg.participant.clone()).or_default().push(leg);
        }

        let mut participants: Vec<ParticipantId> = by_participant.keys().cloned().collect();
        participants.sort();

        let mut kept = Vec::new();
        for participant in participants {
            let Some(mut group) = by_participant.remove(&participant) else { continue };
            group.sort_by_key(|leg| leg.start_time);
            let (survivors, dropped) = Self::resolve_overlaps(group);
            stats.dropped_overlap += dropped;
            kept.extend(survivors);
        }

        debug!(
            kept = %kept.len(),
            dropped_invalid = %stats.dropped_invalid,
            dropped_speed = %stats.dropped_speed,
            dropped_intra = %stats.dropped_intra,
            dropped_overlap = %stats.dropped_overlap,
            "trace_clean_done"
        );

        (kept, stats)
    }

    /// Positive distance and positive duration
    fn has_valid_extent(leg: &Leg) -> bool {
        leg.distance_km > 0.0 && leg.duration() > Duration::zero()
    }

    /// Speed within the configured range for the mode; unknown modes are
    /// unrestricted
    fn has_plausible_speed(&self, leg: &Leg) -> bool {
        let Some((min, max)) = self.config.speed_range(&leg.mode) else {
            return true;
        };
        match leg.speed_kmh() {
            Some(speed) => speed >= min && speed <= max,
            None => false,
        }
    }

    /// A same-place leg must stay under the distance and duration caps
    fn is_plausible_intra(&self, leg: &Leg) -> bool {
        if !leg.is_self_loop() {
            return true;
        }
        let hours = leg.duration().num_seconds() as f64 / 3600.0;
        leg.distance_km <= self.config.max_intra_place_km()
            && hours <= self.config.max_intra_place_hours()
    }

    fn legs_overlap(a: &Leg, b: &Leg) -> bool {
        a.start_time < b.end_time && b.start_time < a.end_time
    }

    /// Single left-to-right pass over one participant's legs, sorted by
    /// start time. Lookback state is the previous leg plus whether it is
    /// still alive; a dead previous leg is skipped as comparand, which
    /// leaves residual overlaps in mutually overlapping triples.
    fn resolve_overlaps(sorted: Vec<Leg>) -> (Vec<Leg>, usize) {
        let mut kept = Vec::with_capacity(sorted.len());
        let mut dropped = 0usize;
        let mut lookback: Option<(Leg, bool)> = None;

        for leg in sorted {
            let mut leg_alive = true;
            if let Some((prev, mut prev_alive)) = lookback.take() {
                if prev_alive && Self::legs_overlap(&prev, &leg) {
                    // The strictly shorter leg loses; ties keep the earlier one
                    if prev.duration() >= leg.duration() {
                        leg_alive = false;
                    } else {
                        prev_alive = false;
                    }
                }
                if prev_alive {
                    kept.push(prev);
                } else {
                    dropped += 1;
                }
            }
            lookback = Some((leg, leg_alive));
        }

        if let Some((prev, prev_alive)) = lookback {
            if prev_alive {
                kept.push(prev);
            } else {
                dropped += 1;
            }
        }

        (kept, dropped)
    }
}
