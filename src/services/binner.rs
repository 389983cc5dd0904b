//! Slot binning - aggregates presence intervals into the time-of-day grid
//!
//! Every presence interval is tested against each slot's window on the
//! interval's date; the overlap test is boolean, with no weighting by
//! overlap length. A participant present at the same place in the same slot
//! on the same date counts once no matter how many intervals said so.
//! Places are ranked by total count and only the top N survive; the output
//! grid is dense (slot-major, zero-filled) over the retained places.

use crate::domain::slots::SlotPartition;
use crate::domain::types::PresenceInterval;
use crate::infra::Config;
use anyhow::Result;
use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

/// One cell of the slot grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCount {
    pub slot: String,
    pub place: String,
    pub count: u64,
}

/// Dense (slot x place) grid plus the ranked place list
#[derive(Debug, Clone, Default)]
pub struct SlotGrid {
    /// Slot-major rows: every retained place for slot 0, then slot 1, ...
    pub rows: Vec<SlotCount>,
    /// Retained places, highest total first
    pub places: Vec<String>,
}

/// Discretizes presence intervals into the configured slot partition
pub struct SlotBinner {
    partition: SlotPartition,
    top_places: usize,
}

impl SlotBinner {
    pub fn new(config: &Config) -> Result<Self> {
        let partition = SlotPartition::from_boundaries(config.slot_boundaries())?;
        Ok(Self { partition, top_places: config.top_places() })
    }

    pub fn partition(&self) -> &SlotPartition {
        &self.partition
    }

    /// Count distinct (participant, date) presences per (slot, place) and
    /// materialize the dense top-N grid
    pub fn bin(&self, intervals: &[PresenceInterval]) -> SlotGrid {
        type PresenceKey<'a> = (&'a str, NaiveDate, &'a str, usize);

        // Distinct presence tuples; overlapping intervals collapse here
        let mut seen: FxHashSet<PresenceKey> = FxHashSet::default();
        for interval in intervals {
            let date = interval.from.date();
            let hits: SmallVec<[usize; 4]> = self
                .partition
                .slots()
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.overlaps(date, interval.from, interval.to))
                .map(|(idx, _)| idx)
                .collect();
            for idx in hits {
                seen.insert((interval.participant.0.as_str(), date, interval.place.as_str(), idx));
            }
        }

        // Aggregate distinct tuples into (slot, place) counts
        let mut counts: FxHashMap<(usize, &str), u64> = FxHashMap::default();
        let mut totals: FxHashMap<&str, u64> = FxHashMap::default();
        for &(_, _, place, slot_idx) in &seen {
            *counts.entry((slot_idx, place)).or_insert(0) += 1;
            *totals.entry(place).or_insert(0) += 1;
        }

        // Rank places by total, ties by name for deterministic output
        let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked.truncate(self.top_places);
        let places: Vec<String> = ranked.iter().map(|(place, _)| place.to_string()).collect();

        // Dense slot-major grid, zero-filled
        let mut rows = Vec::with_capacity(self.partition.len() * places.len());
        for (slot_idx, slot) in self.partition.slots().iter().enumerate() {
            for place in &places {
                let count = counts.get(&(slot_idx, place.as_str())).copied().unwrap_or(0);
                rows.push(SlotCount { slot: slot.label.clone(), place: place.clone(), count });
            }
        }

        debug!(
            intervals = %intervals.len(),
            presences = %seen.len(),
            places = %places.len(),
            rows = %rows.len(),
            "slots_binned"
        );

        SlotGrid { rows, places }
    }
}
