//! Fixed time-of-day slot partition
//!
//! The day is partitioned into labeled half-open slots ("00h-06h",
//! "06h-08h", ...) built from a list of ascending hour boundaries. The last
//! boundary may be 24, in which case the final slot closes at the next
//! midnight.

use crate::domain::types::day_start;
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// One half-open time-of-day bin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub label: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Slot {
    /// Concrete window of this slot on the given date
    pub fn window(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let open = day_start(date);
        let start = open + Duration::hours(i64::from(self.start_hour));
        let end = open + Duration::hours(i64::from(self.end_hour));
        (start, end)
    }

    /// Boolean overlap between this slot's window on `date` and `[from, to)`
    pub fn overlaps(&self, date: NaiveDate, from: NaiveDateTime, to: NaiveDateTime) -> bool {
        let (start, end) = self.window(date);
        end > from && start < to
    }
}

/// Ordered, gapless partition of the day into slots
#[derive(Debug, Clone)]
pub struct SlotPartition {
    slots: Vec<Slot>,
}

impl SlotPartition {
    /// Build a partition from ascending hour boundaries, e.g.
    /// `[0, 6, 8, ..., 22, 24]` yields ten slots
    pub fn from_boundaries(boundaries: &[u32]) -> Result<Self> {
        if boundaries.len() < 2 {
            bail!("slot boundaries need at least two entries, got {}", boundaries.len());
        }
        for pair in boundaries.windows(2) {
            if pair[1] <= pair[0] {
                bail!("slot boundaries must be strictly ascending: {} then {}", pair[0], pair[1]);
            }
        }
        if let Some(&last) = boundaries.last() {
            if last > 24 {
                bail!("slot boundaries must end at or before hour 24, got {}", last);
            }
        }

        let slots = boundaries
            .windows(2)
            .map(|pair| Slot {
                label: format!("{:02}h-{:02}h", pair[0], pair[1]),
                start_hour: pair[0],
                end_hour: pair[1],
            })
            .collect();

        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot labels in canonical order
    pub fn labels(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.label.clone()).collect()
    }
}
