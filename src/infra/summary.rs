//! Per-run counters and end-of-run reporting
//!
//! The pipeline is a single synchronous pass, so there is no periodic
//! reporter; every stage tallies its drops and emissions into one summary
//! that is logged once at the end of the run. Filtered records are counted
//! here, never raised as errors.

use tracing::info;

/// Counters for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Raw CSV rows read
    pub rows_read: usize,
    /// Rows dropped because an endpoint had no resolvable place name
    pub rows_unresolved: usize,
    /// Rows dropped because the raw mode is on the exclusion list
    pub rows_excluded_mode: usize,
    /// Legs entering the cleaner
    pub legs_in: usize,
    /// Dropped: non-positive distance or duration
    pub dropped_invalid: usize,
    /// Dropped: speed outside the mode's plausible range
    pub dropped_speed: usize,
    /// Dropped: implausible same-place leg
    pub dropped_intra: usize,
    /// Dropped: lost the overlap resolution against a neighbor
    pub dropped_overlap: usize,
    /// Legs surviving the cleaner
    pub legs_kept: usize,
    /// Distinct journey ids assigned
    pub journeys: usize,
    /// Presence intervals inferred
    pub presence_intervals: usize,
    /// Places retained by the top-N cut
    pub places_ranked: usize,
    /// Rows in the dense slot grid
    pub grid_rows: usize,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total legs dropped across all cleaning criteria
    pub fn dropped_total(&self) -> usize {
        self.dropped_invalid + self.dropped_speed + self.dropped_intra + self.dropped_overlap
    }

    /// Emit the summary as one structured log line
    pub fn log(&self) {
        info!(
            rows_read = %self.rows_read,
            rows_unresolved = %self.rows_unresolved,
            rows_excluded_mode = %self.rows_excluded_mode,
            legs_in = %self.legs_in,
            dropped_invalid = %self.dropped_invalid,
            dropped_speed = %self.dropped_speed,
            dropped_intra = %self.dropped_intra,
            dropped_overlap = %self.dropped_overlap,
            legs_kept = %self.legs_kept,
            journeys = %self.journeys,
            presence_intervals = %self.presence_intervals,
            places_ranked = %self.places_ranked,
            grid_rows = %self.grid_rows,
            "run_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let summary = RunSummary::new();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(summary.dropped_total(), 0);
    }

    #[test]
    fn test_dropped_total() {
        let summary = RunSummary {
            dropped_invalid: 1,
            dropped_speed: 2,
            dropped_intra: 3,
            dropped_overlap: 4,
            ..RunSummary::default()
        };
        assert_eq!(summary.dropped_total(), 10);
    }
}
