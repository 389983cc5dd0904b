//! Journey chaining - groups consecutive legs into journeys
//!
//! A journey is a maximal run of legs connected by the continuity
//! predicate: same participant, same calendar start-date, a gap of at most
//! `max_gap_minutes` between the previous arrival and the next departure,
//! and a matching place boundary (previous end place == next start place).
//!
//! Ids are assigned by one ordered fold over the globally sorted leg set;
//! the only state is the running id and the previous leg.

use crate::domain::types::{JourneyId, Leg};
use crate::infra::Config;
use chrono::Duration;
use tracing::debug;

/// Assigns monotonically increasing journey ids to cleaned legs
pub struct JourneyChainer {
    max_gap: Duration,
}

impl JourneyChainer {
    pub fn new(config: &Config) -> Self {
        Self { max_gap: Duration::minutes(config.max_gap_minutes()) }
    }

    /// Sort by (participant, start time) and tag every leg with its journey
    /// id; the first leg gets id 0
    pub fn chain(&self, mut legs: Vec<Leg>) -> Vec<Leg> {
        legs.sort_by(|a, b| {
            a.participant.cmp(&b.participant).then(a.start_time.cmp(&b.start_time))
        });

        let mut ids = Vec::with_capacity(legs.len());
        let mut current = 0u64;
        for (i, leg) in legs.iter().enumerate() {
            if i > 0 && !self.continues(&legs[i - 1], leg) {
                current += 1;
            }
            ids.push(JourneyId(current));
        }

        for (leg, id) in legs.iter_mut().zip(ids) {
            leg.journey_id = Some(id);
        }

        if !legs.is_empty() {
            let journeys = current + 1;
            debug!(legs = %legs.len(), journeys = %journeys, "journeys_chained");
        }

        legs
    }

    /// Number of distinct journeys in a chained leg set
    pub fn journey_count(legs: &[Leg]) -> usize {
        legs.iter().filter_map(|l| l.journey_id).max().map_or(0, |id| id.0 as usize + 1)
    }

    /// The continuity predicate between two consecutive legs in sort order
    fn continues(&self, prev: &Leg, curr: &Leg) -> bool {
        let gap = curr.start_time - prev.end_time;
        prev.participant == curr.participant
            && prev.start_date() == curr.start_date()
            && gap >= Duration::zero()
            && gap <= self.max_gap
            && prev.end_place == curr.start_place
    }
}
