//! Occupancy inference - reconstructs where a participant was between legs
//!
//! Legs are grouped per (participant, start date) and walked chronologically
//! with one unit of lookback (previous arrival time and place). Emitted
//! presence intervals cover the day before the first leg, the dwell between
//! place-matching legs, the span of degenerate same-place legs, and the rest
//! of the day after the last leg.
//!
//! When consecutive legs do not share a place boundary the relocation was
//! never observed: presence is granted only up to a capped hour after the
//! last arrival and from the full hour before the next departure. The
//! interior of such a gap is deliberately left uncovered.

use crate::domain::types::{day_end, day_start, hour_floor, Leg, ParticipantId, PresenceInterval};
use crate::infra::Config;
use chrono::Duration;
use tracing::debug;

/// Derives per-day presence intervals from journey-tagged legs
pub struct OccupancyInferrer {
    gap_cap: Duration,
}

impl OccupancyInferrer {
    pub fn new(config: &Config) -> Self {
        Self { gap_cap: Duration::hours(config.gap_cap_hours()) }
    }

    /// Infer presence intervals for every (participant, date) group
    pub fn infer(&self, legs: &[Leg]) -> Vec<PresenceInterval> {
        let mut sorted: Vec<&Leg> = legs.iter().collect();
        sorted.sort_by(|a, b| {
            a.participant.cmp(&b.participant).then(a.start_time.cmp(&b.start_time))
        });

        let mut out = Vec::new();
        let mut group_start = 0;
        for i in 1..=sorted.len() {
            let at_boundary = i == sorted.len() || {
                let (a, b) = (sorted[i - 1], sorted[i]);
                a.participant != b.participant || a.start_date() != b.start_date()
            };
            if at_boundary {
                self.infer_day(&sorted[group_start..i], &mut out);
                group_start = i;
            }
        }

        debug!(legs = %legs.len(), intervals = %out.len(), "occupancy_inferred");
        out
    }

    /// Walk one (participant, date) group, chronologically sorted
    fn infer_day(&self, legs: &[&Leg], out: &mut Vec<PresenceInterval>) {
        let Some(first) = legs.first() else { return };
        let participant = &first.participant;

        // Lookback state: where and when the previous leg arrived
        let mut prev: Option<(chrono::NaiveDateTime, &str)> = None;

        for leg in legs {
            match prev {
                None => {
                    // Start of the day until the first departure
                    Self::push(
                        out,
                        participant,
                        &leg.start_place,
                        day_start(leg.start_date()),
                        leg.start_time,
                    );
                }
                Some((prev_end, prev_place)) => {
                    if prev_end.date() != leg.start_time.date() {
                        // The previous leg spilled over a day boundary:
                        // finish that day where it arrived, open the current
                        // day at the departure place
                        Self::push(out, participant, prev_place, prev_end, day_end(prev_end.date()));
                        Self::push(
                            out,
                            participant,
                            &leg.start_place,
                            day_start(leg.start_date()),
                            leg.start_time,
                        );
                    } else if prev_place == leg.start_place {
                        // Continuous dwell between two observed legs
                        Self::push(out, participant, &leg.start_place, prev_end, leg.start_time);
                    } else {
                        // Unobserved relocation: cap presence on both sides,
                        // leave the interior uncovered
                        Self::push(
                            out,
                            participant,
                            prev_place,
                            prev_end,
                            hour_floor(prev_end) + self.gap_cap,
                        );
                        Self::push(
                            out,
                            participant,
                            &leg.start_place,
                            hour_floor(leg.start_time),
                            leg.start_time,
                        );
                    }
                }
            }

            // A same-place leg is presence in its own right
            if leg.is_self_loop() {
                Self::push(out, participant, &leg.start_place, leg.start_time, leg.end_time);
            }

            prev = Some((leg.end_time, &leg.end_place));
        }

        if let Some((prev_end, prev_place)) = prev {
            // Rest of the day after the last arrival
            Self::push(out, participant, prev_place, prev_end, day_end(prev_end.date()));
        }
    }

    /// Emit an interval, skipping degenerate (empty or reversed) ranges
    fn push(
        out: &mut Vec<PresenceInterval>,
        participant: &ParticipantId,
        place: &str,
        from: chrono::NaiveDateTime,
        to: chrono::NaiveDateTime,
    ) {
        if from < to {
            out.push(PresenceInterval::new(participant.clone(), place.to_string(), from, to));
        }
    }
}
