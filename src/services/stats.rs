//! Leg-set aggregations feeding the dashboard tables
//!
//! Pure functions over the cleaned, journey-tagged leg set. All grouping is
//! by display mode (electric variants folded into their base mode). Plane
//! legs are excluded from the mean views; at several hundred km per leg
//! they drown every other mode.

use crate::domain::types::Leg;
use rustc_hash::FxHashMap;

/// Monday-first weekday order used by the day grids
pub const DAY_ORDER: [&str; 7] =
    ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Display modes carried by the day grid, Plane intentionally absent
pub const GRID_MODES: [&str; 8] =
    ["Bicycle", "Boat", "Bus", "Car", "Scooter", "Train", "Tram", "Walking"];

/// Aggregate totals for one display mode
#[derive(Debug, Clone, PartialEq)]
pub struct ModeTotals {
    pub mode: String,
    pub total_secs: i64,
    pub total_km: f64,
    pub uses: u64,
}

/// Mean leg duration for one (weekday, display mode) cell
#[derive(Debug, Clone, PartialEq)]
pub struct DayModeMean {
    pub day: String,
    pub mode: String,
    pub mean_hours: f64,
}

/// Usage share of one display mode within a place
#[derive(Debug, Clone, PartialEq)]
pub struct ModeShare {
    pub mode: String,
    pub count: u64,
    pub share_pct: f64,
}

/// Count of legs over one (start place, end place, mode) edge
#[derive(Debug, Clone, PartialEq)]
pub struct LegFlow {
    pub from: String,
    pub to: String,
    pub mode: String,
    pub count: u64,
}

/// Total duration, distance and use count per display mode, sorted by total
/// duration descending
pub fn mode_totals(legs: &[Leg]) -> Vec<ModeTotals> {
    let mut by_mode: FxHashMap<&str, (i64, f64, u64)> = FxHashMap::default();
    for leg in legs {
        let entry = by_mode.entry(leg.mode.display_name()).or_insert((0, 0.0, 0));
        entry.0 += leg.duration().num_seconds();
        entry.1 += leg.distance_km;
        entry.2 += 1;
    }

    let mut totals: Vec<ModeTotals> = by_mode
        .into_iter()
        .map(|(mode, (total_secs, total_km, uses))| ModeTotals {
            mode: mode.to_string(),
            total_secs,
            total_km,
            uses,
        })
        .collect();
    totals.sort_by(|a, b| b.total_secs.cmp(&a.total_secs).then(a.mode.cmp(&b.mode)));
    totals
}

/// Mean distance (km) per display mode, Plane excluded, sorted by mode name
pub fn mean_distance_by_mode(legs: &[Leg]) -> Vec<(String, f64)> {
    let mut by_mode: FxHashMap<&str, (f64, u64)> = FxHashMap::default();
    for leg in legs {
        let mode = leg.mode.display_name();
        if mode == "Plane" {
            continue;
        }
        let entry = by_mode.entry(mode).or_insert((0.0, 0));
        entry.0 += leg.distance_km;
        entry.1 += 1;
    }

    let mut means: Vec<(String, f64)> = by_mode
        .into_iter()
        .map(|(mode, (sum, n))| (mode.to_string(), sum / n as f64))
        .collect();
    means.sort_by(|a, b| a.0.cmp(&b.0));
    means
}

/// Mean leg duration per (weekday, display mode), zero-filled over the full
/// Monday-first day x mode grid
pub fn mean_duration_grid(legs: &[Leg]) -> Vec<DayModeMean> {
    let mut sums: FxHashMap<(&str, &str), (i64, u64)> = FxHashMap::default();
    for leg in legs {
        let mode = leg.mode.display_name();
        if !GRID_MODES.contains(&mode) {
            continue;
        }
        let entry = sums.entry((leg.day_of_week(), mode)).or_insert((0, 0));
        entry.0 += leg.duration().num_seconds();
        entry.1 += 1;
    }

    let mut grid = Vec::with_capacity(DAY_ORDER.len() * GRID_MODES.len());
    for day in DAY_ORDER {
        for mode in GRID_MODES {
            let mean_hours = match sums.get(&(day, mode)) {
                Some(&(secs, n)) => secs as f64 / n as f64 / 3600.0,
                None => 0.0,
            };
            grid.push(DayModeMean { day: day.to_string(), mode: mode.to_string(), mean_hours });
        }
    }
    grid
}

/// Mode usage share over the self-loop legs of one place, sorted by count
/// descending; empty when the place has no self-loop legs
pub fn mode_share_for_place(legs: &[Leg], place: &str) -> Vec<ModeShare> {
    let mut counts: FxHashMap<&str, u64> = FxHashMap::default();
    let mut total = 0u64;
    for leg in legs {
        if leg.is_self_loop() && leg.start_place == place {
            *counts.entry(leg.mode.display_name()).or_insert(0) += 1;
            total += 1;
        }
    }
    if total == 0 {
        return Vec::new();
    }

    let mut shares: Vec<ModeShare> = counts
        .into_iter()
        .map(|(mode, count)| ModeShare {
            mode: mode.to_string(),
            count,
            share_pct: count as f64 * 100.0 / total as f64,
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then(a.mode.cmp(&b.mode)));
    shares
}

/// Most traveled (start, end, mode) edges, self-loops excluded, top `limit`
/// by count with deterministic tie-breaks
pub fn top_leg_flows(legs: &[Leg], limit: usize) -> Vec<LegFlow> {
    let mut counts: FxHashMap<(&str, &str, &str), u64> = FxHashMap::default();
    for leg in legs {
        if leg.is_self_loop() {
            continue;
        }
        let key = (leg.start_place.as_str(), leg.end_place.as_str(), leg.mode.display_name());
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut flows: Vec<LegFlow> = counts
        .into_iter()
        .map(|((from, to, mode), count)| LegFlow {
            from: from.to_string(),
            to: to.to_string(),
            mode: mode.to_string(),
            count,
        })
        .collect();
    flows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.from.cmp(&b.from))
            .then(a.to.cmp(&b.to))
            .then(a.mode.cmp(&b.mode))
    });
    flows.truncate(limit);
    flows
}
