//! CSV ingestion of raw movement legs
//!
//! Reads the `;`-delimited export of the movement dataset, resolves both
//! endpoints through the injected `PlaceResolver` and produces `Leg`
//! records for the pipeline. Rows with unresolvable endpoints or excluded
//! modes are dropped and counted; malformed rows (bad CSV, unparseable
//! timestamps) abort ingestion with context, before the core ever runs.

use crate::domain::types::{Leg, ParticipantId, TransportMode};
use crate::infra::Config;
use crate::io::geocode::PlaceResolver;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One raw CSV row, prior to resolution and validation
#[derive(Debug, Clone, Deserialize)]
pub struct RawLegRecord {
    pub participant_id: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "distance(m)")]
    pub distance_m: f64,
    pub mean_of_transport: String,
    pub start_geohash: String,
    pub end_geohash: String,
}

/// Ingestion drop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_read: usize,
    pub rows_unresolved: usize,
    pub rows_excluded_mode: usize,
}

/// Read all raw rows from a CSV file
pub fn read_raw_legs<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<RawLegRecord>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        // Header is line 1, first record line 2
        let record: RawLegRecord = result
            .with_context(|| format!("Failed to parse line {} of {}", i + 2, path.display()))?;
        rows.push(record);
    }

    info!(rows = %rows.len(), file = %path.display(), "raw_legs_read");
    Ok(rows)
}

/// Resolve endpoints and build pipeline legs
///
/// Both geohashes must resolve to a non-empty place name; excluded modes
/// are dropped afterwards, matching the original ingestion order.
pub fn resolve_legs<R: PlaceResolver>(
    rows: Vec<RawLegRecord>,
    resolver: &mut R,
    config: &Config,
) -> Result<(Vec<Leg>, IngestStats)> {
    let mut stats = IngestStats { rows_read: rows.len(), ..IngestStats::default() };
    let mut legs = Vec::with_capacity(rows.len());

    for row in rows {
        let (Some(start_place), Some(end_place)) =
            (resolver.resolve(&row.start_geohash), resolver.resolve(&row.end_geohash))
        else {
            stats.rows_unresolved += 1;
            continue;
        };

        if config.is_excluded_mode(&row.mean_of_transport) {
            stats.rows_excluded_mode += 1;
            continue;
        }

        let start_time = parse_timestamp(&row.start_time).with_context(|| {
            format!("Bad start_time for participant {}", row.participant_id)
        })?;
        let end_time = parse_timestamp(&row.end_time)
            .with_context(|| format!("Bad end_time for participant {}", row.participant_id))?;

        legs.push(Leg {
            participant: ParticipantId(row.participant_id),
            start_place,
            end_place,
            start_time,
            end_time,
            distance_km: row.distance_m / 1000.0,
            mode: TransportMode::from_raw(&row.mean_of_transport),
            journey_id: None,
        });
    }

    info!(
        legs = %legs.len(),
        unresolved = %stats.rows_unresolved,
        excluded_mode = %stats.rows_excluded_mode,
        "legs_resolved"
    );
    Ok((legs, stats))
}

/// Parse the dataset's timestamp formats: RFC 3339 with offset, or a bare
/// local datetime with either a space or a T separator
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    bail!("unparseable timestamp {:?}", raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::geocode::TableResolver;
    use chrono::{Datelike, Timelike};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "participant_id;start_time;end_time;distance(m);mean_of_transport;start_geohash;end_geohash\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn resolver() -> TableResolver {
        TableResolver::from_entries([
            ("u0m3h".to_string(), "Lausanne, CH".to_string()),
            ("u0m5x".to_string(), "Geneva, CH".to_string()),
        ])
    }

    #[test]
    fn test_read_and_resolve() {
        let file = write_csv(&format!(
            "{HEADER}p1;2024-08-26 08:00:00;2024-08-26 08:40:00;35000;TRAIN;u0m3h;u0m5x\n"
        ));
        let rows = read_raw_legs(file.path(), b';').unwrap();
        assert_eq!(rows.len(), 1);

        let (legs, stats) = resolve_legs(rows, &mut resolver(), &Config::default()).unwrap();
        assert_eq!(stats.rows_read, 1);
        assert_eq!(legs.len(), 1);

        let leg = &legs[0];
        assert_eq!(leg.participant, ParticipantId("p1".to_string()));
        assert_eq!(leg.start_place, "Lausanne, CH");
        assert_eq!(leg.end_place, "Geneva, CH");
        assert_eq!(leg.distance_km, 35.0);
        assert_eq!(leg.mode, TransportMode::Train);
        assert_eq!(leg.start_time.hour(), 8);
        assert!(leg.journey_id.is_none());
    }

    #[test]
    fn test_rfc3339_timestamps() {
        let file = write_csv(&format!(
            "{HEADER}p1;2024-08-26T08:00:00+00:00;2024-08-26T08:40:00+00:00;35000;TRAIN;u0m3h;u0m5x\n"
        ));
        let rows = read_raw_legs(file.path(), b';').unwrap();
        let (legs, _) = resolve_legs(rows, &mut resolver(), &Config::default()).unwrap();
        assert_eq!(legs[0].start_time.day(), 26);
        assert_eq!(legs[0].start_time.minute(), 0);
    }

    #[test]
    fn test_malformed_timestamp_fails_loudly() {
        let file = write_csv(&format!(
            "{HEADER}p1;yesterday;2024-08-26 08:40:00;35000;TRAIN;u0m3h;u0m5x\n"
        ));
        let rows = read_raw_legs(file.path(), b';').unwrap();
        let err = resolve_legs(rows, &mut resolver(), &Config::default()).unwrap_err();
        assert!(format!("{err:#}").contains("start_time"));
    }

    #[test]
    fn test_missing_column_fails_loudly() {
        let file = write_csv("participant_id;start_time\np1;2024-08-26 08:00:00\n");
        assert!(read_raw_legs(file.path(), b';').is_err());
    }

    #[test]
    fn test_unresolved_rows_are_dropped() {
        let file = write_csv(&format!(
            "{HEADER}p1;2024-08-26 08:00:00;2024-08-26 08:40:00;35000;TRAIN;zzzzz;u0m5x\n"
        ));
        let rows = read_raw_legs(file.path(), b';').unwrap();
        let (legs, stats) = resolve_legs(rows, &mut resolver(), &Config::default()).unwrap();
        assert!(legs.is_empty());
        assert_eq!(stats.rows_unresolved, 1);
    }

    #[test]
    fn test_excluded_modes_are_dropped() {
        let file = write_csv(&format!(
            "{HEADER}p1;2024-08-26 08:00:00;2024-08-26 08:40:00;5000;DETECTION_ERROR;u0m3h;u0m5x\np1;2024-08-26 09:00:00;2024-08-26 09:40:00;5000;MOTORBIKE;u0m3h;u0m5x\n"
        ));
        let rows = read_raw_legs(file.path(), b';').unwrap();
        let (legs, stats) = resolve_legs(rows, &mut resolver(), &Config::default()).unwrap();
        assert!(legs.is_empty());
        assert_eq!(stats.rows_excluded_mode, 2);
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let file = write_csv(
            "participant_id;start_time;end_time;distance(m);mean_of_transport;start_geohash;end_geohash;gCO2;is_power_saving\np1;2024-08-26 08:00:00;2024-08-26 08:40:00;35000;TRAIN;u0m3h;u0m5x;120;false\n",
        );
        let rows = read_raw_legs(file.path(), b';').unwrap();
        assert_eq!(rows.len(), 1);
    }
}
