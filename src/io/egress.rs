//! Result egress - writes one run's outputs under the egress directory
//!
//! Legs and presence intervals go to JSONL (one object per line, short
//! stable keys); the slot grid is a dense table and goes to CSV; the
//! aggregate tables go to a single stats.json stamped with the run id.
//! Files are truncated per run - a batch run owns its output directory.

use crate::domain::types::{Leg, PresenceInterval};
use crate::services::binner::SlotGrid;
use crate::services::stats;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Egress writer for one run's outputs
pub struct Egress {
    out_dir: PathBuf,
}

impl Egress {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        let out_dir = out_dir.as_ref().to_path_buf();
        info!(out_dir = %out_dir.display(), "egress_initialized");
        Self { out_dir }
    }

    /// Write journey-tagged legs to legs.jsonl; returns the line count
    pub fn write_legs(&self, legs: &[Leg]) -> Result<usize> {
        let mut writer = self.create("legs.jsonl")?;
        for leg in legs {
            let record = json!({
                "participant": leg.participant.0,
                "start_place": leg.start_place,
                "end_place": leg.end_place,
                "start_time": fmt_ts(leg.start_time),
                "end_time": fmt_ts(leg.end_time),
                "distance_km": leg.distance_km,
                "mode": leg.mode.as_str(),
                "day": leg.day_of_week(),
                "journey_id": leg.journey_id.map(|id| id.0),
            });
            writeln!(writer, "{}", record).context("Failed to write legs.jsonl")?;
        }
        writer.flush().context("Failed to flush legs.jsonl")?;
        debug!(lines = %legs.len(), "legs_egressed");
        Ok(legs.len())
    }

    /// Write presence intervals to presence.jsonl; returns the line count
    pub fn write_presence(&self, intervals: &[PresenceInterval]) -> Result<usize> {
        let mut writer = self.create("presence.jsonl")?;
        for interval in intervals {
            let record = json!({
                "participant": interval.participant.0,
                "date": interval.date.format("%Y-%m-%d").to_string(),
                "place": interval.place,
                "from": fmt_ts(interval.from),
                "to": fmt_ts(interval.to),
            });
            writeln!(writer, "{}", record).context("Failed to write presence.jsonl")?;
        }
        writer.flush().context("Failed to flush presence.jsonl")?;
        debug!(lines = %intervals.len(), "presence_egressed");
        Ok(intervals.len())
    }

    /// Write the dense slot grid to slot_counts.csv; returns the row count
    pub fn write_slot_grid(&self, grid: &SlotGrid) -> Result<usize> {
        self.ensure_dir()?;
        let path = self.out_dir.join("slot_counts.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        writer
            .write_record(["time_slot", "place", "count"])
            .context("Failed to write slot_counts.csv header")?;
        for row in &grid.rows {
            writer
                .write_record([row.slot.as_str(), row.place.as_str(), &row.count.to_string()])
                .context("Failed to write slot_counts.csv row")?;
        }
        writer.flush().context("Failed to flush slot_counts.csv")?;
        debug!(rows = %grid.rows.len(), "slot_grid_egressed");
        Ok(grid.rows.len())
    }

    /// Write the aggregate tables to stats.json
    pub fn write_stats(&self, run_id: &str, legs: &[Leg], flow_limit: usize) -> Result<()> {
        let totals: Vec<_> = stats::mode_totals(legs)
            .into_iter()
            .map(|t| {
                json!({
                    "mode": t.mode,
                    "total_secs": t.total_secs,
                    "total_km": t.total_km,
                    "uses": t.uses,
                })
            })
            .collect();
        let means: Vec<_> = stats::mean_distance_by_mode(legs)
            .into_iter()
            .map(|(mode, mean_km)| json!({ "mode": mode, "mean_km": mean_km }))
            .collect();
        let day_grid: Vec<_> = stats::mean_duration_grid(legs)
            .into_iter()
            .map(|c| json!({ "day": c.day, "mode": c.mode, "mean_hours": c.mean_hours }))
            .collect();
        let flows: Vec<_> = stats::top_leg_flows(legs, flow_limit)
            .into_iter()
            .map(|f| json!({ "from": f.from, "to": f.to, "mode": f.mode, "count": f.count }))
            .collect();

        let doc = json!({
            "run_id": run_id,
            "mode_totals": totals,
            "mean_distance_by_mode": means,
            "mean_duration_by_day_mode": day_grid,
            "top_leg_flows": flows,
        });

        let mut writer = self.create("stats.json")?;
        serde_json::to_writer_pretty(&mut writer, &doc).context("Failed to write stats.json")?;
        writeln!(writer).context("Failed to write stats.json")?;
        writer.flush().context("Failed to flush stats.json")?;
        debug!("stats_egressed");
        Ok(())
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Failed to create egress dir {}", self.out_dir.display()))
    }

    fn create(&self, name: &str) -> Result<BufWriter<File>> {
        self.ensure_dir()?;
        let path = self.out_dir.join(name);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(BufWriter::new(file))
    }
}

fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{JourneyId, ParticipantId, TransportMode};
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::tempdir;

    fn ts(d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn leg() -> Leg {
        Leg {
            participant: ParticipantId("p1".to_string()),
            start_place: "Lausanne, CH".to_string(),
            end_place: "Geneva, CH".to_string(),
            start_time: ts(26, 8, 0),
            end_time: ts(26, 8, 40),
            distance_km: 35.0,
            mode: TransportMode::Train,
            journey_id: Some(JourneyId(3)),
        }
    }

    #[test]
    fn test_write_legs_jsonl() {
        let dir = tempdir().unwrap();
        let egress = Egress::new(dir.path());

        let count = egress.write_legs(&[leg()]).unwrap();
        assert_eq!(count, 1);

        let content = fs::read_to_string(dir.path().join("legs.jsonl")).unwrap();
        assert!(content.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["participant"], "p1");
        assert_eq!(parsed["mode"], "TRAIN");
        assert_eq!(parsed["journey_id"], 3);
        assert_eq!(parsed["day"], "Monday");
        assert_eq!(parsed["start_time"], "2024-08-26T08:00:00");
    }

    #[test]
    fn test_write_presence_jsonl() {
        let dir = tempdir().unwrap();
        let egress = Egress::new(dir.path());

        let interval = PresenceInterval::new(
            ParticipantId("p1".to_string()),
            "Lausanne, CH".to_string(),
            ts(26, 0, 0),
            ts(26, 8, 0),
        );
        egress.write_presence(&[interval]).unwrap();

        let content = fs::read_to_string(dir.path().join("presence.jsonl")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["place"], "Lausanne, CH");
        assert_eq!(parsed["date"], "2024-08-26");
        assert_eq!(parsed["from"], "2024-08-26T00:00:00");
        assert_eq!(parsed["to"], "2024-08-26T08:00:00");
    }

    #[test]
    fn test_write_slot_grid_csv() {
        use crate::services::binner::SlotCount;

        let dir = tempdir().unwrap();
        let egress = Egress::new(dir.path());

        let grid = SlotGrid {
            rows: vec![
                SlotCount { slot: "00h-06h".to_string(), place: "X".to_string(), count: 2 },
                SlotCount { slot: "06h-08h".to_string(), place: "X".to_string(), count: 0 },
            ],
            places: vec!["X".to_string()],
        };
        let rows = egress.write_slot_grid(&grid).unwrap();
        assert_eq!(rows, 2);

        let content = fs::read_to_string(dir.path().join("slot_counts.csv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "time_slot,place,count");
        assert_eq!(lines[1], "00h-06h,X,2");
        assert_eq!(lines[2], "06h-08h,X,0");
    }

    #[test]
    fn test_write_stats_json() {
        let dir = tempdir().unwrap();
        let egress = Egress::new(dir.path());

        egress.write_stats("run-123", &[leg()], 20).unwrap();

        let content = fs::read_to_string(dir.path().join("stats.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["run_id"], "run-123");
        assert_eq!(parsed["mode_totals"][0]["mode"], "Train");
        assert_eq!(parsed["top_leg_flows"][0]["count"], 1);
        assert_eq!(parsed["mean_duration_by_day_mode"].as_array().unwrap().len(), 7 * 8);
    }

    #[test]
    fn test_creates_missing_out_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("out");
        let egress = Egress::new(&nested);

        egress.write_legs(&[leg()]).unwrap();
        assert!(nested.join("legs.jsonl").exists());
    }

    #[test]
    fn test_rewrites_truncate_previous_run() {
        let dir = tempdir().unwrap();
        let egress = Egress::new(dir.path());

        egress.write_legs(&[leg(), leg()]).unwrap();
        egress.write_legs(&[leg()]).unwrap();

        let content = fs::read_to_string(dir.path().join("legs.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
