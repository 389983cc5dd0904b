//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every policy constant of the pipeline lives here: the per-mode speed
//! ranges, the intra-place plausibility thresholds, the journey gap, the
//! unobserved-relocation cap, the slot boundaries and the top-N cut.

use crate::domain::types::TransportMode;
use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_input_file")]
    pub input_file: String,
    #[serde(default = "default_places_file")]
    pub places_file: String,
    /// Single-character CSV field delimiter
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: String,
    /// Raw modes dropped at ingestion (sensor artifacts, unsupported modes)
    #[serde(default = "default_excluded_modes")]
    pub excluded_modes: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_file: default_input_file(),
            places_file: default_places_file(),
            csv_delimiter: default_csv_delimiter(),
            excluded_modes: default_excluded_modes(),
        }
    }
}

fn default_input_file() -> String {
    "data/all_movements.csv".to_string()
}

fn default_places_file() -> String {
    "data/places.json".to_string()
}

fn default_csv_delimiter() -> String {
    ";".to_string()
}

fn default_excluded_modes() -> Vec<String> {
    vec!["DETECTION_ERROR".to_string(), "MOTORBIKE".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleaningConfig {
    /// Max distance (km) for a leg that starts and ends in the same place
    #[serde(default = "default_max_intra_place_km")]
    pub max_intra_place_km: f64,
    /// Max duration (hours) for a leg that starts and ends in the same place
    #[serde(default = "default_max_intra_place_hours")]
    pub max_intra_place_hours: f64,
    /// Plausible [min, max] speed in km/h per raw mode name; modes absent
    /// from the table are unrestricted
    #[serde(default = "default_speed_ranges")]
    pub speed_ranges: HashMap<String, [f64; 2]>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            max_intra_place_km: default_max_intra_place_km(),
            max_intra_place_hours: default_max_intra_place_hours(),
            speed_ranges: default_speed_ranges(),
        }
    }
}

fn default_max_intra_place_km() -> f64 {
    30.0
}

fn default_max_intra_place_hours() -> f64 {
    2.0
}

fn default_speed_ranges() -> HashMap<String, [f64; 2]> {
    let mut ranges = HashMap::new();
    ranges.insert("WALKING".to_string(), [1.0, 15.0]);
    ranges.insert("ON_BICYCLE".to_string(), [5.0, 30.0]);
    ranges.insert("ELECTRIC_BIKE".to_string(), [10.0, 45.0]);
    ranges.insert("SCOOTER".to_string(), [5.0, 30.0]);
    ranges.insert("ELECTRIC_SCOOTER".to_string(), [5.0, 30.0]);
    ranges.insert("CAR".to_string(), [10.0, 250.0]);
    ranges.insert("ELECTRIC_CAR".to_string(), [10.0, 250.0]);
    ranges.insert("HYBRID_CAR".to_string(), [10.0, 250.0]);
    ranges.insert("BUS".to_string(), [10.0, 100.0]);
    ranges.insert("ELECTRIC_BUS".to_string(), [10.0, 100.0]);
    ranges.insert("COACH".to_string(), [20.0, 100.0]);
    ranges.insert("TRAIN".to_string(), [20.0, 300.0]);
    ranges.insert("TRAM".to_string(), [10.0, 60.0]);
    ranges.insert("BOAT".to_string(), [5.0, 50.0]);
    ranges.insert("BOAT_NO_ENGINE".to_string(), [2.0, 15.0]);
    ranges.insert("PLANE".to_string(), [200.0, 900.0]);
    ranges
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainingConfig {
    /// Max gap (minutes) between legs for journey continuation
    #[serde(default = "default_max_gap_minutes")]
    pub max_gap_minutes: i64,
}

impl Default for ChainingConfig {
    fn default() -> Self {
        Self { max_gap_minutes: default_max_gap_minutes() }
    }
}

fn default_max_gap_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccupancyConfig {
    /// Hours of presence granted around an unobserved relocation
    #[serde(default = "default_gap_cap_hours")]
    pub gap_cap_hours: i64,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self { gap_cap_hours: default_gap_cap_hours() }
    }
}

fn default_gap_cap_hours() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsConfig {
    /// Ascending hour boundaries; n+1 boundaries yield n slots
    #[serde(default = "default_slot_boundaries")]
    pub boundaries: Vec<u32>,
    /// Number of top places kept in the slot grid
    #[serde(default = "default_top_places")]
    pub top_places: usize,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self { boundaries: default_slot_boundaries(), top_places: default_top_places() }
    }
}

fn default_slot_boundaries() -> Vec<u32> {
    vec![0, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24]
}

fn default_top_places() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// Directory receiving the run outputs
    #[serde(default = "default_egress_dir")]
    pub dir: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { dir: default_egress_dir() }
    }
}

fn default_egress_dir() -> String {
    "out".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub chaining: ChainingConfig,
    #[serde(default)]
    pub occupancy: OccupancyConfig,
    #[serde(default)]
    pub slots: SlotsConfig,
    #[serde(default)]
    pub egress: EgressConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    input_file: String,
    places_file: String,
    csv_delimiter: u8,
    excluded_modes: Vec<String>,
    max_intra_place_km: f64,
    max_intra_place_hours: f64,
    speed_ranges: FxHashMap<String, (f64, f64)>,
    max_gap_minutes: i64,
    gap_cap_hours: i64,
    slot_boundaries: Vec<u32>,
    top_places: usize,
    egress_dir: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        let csv_delimiter = *toml_config.ingest.csv_delimiter.as_bytes().first().unwrap_or(&b';');
        let speed_ranges = toml_config
            .cleaning
            .speed_ranges
            .into_iter()
            .map(|(mode, range)| (mode, (range[0], range[1])))
            .collect();

        Self {
            input_file: toml_config.ingest.input_file,
            places_file: toml_config.ingest.places_file,
            csv_delimiter,
            excluded_modes: toml_config.ingest.excluded_modes,
            max_intra_place_km: toml_config.cleaning.max_intra_place_km,
            max_intra_place_hours: toml_config.cleaning.max_intra_place_hours,
            speed_ranges,
            max_gap_minutes: toml_config.chaining.max_gap_minutes,
            gap_cap_hours: toml_config.occupancy.gap_cap_hours,
            slot_boundaries: toml_config.slots.boundaries,
            top_places: toml_config.slots.top_places,
            egress_dir: toml_config.egress.dir,
            config_file: config_file.to_string(),
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Plausible speed range for a mode, None when unrestricted
    pub fn speed_range(&self, mode: &TransportMode) -> Option<(f64, f64)> {
        self.speed_ranges.get(mode.as_str()).copied()
    }

    /// Whether a raw mode name is dropped at ingestion
    pub fn is_excluded_mode(&self, raw_mode: &str) -> bool {
        self.excluded_modes.iter().any(|m| m == raw_mode)
    }

    // Getters for all config fields
    pub fn input_file(&self) -> &str {
        &self.input_file
    }

    pub fn places_file(&self) -> &str {
        &self.places_file
    }

    pub fn csv_delimiter(&self) -> u8 {
        self.csv_delimiter
    }

    pub fn excluded_modes(&self) -> &[String] {
        &self.excluded_modes
    }

    pub fn max_intra_place_km(&self) -> f64 {
        self.max_intra_place_km
    }

    pub fn max_intra_place_hours(&self) -> f64 {
        self.max_intra_place_hours
    }

    pub fn max_gap_minutes(&self) -> i64 {
        self.max_gap_minutes
    }

    pub fn gap_cap_hours(&self) -> i64 {
        self.gap_cap_hours
    }

    pub fn slot_boundaries(&self) -> &[u32] {
        &self.slot_boundaries
    }

    pub fn top_places(&self) -> usize {
        self.top_places
    }

    pub fn egress_dir(&self) -> &str {
        &self.egress_dir
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the top-N place cut
    #[cfg(test)]
    pub fn with_top_places(mut self, top_places: usize) -> Self {
        self.top_places = top_places;
        self
    }

    /// Builder method for tests to set the journey continuation gap
    #[cfg(test)]
    pub fn with_max_gap_minutes(mut self, minutes: i64) -> Self {
        self.max_gap_minutes = minutes;
        self
    }

    /// Builder method for tests to set the unobserved-relocation cap
    #[cfg(test)]
    pub fn with_gap_cap_hours(mut self, hours: i64) -> Self {
        self.gap_cap_hours = hours;
        self
    }

    /// Builder method for tests to override one mode's speed range
    #[cfg(test)]
    pub fn with_speed_range(mut self, raw_mode: &str, min: f64, max: f64) -> Self {
        self.speed_ranges.insert(raw_mode.to_string(), (min, max));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_intra_place_km(), 30.0);
        assert_eq!(config.max_intra_place_hours(), 2.0);
        assert_eq!(config.max_gap_minutes(), 60);
        assert_eq!(config.gap_cap_hours(), 1);
        assert_eq!(config.top_places(), 20);
        assert_eq!(config.csv_delimiter(), b';');
        assert_eq!(config.slot_boundaries(), &[0, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24]);
        assert_eq!(config.excluded_modes(), &["DETECTION_ERROR", "MOTORBIKE"]);
    }

    #[test]
    fn test_default_speed_ranges() {
        let config = Config::default();
        assert_eq!(config.speed_range(&TransportMode::Walking), Some((1.0, 15.0)));
        assert_eq!(config.speed_range(&TransportMode::Plane), Some((200.0, 900.0)));
        assert_eq!(config.speed_range(&TransportMode::Train), Some((20.0, 300.0)));
    }

    #[test]
    fn test_unknown_mode_is_unrestricted() {
        let config = Config::default();
        let mode = TransportMode::from_raw("HOVERBOARD");
        assert_eq!(config.speed_range(&mode), None);
    }

    #[test]
    fn test_is_excluded_mode() {
        let config = Config::default();
        assert!(config.is_excluded_mode("DETECTION_ERROR"));
        assert!(config.is_excluded_mode("MOTORBIKE"));
        assert!(!config.is_excluded_mode("WALKING"));
    }

    #[test]
    fn test_resolve_config_path_default() {
        let args: Vec<String> = vec!["mobility-pipeline".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/dev.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> = vec![
            "mobility-pipeline".to_string(),
            "--config".to_string(),
            "config/prod.toml".to_string(),
        ];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["mobility-pipeline".to_string(), "--config=config/local.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/local.toml");
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::default()
            .with_top_places(5)
            .with_max_gap_minutes(30)
            .with_gap_cap_hours(2)
            .with_speed_range("WALKING", 0.5, 10.0);
        assert_eq!(config.top_places(), 5);
        assert_eq!(config.max_gap_minutes(), 30);
        assert_eq!(config.gap_cap_hours(), 2);
        assert_eq!(config.speed_range(&TransportMode::Walking), Some((0.5, 10.0)));
    }
}
