//! Shared types for the mobility pipeline

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

/// Newtype wrapper for participant ids to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub String);

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for journey ids assigned by the chainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct JourneyId(pub u64);

impl std::fmt::Display for JourneyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport mode vocabulary of the movement dataset
///
/// Raw wire names ("WALKING", "ON_BICYCLE", ...) round-trip through
/// `from_raw`/`as_str`. Modes outside the vocabulary are carried as
/// `Other` so the speed filter can treat them as unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Walking,
    Bicycle,
    ElectricBike,
    Scooter,
    ElectricScooter,
    Car,
    ElectricCar,
    HybridCar,
    Bus,
    ElectricBus,
    Coach,
    Train,
    Tram,
    Boat,
    BoatNoEngine,
    Plane,
    Other(String),
}

impl TransportMode {
    pub fn from_raw(s: &str) -> Self {
        match s {
            "WALKING" => TransportMode::Walking,
            "ON_BICYCLE" => TransportMode::Bicycle,
            "ELECTRIC_BIKE" => TransportMode::ElectricBike,
            "SCOOTER" => TransportMode::Scooter,
            "ELECTRIC_SCOOTER" => TransportMode::ElectricScooter,
            "CAR" => TransportMode::Car,
            "ELECTRIC_CAR" => TransportMode::ElectricCar,
            "HYBRID_CAR" => TransportMode::HybridCar,
            "BUS" => TransportMode::Bus,
            "ELECTRIC_BUS" => TransportMode::ElectricBus,
            "COACH" => TransportMode::Coach,
            "TRAIN" => TransportMode::Train,
            "TRAM" => TransportMode::Tram,
            "BOAT" => TransportMode::Boat,
            "BOAT_NO_ENGINE" => TransportMode::BoatNoEngine,
            "PLANE" => TransportMode::Plane,
            other => TransportMode::Other(other.to_string()),
        }
    }

    /// Raw dataset name, also the key into the configured speed-range table
    pub fn as_str(&self) -> &str {
        match self {
            TransportMode::Walking => "WALKING",
            TransportMode::Bicycle => "ON_BICYCLE",
            TransportMode::ElectricBike => "ELECTRIC_BIKE",
            TransportMode::Scooter => "SCOOTER",
            TransportMode::ElectricScooter => "ELECTRIC_SCOOTER",
            TransportMode::Car => "CAR",
            TransportMode::ElectricCar => "ELECTRIC_CAR",
            TransportMode::HybridCar => "HYBRID_CAR",
            TransportMode::Bus => "BUS",
            TransportMode::ElectricBus => "ELECTRIC_BUS",
            TransportMode::Coach => "COACH",
            TransportMode::Train => "TRAIN",
            TransportMode::Tram => "TRAM",
            TransportMode::Boat => "BOAT",
            TransportMode::BoatNoEngine => "BOAT_NO_ENGINE",
            TransportMode::Plane => "PLANE",
            TransportMode::Other(s) => s,
        }
    }

    /// Canonical grouped name used by the aggregations
    ///
    /// Electric/hybrid variants fold into their base mode, COACH counts
    /// as Bus, engineless boats as Boat.
    pub fn display_name(&self) -> &str {
        match self {
            TransportMode::Walking => "Walking",
            TransportMode::Bicycle | TransportMode::ElectricBike => "Bicycle",
            TransportMode::Scooter | TransportMode::ElectricScooter => "Scooter",
            TransportMode::Car | TransportMode::ElectricCar | TransportMode::HybridCar => "Car",
            TransportMode::Bus | TransportMode::ElectricBus | TransportMode::Coach => "Bus",
            TransportMode::Train => "Train",
            TransportMode::Tram => "Tram",
            TransportMode::Boat | TransportMode::BoatNoEngine => "Boat",
            TransportMode::Plane => "Plane",
            TransportMode::Other(s) => s,
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TransportMode::from_raw(s))
    }
}

/// One recorded trip segment between two resolved places
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub participant: ParticipantId,
    pub start_place: String,
    pub end_place: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub distance_km: f64,
    pub mode: TransportMode,
    /// Assigned by the journey chainer; None until chained
    pub journey_id: Option<JourneyId>,
}

impl Leg {
    /// Signed duration; non-positive durations mark invalid legs
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    #[inline]
    pub fn start_date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Full English weekday name of the start timestamp
    pub fn day_of_week(&self) -> &'static str {
        weekday_name(self.start_time.weekday())
    }

    /// A leg that starts and ends at the same place
    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.start_place == self.end_place
    }

    /// Speed in km/h, or None when the duration is not positive
    pub fn speed_kmh(&self) -> Option<f64> {
        let secs = self.duration().num_seconds();
        if secs <= 0 {
            return None;
        }
        Some(self.distance_km / (secs as f64 / 3600.0))
    }
}

/// A derived stay: the participant occupied `place` during `[from, to)`
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceInterval {
    pub participant: ParticipantId,
    pub date: NaiveDate,
    pub place: String,
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl PresenceInterval {
    pub fn new(
        participant: ParticipantId,
        place: String,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Self {
        Self { participant, date: from.date(), place, from, to }
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Midnight opening the given date
#[inline]
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// Exclusive end of the given date: midnight of the next day
#[inline]
pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    day_start(date) + Duration::days(1)
}

/// Truncate a timestamp down to the full hour
pub fn hour_floor(ts: NaiveDateTime) -> NaiveDateTime {
    let into_hour = i64::from(ts.minute()) * 60 + i64::from(ts.second());
    ts - Duration::seconds(into_hour) - Duration::nanoseconds(i64::from(ts.nanosecond()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn leg(start: NaiveDateTime, end: NaiveDateTime, km: f64) -> Leg {
        Leg {
            participant: ParticipantId("p1".to_string()),
            start_place: "Lausanne, CH".to_string(),
            end_place: "Geneva, CH".to_string(),
            start_time: start,
            end_time: end,
            distance_km: km,
            mode: TransportMode::Train,
            journey_id: None,
        }
    }

    #[test]
    fn test_mode_round_trip() {
        assert_eq!(TransportMode::from_raw("WALKING"), TransportMode::Walking);
        assert_eq!(TransportMode::from_raw("ON_BICYCLE").as_str(), "ON_BICYCLE");
        assert!(matches!(
            "HOVERBOARD".parse::<TransportMode>().unwrap(),
            TransportMode::Other(_)
        ));
        assert_eq!(TransportMode::from_raw("HOVERBOARD").as_str(), "HOVERBOARD");
    }

    #[test]
    fn test_display_name_grouping() {
        assert_eq!(TransportMode::from_raw("ELECTRIC_BIKE").display_name(), "Bicycle");
        assert_eq!(TransportMode::from_raw("COACH").display_name(), "Bus");
        assert_eq!(TransportMode::from_raw("BOAT_NO_ENGINE").display_name(), "Boat");
        assert_eq!(TransportMode::from_raw("HYBRID_CAR").display_name(), "Car");
        assert_eq!(TransportMode::from_raw("WALKING").display_name(), "Walking");
    }

    #[test]
    fn test_speed_kmh() {
        let l = leg(ts(2024, 8, 28, 10, 0), ts(2024, 8, 28, 10, 30), 30.0);
        assert_eq!(l.speed_kmh(), Some(60.0));
    }

    #[test]
    fn test_speed_kmh_invalid_duration() {
        let l = leg(ts(2024, 8, 28, 10, 0), ts(2024, 8, 28, 10, 0), 30.0);
        assert_eq!(l.speed_kmh(), None);

        let l = leg(ts(2024, 8, 28, 10, 0), ts(2024, 8, 28, 9, 0), 30.0);
        assert_eq!(l.speed_kmh(), None);
    }

    #[test]
    fn test_self_loop() {
        let mut l = leg(ts(2024, 8, 28, 10, 0), ts(2024, 8, 28, 10, 30), 1.0);
        assert!(!l.is_self_loop());
        l.end_place = l.start_place.clone();
        assert!(l.is_self_loop());
    }

    #[test]
    fn test_day_of_week() {
        // 2024-08-26 was a Monday
        let l = leg(ts(2024, 8, 26, 10, 0), ts(2024, 8, 26, 10, 30), 1.0);
        assert_eq!(l.day_of_week(), "Monday");
    }

    #[test]
    fn test_hour_floor() {
        assert_eq!(hour_floor(ts(2024, 8, 28, 10, 42)), ts(2024, 8, 28, 10, 0));
        assert_eq!(hour_floor(ts(2024, 8, 28, 10, 0)), ts(2024, 8, 28, 10, 0));
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 28).unwrap();
        assert_eq!(day_start(date), ts(2024, 8, 28, 0, 0));
        assert_eq!(day_end(date), ts(2024, 8, 29, 0, 0));
    }

    #[test]
    fn test_presence_interval_date_follows_from() {
        let iv = PresenceInterval::new(
            ParticipantId("p1".to_string()),
            "Lausanne, CH".to_string(),
            ts(2024, 8, 28, 22, 0),
            ts(2024, 8, 29, 0, 0),
        );
        assert_eq!(iv.date, NaiveDate::from_ymd_opt(2024, 8, 28).unwrap());
    }
}
