use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Hourly variables requested from the archive, in query order.
pub const FIELDS: [Field; 5] = [
    Field::Temperature,
    Field::Humidity,
    Field::Precipitation,
    Field::Pressure,
    Field::WindSpeed,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "temperature_2m")]
    Temperature,
    #[serde(rename = "humidity_2m", alias = "relative_humidity_2m")]
    Humidity,
    #[serde(rename = "precipitation")]
    Precipitation,
    #[serde(rename = "surface_pressure")]
    Pressure,
    #[serde(rename = "wind_speed_10m")]
    WindSpeed,
}

impl Field {
    /// Name used for the field in observations and rule sets.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature_2m",
            Field::Humidity => "humidity_2m",
            Field::Precipitation => "precipitation",
            Field::Pressure => "surface_pressure",
            Field::WindSpeed => "wind_speed_10m",
        }
    }

    /// Name of the hourly variable on the wire.
    pub fn api_param(&self) -> &'static str {
        match self {
            Field::Humidity => "relative_humidity_2m",
            other => other.key(),
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        match key {
            "temperature_2m" => Some(Field::Temperature),
            "humidity_2m" | "relative_humidity_2m" => Some(Field::Humidity),
            "precipitation" => Some(Field::Precipitation),
            "surface_pressure" => Some(Field::Pressure),
            "wind_speed_10m" => Some(Field::WindSpeed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Temperature => "Temperature",
            Field::Humidity => "Humidity",
            Field::Precipitation => "Precipitation",
            Field::Pressure => "Surface Pressure",
            Field::WindSpeed => "Wind Speed",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Field::Temperature => "°C",
            Field::Humidity => "%",
            Field::Precipitation => "mm",
            Field::Pressure => "hPa",
            Field::WindSpeed => "km/h",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Coordinate scaled to integer thousandths, stable enough to hash.
    pub fn rounded(&self) -> (i64, i64) {
        (
            (self.latitude * 1000.0).round() as i64,
            (self.longitude * 1000.0).round() as i64,
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}, {:.3}", self.latitude, self.longitude)
    }
}

/// The instant or span a zone is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    At(NaiveDateTime),
    Between(NaiveDateTime, NaiveDateTime),
}

impl TimeWindow {
    /// Inclusive date range for the archive query.
    pub fn dates(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            TimeWindow::At(ts) => (ts.date(), ts.date()),
            TimeWindow::Between(start, end) => (start.date(), end.date()),
        }
    }

    /// Instant the hourly series is sampled at; the midpoint for a span.
    pub fn target(&self) -> NaiveDateTime {
        match *self {
            TimeWindow::At(ts) => ts,
            TimeWindow::Between(start, end) => start + (end - start) / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// Every value came from the archive.
    Remote,
    /// The archive answered but some values were filled in locally.
    Patched,
    /// The archive was unreachable; every value is synthesized.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub values: BTreeMap<Field, f64>,
    pub timestamp: NaiveDateTime,
    pub coordinate: Coordinate,
    pub quality: Quality,
}

impl Observation {
    pub fn value(&self, field: Field) -> Option<f64> {
        self.values.get(&field).copied()
    }

    /// Looks a value up by its observation key (e.g. `temperature_2m`).
    pub fn get(&self, key: &str) -> Option<f64> {
        Field::from_key(key).and_then(|field| self.value(field))
    }

    pub fn is_fallback(&self) -> bool {
        self.quality == Quality::Fallback
    }

    /// Whether this observation was produced for the given request.
    pub fn answers(&self, coordinate: Coordinate, window: TimeWindow) -> bool {
        self.coordinate == coordinate && self.timestamp == window.target()
    }
}
