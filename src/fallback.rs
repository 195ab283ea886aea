//! Deterministic stand-in values used when the archive has nothing to offer.
//!
//! Every value is a pure function of the field and the coordinate, so an
//! offline session always paints the same picture.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::weather::{Coordinate, Field, Observation, Quality, FIELDS};

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn fallback(field: Field, lat: f64, lng: f64) -> f64 {
    let seed = (lat * lng).sin().abs() * 1000.0;

    match field {
        // warmer toward the equator
        Field::Temperature => round_to(35.0 - lat.abs() * 0.8 + seed % 20.0 - 10.0, 1),
        // wetter inside the tropics
        Field::Humidity => {
            let base = if lat.abs() < 23.5 { 70.0 } else { 50.0 };
            round_to(base + seed % 30.0, 0)
        }
        Field::Precipitation => round_to(seed % 5.0, 1),
        Field::Pressure => round_to(1013.0 + seed % 40.0 - 20.0, 1),
        Field::WindSpeed => round_to(seed % 15.0, 1),
    }
}

/// An observation made entirely of synthesized values.
pub fn observation(coordinate: Coordinate, timestamp: NaiveDateTime) -> Observation {
    let values: BTreeMap<Field, f64> = FIELDS
        .iter()
        .map(|&field| {
            (
                field,
                fallback(field, coordinate.latitude, coordinate.longitude),
            )
        })
        .collect();

    Observation {
        values,
        timestamp,
        coordinate,
        quality: Quality::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn same_inputs_same_output() {
        let a = fallback(Field::Temperature, 12.34, 56.78);
        let b = fallback(Field::Temperature, 12.34, 56.78);
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(close(a, 25.0));
    }

    #[test]
    fn known_values_for_central_india() {
        assert!(close(fallback(Field::Temperature, 20.0, 78.0), 9.2));
        assert!(close(fallback(Field::Humidity, 20.0, 78.0), 90.0));
        assert!(close(fallback(Field::Precipitation, 20.0, 78.0), 0.2));
        assert!(close(fallback(Field::Pressure, 20.0, 78.0), 1013.2));
        assert!(close(fallback(Field::WindSpeed, 20.0, 78.0), 5.2));
    }

    #[test]
    fn origin_is_calm() {
        assert!(close(fallback(Field::Temperature, 0.0, 0.0), 25.0));
        assert!(close(fallback(Field::Humidity, 0.0, 0.0), 70.0));
        assert!(close(fallback(Field::Pressure, 0.0, 0.0), 993.0));
        assert!(close(fallback(Field::WindSpeed, 0.0, 0.0), 0.0));
    }

    proptest! {
        #[test]
        fn values_stay_in_band(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
            let humidity = fallback(Field::Humidity, lat, lng);
            prop_assert!((50.0..=100.0).contains(&humidity));
            let rain = fallback(Field::Precipitation, lat, lng);
            prop_assert!((0.0..=5.0).contains(&rain));
            let pressure = fallback(Field::Pressure, lat, lng);
            prop_assert!((993.0..=1033.0).contains(&pressure));
            let wind = fallback(Field::WindSpeed, lat, lng);
            prop_assert!((0.0..=15.0).contains(&wind));
            let temp = fallback(Field::Temperature, lat, lng);
            prop_assert_eq!(temp.to_bits(), fallback(Field::Temperature, lat, lng).to_bits());
        }
    }
}
