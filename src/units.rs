use crate::weather::Field;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn toggled(self) -> Self {
        match self {
            Units::Metric => Units::Imperial,
            Units::Imperial => Units::Metric,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

pub mod temperature {
    pub fn c2f(temp_c: f64) -> f64 {
        temp_c * 9.0 / 5.0 + 32.0
    }

    #[test]
    fn test_temperature() {
        assert_eq!(c2f(0.0), 32.0);
        assert_eq!(c2f(100.0), 212.0);
    }
}

pub mod speed {
    const MILES_PER_KM: f64 = 0.621371;

    pub fn kph2mph(kph: f64) -> f64 {
        kph * MILES_PER_KM
    }

    #[test]
    fn test_speed() {
        assert!((kph2mph(100.0) - 62.1371).abs() < 1e-9);
        assert_eq!(kph2mph(0.0), 0.0);
    }
}

pub mod length {
    const MM_PER_INCH: f64 = 25.4;

    pub fn mm2in(mm: f64) -> f64 {
        mm / MM_PER_INCH
    }
}

pub mod pressure {
    const HPA_PER_INHG: f64 = 33.863_886;

    pub fn hpa2inhg(hpa: f64) -> f64 {
        hpa / HPA_PER_INHG
    }
}

/// Renders a metric observation value in the requested unit system.
pub fn format_value(field: Field, value: f64, units: Units) -> String {
    match (units, field) {
        (Units::Metric, Field::Humidity) => format!("{value:.0} {}", field.unit()),
        (Units::Metric, _) => format!("{value:.1} {}", field.unit()),
        (Units::Imperial, Field::Temperature) => format!("{:.1} °F", temperature::c2f(value)),
        (Units::Imperial, Field::WindSpeed) => format!("{:.1} mph", speed::kph2mph(value)),
        (Units::Imperial, Field::Precipitation) => format!("{:.2} in", length::mm2in(value)),
        (Units::Imperial, Field::Pressure) => format!("{:.2} inHg", pressure::hpa2inhg(value)),
        (Units::Imperial, Field::Humidity) => format!("{value:.0} %"),
    }
}

#[test]
fn test_format_value() {
    assert_eq!(format_value(Field::Temperature, 25.0, Units::Metric), "25.0 °C");
    assert_eq!(format_value(Field::Temperature, 25.0, Units::Imperial), "77.0 °F");
    assert_eq!(format_value(Field::Humidity, 89.6, Units::Metric), "90 %");
    assert_eq!(format_value(Field::Precipitation, 25.4, Units::Imperial), "1.00 in");
    assert_eq!(format_value(Field::Pressure, 1013.25, Units::Imperial), "29.92 inHg");
}
