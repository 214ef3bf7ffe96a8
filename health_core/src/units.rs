//! Display units and conversion from canonical storage units.
//!
//! Samples are kept in canonical units (kg, mg/dL, %). The user's
//! preference is applied only when a row is rendered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pounds per kilogram
pub const POUNDS_PER_KILOGRAM: f64 = 2.2046226218;

/// User's preferred weight unit
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightDisplayUnit {
    #[default]
    Kilograms,
    Pounds,
}

impl WeightDisplayUnit {
    /// Unit label written to the `Unit` column
    pub fn label(self) -> &'static str {
        match self {
            WeightDisplayUnit::Kilograms => "kg",
            WeightDisplayUnit::Pounds => "lbs",
        }
    }

    /// Name shown in settings
    pub fn display_name(self) -> &'static str {
        match self {
            WeightDisplayUnit::Kilograms => "Kilograms (kg)",
            WeightDisplayUnit::Pounds => "Pounds (lbs)",
        }
    }

    /// Parse a CLI/config token; `None` for anything unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" | "kilograms" => Some(WeightDisplayUnit::Kilograms),
            "lb" | "lbs" | "pounds" => Some(WeightDisplayUnit::Pounds),
            _ => None,
        }
    }
}

impl fmt::Display for WeightDisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Convert a weight in kilograms into the requested display unit.
///
/// Returns the converted value and its unit label.
pub fn convert_weight(kilograms: f64, to: WeightDisplayUnit) -> (f64, &'static str) {
    match to {
        WeightDisplayUnit::Kilograms => (kilograms, to.label()),
        WeightDisplayUnit::Pounds => (kilograms * POUNDS_PER_KILOGRAM, to.label()),
    }
}

/// Temperature preference (persisted, not used by any exported metric yet)
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn display_name(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "Celsius (°C)",
            TemperatureUnit::Fahrenheit => "Fahrenheit (°F)",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "c" | "celsius" => Some(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }
}

/// Distance and speed preference
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSpeedUnit {
    #[default]
    Metric,
    Imperial,
}

impl DistanceSpeedUnit {
    pub fn display_name(self) -> &'static str {
        match self {
            DistanceSpeedUnit::Metric => "Metric (meters/kph)",
            DistanceSpeedUnit::Imperial => "Imperial (feet/mph)",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Some(DistanceSpeedUnit::Metric),
            "imperial" => Some(DistanceSpeedUnit::Imperial),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kilograms_pass_through() {
        let (value, label) = convert_weight(75.0, WeightDisplayUnit::Kilograms);
        assert_eq!(value, 75.0);
        assert_eq!(label, "kg");
    }

    #[test]
    fn test_pounds_conversion() {
        let (value, label) = convert_weight(100.0, WeightDisplayUnit::Pounds);
        assert_eq!(label, "lbs");
        assert_eq!(format!("{:.2}", value), "220.46");

        let (value, _) = convert_weight(75.0, WeightDisplayUnit::Pounds);
        assert_eq!(format!("{:.2}", value), "165.35");
    }

    #[test]
    fn test_parse_weight_unit() {
        assert_eq!(WeightDisplayUnit::parse("kg"), Some(WeightDisplayUnit::Kilograms));
        assert_eq!(WeightDisplayUnit::parse("LBS"), Some(WeightDisplayUnit::Pounds));
        assert_eq!(WeightDisplayUnit::parse("stone"), None);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(WeightDisplayUnit::default(), WeightDisplayUnit::Kilograms);
        assert_eq!(TemperatureUnit::default(), TemperatureUnit::Celsius);
        assert_eq!(DistanceSpeedUnit::default(), DistanceSpeedUnit::Metric);
    }
}
