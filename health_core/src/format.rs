//! Row formatting.
//!
//! A [`RowFormatter`] is built per export from the caller's preferences and
//! turns validated samples into [`ExportRow`]s. Date patterns are fixed and
//! never depend on locale.

use crate::units::{convert_weight, WeightDisplayUnit};
use crate::{A1cSample, GlucoseSample, MetricKind, MetricSamples, StepsSample, WeightSample};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Pattern of the `Date` column
pub const LOCAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Pattern of the `ISO8601` column, always rendered in UTC
pub const UTC_ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Time zone used for the `Date` column and for resolving day ranges
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayZone {
    /// The system's local time zone
    #[default]
    Local,
    Utc,
    #[serde(skip)]
    Fixed(FixedOffset),
}

impl DisplayZone {
    /// Render `at` in this zone with a chrono format string
    pub fn format(self, at: &DateTime<Utc>, pattern: &str) -> String {
        match self {
            DisplayZone::Local => at.with_timezone(&Local).format(pattern).to_string(),
            DisplayZone::Utc => at.format(pattern).to_string(),
            DisplayZone::Fixed(offset) => at.with_timezone(&offset).format(pattern).to_string(),
        }
    }

    /// Calendar date of `at` in this zone
    pub fn date_of(self, at: &DateTime<Utc>) -> NaiveDate {
        match self {
            DisplayZone::Local => at.with_timezone(&Local).date_naive(),
            DisplayZone::Utc => at.date_naive(),
            DisplayZone::Fixed(offset) => at.with_timezone(&offset).date_naive(),
        }
    }

    /// First instant of `date` in this zone
    pub fn start_of_day(self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        match self {
            DisplayZone::Local => resolve_local(&Local, &midnight),
            DisplayZone::Utc => midnight.and_utc(),
            DisplayZone::Fixed(offset) => resolve_local(&offset, &midnight),
        }
    }
}

// Midnight can fall into a DST gap; fall back to reading it as UTC.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// One data line of the exported CSV
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub date_local: String,
    pub date_utc_iso8601: String,
    pub metric_label: String,
    pub formatted_value: String,
    pub unit_label: String,
}

/// Renders validated samples into export rows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowFormatter {
    pub zone: DisplayZone,
    pub weight_unit: WeightDisplayUnit,
}

impl RowFormatter {
    pub fn new(zone: DisplayZone, weight_unit: WeightDisplayUnit) -> Self {
        Self { zone, weight_unit }
    }

    fn row(
        &self,
        timestamp: &DateTime<Utc>,
        kind: MetricKind,
        value: String,
        unit: &str,
    ) -> ExportRow {
        ExportRow {
            date_local: self.zone.format(timestamp, LOCAL_DATE_FORMAT),
            date_utc_iso8601: timestamp.format(UTC_ISO8601_FORMAT).to_string(),
            metric_label: kind.label().to_string(),
            formatted_value: value,
            unit_label: unit.to_string(),
        }
    }

    pub fn weight_row(&self, sample: &WeightSample) -> ExportRow {
        let (value, unit) = convert_weight(sample.kilograms, self.weight_unit);
        self.row(
            &sample.timestamp,
            MetricKind::Weight,
            format!("{:.2}", value),
            unit,
        )
    }

    pub fn steps_row(&self, sample: &StepsSample) -> ExportRow {
        self.row(
            &sample.timestamp,
            MetricKind::Steps,
            sample.count.to_string(),
            "steps",
        )
    }

    pub fn glucose_row(&self, sample: &GlucoseSample) -> ExportRow {
        self.row(
            &sample.timestamp(),
            MetricKind::BloodGlucose,
            format!("{:.0}", sample.mg_per_dl()),
            "mg/dL",
        )
    }

    pub fn a1c_row(&self, sample: &A1cSample) -> ExportRow {
        self.row(
            &sample.timestamp(),
            MetricKind::HemoglobinA1c,
            format!("{:.2}", sample.percent()),
            sample.source_unit(),
        )
    }

    /// Rows for a whole collection, in input order
    pub fn rows(&self, samples: &MetricSamples) -> Vec<ExportRow> {
        match samples {
            MetricSamples::Weight(s) => s.iter().map(|x| self.weight_row(x)).collect(),
            MetricSamples::Steps(s) => s.iter().map(|x| self.steps_row(x)).collect(),
            MetricSamples::BloodGlucose(s) => s.iter().map(|x| self.glucose_row(x)).collect(),
            MetricSamples::HemoglobinA1c(s) => s.iter().map(|x| self.a1c_row(x)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{make_a1c_sample_from_measurement, make_glucose_sample};
    use crate::{RawMeasurement, UnitKind};

    fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
    }

    fn utc_formatter(unit: WeightDisplayUnit) -> RowFormatter {
        RowFormatter::new(DisplayZone::Utc, unit)
    }

    #[test]
    fn test_weight_row_kilograms() {
        let row = utc_formatter(WeightDisplayUnit::Kilograms).weight_row(&WeightSample {
            timestamp: reference_time(),
            kilograms: 75.0,
        });
        assert_eq!(row.date_local, "2024-01-15 09:30:00");
        assert_eq!(row.date_utc_iso8601, "2024-01-15T09:30:00Z");
        assert_eq!(row.metric_label, "Weight");
        assert_eq!(row.formatted_value, "75.00");
        assert_eq!(row.unit_label, "kg");
    }

    #[test]
    fn test_weight_row_pounds() {
        let row = utc_formatter(WeightDisplayUnit::Pounds).weight_row(&WeightSample {
            timestamp: reference_time(),
            kilograms: 75.0,
        });
        assert_eq!(row.formatted_value, "165.35");
        assert_eq!(row.unit_label, "lbs");
    }

    #[test]
    fn test_steps_row_is_integer() {
        let row = utc_formatter(WeightDisplayUnit::Kilograms).steps_row(&StepsSample {
            timestamp: reference_time(),
            count: 8500,
        });
        assert_eq!(row.formatted_value, "8500");
        assert_eq!(row.unit_label, "steps");
    }

    #[test]
    fn test_glucose_row_rounds() {
        let sample = make_glucose_sample(&RawMeasurement {
            timestamp: reference_time(),
            value: 145.6,
            declared_unit: UnitKind::Concentration,
        })
        .accepted()
        .unwrap();
        let row = utc_formatter(WeightDisplayUnit::Kilograms).glucose_row(&sample);
        assert_eq!(row.metric_label, "Blood Glucose");
        assert_eq!(row.formatted_value, "146");
        assert_eq!(row.unit_label, "mg/dL");
    }

    #[test]
    fn test_a1c_row_two_decimals() {
        let sample = make_a1c_sample_from_measurement(&RawMeasurement {
            timestamp: reference_time(),
            value: 7.2,
            declared_unit: UnitKind::Percent,
        })
        .accepted()
        .unwrap();
        let row = utc_formatter(WeightDisplayUnit::Kilograms).a1c_row(&sample);
        assert_eq!(row.metric_label, "Hemoglobin A1C");
        assert_eq!(row.formatted_value, "7.20");
        assert_eq!(row.unit_label, "%");
    }

    #[test]
    fn test_local_column_follows_zone_but_iso_stays_utc() {
        let offset = FixedOffset::east_opt(-5 * 3600).unwrap();
        let formatter = RowFormatter::new(DisplayZone::Fixed(offset), WeightDisplayUnit::Kilograms);
        let row = formatter.steps_row(&StepsSample {
            timestamp: reference_time(),
            count: 1,
        });
        assert_eq!(row.date_local, "2024-01-15 04:30:00");
        assert_eq!(row.date_utc_iso8601, "2024-01-15T09:30:00Z");
    }

    #[test]
    fn test_start_of_day_in_fixed_zone() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            DisplayZone::Fixed(offset).start_of_day(date),
            Utc.with_ymd_and_hms(2024, 1, 14, 22, 0, 0).unwrap()
        );
        assert_eq!(
            DisplayZone::Utc.start_of_day(date),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }
}
