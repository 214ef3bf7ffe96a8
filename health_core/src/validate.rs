//! Sample validators.
//!
//! Each validator turns one raw measurement (or lab record) into a typed
//! sample, or rejects it with a reason. Rejection is not an error: the
//! sample is simply left out of its collection.
//!
//! The glucose and A1C thresholds guard against the health store's
//! percent/mg/dL ambiguity. A1C readings (4-15 %) misread as mg/dL land
//! well below any real blood glucose value.

use crate::lab::{LabRecord, LOINC_HEMOGLOBIN_A1C};
use crate::{
    A1cSample, GlucoseSample, MetricKind, MetricSamples, RawMeasurement, StepsSample, UnitKind,
    WeightSample,
};
use std::fmt;

/// Lowest blood glucose value accepted, in mg/dL (inclusive)
pub const GLUCOSE_MIN_MG_DL: f64 = 20.0;

/// Highest A1C value accepted, in percent (inclusive). The lower fence is
/// exclusive zero.
pub const A1C_MAX_PERCENT: f64 = 20.0;

/// Why a measurement did not become a sample
#[derive(Clone, Debug, PartialEq)]
pub enum RejectReason {
    UnitMismatch { expected: UnitKind, found: UnitKind },
    NonFinite,
    GlucoseBelowThreshold(f64),
    A1cOutOfRange(f64),
    MissingLabCode,
    UnparseableDate(Option<String>),
    MissingQuantity,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnitMismatch { expected, found } => {
                write!(f, "expected {:?} unit, found {:?}", expected, found)
            }
            RejectReason::NonFinite => f.write_str("value is not a finite number"),
            RejectReason::GlucoseBelowThreshold(v) => {
                write!(f, "glucose {} mg/dL is below {} mg/dL", v, GLUCOSE_MIN_MG_DL)
            }
            RejectReason::A1cOutOfRange(v) => {
                write!(f, "A1C {}% is outside (0, {}]", v, A1C_MAX_PERCENT)
            }
            RejectReason::MissingLabCode => {
                write!(f, "no coding matches LOINC {}", LOINC_HEMOGLOBIN_A1C)
            }
            RejectReason::UnparseableDate(raw) => match raw {
                Some(raw) => write!(f, "cannot parse effective date {:?}", raw),
                None => f.write_str("effective date missing"),
            },
            RejectReason::MissingQuantity => f.write_str("lab record has no numeric value"),
        }
    }
}

/// Outcome of validating one measurement
#[derive(Clone, Debug, PartialEq)]
pub enum Validation<T> {
    Accepted(T),
    Rejected(RejectReason),
}

impl<T> Validation<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }

    /// Drop the rejection reason
    pub fn accepted(self) -> Option<T> {
        match self {
            Validation::Accepted(sample) => Some(sample),
            Validation::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Validation::Accepted(_) => None,
            Validation::Rejected(reason) => Some(reason),
        }
    }
}

fn check_unit(raw: &RawMeasurement, kind: MetricKind) -> Result<(), RejectReason> {
    let expected = kind.expected_unit();
    if raw.declared_unit != expected {
        return Err(RejectReason::UnitMismatch {
            expected,
            found: raw.declared_unit,
        });
    }
    if !raw.value.is_finite() {
        return Err(RejectReason::NonFinite);
    }
    Ok(())
}

pub fn make_weight_sample(raw: &RawMeasurement) -> Validation<WeightSample> {
    if let Err(reason) = check_unit(raw, MetricKind::Weight) {
        return Validation::Rejected(reason);
    }
    Validation::Accepted(WeightSample {
        timestamp: raw.timestamp,
        kilograms: raw.value,
    })
}

/// Steps are whole numbers; any fractional part is truncated toward zero.
pub fn make_steps_sample(raw: &RawMeasurement) -> Validation<StepsSample> {
    if let Err(reason) = check_unit(raw, MetricKind::Steps) {
        return Validation::Rejected(reason);
    }
    Validation::Accepted(StepsSample {
        timestamp: raw.timestamp,
        count: raw.value.trunc() as i64,
    })
}

/// Build a glucose sample, rejecting anything below 20 mg/dL.
///
/// The store may declare glucose entries as either concentration or
/// percent; both are read as mg/dL and the threshold decides.
pub fn make_glucose_sample(raw: &RawMeasurement) -> Validation<GlucoseSample> {
    match raw.declared_unit {
        UnitKind::Concentration | UnitKind::Percent => {}
        found => {
            return Validation::Rejected(RejectReason::UnitMismatch {
                expected: MetricKind::BloodGlucose.expected_unit(),
                found,
            })
        }
    }

    let mg_per_dl = raw.value;
    if !mg_per_dl.is_finite() {
        return Validation::Rejected(RejectReason::NonFinite);
    }
    if mg_per_dl < GLUCOSE_MIN_MG_DL {
        return Validation::Rejected(RejectReason::GlucoseBelowThreshold(mg_per_dl));
    }

    Validation::Accepted(GlucoseSample::new(raw.timestamp, mg_per_dl))
}

fn check_a1c_percent(percent: f64) -> Result<(), RejectReason> {
    if !percent.is_finite() {
        return Err(RejectReason::NonFinite);
    }
    if percent <= 0.0 || percent > A1C_MAX_PERCENT {
        return Err(RejectReason::A1cOutOfRange(percent));
    }
    Ok(())
}

/// Build an A1C sample from a clinical lab record.
///
/// The record must carry the Hemoglobin A1C LOINC code, a parseable
/// effective date and a numeric value in `(0, 20]`.
pub fn make_a1c_sample(record: &LabRecord) -> Validation<A1cSample> {
    if !record.has_code(LOINC_HEMOGLOBIN_A1C) {
        return Validation::Rejected(RejectReason::MissingLabCode);
    }

    let Some(timestamp) = record.effective_at() else {
        return Validation::Rejected(RejectReason::UnparseableDate(
            record.effective_date_time.clone(),
        ));
    };

    let Some(quantity) = record.value_quantity.as_ref() else {
        return Validation::Rejected(RejectReason::MissingQuantity);
    };
    let Some(percent) = quantity.value else {
        return Validation::Rejected(RejectReason::MissingQuantity);
    };

    if let Err(reason) = check_a1c_percent(percent) {
        return Validation::Rejected(reason);
    }

    let unit = quantity
        .unit
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "%".to_string());

    Validation::Accepted(A1cSample::new(timestamp, percent, unit))
}

/// Build an A1C sample from a percent-typed quantity measurement
pub fn make_a1c_sample_from_measurement(raw: &RawMeasurement) -> Validation<A1cSample> {
    if let Err(reason) = check_unit(raw, MetricKind::HemoglobinA1c) {
        return Validation::Rejected(reason);
    }
    if let Err(reason) = check_a1c_percent(raw.value) {
        return Validation::Rejected(reason);
    }
    Validation::Accepted(A1cSample::new(raw.timestamp, raw.value, "%".to_string()))
}

/// A validated collection plus the number of inputs that were dropped
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedBatch {
    pub samples: MetricSamples,
    pub rejected: usize,
}

fn collect<T, F>(kind: MetricKind, inputs: usize, validations: F) -> (Vec<T>, usize)
where
    F: Iterator<Item = Validation<T>>,
{
    let mut samples = Vec::with_capacity(inputs);
    let mut rejected = 0;
    for validation in validations {
        match validation {
            Validation::Accepted(sample) => samples.push(sample),
            Validation::Rejected(reason) => {
                tracing::debug!("Rejected {} sample: {}", kind, reason);
                rejected += 1;
            }
        }
    }
    (samples, rejected)
}

/// Validate a whole collection of quantity measurements for one metric.
///
/// Input order is preserved among the accepted samples.
pub fn validate_measurements(kind: MetricKind, raws: &[RawMeasurement]) -> ValidatedBatch {
    let n = raws.len();
    let (samples, rejected) = match kind {
        MetricKind::Weight => {
            let (s, r) = collect(kind, n, raws.iter().map(make_weight_sample));
            (MetricSamples::Weight(s), r)
        }
        MetricKind::Steps => {
            let (s, r) = collect(kind, n, raws.iter().map(make_steps_sample));
            (MetricSamples::Steps(s), r)
        }
        MetricKind::BloodGlucose => {
            let (s, r) = collect(kind, n, raws.iter().map(make_glucose_sample));
            (MetricSamples::BloodGlucose(s), r)
        }
        MetricKind::HemoglobinA1c => {
            let (s, r) = collect(kind, n, raws.iter().map(make_a1c_sample_from_measurement));
            (MetricSamples::HemoglobinA1c(s), r)
        }
    };

    if rejected > 0 {
        tracing::info!("Dropped {} of {} {} samples", rejected, n, kind);
    }

    ValidatedBatch { samples, rejected }
}

/// Validate lab records into A1C samples, preserving input order
pub fn validate_lab_records(records: &[LabRecord]) -> ValidatedBatch {
    let kind = MetricKind::HemoglobinA1c;
    let (samples, rejected) = collect(kind, records.len(), records.iter().map(make_a1c_sample));

    if rejected > 0 {
        tracing::info!(
            "Dropped {} of {} lab records while extracting A1C",
            rejected,
            records.len()
        );
    }

    ValidatedBatch {
        samples: MetricSamples::HemoglobinA1c(samples),
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::{CodeableConcept, Coding, Quantity};
    use chrono::{TimeZone, Utc};

    fn raw(value: f64, unit: UnitKind) -> RawMeasurement {
        RawMeasurement {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            value,
            declared_unit: unit,
        }
    }

    fn glucose(value: f64) -> Validation<GlucoseSample> {
        make_glucose_sample(&raw(value, UnitKind::Concentration))
    }

    fn a1c_record(value: Option<f64>, unit: Option<&str>) -> LabRecord {
        LabRecord {
            code: CodeableConcept {
                coding: vec![Coding {
                    system: Some("http://loinc.org".into()),
                    code: Some(LOINC_HEMOGLOBIN_A1C.into()),
                    display: Some("Hemoglobin A1c".into()),
                }],
                text: None,
            },
            effective_date_time: Some("2024-01-15T09:30:00Z".into()),
            value_quantity: Some(Quantity {
                value,
                unit: unit.map(String::from),
            }),
        }
    }

    #[test]
    fn test_glucose_threshold_boundaries() {
        assert!(!glucose(19.9).is_accepted());
        assert!(glucose(20.0).is_accepted());
        assert!(glucose(20.1).is_accepted());
    }

    #[test]
    fn test_glucose_normal_and_high_values() {
        let sample = glucose(120.0).accepted().unwrap();
        assert_eq!(sample.mg_per_dl(), 120.0);
        let sample = glucose(500.0).accepted().unwrap();
        assert_eq!(sample.mg_per_dl(), 500.0);
    }

    #[test]
    fn test_glucose_rejects_misread_percentages() {
        for value in [0.0, 0.072, 7.2, 14.0] {
            assert_eq!(
                glucose(value).reason(),
                Some(&RejectReason::GlucoseBelowThreshold(value)),
                "value {} should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_glucose_rejects_nan() {
        assert_eq!(glucose(f64::NAN).reason(), Some(&RejectReason::NonFinite));
    }

    #[test]
    fn test_glucose_preserves_timestamp_and_value() {
        let input = raw(183.5, UnitKind::Concentration);
        let sample = make_glucose_sample(&input).accepted().unwrap();
        assert_eq!(sample.timestamp(), input.timestamp);
        assert!((sample.mg_per_dl() - 183.5).abs() < 0.001);
    }

    #[test]
    fn test_glucose_rejects_mass_unit() {
        let result = make_glucose_sample(&raw(100.0, UnitKind::Mass));
        assert_eq!(
            result.reason(),
            Some(&RejectReason::UnitMismatch {
                expected: UnitKind::Concentration,
                found: UnitKind::Mass,
            })
        );
    }

    #[test]
    fn test_unit_mismatch_reports_expected_unit_per_metric() {
        let cases = [
            (
                MetricKind::Weight,
                make_weight_sample(&raw(5.0, UnitKind::Percent)).reason().cloned(),
            ),
            (
                MetricKind::Steps,
                make_steps_sample(&raw(5.0, UnitKind::Percent)).reason().cloned(),
            ),
            (
                MetricKind::HemoglobinA1c,
                make_a1c_sample_from_measurement(&raw(5.0, UnitKind::Count))
                    .reason()
                    .cloned(),
            ),
        ];
        for (kind, reason) in cases {
            match reason {
                Some(RejectReason::UnitMismatch { expected, .. }) => {
                    assert_eq!(expected, kind.expected_unit(), "{}", kind)
                }
                other => panic!("{}: expected a unit mismatch, got {:?}", kind, other),
            }
        }
    }

    #[test]
    fn test_a1c_range() {
        assert!(make_a1c_sample(&a1c_record(Some(7.2), Some("%"))).is_accepted());
        assert!(make_a1c_sample(&a1c_record(Some(20.0), Some("%"))).is_accepted());
        assert_eq!(
            make_a1c_sample(&a1c_record(Some(0.0), Some("%"))).reason(),
            Some(&RejectReason::A1cOutOfRange(0.0))
        );
        assert_eq!(
            make_a1c_sample(&a1c_record(Some(20.1), Some("%"))).reason(),
            Some(&RejectReason::A1cOutOfRange(20.1))
        );
        assert!(!make_a1c_sample(&a1c_record(Some(-1.0), Some("%"))).is_accepted());
    }

    #[test]
    fn test_a1c_keeps_source_unit() {
        let sample = make_a1c_sample(&a1c_record(Some(6.8), Some("% of total Hgb")))
            .accepted()
            .unwrap();
        assert_eq!(sample.source_unit(), "% of total Hgb");
        assert_eq!(sample.percent(), 6.8);
    }

    #[test]
    fn test_a1c_defaults_missing_unit_to_percent() {
        let sample = make_a1c_sample(&a1c_record(Some(6.8), None))
            .accepted()
            .unwrap();
        assert_eq!(sample.source_unit(), "%");
    }

    #[test]
    fn test_a1c_requires_loinc_code() {
        let mut record = a1c_record(Some(7.0), Some("%"));
        record.code.coding[0].code = Some("2345-7".into());
        assert_eq!(
            make_a1c_sample(&record).reason(),
            Some(&RejectReason::MissingLabCode)
        );
    }

    #[test]
    fn test_a1c_rejects_bad_date_and_missing_value() {
        let mut record = a1c_record(Some(7.0), Some("%"));
        record.effective_date_time = Some("not a date".into());
        assert!(matches!(
            make_a1c_sample(&record).reason(),
            Some(RejectReason::UnparseableDate(_))
        ));

        let record = a1c_record(None, Some("%"));
        assert_eq!(
            make_a1c_sample(&record).reason(),
            Some(&RejectReason::MissingQuantity)
        );
    }

    #[test]
    fn test_steps_truncate() {
        let sample = make_steps_sample(&raw(12345.7, UnitKind::Count))
            .accepted()
            .unwrap();
        assert_eq!(sample.count, 12345);
    }

    #[test]
    fn test_weight_requires_mass_unit() {
        assert!(make_weight_sample(&raw(80.0, UnitKind::Mass)).is_accepted());
        assert!(!make_weight_sample(&raw(80.0, UnitKind::Count)).is_accepted());
        assert_eq!(
            make_weight_sample(&raw(f64::INFINITY, UnitKind::Mass)).reason(),
            Some(&RejectReason::NonFinite)
        );
    }

    #[test]
    fn test_validate_measurements_filters_and_keeps_order() {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let raws: Vec<RawMeasurement> = [145.0, 7.2, 98.0, 19.9, 210.0]
            .iter()
            .enumerate()
            .map(|(i, v)| RawMeasurement {
                timestamp: base - chrono::Duration::days(i as i64),
                value: *v,
                declared_unit: UnitKind::Concentration,
            })
            .collect();

        let batch = validate_measurements(MetricKind::BloodGlucose, &raws);
        assert_eq!(batch.rejected, 2);
        match batch.samples {
            MetricSamples::BloodGlucose(samples) => {
                let values: Vec<f64> = samples.iter().map(|s| s.mg_per_dl()).collect();
                assert_eq!(values, vec![145.0, 98.0, 210.0]);
            }
            other => panic!("Expected glucose samples, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_validate_lab_records_counts_rejections() {
        let records = vec![
            a1c_record(Some(7.2), Some("%")),
            a1c_record(Some(25.0), Some("%")),
            LabRecord::default(),
        ];
        let batch = validate_lab_records(&records);
        assert_eq!(batch.rejected, 2);
        assert_eq!(batch.samples.len(), 1);
        assert_eq!(batch.samples.kind(), MetricKind::HemoglobinA1c);
    }
}
