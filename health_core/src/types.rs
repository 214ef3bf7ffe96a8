//! Core domain types for the health exporter.
//!
//! This module defines the fundamental types used throughout the system:
//! - Metric kinds and their export order
//! - Raw measurements as handed over by a data source
//! - Validated samples, one type per metric
//! - Tagged sample collections consumed by the CSV generator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Metric Types
// ============================================================================

/// A health metric that can be exported
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Weight,
    Steps,
    BloodGlucose,
    HemoglobinA1c,
}

impl MetricKind {
    /// Order in which metric groups appear in an exported document
    pub const EXPORT_ORDER: [MetricKind; 4] = [
        MetricKind::Weight,
        MetricKind::Steps,
        MetricKind::BloodGlucose,
        MetricKind::HemoglobinA1c,
    ];

    /// Label written to the `Metric` column
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Weight => "Weight",
            MetricKind::Steps => "Steps",
            MetricKind::BloodGlucose => "Blood Glucose",
            MetricKind::HemoglobinA1c => "Hemoglobin A1C",
        }
    }

    /// Position of this metric in `EXPORT_ORDER`
    pub fn export_rank(self) -> usize {
        match self {
            MetricKind::Weight => 0,
            MetricKind::Steps => 1,
            MetricKind::BloodGlucose => 2,
            MetricKind::HemoglobinA1c => 3,
        }
    }

    /// Unit a data source must declare for quantity samples of this metric.
    ///
    /// A1C comes from lab records, which carry their own unit string.
    pub fn expected_unit(self) -> UnitKind {
        match self {
            MetricKind::Weight => UnitKind::Mass,
            MetricKind::Steps => UnitKind::Count,
            MetricKind::BloodGlucose => UnitKind::Concentration,
            MetricKind::HemoglobinA1c => UnitKind::Percent,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MetricKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weight" => Ok(MetricKind::Weight),
            "steps" => Ok(MetricKind::Steps),
            "glucose" | "blood_glucose" | "blood glucose" => Ok(MetricKind::BloodGlucose),
            "a1c" | "hemoglobin_a1c" | "hemoglobin a1c" => Ok(MetricKind::HemoglobinA1c),
            other => Err(crate::Error::Other(format!("Unknown metric: {}", other))),
        }
    }
}

/// Unit family declared by the data source for a raw measurement
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Kilograms
    Mass,
    /// Dimensionless count
    Count,
    /// Percent
    Percent,
    /// Milligrams per deciliter
    Concentration,
}

/// One measurement as returned by the data source, before validation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RawMeasurement {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub declared_unit: UnitKind,
}

// ============================================================================
// Validated Samples
// ============================================================================

/// Body weight, stored in kilograms regardless of display preference
#[derive(Clone, Debug, PartialEq)]
pub struct WeightSample {
    pub timestamp: DateTime<Utc>,
    pub kilograms: f64,
}

/// Step count; always a whole number
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepsSample {
    pub timestamp: DateTime<Utc>,
    pub count: i64,
}

/// Blood glucose in mg/dL.
///
/// Only the validators in [`crate::validate`] construct these, so every
/// value is at least [`crate::validate::GLUCOSE_MIN_MG_DL`].
#[derive(Clone, Debug, PartialEq)]
pub struct GlucoseSample {
    timestamp: DateTime<Utc>,
    mg_per_dl: f64,
}

impl GlucoseSample {
    pub(crate) fn new(timestamp: DateTime<Utc>, mg_per_dl: f64) -> Self {
        Self {
            timestamp,
            mg_per_dl,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn mg_per_dl(&self) -> f64 {
        self.mg_per_dl
    }
}

/// Hemoglobin A1C lab result; percent lies in `(0, 20]`
#[derive(Clone, Debug, PartialEq)]
pub struct A1cSample {
    timestamp: DateTime<Utc>,
    percent: f64,
    source_unit: String,
}

impl A1cSample {
    pub(crate) fn new(timestamp: DateTime<Utc>, percent: f64, source_unit: String) -> Self {
        Self {
            timestamp,
            percent,
            source_unit,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Unit string exactly as the lab record reported it (usually `%`)
    pub fn source_unit(&self) -> &str {
        &self.source_unit
    }
}

// ============================================================================
// Tagged Collections
// ============================================================================

/// Validated samples for one metric, tagged with their kind
#[derive(Clone, Debug, PartialEq)]
pub enum MetricSamples {
    Weight(Vec<WeightSample>),
    Steps(Vec<StepsSample>),
    BloodGlucose(Vec<GlucoseSample>),
    HemoglobinA1c(Vec<A1cSample>),
}

impl MetricSamples {
    /// An empty collection for the given metric
    pub fn empty(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Weight => MetricSamples::Weight(Vec::new()),
            MetricKind::Steps => MetricSamples::Steps(Vec::new()),
            MetricKind::BloodGlucose => MetricSamples::BloodGlucose(Vec::new()),
            MetricKind::HemoglobinA1c => MetricSamples::HemoglobinA1c(Vec::new()),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSamples::Weight(_) => MetricKind::Weight,
            MetricSamples::Steps(_) => MetricKind::Steps,
            MetricSamples::BloodGlucose(_) => MetricKind::BloodGlucose,
            MetricSamples::HemoglobinA1c(_) => MetricKind::HemoglobinA1c,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetricSamples::Weight(s) => s.len(),
            MetricSamples::Steps(s) => s.len(),
            MetricSamples::BloodGlucose(s) => s.len(),
            MetricSamples::HemoglobinA1c(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
