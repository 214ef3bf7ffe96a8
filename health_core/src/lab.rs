//! Clinical lab records.
//!
//! Lab results arrive as FHIR-style `Observation` resources. Only the
//! handful of fields needed to pull out a Hemoglobin A1C value are modelled;
//! everything else in the resource is ignored by serde.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// LOINC code for Hemoglobin A1C
pub const LOINC_HEMOGLOBIN_A1C: &str = "4548-4";

/// A single lab result record
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabRecord {
    #[serde(default)]
    pub code: CodeableConcept,
    #[serde(default)]
    pub effective_date_time: Option<String>,
    #[serde(default)]
    pub value_quantity: Option<Quantity>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Coding {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Quantity {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl LabRecord {
    /// Whether any coding on this record carries `code`
    pub fn has_code(&self, code: &str) -> bool {
        self.code
            .coding
            .iter()
            .any(|c| c.code.as_deref() == Some(code))
    }

    /// Parse `effectiveDateTime`.
    ///
    /// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date, which
    /// is taken as midnight UTC.
    pub fn effective_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.effective_date_time.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}
