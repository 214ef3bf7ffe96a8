//! Catalog of exportable health metrics.
//!
//! Some metrics depend on capabilities that only a paid account unlocks;
//! those are listed here but stay unavailable until the account flag is set.

use crate::MetricKind;

/// Availability requirements of one metric
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricConfig {
    pub kind: MetricKind,
    pub name: &'static str,
    pub requires_paid_account: bool,
}

impl MetricConfig {
    /// Whether the metric can be exported given the account status
    pub fn is_available(&self, paid_account: bool) -> bool {
        !self.requires_paid_account || paid_account
    }
}

/// All metrics, in export order
pub const HEALTH_METRICS: [MetricConfig; 4] = [
    MetricConfig {
        kind: MetricKind::Weight,
        name: "Weight",
        requires_paid_account: false,
    },
    MetricConfig {
        kind: MetricKind::Steps,
        name: "Steps",
        requires_paid_account: false,
    },
    MetricConfig {
        kind: MetricKind::BloodGlucose,
        name: "Blood Glucose",
        requires_paid_account: false,
    },
    // Clinical records access
    MetricConfig {
        kind: MetricKind::HemoglobinA1c,
        name: "Hemoglobin A1C",
        requires_paid_account: true,
    },
];

/// Catalog entry for `kind`
pub fn metric_config(kind: MetricKind) -> &'static MetricConfig {
    &HEALTH_METRICS[kind.export_rank()]
}

/// Metrics usable with the given account status
pub fn available_metrics(paid_account: bool) -> Vec<MetricKind> {
    HEALTH_METRICS
        .iter()
        .filter(|m| m.is_available(paid_account))
        .map(|m| m.kind)
        .collect()
}
