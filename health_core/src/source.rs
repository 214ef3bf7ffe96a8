//! Health data sources.
//!
//! The exporter never talks to a health store directly; it goes through
//! [`HealthDataSource`]. [`JsonFileSource`] reads a JSON dump with quantity
//! samples and FHIR-style lab observations.

use crate::format::DisplayZone;
use crate::lab::LabRecord;
use crate::range::FetchQuery;
use crate::{Error, MetricKind, RawMeasurement, Result, UnitKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Read access to a store of health measurements
#[async_trait]
pub trait HealthDataSource: Send + Sync {
    /// Whether a health store exists at all
    fn is_available(&self) -> bool {
        true
    }

    /// Ask for read access to the given metrics
    async fn request_access(&self, kinds: &[MetricKind]) -> Result<bool>;

    /// Quantity samples for one metric, newest first
    async fn fetch(&self, kind: MetricKind, query: &FetchQuery) -> Result<Vec<RawMeasurement>>;

    /// Clinical lab records, newest first.
    ///
    /// Sources may ignore the query; the exporter filters lab-derived
    /// samples by range and limit itself.
    async fn fetch_lab_records(&self, query: &FetchQuery) -> Result<Vec<LabRecord>>;
}

/// On-disk dump format
#[derive(Debug, Default, Deserialize)]
struct HealthDump {
    #[serde(default)]
    samples: Vec<serde_json::Value>,
    #[serde(default)]
    lab_records: Vec<serde_json::Value>,
}

/// A quantity sample entry in the dump
#[derive(Debug, Deserialize)]
struct SampleEntry {
    kind: MetricKind,
    timestamp: DateTime<Utc>,
    value: f64,
    unit: UnitKind,
}

/// Data source backed by a JSON file
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    path: PathBuf,
    zone: DisplayZone,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, zone: DisplayZone) -> Self {
        Self {
            path: path.into(),
            zone,
        }
    }

    async fn load(&self) -> Result<HealthDump> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let dump: HealthDump = serde_json::from_str(&contents)?;
        tracing::debug!(
            "Loaded {} samples and {} lab records from {:?}",
            dump.samples.len(),
            dump.lab_records.len(),
            self.path
        );
        Ok(dump)
    }
}

fn fetch_failed(kind: MetricKind, e: Error) -> Error {
    Error::Fetch {
        metric: kind.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl HealthDataSource for JsonFileSource {
    fn is_available(&self) -> bool {
        self.path.exists()
    }

    async fn request_access(&self, kinds: &[MetricKind]) -> Result<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(true),
            Ok(_) => Err(Error::AuthorizationDenied(format!(
                "{:?} is not a file",
                self.path
            ))),
            Err(e) => {
                tracing::warn!(
                    "Cannot read {:?} for {} metrics: {}",
                    self.path,
                    kinds.len(),
                    e
                );
                Ok(false)
            }
        }
    }

    async fn fetch(&self, kind: MetricKind, query: &FetchQuery) -> Result<Vec<RawMeasurement>> {
        let dump = self.load().await.map_err(|e| fetch_failed(kind, e))?;

        let mut measurements = Vec::new();
        for (index, value) in dump.samples.into_iter().enumerate() {
            let entry = match serde_json::from_value::<SampleEntry>(value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping malformed sample #{}: {}", index + 1, e);
                    continue;
                }
            };
            if entry.kind != kind || !query.contains(&entry.timestamp, self.zone) {
                continue;
            }
            measurements.push(RawMeasurement {
                timestamp: entry.timestamp,
                value: entry.value,
                declared_unit: entry.unit,
            });
        }

        measurements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        query.truncate(&mut measurements);

        tracing::debug!("Fetched {} {} samples", measurements.len(), kind);
        Ok(measurements)
    }

    async fn fetch_lab_records(&self, _query: &FetchQuery) -> Result<Vec<LabRecord>> {
        let dump = self
            .load()
            .await
            .map_err(|e| fetch_failed(MetricKind::HemoglobinA1c, e))?;

        let mut records = Vec::with_capacity(dump.lab_records.len());
        for (index, value) in dump.lab_records.into_iter().enumerate() {
            match serde_json::from_value::<LabRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping malformed lab record #{}: {}", index + 1, e),
            }
        }

        // Undated records sort last
        records.sort_by(|a, b| b.effective_at().cmp(&a.effective_at()));
        Ok(records)
    }
}
