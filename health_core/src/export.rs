//! Export orchestration.
//!
//! One export attempt moves through
//! `Idle → Fetching → Evaluating → Ready | NoData`, with `AuthFailed` when the
//! source refuses access and `Cancelled` when the token fires before all
//! fetches have joined.

use crate::cancel::CancellationToken;
use crate::csv_export::{generate, ExportDocument};
use crate::format::RowFormatter;
use crate::range::{DateRangeSelection, FetchQuery};
use crate::source::HealthDataSource;
use crate::validate::{validate_lab_records, validate_measurements, ValidatedBatch};
use crate::{Error, MetricKind, MetricSamples, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::fmt;

/// Where an export attempt currently stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Fetching,
    Evaluating,
    Ready,
    NoData,
    AuthFailed,
    Cancelled,
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportPhase::Idle => "idle",
            ExportPhase::Fetching => "fetching",
            ExportPhase::Evaluating => "evaluating",
            ExportPhase::Ready => "ready",
            ExportPhase::NoData => "no data",
            ExportPhase::AuthFailed => "authorization failed",
            ExportPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// What to export and how to render it
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportRequest {
    /// Enabled metrics. Order and duplicates do not matter.
    pub metrics: Vec<MetricKind>,
    pub selection: DateRangeSelection,
    pub formatter: RowFormatter,
}

impl ExportRequest {
    /// Enabled metrics, deduplicated, in export order
    pub fn enabled_metrics(&self) -> Vec<MetricKind> {
        MetricKind::EXPORT_ORDER
            .into_iter()
            .filter(|kind| self.metrics.contains(kind))
            .collect()
    }
}

/// Per-metric result of one export
#[derive(Clone, Debug, PartialEq)]
pub struct MetricOutcome {
    pub kind: MetricKind,
    /// Records returned by the source
    pub fetched: usize,
    /// Samples that made it into the document
    pub exported: usize,
    /// Inputs dropped by validation
    pub rejected: usize,
    /// Fetch failure, if any; the metric then counts as empty
    pub error: Option<String>,
}

/// A finished export
#[derive(Clone, Debug, PartialEq)]
pub struct ExportReport {
    pub document: ExportDocument,
    pub outcomes: Vec<MetricOutcome>,
}

impl ExportReport {
    pub fn failed_metrics(&self) -> Vec<MetricKind> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.kind)
            .collect()
    }

    pub fn total_rejected(&self) -> usize {
        self.outcomes.iter().map(|o| o.rejected).sum()
    }
}

struct Fetched {
    count: usize,
    batch: ValidatedBatch,
}

/// Drives one data source through the export state machine
pub struct Exporter<'a> {
    source: &'a dyn HealthDataSource,
    phase: ExportPhase,
}

impl<'a> Exporter<'a> {
    pub fn new(source: &'a dyn HealthDataSource) -> Self {
        Self {
            source,
            phase: ExportPhase::Idle,
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    fn transition(&mut self, next: ExportPhase) {
        tracing::info!("Export {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Run an export relative to the current time
    pub async fn export(
        &mut self,
        request: &ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<ExportReport> {
        self.export_at(request, Utc::now(), cancel).await
    }

    /// Run an export with `now` as the reference for relative ranges
    pub async fn export_at(
        &mut self,
        request: &ExportRequest,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<ExportReport> {
        self.phase = ExportPhase::Idle;

        let metrics = request.enabled_metrics();
        let zone = request.formatter.zone;
        let query = request.selection.resolve(&now, zone)?;

        if !self.source.is_available() {
            self.transition(ExportPhase::AuthFailed);
            return Err(Error::HealthDataUnavailable);
        }

        match self.source.request_access(&metrics).await {
            Ok(true) => {}
            Ok(false) => {
                self.transition(ExportPhase::AuthFailed);
                return Err(Error::AuthorizationDenied(
                    "read access was not granted".into(),
                ));
            }
            Err(Error::AuthorizationDenied(reason)) => {
                self.transition(ExportPhase::AuthFailed);
                return Err(Error::AuthorizationDenied(reason));
            }
            Err(e) => {
                self.transition(ExportPhase::AuthFailed);
                return Err(Error::AuthorizationDenied(e.to_string()));
            }
        }

        self.transition(ExportPhase::Fetching);

        let source = self.source;
        let fetches = metrics.iter().map(|&kind| async move {
            (kind, fetch_metric(source, kind, &query, zone).await)
        });

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            results = join_all(fetches) => Some(results),
        };
        let Some(results) = results else {
            self.transition(ExportPhase::Cancelled);
            return Err(Error::Cancelled);
        };

        self.transition(ExportPhase::Evaluating);

        let mut collections = Vec::with_capacity(results.len());
        let mut outcomes = Vec::with_capacity(results.len());
        for (kind, result) in results {
            match result {
                Ok(fetched) => {
                    outcomes.push(MetricOutcome {
                        kind,
                        fetched: fetched.count,
                        exported: fetched.batch.samples.len(),
                        rejected: fetched.batch.rejected,
                        error: None,
                    });
                    collections.push(fetched.batch.samples);
                }
                Err(e) => {
                    tracing::warn!("Fetching {} failed, exporting it as empty: {}", kind, e);
                    outcomes.push(MetricOutcome {
                        kind,
                        fetched: 0,
                        exported: 0,
                        rejected: 0,
                        error: Some(e.to_string()),
                    });
                    collections.push(MetricSamples::empty(kind));
                }
            }
        }

        if collections.iter().all(MetricSamples::is_empty) {
            self.transition(ExportPhase::NoData);
            return Err(Error::NoDataFound);
        }

        let document = generate(&collections, &request.formatter);
        self.transition(ExportPhase::Ready);

        Ok(ExportReport { document, outcomes })
    }
}

async fn fetch_metric(
    source: &dyn HealthDataSource,
    kind: MetricKind,
    query: &FetchQuery,
    zone: crate::format::DisplayZone,
) -> Result<Fetched> {
    if kind == MetricKind::HemoglobinA1c {
        let records = source.fetch_lab_records(query).await?;
        let count = records.len();
        let mut batch = validate_lab_records(&records);
        // The lab store is not queried with a predicate
        if let MetricSamples::HemoglobinA1c(samples) = &mut batch.samples {
            samples.retain(|s| query.contains(&s.timestamp(), zone));
            samples.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
            query.truncate(samples);
        }
        return Ok(Fetched { count, batch });
    }

    let raws = source.fetch(kind, query).await?;
    Ok(Fetched {
        count: raws.len(),
        batch: validate_measurements(kind, &raws),
    })
}

/// Export the selection from `source` and return just the document
pub async fn export_csv(
    source: &dyn HealthDataSource,
    request: &ExportRequest,
    cancel: &CancellationToken,
) -> Result<ExportDocument> {
    let report = Exporter::new(source).export(request, cancel).await?;
    Ok(report.document)
}
