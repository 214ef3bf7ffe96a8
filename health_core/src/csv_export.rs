//! CSV document generation.
//!
//! Merges validated metric collections into one document: a fixed header,
//! then one row per sample. Metric groups always follow
//! [`MetricKind::EXPORT_ORDER`]; within a group the caller's order is kept.

use crate::format::{DisplayZone, ExportRow, RowFormatter};
use crate::{Error, MetricKind, MetricSamples, Result};
use chrono::{DateTime, Utc};
use std::io;

/// Header record of every exported document
pub const HEADER: [&str; 5] = ["Date", "ISO8601", "Metric", "Value", "Unit"];

/// Prefix of generated export file names
pub const FILENAME_PREFIX: &str = "HealthExporter_";

/// A complete export: header plus ordered data rows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportDocument {
    rows: Vec<ExportRow>,
}

impl ExportDocument {
    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count per metric, in export order
    pub fn counts(&self) -> Vec<(MetricKind, usize)> {
        MetricKind::EXPORT_ORDER
            .iter()
            .map(|kind| {
                let n = self
                    .rows
                    .iter()
                    .filter(|r| r.metric_label == kind.label())
                    .count();
                (*kind, n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    /// Write the document as CSV.
    ///
    /// Every record, header included, ends with a single `\n`.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        wtr.write_record(HEADER)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(32 * (self.rows.len() + 1));
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        String::from_utf8(self.to_bytes()?)
            .map_err(|e| Error::Other(format!("CSV output is not UTF-8: {}", e)))
    }
}

/// Build a document from tagged collections.
///
/// Collections may arrive in any order and may be empty. Several
/// collections of the same kind are emitted back to back in the order given.
pub fn generate(collections: &[MetricSamples], formatter: &RowFormatter) -> ExportDocument {
    let mut ordered: Vec<&MetricSamples> = collections.iter().collect();
    // Stable, so same-kind collections keep their relative order
    ordered.sort_by_key(|c| c.kind().export_rank());

    let total = ordered.iter().map(|c| c.len()).sum();
    let mut rows = Vec::with_capacity(total);
    for collection in ordered {
        rows.extend(formatter.rows(collection));
    }

    tracing::debug!("Generated {} CSV rows", rows.len());
    ExportDocument { rows }
}

/// File name for an export created at `at`, e.g.
/// `HealthExporter_2024-01-15_093000.csv`
pub fn export_filename(zone: DisplayZone, at: &DateTime<Utc>) -> String {
    format!(
        "{}{}.csv",
        FILENAME_PREFIX,
        zone.format(at, "%Y-%m-%d_%H%M%S")
    )
}
