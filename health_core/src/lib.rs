#![forbid(unsafe_code)]

//! Core domain model and business logic for the Health Exporter.
//!
//! This crate provides:
//! - Domain types (metric kinds, raw measurements, validated samples)
//! - Sample validation and unit conversion
//! - Row formatting and CSV document generation
//! - Date range resolution and data source access
//! - Export orchestration, sinks and preferences

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod units;
pub mod lab;
pub mod validate;
pub mod format;
pub mod csv_export;
pub mod range;
pub mod source;
pub mod cancel;
pub mod export;
pub mod sink;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use cancel::CancellationToken;
pub use config::Config;
pub use csv_export::{export_filename, generate, ExportDocument};
pub use export::{export_csv, ExportPhase, ExportReport, ExportRequest, Exporter};
pub use format::{DisplayZone, RowFormatter};
pub use range::{DateRangeOption, DateRangeSelection};
pub use sink::{DirectorySink, DocumentSink, WriterSink};
pub use source::{HealthDataSource, JsonFileSource};
pub use units::WeightDisplayUnit;
