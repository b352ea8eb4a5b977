//! Spreadsheet ingestion engine
//!
//! Pure building blocks used by [`crate::services::ImportService`]: value
//! normalization, header detection, column mapping, store resolution,
//! record building and period replacement.

pub mod builder;
pub mod columns;
pub mod header;
pub mod lease;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod resolver;

use serde::Serialize;
use thiserror::Error;

pub use builder::{build_records, BuildContext, BuildOutput, BuildStats};
pub use columns::{map_columns, resolve_fields};
pub use header::{locate, HeaderMatch, DEFAULT_SCAN_LIMIT};
pub use lease::PeriodLease;
pub use reconcile::{plan_deletion, ReconciliationPolicy, ReplacementScope};
pub use report::{ImportOutcome, ImportReport};
pub use resolver::{Resolution, StoreResolver};

/// Why an import produced nothing
///
/// Whenever one of these is reported, no record was deleted or written.
/// `Persistence` is the exception: the failure happened while replacing
/// data and earlier periods of the batch may already be gone.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportFailure {
    #[error("Could not read workbook: {message}")]
    UnreadableWorkbook { message: String },

    #[error("No header row found in the first {scanned} rows")]
    HeaderNotFound { scanned: usize },

    #[error("Required columns not found: {}", fields.join(", "))]
    MissingRequiredColumns { fields: Vec<String> },

    #[error("The sheet has no data rows below the header")]
    EmptySheet,

    #[error("No valid records found")]
    NoValidRecords,

    #[error("Could not load stores: {message}")]
    StoreDirectory { message: String },

    #[error("Period {period} is being imported by another process")]
    PeriodLocked { period: String },

    #[error("Failed to save records: {message}")]
    Persistence { message: String },
}

impl ImportFailure {
    /// Short machine-readable name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ImportFailure::UnreadableWorkbook { .. } => "unreadable_workbook",
            ImportFailure::HeaderNotFound { .. } => "header_not_found",
            ImportFailure::MissingRequiredColumns { .. } => "missing_required_columns",
            ImportFailure::EmptySheet => "empty_sheet",
            ImportFailure::NoValidRecords => "no_valid_records",
            ImportFailure::StoreDirectory { .. } => "store_directory",
            ImportFailure::PeriodLocked { .. } => "period_locked",
            ImportFailure::Persistence { .. } => "persistence",
        }
    }
}
