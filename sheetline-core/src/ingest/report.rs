//! Import report

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::builder::BuildStats;
use super::ImportFailure;
use crate::domain::{CanonicalRecord, FieldMap, ImportSchema, Period};

/// Final state of one import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Success {
        count: usize,
    },
    SuccessWithWarnings {
        count: usize,
        unknown_store_count: usize,
    },
    Failure {
        reason: ImportFailure,
    },
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ImportOutcome::Failure { .. })
    }

    pub fn failure(&self) -> Option<&ImportFailure> {
        match self {
            ImportOutcome::Failure { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Everything an operator needs to know about one import run
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub batch_id: Uuid,
    pub schema: ImportSchema,
    pub fallback_period: Period,
    /// Zero-based index of the detected header row
    pub header_row: Option<usize>,
    /// Field name → zero-based column index
    pub columns: BTreeMap<String, usize>,
    pub total_rows_processed: usize,
    pub success_count: usize,
    pub unknown_store_count: usize,
    pub unknown_store_tokens: Vec<String>,
    pub skipped_rows: usize,
    pub duplicate_rows: usize,
    pub unparsed_cells: usize,
    pub replaced_periods: Vec<Period>,
    pub deleted_count: u64,
    pub preview: bool,
    /// The batch; always filled in preview mode, empty otherwise
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<CanonicalRecord>,
    pub outcome: ImportOutcome,
}

impl ImportReport {
    /// Empty report for an import that has not got anywhere yet
    pub fn new(schema: ImportSchema, fallback_period: Period, preview: bool) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            schema,
            fallback_period,
            header_row: None,
            columns: BTreeMap::new(),
            total_rows_processed: 0,
            success_count: 0,
            unknown_store_count: 0,
            unknown_store_tokens: Vec::new(),
            skipped_rows: 0,
            duplicate_rows: 0,
            unparsed_cells: 0,
            replaced_periods: Vec::new(),
            deleted_count: 0,
            preview,
            records: Vec::new(),
            outcome: ImportOutcome::Success { count: 0 },
        }
    }

    pub fn with_columns(mut self, header_row: usize, fields: &FieldMap) -> Self {
        self.header_row = Some(header_row);
        self.columns = fields
            .iter()
            .map(|(field, column)| (field.to_string(), column))
            .collect();
        self
    }

    pub fn with_stats(mut self, stats: &BuildStats) -> Self {
        self.total_rows_processed = stats.total_rows;
        self.success_count = stats.success_count;
        self.unknown_store_count = stats.unknown_store_count;
        self.unknown_store_tokens = stats.unknown_store_tokens.iter().cloned().collect();
        self.skipped_rows = stats.skipped_rows;
        self.duplicate_rows = stats.duplicate_rows;
        self.unparsed_cells = stats.unparsed_cells;
        self
    }

    /// Mark the import as failed; nothing counts as imported
    pub fn failed(mut self, reason: ImportFailure) -> Self {
        self.success_count = 0;
        self.outcome = ImportOutcome::Failure { reason };
        self
    }

    /// Mark the import as done, with a warning when stores went unresolved
    pub fn succeeded(mut self) -> Self {
        self.outcome = if self.unknown_store_count > 0 {
            ImportOutcome::SuccessWithWarnings {
                count: self.success_count,
                unknown_store_count: self.unknown_store_count,
            }
        } else {
            ImportOutcome::Success {
                count: self.success_count,
            }
        };
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
