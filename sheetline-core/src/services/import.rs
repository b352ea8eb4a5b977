//! Import service - spreadsheet ingestion
//!
//! Runs the whole pipeline for one uploaded file: decode, locate the
//! header, map columns, build records, then replace the touched periods.
//! Every outcome, failures included, comes back as an [`ImportReport`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::adapters::workbook;
use crate::config::ImportSettings;
use crate::domain::{ImportSchema, Period, RawSheet};
use crate::ingest::{
    build_records, locate, map_columns, plan_deletion, resolve_fields, BuildContext,
    HeaderMatch, ImportFailure, ImportReport, PeriodLease, ReconciliationPolicy, StoreResolver,
};
use crate::ports::{RecordStore, StoreDirectory};

/// Per-run import options
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Overrides the configured importer name when set
    pub imported_by: Option<String>,
    /// Build the batch but write nothing
    pub preview: bool,
}

/// Header row and column mapping found in a file, without importing it
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDetection {
    pub schema: ImportSchema,
    pub header_row: usize,
    pub headers: Vec<String>,
    /// Field name → column
    pub columns: BTreeMap<String, DetectedColumn>,
    /// Required fields (or field groups) with no column
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectedColumn {
    pub index: usize,
    pub header: String,
}

/// Import service for spreadsheet uploads
pub struct ImportService {
    records: Arc<dyn RecordStore>,
    settings: ImportSettings,
    lock_dir: Option<PathBuf>,
}

impl ImportService {
    pub fn new(records: Arc<dyn RecordStore>, settings: ImportSettings) -> Self {
        Self {
            records,
            settings,
            lock_dir: None,
        }
    }

    /// Hold a per-period lock file under `lock_dir` while replacing data
    pub fn with_period_lease(mut self, lock_dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(lock_dir.into());
        self
    }

    /// Find the header row and column mapping of a file
    pub fn detect_columns(
        &self,
        bytes: &[u8],
        schema: ImportSchema,
    ) -> Result<ColumnDetection, ImportFailure> {
        let sheet = decode(bytes)?;
        let table = self.settings.keyword_table(schema);
        let header = locate(&sheet, &table.header_groups(), self.settings.header_scan_limit)?;
        let fields = resolve_fields(&header.normalized_headers, &table);

        let columns = fields
            .iter()
            .map(|(field, index)| {
                let header = header
                    .normalized_headers
                    .get(index)
                    .cloned()
                    .unwrap_or_default();
                (field.to_string(), DetectedColumn { index, header })
            })
            .collect();

        let missing = schema
            .required()
            .iter()
            .filter(|rule| !rule.is_satisfied(&fields))
            .map(|rule| rule.describe())
            .collect();

        Ok(ColumnDetection {
            schema,
            header_row: header.row_index,
            headers: header.normalized_headers,
            columns,
            missing,
        })
    }

    /// Import a file from disk
    pub async fn import_file(
        &self,
        path: &Path,
        schema: ImportSchema,
        fallback_period: Period,
        directory: &dyn StoreDirectory,
        options: &ImportOptions,
    ) -> ImportReport {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                self.import_spreadsheet(&bytes, schema, fallback_period, directory, options)
                    .await
            }
            Err(e) => ImportReport::new(schema, fallback_period, options.preview).failed(
                ImportFailure::UnreadableWorkbook {
                    message: format!("{}: {}", path.display(), e),
                },
            ),
        }
    }

    /// Import raw workbook bytes
    ///
    /// Rows whose own period column parses go to that period; the rest go
    /// to `fallback_period`. Each period present in the batch is replaced
    /// wholesale.
    pub async fn import_spreadsheet(
        &self,
        bytes: &[u8],
        schema: ImportSchema,
        fallback_period: Period,
        directory: &dyn StoreDirectory,
        options: &ImportOptions,
    ) -> ImportReport {
        let report = ImportReport::new(schema, fallback_period, options.preview);
        match self
            .run(report.clone(), bytes, schema, fallback_period, directory, options)
            .await
        {
            Ok(done) => done,
            Err((partial, reason)) => partial.unwrap_or(report).failed(reason),
        }
    }

    async fn run(
        &self,
        report: ImportReport,
        bytes: &[u8],
        schema: ImportSchema,
        fallback_period: Period,
        directory: &dyn StoreDirectory,
        options: &ImportOptions,
    ) -> Result<ImportReport, (Option<ImportReport>, ImportFailure)> {
        let fail = |reason| (None, reason);

        let sheet = decode(bytes).map_err(fail)?;
        let table = self.settings.keyword_table(schema);
        let header = locate(&sheet, &table.header_groups(), self.settings.header_scan_limit)
            .map_err(fail)?;
        let fields = map_columns(&header.normalized_headers, &table).map_err(fail)?;
        let mut report = report.with_columns(header.row_index, &fields);

        if !has_data_below(&sheet, &header) {
            return Err((Some(report), ImportFailure::EmptySheet));
        }

        let stores = match directory.list_stores().await {
            Ok(stores) => stores,
            Err(e) => {
                let reason = ImportFailure::StoreDirectory {
                    message: e.to_string(),
                };
                return Err((Some(report), reason));
            }
        };
        let resolver = StoreResolver::new(stores);

        let imported_by = options
            .imported_by
            .as_deref()
            .unwrap_or(&self.settings.imported_by);
        let ctx = BuildContext {
            schema,
            fields: &fields,
            resolver: &resolver,
            fallback_period,
            imported_by,
            imported_at: Utc::now(),
        };
        let built = build_records(&sheet, header.row_index, &ctx);
        report = report.with_stats(&built.stats);

        if built.records.is_empty() {
            return Err((Some(report), ImportFailure::NoValidRecords));
        }

        let scope = plan_deletion(schema, &built.records);
        report.replaced_periods = scope.periods.iter().copied().collect();

        if options.preview {
            report.records = built.records;
            return Ok(report.succeeded());
        }

        let _lease = match &self.lock_dir {
            Some(dir) => match PeriodLease::acquire(dir, &scope) {
                Ok(lease) => Some(lease),
                Err(reason) => return Err((Some(report), reason)),
            },
            None => None,
        };

        let policy = ReconciliationPolicy::new(Arc::clone(&self.records));
        match policy.apply(&scope, &built.records).await {
            Ok(applied) => {
                report.deleted_count = applied.deleted;
                Ok(report.succeeded())
            }
            Err(reason) => Err((Some(report), reason)),
        }
    }
}

fn decode(bytes: &[u8]) -> Result<RawSheet, ImportFailure> {
    workbook::read_sheet(bytes).map_err(|e| ImportFailure::UnreadableWorkbook {
        message: format!("{:#}", e),
    })
}

/// Whether any row after the header has a non-empty cell
fn has_data_below(sheet: &RawSheet, header: &HeaderMatch) -> bool {
    sheet
        .rows()
        .skip(header.row_index + 1)
        .any(|row| row.iter().any(|cell| !cell.is_empty()))
}
