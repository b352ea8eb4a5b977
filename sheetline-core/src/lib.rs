//! Sheetline Core - spreadsheet ingestion and period reconciliation
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Store, Period, CanonicalRecord, keyword tables)
//! - **ports**: Trait definitions for external dependencies (StoreDirectory, RecordStore)
//! - **ingest**: The ingestion engine (header detection, column mapping, record building, reconciliation)
//! - **services**: Use-case orchestration
//! - **adapters**: Concrete implementations (DuckDB, workbook decoding)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{CanonicalRecord, ImportSchema, Period, Store, StoreStatus};
pub use ingest::{ImportFailure, ImportOutcome, ImportReport};

/// Database file inside the data directory
pub const DB_FILENAME: &str = "sheetline.duckdb";

/// Main context for Sheetline operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct SheetlineContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub store_service: StoreService,
    pub status_service: StatusService,
}

impl SheetlineContext {
    /// Create a new Sheetline context
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        let import_service = ImportService::new(repository.clone(), config.import.clone())
            .with_period_lease(data_dir.join("locks"));
        let store_service = StoreService::new(Arc::clone(&repository));
        let status_service = StatusService::new(repository.clone(), repository.clone());

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            repository,
            import_service,
            store_service,
            status_service,
        })
    }

    /// Import a file against the DuckDB store directory
    pub async fn import_file(
        &self,
        path: &Path,
        schema: ImportSchema,
        fallback_period: Period,
        options: &ImportOptions,
    ) -> ImportReport {
        self.import_service
            .import_file(path, schema, fallback_period, self.repository.as_ref(), options)
            .await
    }
}
