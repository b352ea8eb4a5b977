//! Service layer - business logic orchestration
//!
//! Services coordinate the ingest engine and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod import;
pub mod logging;
pub mod migration;
mod status;
mod store;

pub use import::{ColumnDetection, DetectedColumn, ImportOptions, ImportService};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{SchemaStatus, StatusService, StatusSummary};
pub use store::{StoreImportResult, StoreService};
