//! Port definitions (hexagonal architecture)
//!
//! The import engine talks to storage only through these traits. The
//! DuckDB adapter implements both; tests swap in an in-memory store.

mod record_store;
mod store_directory;

pub use record_store::{PeriodSummary, RecordStore};
pub use store_directory::StoreDirectory;
