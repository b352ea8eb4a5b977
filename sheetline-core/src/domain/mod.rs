//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O.

mod period;
mod record;
pub mod result;
pub mod schema;
mod sheet;
mod store;

pub use period::Period;
pub use record::{product_record_id, CanonicalRecord, PerformanceActual, ProductPerformance};
pub use schema::{FieldMap, ImportSchema, KeywordTable, Required, SemanticField};
pub use sheet::{Cell, RawSheet};
pub use store::{Store, StoreStatus};
