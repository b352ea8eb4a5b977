//! Canonical record storage port

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{CanonicalRecord, ImportSchema, Period};

/// Per-period totals for one schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: Period,
    pub record_count: u64,
    pub store_count: u64,
    pub total_revenue: Decimal,
}

/// Storage for imported records, partitioned by schema and period
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Remove every record of `schema` in `period`, returning how many went
    async fn delete_by_period(&self, schema: ImportSchema, period: &Period) -> Result<u64>;

    /// Write a batch as one unit; records must all belong to `schema`
    async fn insert_batch(&self, schema: ImportSchema, records: &[CanonicalRecord]) -> Result<u64>;

    /// Records of `schema`, optionally limited to one period
    async fn list_records(
        &self,
        schema: ImportSchema,
        period: Option<&Period>,
    ) -> Result<Vec<CanonicalRecord>>;

    /// One summary per stored period, newest first
    async fn period_summaries(&self, schema: ImportSchema) -> Result<Vec<PeriodSummary>>;
}
