//! Status service - what has been imported so far

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::domain::ImportSchema;
use crate::ports::{PeriodSummary, RecordStore, StoreDirectory};

/// Status service for import summaries
pub struct StatusService {
    stores: Arc<dyn StoreDirectory>,
    records: Arc<dyn RecordStore>,
}

impl StatusService {
    pub fn new(stores: Arc<dyn StoreDirectory>, records: Arc<dyn RecordStore>) -> Self {
        Self { stores, records }
    }

    /// Store count and imported periods of every schema
    pub async fn get_status(&self) -> Result<StatusSummary> {
        let mut schemas = Vec::with_capacity(ImportSchema::ALL.len());
        for schema in ImportSchema::ALL {
            schemas.push(self.schema_status(schema).await?);
        }

        Ok(StatusSummary {
            total_stores: self.stores.list_stores().await?.len(),
            schemas,
        })
    }

    /// Imported periods of one schema, newest first
    pub async fn schema_status(&self, schema: ImportSchema) -> Result<SchemaStatus> {
        let periods = self.records.period_summaries(schema).await?;
        Ok(SchemaStatus {
            schema,
            total_records: periods.iter().map(|p| p.record_count).sum(),
            periods,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_stores: usize,
    pub schemas: Vec<SchemaStatus>,
}

#[derive(Debug, Serialize)]
pub struct SchemaStatus {
    pub schema: ImportSchema,
    pub total_records: u64,
    pub periods: Vec<PeriodSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::adapters::memory::{MemoryRecordStore, MemoryStoreDirectory};
    use crate::domain::{CanonicalRecord, Period, PerformanceActual, ProductPerformance, Store};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn performance(store: &Store, year: i32, month: u32, revenue: i64) -> CanonicalRecord {
        CanonicalRecord::Performance(PerformanceActual::new(
            store.id,
            Period::new(year, month).unwrap(),
            Decimal::from(revenue),
            Decimal::from(4),
            2,
            "test",
            Utc::now(),
        ))
    }

    #[tokio::test]
    async fn test_status_counts_periods_per_schema() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();

        let store = repo
            .upsert_store(&Store::new(Uuid::new_v4(), "7", "Sul"))
            .unwrap();
        let records = vec![performance(&store, 2024, 1, 100), performance(&store, 2024, 2, 100)];
        repo.insert_records(ImportSchema::Performance, &records)
            .unwrap();

        let status = StatusService::new(repo.clone(), repo)
            .get_status()
            .await
            .unwrap();
        assert_eq!(status.total_stores, 1);
        assert_eq!(status.schemas.len(), 2);

        let performance = &status.schemas[0];
        assert_eq!(performance.schema, ImportSchema::Performance);
        assert_eq!(performance.total_records, 2);
        assert_eq!(performance.periods[0].period, Period::new(2024, 2).unwrap());

        assert_eq!(status.schemas[1].total_records, 0);
    }

    #[tokio::test]
    async fn test_period_summaries_from_memory_store() {
        let north = Store::new(Uuid::new_v4(), "1", "Norte");
        let south = Store::new(Uuid::new_v4(), "2", "Sul");
        let records = Arc::new(MemoryRecordStore::new());
        records
            .insert_batch(
                ImportSchema::Performance,
                &[
                    performance(&north, 2024, 3, 300),
                    performance(&south, 2024, 3, 200),
                    performance(&north, 2024, 4, 50),
                ],
            )
            .await
            .unwrap();
        records
            .insert_batch(
                ImportSchema::Product,
                &[CanonicalRecord::Product(ProductPerformance::new(
                    north.id,
                    Period::new(2024, 3).unwrap(),
                    "Acme",
                    None,
                    Decimal::from(3),
                    Decimal::from(90),
                ))],
            )
            .await
            .unwrap();

        let directory = Arc::new(MemoryStoreDirectory::new(vec![north, south]));
        let status = StatusService::new(directory, records).get_status().await.unwrap();

        assert_eq!(status.total_stores, 2);
        let performance = &status.schemas[0];
        assert_eq!(performance.total_records, 3);
        assert_eq!(performance.periods.len(), 2);
        assert_eq!(performance.periods[0].period, Period::new(2024, 4).unwrap());
        assert_eq!(performance.periods[1].store_count, 2);
        assert_eq!(performance.periods[1].total_revenue, Decimal::from(500));
        assert_eq!(status.schemas[1].total_records, 1);
    }

    #[tokio::test]
    async fn test_directory_failure_is_reported() {
        let status = StatusService::new(
            Arc::new(MemoryStoreDirectory::failing()),
            Arc::new(MemoryRecordStore::new()),
        );
        let err = status.get_status().await.unwrap_err();
        assert!(err.to_string().contains("store directory unavailable"));
    }
}
