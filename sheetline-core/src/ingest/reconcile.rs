//! Period replacement
//!
//! An import owns every period it touches: all existing records of the
//! schema in those periods are deleted, then the batch is inserted. Periods
//! the batch does not mention are left alone.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use super::ImportFailure;
use crate::domain::{CanonicalRecord, ImportSchema, Period};
use crate::ports::RecordStore;

/// What an import is about to replace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplacementScope {
    pub schema: ImportSchema,
    pub periods: BTreeSet<Period>,
}

impl ReplacementScope {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Distinct periods of the batch, in chronological order
pub fn plan_deletion(schema: ImportSchema, batch: &[CanonicalRecord]) -> ReplacementScope {
    ReplacementScope {
        schema,
        periods: batch.iter().map(CanonicalRecord::period).collect(),
    }
}

/// Result of a replacement that went through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub deleted: u64,
    pub inserted: u64,
}

/// Delete-then-insert over a record store
pub struct ReconciliationPolicy {
    store: Arc<dyn RecordStore>,
}

impl ReconciliationPolicy {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Replace the periods of `scope` with `batch`
    ///
    /// Deletes run period by period, then the batch goes in with a single
    /// insert. There is no retry and no compensation: a failure after a
    /// delete leaves that period empty until the next import.
    pub async fn apply(
        &self,
        scope: &ReplacementScope,
        batch: &[CanonicalRecord],
    ) -> Result<Replacement, ImportFailure> {
        let mut deleted = 0;
        for period in &scope.periods {
            deleted += self
                .store
                .delete_by_period(scope.schema, period)
                .await
                .map_err(|e| ImportFailure::Persistence {
                    message: format!("deleting {} {}: {}", scope.schema, period, e),
                })?;
        }

        let inserted = self
            .store
            .insert_batch(scope.schema, batch)
            .await
            .map_err(|e| ImportFailure::Persistence {
                message: e.to_string(),
            })?;

        Ok(Replacement { deleted, inserted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRecordStore;
    use crate::domain::PerformanceActual;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn record(store: Uuid, year: i32, month: u32, revenue: i64) -> CanonicalRecord {
        CanonicalRecord::Performance(PerformanceActual::new(
            store,
            Period::new(year, month).unwrap(),
            Decimal::from(revenue),
            Decimal::ZERO,
            1,
            "tester",
            Utc::now(),
        ))
    }

    #[test]
    fn test_plan_collects_distinct_periods_in_order() {
        let store = Uuid::new_v4();
        let batch = vec![
            record(store, 2024, 3, 1),
            record(store, 2024, 1, 1),
            record(Uuid::new_v4(), 2024, 3, 1),
        ];
        let scope = plan_deletion(ImportSchema::Performance, &batch);
        let periods: Vec<String> = scope.periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-03"]);
    }

    #[tokio::test]
    async fn test_apply_replaces_only_touched_periods() {
        let memory = Arc::new(MemoryRecordStore::new());
        let store = Uuid::new_v4();
        memory
            .insert_batch(
                ImportSchema::Performance,
                &[record(store, 2024, 2, 10), record(store, 2024, 3, 20)],
            )
            .await
            .unwrap();

        let policy = ReconciliationPolicy::new(memory.clone());
        let batch = vec![record(store, 2024, 3, 99)];
        let scope = plan_deletion(ImportSchema::Performance, &batch);
        let result = policy.apply(&scope, &batch).await.unwrap();

        assert_eq!(result, Replacement { deleted: 1, inserted: 1 });
        let all = memory
            .list_records(ImportSchema::Performance, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        let march = Period::new(2024, 3).unwrap();
        let march_records = memory
            .list_records(ImportSchema::Performance, Some(&march))
            .await
            .unwrap();
        assert_eq!(march_records[0].revenue(), Decimal::from(99));
    }

    #[tokio::test]
    async fn test_insert_failure_is_reported_after_deletes() {
        let memory = Arc::new(MemoryRecordStore::new());
        let store = Uuid::new_v4();
        memory
            .insert_batch(ImportSchema::Performance, &[record(store, 2024, 3, 20)])
            .await
            .unwrap();
        memory.fail_inserts(true);

        let policy = ReconciliationPolicy::new(memory.clone());
        let batch = vec![record(store, 2024, 3, 99)];
        let scope = plan_deletion(ImportSchema::Performance, &batch);
        let err = policy.apply(&scope, &batch).await.unwrap_err();

        assert!(matches!(err, ImportFailure::Persistence { .. }));
        // the period was already cleared when the insert failed
        assert!(memory
            .list_records(ImportSchema::Performance, None)
            .await
            .unwrap()
            .is_empty());
    }
}
