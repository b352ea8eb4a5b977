//! In-memory store directory and record store for unit tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalRecord, ImportSchema, Period, Store};
use crate::ports::{PeriodSummary, RecordStore, StoreDirectory};

#[derive(Default)]
pub struct MemoryStoreDirectory {
    stores: Vec<Store>,
    fail: bool,
}

impl MemoryStoreDirectory {
    pub fn new(stores: Vec<Store>) -> Self {
        Self { stores, fail: false }
    }

    /// A directory whose every read fails
    pub fn failing() -> Self {
        Self {
            stores: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl StoreDirectory for MemoryStoreDirectory {
    async fn list_stores(&self) -> Result<Vec<Store>> {
        if self.fail {
            return Err(Error::database("store directory unavailable"));
        }
        Ok(self.stores.clone())
    }
}

/// Records keyed by (schema, batch key); counts every call it receives
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<(ImportSchema, String), CanonicalRecord>>,
    fail_inserts: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of delete/insert calls received so far
    pub fn write_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(ImportSchema, String), CanonicalRecord>>> {
        self.records
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn delete_by_period(&self, schema: ImportSchema, period: &Period) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|(s, _), r| !(*s == schema && r.period() == *period));
        Ok((before - records.len()) as u64)
    }

    async fn insert_batch(&self, schema: ImportSchema, batch: &[CanonicalRecord]) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::database("insert rejected"));
        }
        let mut records = self.lock()?;
        for record in batch {
            records.insert((schema, record.batch_key()), record.clone());
        }
        Ok(batch.len() as u64)
    }

    async fn list_records(
        &self,
        schema: ImportSchema,
        period: Option<&Period>,
    ) -> Result<Vec<CanonicalRecord>> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .filter(|((s, _), r)| *s == schema && period.map_or(true, |p| r.period() == *p))
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn period_summaries(&self, schema: ImportSchema) -> Result<Vec<PeriodSummary>> {
        let records = self.list_records(schema, None).await?;
        let mut by_period: BTreeMap<Period, Vec<CanonicalRecord>> = BTreeMap::new();
        for record in records {
            by_period.entry(record.period()).or_default().push(record);
        }

        Ok(by_period
            .into_iter()
            .rev()
            .map(|(period, records)| {
                let mut stores: Vec<_> = records.iter().map(|r| r.store_id()).collect();
                stores.sort();
                stores.dedup();
                PeriodSummary {
                    period,
                    record_count: records.len() as u64,
                    store_count: stores.len() as u64,
                    total_revenue: records.iter().map(|r| r.revenue()).sum::<Decimal>(),
                }
            })
            .collect())
    }
}
