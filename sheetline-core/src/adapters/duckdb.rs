//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result as PortResult};
use crate::domain::{
    CanonicalRecord, ImportSchema, PerformanceActual, Period, ProductPerformance, Store,
    StoreStatus,
};
use crate::ports::{PeriodSummary, RecordStore, StoreDirectory};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[sheetline] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.conn()?;
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Store operations ===

    pub fn get_stores(&self) -> Result<Vec<Store>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT store_id, store_number, name, city, status
             FROM stores ORDER BY TRY_CAST(store_number AS BIGINT), store_number",
        )?;

        let stores = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .map(|(id, number, name, city, status)| Store {
                id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
                number,
                name,
                city,
                status: StoreStatus::from_str(&status).unwrap_or(StoreStatus::Active),
            })
            .collect();

        Ok(stores)
    }

    /// Insert or update a store, keyed by store number
    ///
    /// An existing store keeps its id so imported records stay attached.
    pub fn upsert_store(&self, store: &Store) -> Result<Store> {
        if store.number.is_empty() {
            bail!("Store '{}' has no store number", store.name);
        }

        let conn = self.conn()?;
        let now = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();
        conn.execute(
            "INSERT INTO stores (store_id, store_number, name, city, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (store_number) DO UPDATE SET
                name = EXCLUDED.name,
                city = COALESCE(EXCLUDED.city, stores.city),
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at",
            params![
                store.id.to_string(),
                store.number,
                store.name,
                store.city,
                store.status.as_str(),
                now,
                now,
            ],
        )?;

        let id: String = conn.query_row(
            "SELECT store_id FROM stores WHERE store_number = ?",
            params![store.number],
            |row| row.get(0),
        )?;

        Ok(Store {
            id: Uuid::parse_str(&id).context("Invalid store id in database")?,
            ..store.clone()
        })
    }

    // === Record operations ===

    pub fn delete_records_in_period(&self, schema: ImportSchema, period: &Period) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE period = ?", table_name(schema)),
            params![period.to_string()],
        )?;
        Ok(deleted as u64)
    }

    /// Write every record of the batch in one transaction
    pub fn insert_records(&self, schema: ImportSchema, records: &[CanonicalRecord]) -> Result<u64> {
        if let Some(stray) = records.iter().find(|r| r.schema() != schema) {
            bail!(
                "Cannot insert a {} record into the {} table",
                stray.schema(),
                table_name(schema)
            );
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for record in records {
            match record {
                CanonicalRecord::Performance(r) => {
                    tx.execute(
                        "INSERT INTO performance_actuals (store_id, period, revenue_actual, items_actual,
                                                          sales_count, items_per_sale, unit_price,
                                                          average_ticket, imported_by, imported_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        params![
                            r.store_id.to_string(),
                            r.period.to_string(),
                            to_f64(r.revenue_actual),
                            to_f64(r.items_actual),
                            r.sales_count,
                            to_f64(r.items_per_sale),
                            to_f64(r.unit_price),
                            to_f64(r.average_ticket),
                            r.imported_by,
                            r.imported_at.naive_utc().format(TIMESTAMP_FORMAT).to_string(),
                        ],
                    )?;
                }
                CanonicalRecord::Product(r) => {
                    tx.execute(
                        "INSERT INTO product_performance (record_id, store_id, period, brand, category,
                                                          units_sold, revenue)
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                        params![
                            r.id,
                            r.store_id.to_string(),
                            r.period.to_string(),
                            r.brand,
                            r.category,
                            to_f64(r.units_sold),
                            to_f64(r.revenue),
                        ],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(records.len() as u64)
    }

    pub fn get_records(
        &self,
        schema: ImportSchema,
        period: Option<&Period>,
    ) -> Result<Vec<CanonicalRecord>> {
        let conn = self.conn()?;
        let filter = if period.is_some() { "WHERE period = ?" } else { "" };
        let period_param = period.map(|p| p.to_string());

        // Decimals come back as VARCHAR so they parse without float noise
        let records = match schema {
            ImportSchema::Performance => {
                let sql = format!(
                    "SELECT store_id, period, revenue_actual::VARCHAR, items_actual::VARCHAR,
                            sales_count, items_per_sale::VARCHAR, unit_price::VARCHAR,
                            average_ticket::VARCHAR, imported_by, imported_at::VARCHAR
                     FROM performance_actuals {} ORDER BY period, store_id",
                    filter
                );
                let mut stmt = conn.prepare(&sql)?;
                let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<CanonicalRecord> {
                    Ok(CanonicalRecord::Performance(PerformanceActual {
                        store_id: parse_uuid(&row.get::<_, String>(0)?),
                        period: parse_period(&row.get::<_, String>(1)?),
                        revenue_actual: parse_decimal(&row.get::<_, String>(2)?),
                        items_actual: parse_decimal(&row.get::<_, String>(3)?),
                        sales_count: row.get(4)?,
                        items_per_sale: parse_decimal(&row.get::<_, String>(5)?),
                        unit_price: parse_decimal(&row.get::<_, String>(6)?),
                        average_ticket: parse_decimal(&row.get::<_, String>(7)?),
                        imported_by: row.get(8)?,
                        imported_at: parse_timestamp(&row.get::<_, String>(9)?),
                    }))
                };
                match &period_param {
                    Some(p) => stmt.query_map(params![p], map_row)?.collect::<Vec<_>>(),
                    None => stmt.query_map([], map_row)?.collect::<Vec<_>>(),
                }
            }
            ImportSchema::Product => {
                let sql = format!(
                    "SELECT record_id, store_id, period, brand, category,
                            units_sold::VARCHAR, revenue::VARCHAR
                     FROM product_performance {} ORDER BY period, store_id, brand, category",
                    filter
                );
                let mut stmt = conn.prepare(&sql)?;
                let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<CanonicalRecord> {
                    Ok(CanonicalRecord::Product(ProductPerformance {
                        id: row.get(0)?,
                        store_id: parse_uuid(&row.get::<_, String>(1)?),
                        period: parse_period(&row.get::<_, String>(2)?),
                        brand: row.get(3)?,
                        category: row.get(4)?,
                        units_sold: parse_decimal(&row.get::<_, String>(5)?),
                        revenue: parse_decimal(&row.get::<_, String>(6)?),
                    }))
                };
                match &period_param {
                    Some(p) => stmt.query_map(params![p], map_row)?.collect::<Vec<_>>(),
                    None => stmt.query_map([], map_row)?.collect::<Vec<_>>(),
                }
            }
        };

        records
            .into_iter()
            .collect::<std::result::Result<Vec<_>, duckdb::Error>>()
            .context("Failed to read records")
    }

    pub fn get_period_summaries(&self, schema: ImportSchema) -> Result<Vec<PeriodSummary>> {
        let conn = self.conn()?;
        let revenue_column = match schema {
            ImportSchema::Performance => "revenue_actual",
            ImportSchema::Product => "revenue",
        };
        let sql = format!(
            "SELECT period, COUNT(*), COUNT(DISTINCT store_id), SUM({})::VARCHAR
             FROM {} GROUP BY period ORDER BY period DESC",
            revenue_column,
            table_name(schema)
        );

        let mut stmt = conn.prepare(&sql)?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(PeriodSummary {
                    period: parse_period(&row.get::<_, String>(0)?),
                    record_count: row.get::<_, i64>(1)? as u64,
                    store_count: row.get::<_, i64>(2)? as u64,
                    total_revenue: parse_decimal(
                        &row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    ),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(summaries)
    }
}

#[async_trait]
impl StoreDirectory for DuckDbRepository {
    async fn list_stores(&self) -> PortResult<Vec<Store>> {
        self.get_stores().map_err(to_port_error)
    }
}

#[async_trait]
impl RecordStore for DuckDbRepository {
    async fn delete_by_period(&self, schema: ImportSchema, period: &Period) -> PortResult<u64> {
        self.delete_records_in_period(schema, period)
            .map_err(to_port_error)
    }

    async fn insert_batch(&self, schema: ImportSchema, records: &[CanonicalRecord]) -> PortResult<u64> {
        self.insert_records(schema, records).map_err(to_port_error)
    }

    async fn list_records(
        &self,
        schema: ImportSchema,
        period: Option<&Period>,
    ) -> PortResult<Vec<CanonicalRecord>> {
        self.get_records(schema, period).map_err(to_port_error)
    }

    async fn period_summaries(&self, schema: ImportSchema) -> PortResult<Vec<PeriodSummary>> {
        self.get_period_summaries(schema).map_err(to_port_error)
    }
}

fn to_port_error(e: anyhow::Error) -> Error {
    Error::database(format!("{:#}", e))
}

fn table_name(schema: ImportSchema) -> &'static str {
    match schema {
        ImportSchema::Performance => "performance_actuals",
        ImportSchema::Product => "product_performance",
    }
}

// Helper functions

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn parse_decimal(s: &str) -> Decimal {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or_default()
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_default()
}

fn parse_period(s: &str) -> Period {
    s.parse().unwrap_or_else(|_| Period::from_date(Utc::now().date_naive()))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}
