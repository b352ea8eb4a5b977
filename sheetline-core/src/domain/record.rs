//! Canonical records produced by an import

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::period::Period;
use super::schema::ImportSchema;

/// Monthly actuals for one store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceActual {
    pub store_id: Uuid,
    pub period: Period,
    pub revenue_actual: Decimal,
    pub items_actual: Decimal,
    /// Always at least 1
    pub sales_count: i64,
    pub items_per_sale: Decimal,
    pub unit_price: Decimal,
    pub average_ticket: Decimal,
    pub imported_by: String,
    pub imported_at: DateTime<Utc>,
}

impl PerformanceActual {
    /// Build a record and compute its derived ratios
    ///
    /// A sales count below 1 is raised to 1 so the ratios never divide by zero.
    /// A ratio that has no value or does not fit a `Decimal` is zero.
    pub fn new(
        store_id: Uuid,
        period: Period,
        revenue: Decimal,
        items: Decimal,
        sales_count: i64,
        imported_by: impl Into<String>,
        imported_at: DateTime<Utc>,
    ) -> Self {
        let sales_count = sales_count.max(1);
        let sales = Decimal::from(sales_count);

        Self {
            store_id,
            period,
            revenue_actual: revenue,
            items_actual: items,
            sales_count,
            items_per_sale: ratio(items, sales),
            unit_price: ratio(revenue, items),
            average_ticket: ratio(revenue, sales),
            imported_by: imported_by.into(),
            imported_at,
        }
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator
        .checked_div(denominator)
        .map(|q| q.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}

/// Brand/category sales for one store in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub id: String,
    pub store_id: Uuid,
    pub period: Period,
    pub brand: String,
    pub category: Option<String>,
    pub units_sold: Decimal,
    pub revenue: Decimal,
}

impl ProductPerformance {
    pub fn new(
        store_id: Uuid,
        period: Period,
        brand: impl Into<String>,
        category: Option<String>,
        units_sold: Decimal,
        revenue: Decimal,
    ) -> Self {
        let brand = brand.into();
        let id = product_record_id(store_id, period, &brand, category.as_deref());
        Self {
            id,
            store_id,
            period,
            brand,
            category,
            units_sold,
            revenue,
        }
    }
}

/// Deterministic id for a product row: same store, month, brand and
/// category always hash to the same id
pub fn product_record_id(
    store_id: Uuid,
    period: Period,
    brand: &str,
    category: Option<&str>,
) -> String {
    let input = format!(
        "{}|{}|{}|{}",
        store_id,
        period,
        brand.trim().to_lowercase(),
        category.unwrap_or("").trim().to_lowercase()
    );

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

/// A canonical record of either import flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalRecord {
    Performance(PerformanceActual),
    Product(ProductPerformance),
}

impl CanonicalRecord {
    pub fn schema(&self) -> ImportSchema {
        match self {
            CanonicalRecord::Performance(_) => ImportSchema::Performance,
            CanonicalRecord::Product(_) => ImportSchema::Product,
        }
    }

    pub fn store_id(&self) -> Uuid {
        match self {
            CanonicalRecord::Performance(r) => r.store_id,
            CanonicalRecord::Product(r) => r.store_id,
        }
    }

    pub fn period(&self) -> Period {
        match self {
            CanonicalRecord::Performance(r) => r.period,
            CanonicalRecord::Product(r) => r.period,
        }
    }

    /// Revenue carried by the record
    pub fn revenue(&self) -> Decimal {
        match self {
            CanonicalRecord::Performance(r) => r.revenue_actual,
            CanonicalRecord::Product(r) => r.revenue,
        }
    }

    /// Key under which later rows of the same batch replace earlier ones
    pub fn batch_key(&self) -> String {
        match self {
            CanonicalRecord::Performance(r) => format!("{}|{}", r.store_id, r.period),
            CanonicalRecord::Product(r) => r.id.clone(),
        }
    }
}
