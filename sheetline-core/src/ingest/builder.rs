//! Record building
//!
//! Turns the data rows below the header into canonical records for one
//! schema. Rows are read only through the resolved field map.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::normalize::{normalize_store_token, parse_amount_checked, parse_period_key};
use super::resolver::{Resolution, StoreResolver};
use crate::domain::{
    CanonicalRecord, FieldMap, ImportSchema, PerformanceActual, Period, ProductPerformance,
    RawSheet, SemanticField, Store,
};

/// Everything the builder needs besides the sheet itself
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub schema: ImportSchema,
    pub fields: &'a FieldMap,
    pub resolver: &'a StoreResolver,
    /// Period used when a row has no readable period of its own
    pub fallback_period: Period,
    pub imported_by: &'a str,
    pub imported_at: DateTime<Utc>,
}

/// Row counters gathered while building
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Rows below the header, blank ones included
    pub total_rows: usize,
    /// Records in the final batch
    pub success_count: usize,
    pub unknown_store_count: usize,
    /// Distinct store tokens that matched no store
    pub unknown_store_tokens: BTreeSet<String>,
    /// Blank/separator rows and rows with nothing to record
    pub skipped_rows: usize,
    /// Rows replaced by a later row with the same record key
    pub duplicate_rows: usize,
    /// Non-empty numeric cells that could not be read and counted as zero
    pub unparsed_cells: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub records: Vec<CanonicalRecord>,
    pub stats: BuildStats,
}

/// Build records from every row after `header_row`
pub fn build_records(sheet: &RawSheet, header_row: usize, ctx: &BuildContext<'_>) -> BuildOutput {
    let mut stats = BuildStats::default();
    let mut records: Vec<CanonicalRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let Some(store_col) = ctx.fields.get(SemanticField::Store) else {
        return BuildOutput { records, stats };
    };

    for row in (header_row + 1)..sheet.len() {
        stats.total_rows += 1;

        let store_cell = sheet.cell(row, store_col);
        let store = match ctx.resolver.resolve(store_cell) {
            Resolution::Found(store) => store,
            Resolution::NoToken => {
                stats.skipped_rows += 1;
                continue;
            }
            Resolution::Unknown => {
                stats.unknown_store_count += 1;
                stats
                    .unknown_store_tokens
                    .insert(normalize_store_token(store_cell));
                continue;
            }
        };

        let mut reader = RowReader {
            sheet,
            row,
            fields: ctx.fields,
            unparsed: 0,
        };

        let period = reader.period().unwrap_or(ctx.fallback_period);
        let record = match ctx.schema {
            ImportSchema::Performance => performance_record(&mut reader, store, period, ctx),
            ImportSchema::Product => product_record(&mut reader, store, period),
        };
        stats.unparsed_cells += reader.unparsed;

        let Some(record) = record else {
            stats.skipped_rows += 1;
            continue;
        };

        match positions.get(&record.batch_key()) {
            Some(&existing) => {
                records[existing] = record;
                stats.duplicate_rows += 1;
            }
            None => {
                positions.insert(record.batch_key(), records.len());
                records.push(record);
            }
        }
    }

    stats.success_count = records.len();
    BuildOutput { records, stats }
}

fn performance_record(
    reader: &mut RowReader<'_>,
    store: &Store,
    period: Period,
    ctx: &BuildContext<'_>,
) -> Option<CanonicalRecord> {
    let revenue = reader.amount(SemanticField::Revenue);
    if revenue <= Decimal::ZERO {
        return None;
    }

    let items = reader.amount(SemanticField::Units);
    let sales_count = reader
        .amount(SemanticField::SalesCount)
        .trunc()
        .to_i64()
        .unwrap_or(1);

    Some(CanonicalRecord::Performance(PerformanceActual::new(
        store.id,
        period,
        revenue,
        items,
        sales_count,
        ctx.imported_by,
        ctx.imported_at,
    )))
}

fn product_record(
    reader: &mut RowReader<'_>,
    store: &Store,
    period: Period,
) -> Option<CanonicalRecord> {
    let brand = reader.text(SemanticField::Brand)?;
    let units = reader.amount(SemanticField::Units);
    let revenue = reader.amount(SemanticField::Revenue);
    if units <= Decimal::ZERO && revenue <= Decimal::ZERO {
        return None;
    }

    let category = reader.text(SemanticField::Category);
    Some(CanonicalRecord::Product(ProductPerformance::new(
        store.id, period, brand, category, units, revenue,
    )))
}

/// Typed access to one data row
struct RowReader<'a> {
    sheet: &'a RawSheet,
    row: usize,
    fields: &'a FieldMap,
    unparsed: usize,
}

impl RowReader<'_> {
    /// Non-negative amount; absent columns read as zero
    fn amount(&mut self, field: SemanticField) -> Decimal {
        let Some(col) = self.fields.get(field) else {
            return Decimal::ZERO;
        };
        let parsed = parse_amount_checked(self.sheet.cell(self.row, col));
        if parsed.fell_back {
            self.unparsed += 1;
        }
        parsed.value.max(Decimal::ZERO)
    }

    /// Trimmed text with inner whitespace collapsed; `None` when blank
    fn text(&self, field: SemanticField) -> Option<String> {
        let col = self.fields.get(field)?;
        let text = self.sheet.cell(self.row, col).as_text();
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        (!collapsed.is_empty()).then_some(collapsed)
    }

    fn period(&self) -> Option<Period> {
        let col = self.fields.get(SemanticField::Period)?;
        parse_period_key(self.sheet.cell(self.row, col))
    }
}
