//! Import command - load a spreadsheet into one or more periods

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;

use super::{block_on, get_context, get_logger, log_event};
use crate::output;
use sheetline_core::services::{ImportOptions, LogEvent};
use sheetline_core::{CanonicalRecord, ImportOutcome, ImportReport, ImportSchema, Period};

/// Rows of the batch shown in preview mode
const PREVIEW_ROWS: usize = 20;

pub fn parse_schema(s: &str) -> std::result::Result<ImportSchema, String> {
    s.parse().map_err(|e: sheetline_core::Error| e.to_string())
}

pub fn parse_period(s: &str) -> std::result::Result<Period, String> {
    s.parse().map_err(|e: sheetline_core::Error| e.to_string())
}

pub fn run(
    file: PathBuf,
    schema: ImportSchema,
    period: Period,
    preview: bool,
    imported_by: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let options = ImportOptions {
        imported_by,
        preview,
    };
    let report = block_on(ctx.import_file(&file, schema, period, &options))?;

    let event = match report.outcome.failure() {
        None => LogEvent::new("import_completed"),
        Some(reason) => LogEvent::new("import_failed")
            .with_error(reason.to_string())
            .with_error_details(reason.kind()),
    };
    log_event(
        &logger,
        event
            .with_schema(schema.as_str())
            .with_period(period.to_string())
            .with_command("import"),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(reason) = report.outcome.failure() {
        bail!("Import failed: {}", reason);
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    let title = if report.preview { "Import Preview" } else { "Import" };
    println!("{} ({}, {})", title.bold(), report.schema, report.fallback_period);
    println!();

    if let Some(row) = report.header_row {
        println!("Header row: {}", row + 1);
        let mut table = output::create_table();
        table.set_header(vec!["Field", "Column"]);
        for (field, col) in &report.columns {
            table.add_row(vec![field.clone(), output::column_letter(*col)]);
        }
        println!("{}", table);
        println!();
    }

    println!("  Rows processed:  {}", report.total_rows_processed);
    println!("  Records:         {}", report.success_count);
    println!("  Skipped rows:    {}", report.skipped_rows);
    if report.duplicate_rows > 0 {
        println!("  Duplicate rows:  {}", report.duplicate_rows);
    }
    if report.unparsed_cells > 0 {
        output::warning(&format!(
            "  {} cell(s) could not be read as numbers and counted as zero",
            report.unparsed_cells
        ));
    }
    if report.unknown_store_count > 0 {
        output::warning(&format!(
            "  {} row(s) reference unknown stores: {}",
            report.unknown_store_count,
            report.unknown_store_tokens.join(", ")
        ));
    }

    if !report.records.is_empty() {
        println!();
        print_records(&report.records);
    }

    println!();
    let periods: Vec<String> = report
        .replaced_periods
        .iter()
        .map(Period::to_string)
        .collect();
    match &report.outcome {
        ImportOutcome::Failure { reason } => output::error(&format!("Import failed: {}", reason)),
        _ if report.preview => output::info(&format!(
            "Preview only. Would replace period(s): {}",
            periods.join(", ")
        )),
        ImportOutcome::Success { count } => output::success(&format!(
            "Imported {} record(s) into {} (replaced {} previous)",
            count,
            periods.join(", "),
            report.deleted_count
        )),
        ImportOutcome::SuccessWithWarnings { count, .. } => output::warning(&format!(
            "Imported {} record(s) into {} with warnings (replaced {} previous)",
            count,
            periods.join(", "),
            report.deleted_count
        )),
    }
}

fn print_records(records: &[CanonicalRecord]) {
    let mut table = output::create_table();
    match records.first() {
        Some(CanonicalRecord::Product(_)) => {
            table.set_header(vec!["Store", "Period", "Brand", "Category", "Units", "Revenue"])
        }
        _ => table.set_header(vec![
            "Store", "Period", "Revenue", "Items", "Sales", "Ticket",
        ]),
    };

    for record in records.iter().take(PREVIEW_ROWS) {
        match record {
            CanonicalRecord::Performance(r) => table.add_row(vec![
                output::short_id(&r.store_id),
                r.period.to_string(),
                r.revenue_actual.to_string(),
                r.items_actual.to_string(),
                r.sales_count.to_string(),
                r.average_ticket.to_string(),
            ]),
            CanonicalRecord::Product(r) => table.add_row(vec![
                output::short_id(&r.store_id),
                r.period.to_string(),
                r.brand.clone(),
                r.category.clone().unwrap_or_default(),
                r.units_sold.to_string(),
                r.revenue.to_string(),
            ]),
        };
    }

    println!("{}", table);
    if records.len() > PREVIEW_ROWS {
        println!("... and {} more", records.len() - PREVIEW_ROWS);
    }
}
