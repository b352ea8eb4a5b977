//! Detect command - show how a spreadsheet's columns would be mapped

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use super::get_context;
use crate::output;
use sheetline_core::ImportSchema;

pub fn run(file: PathBuf, schema: ImportSchema, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let bytes =
        std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;

    let detection = ctx.import_service.detect_columns(&bytes, schema)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detection)?);
        return Ok(());
    }

    println!(
        "{} ({})",
        file.display().to_string().bold(),
        detection.schema
    );
    println!("Header row: {}", detection.header_row + 1);
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Field", "Column", "Header"]);
    for (field, column) in &detection.columns {
        table.add_row(vec![
            field.clone(),
            output::column_letter(column.index),
            column.header.clone(),
        ]);
    }
    println!("{}", table);

    if detection.missing.is_empty() {
        output::success("All required columns found");
        Ok(())
    } else {
        bail!("Missing required columns: {}", detection.missing.join(", "))
    }
}
