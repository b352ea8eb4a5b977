//! Status command - show imported periods per schema

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{block_on, get_context};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = block_on(ctx.status_service.get_status())??;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Sheetline Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Stores".to_string(), status.total_stores.to_string()]);
    for schema in &status.schemas {
        table.add_row(vec![
            format!("{} records", schema.schema),
            schema.total_records.to_string(),
        ]);
    }
    println!("{}", table);

    for schema in &status.schemas {
        if schema.periods.is_empty() {
            continue;
        }
        println!();
        println!("{}", format!("{} periods", schema.schema).bold());

        let mut periods = output::create_table();
        periods.set_header(vec!["Period", "Records", "Stores", "Revenue"]);
        for p in &schema.periods {
            periods.add_row(vec![
                p.period.to_string(),
                p.record_count.to_string(),
                p.store_count.to_string(),
                p.total_revenue.round_dp(2).to_string(),
            ]);
        }
        println!("{}", periods);
    }

    if status.total_stores == 0 {
        println!();
        output::warning("No stores yet. Add them with `sheetline stores add` or `sheetline stores import`.");
    }

    Ok(())
}
