//! Stores command - manage the store directory

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use super::{block_on, get_context};
use crate::output;
use sheetline_core::StoreStatus;

#[derive(Subcommand)]
pub enum StoresCommands {
    /// List known stores
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a store, or update the one with the same number
    Add {
        /// Store number (leading zeros and non-digits are ignored)
        number: String,
        /// Store name
        name: String,
        #[arg(long)]
        city: Option<String>,
        /// Mark the store inactive
        #[arg(long)]
        inactive: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a store list (CSV or workbook; first row names the columns)
    Import {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: StoresCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        StoresCommands::List { json } => {
            let stores = ctx.store_service.list_stores()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stores)?);
                return Ok(());
            }

            if stores.is_empty() {
                println!("No stores found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Number", "Name", "City", "Status", "ID"]);
            for store in &stores {
                table.add_row(vec![
                    store.number.clone(),
                    store.name.clone(),
                    store.city.clone().unwrap_or_default(),
                    store.status.to_string(),
                    store.id.to_string(),
                ]);
            }
            println!("{}", table);
        }
        StoresCommands::Add {
            number,
            name,
            city,
            inactive,
            json,
        } => {
            let status = if inactive {
                StoreStatus::Inactive
            } else {
                StoreStatus::Active
            };
            let store = ctx
                .store_service
                .add_store(&number, &name, city.as_deref(), status)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&store)?);
            } else {
                output::success(&format!("Saved store {} ({})", store.number, store.name));
            }
        }
        StoresCommands::Import { file, json } => {
            let result = block_on(ctx.store_service.import_file(&file))??;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            output::success(&format!("Imported {} store(s)", result.imported));
            if result.skipped > 0 {
                output::warning(&format!("Skipped {} row(s):", result.skipped));
                for e in &result.errors {
                    println!("  {}", e);
                }
            }
        }
    }

    Ok(())
}
