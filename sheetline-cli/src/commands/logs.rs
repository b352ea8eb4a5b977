//! Logs command - view and manage the event log

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_data_dir;
use crate::output;
use sheetline_core::services::{EntryPoint, LogEntry, LoggingService};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete log entries
    Clear {
        /// Delete entries older than N days
        #[arg(long, default_value = "30", conflicts_with = "all")]
        older_than_days: u64,
        /// Delete every entry
        #[arg(long)]
        all: bool,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show entry counts per event and the log database location
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let service = LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List { limit, errors, json } => list(&service, limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            all,
            force,
            json,
        } => clear(&service, older_than_days, all, force, json),
        LogsCommands::Stats { json } => stats(&service, json),
    }
}

fn list(service: &LoggingService, limit: usize, errors_only: bool, json: bool) -> Result<()> {
    let entries = if errors_only {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Command", "Schema", "Period", "Error"]);
    for entry in &entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            entry.command.clone().unwrap_or_default(),
            entry.schema.clone().unwrap_or_default(),
            entry.period.clone().unwrap_or_default(),
            entry.error_details.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    let failed: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| e.error_message.is_some())
        .take(3)
        .collect();
    if !failed.is_empty() {
        println!();
        println!("{}", "Recent Errors:".red().bold());
        for entry in failed {
            println!(
                "  {} [{}]: {}",
                format_timestamp(entry.timestamp).dimmed(),
                entry.event,
                entry.error_message.as_deref().unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn clear(service: &LoggingService, older_than_days: u64, all: bool, force: bool, json: bool) -> Result<()> {
    let prompt = if all {
        "Delete every log entry?".to_string()
    } else {
        format!("Delete log entries older than {} days?", older_than_days)
    };

    if !force && !json && !Confirm::new().with_prompt(prompt).default(false).interact()? {
        println!("Cancelled.");
        return Ok(());
    }

    let deleted = if all {
        service.clear()?
    } else {
        service.delete_before(Utc::now().timestamp_millis() - older_than_days as i64 * DAY_MS)?
    };

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!("Deleted {} log entries", deleted));
    }
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let total = service.count()?;
    let events = service.event_counts()?;
    let db_path = service.db_path();
    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "total_entries": total,
                "events": events,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes,
            }))?
        );
        return Ok(());
    }

    println!("{}", "Log Statistics".bold());
    println!("  Total entries: {}", total);
    println!("  Database: {}", db_path.display());
    println!("  Size: {}", output::format_size(size_bytes));

    if !events.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Event", "Count"]);
        for e in &events {
            table.add_row(vec![e.event.clone(), e.count.to_string()]);
        }
        println!("{}", table);
    }
    Ok(())
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
