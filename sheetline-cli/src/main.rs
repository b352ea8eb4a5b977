//! Sheetline CLI - store sales spreadsheets in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{detect, import, logs, status, stores};
use sheetline_core::services::LogEvent;
use sheetline_core::{ImportSchema, Period};

/// Sheetline - import store sales spreadsheets period by period
#[derive(Parser)]
#[command(name = "sheetline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a spreadsheet, replacing every period it contains
    Import {
        /// Path to the workbook (xlsx, xls, ods) or CSV file
        file: PathBuf,
        /// Import flow: performance or product
        #[arg(long, short, value_parser = import::parse_schema)]
        schema: ImportSchema,
        /// Period (YYYY-MM) for rows without their own period column
        #[arg(long, short, value_parser = import::parse_period)]
        period: Period,
        /// Build the records without writing anything
        #[arg(long)]
        preview: bool,
        /// Name recorded as the importer
        #[arg(long, env = "SHEETLINE_IMPORTED_BY")]
        imported_by: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the header row and column mapping detected in a file
    Detect {
        /// Path to the workbook or CSV file
        file: PathBuf,
        /// Import flow: performance or product
        #[arg(long, short, value_parser = import::parse_schema)]
        schema: ImportSchema,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the store directory
    Stores {
        #[command(subcommand)]
        command: stores::StoresCommands,
    },

    /// Show imported periods and store count
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Import { .. } => "import",
            Commands::Detect { .. } => "detect",
            Commands::Stores { .. } => "stores",
            Commands::Status { .. } => "status",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = commands::get_logger();
    commands::log_event(
        &logger,
        LogEvent::new("command_executed").with_command(cli.command.name()),
    );
    // Commands open their own log connection
    drop(logger);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import {
            file,
            schema,
            period,
            preview,
            imported_by,
            json,
        } => import::run(file, schema, period, preview, imported_by, json),
        Commands::Detect { file, schema, json } => detect::run(file, schema, json),
        Commands::Stores { command } => stores::run(command),
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
