use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use valve_core::{LoadReport, Settings};
use valve_store::{export_path, load_path, ExportSummary};

/// VALVE - validate delimited tables and load them into SQLite
#[derive(Parser)]
#[command(name = "valve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to settings file (default: valve.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every configured table and load it into a store
    Load {
        /// SQLite store to create or replace tables in
        store: PathBuf,

        /// Path of the table-of-tables
        table: String,

        /// Rows validated and committed together
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Also write the load report as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Write a store's tables and messages back to delimited files
    Export {
        /// SQLite store to export from
        store: PathBuf,

        /// Directory to write to (default: next to the store)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = load_settings(cli.config.as_deref(), cli.verbose)?;
    tracing::debug!(?settings, "Resolved settings");

    match cli.command {
        Commands::Load {
            store,
            table,
            chunk_size,
            report,
        } => {
            if let Some(chunk_size) = chunk_size {
                settings.chunk_size = chunk_size;
                settings.validate()?;
            }
            load_command(&settings, &store, &table, report.as_deref())
        }
        Commands::Export { store, output_dir } => {
            export_command(&settings, &store, output_dir.as_deref())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Settings from `--config`, else ./valve.toml, else defaults
fn load_settings(path: Option<&Path>, verbose: bool) -> Result<Settings> {
    let default_path = Path::new("valve.toml");
    let path = match path {
        Some(path) => path,
        None if default_path.exists() => default_path,
        None => {
            if verbose {
                eprintln!("{}", "No settings file found, using defaults".yellow());
            }
            return Ok(Settings::default());
        }
    };

    let settings = Settings::from_file(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if verbose {
        eprintln!("{} {}", "Using settings from".cyan(), path.display());
    }
    Ok(settings)
}

fn load_command(settings: &Settings, store: &Path, table: &str, report_path: Option<&Path>) -> Result<()> {
    let report = load_path(store, table, settings)
        .with_context(|| format!("Failed to load '{}' into {}", table, store.display()))?;

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        eprintln!("{} {}", "Report saved to:".green(), path.display());
    }

    print_load_summary(&report, store);
    Ok(())
}

fn export_command(settings: &Settings, store: &Path, output_dir: Option<&Path>) -> Result<()> {
    let summary = export_path(store, output_dir, settings)
        .with_context(|| format!("Failed to export {}", store.display()))?;

    print_export_summary(&summary);
    Ok(())
}

fn print_load_summary(report: &LoadReport, store: &Path) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Load Summary".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Store:".bold(), store.display());
    println!("{} {}", "Load order:".bold(), report.load_order.join(", "));
    println!();

    for table in &report.tables {
        let conflicts = if table.conflict_rows > 0 {
            table.conflict_rows.to_string().yellow()
        } else {
            table.conflict_rows.to_string().green()
        };
        let invalid = if table.invalid_cells > 0 {
            table.invalid_cells.to_string().red()
        } else {
            table.invalid_cells.to_string().green()
        };
        println!(
            "  {:<20} {:>6} rows  {:>6} main  {:>6} conflict  {:>6} invalid cells",
            table.table, table.rows, table.main_rows, conflicts, invalid
        );
    }

    let summary = &report.summary;
    println!();
    println!("{}", "Summary:".bold());
    println!("  Tables:         {}", summary.tables);
    println!("  Rows:           {}", summary.rows);
    println!("  Main rows:      {}", summary.main_rows);
    println!("  Conflict rows:  {}", summary.conflict_rows);
    println!("  Invalid cells:  {}", summary.invalid_cells);
    println!("  Messages:       {}", summary.messages);
    println!();

    if report.has_conflicts() {
        println!("{}", "⚠ Some rows were routed to conflict tables".yellow().bold());
    } else if summary.invalid_cells > 0 {
        println!("{}", "⚠ Some cells failed validation".yellow());
    } else {
        println!("{}", "✓ All rows valid".green().bold());
    }
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_export_summary(summary: &ExportSummary) {
    println!();
    println!("{}", "Exported tables:".bold());
    for (table, path, rows) in &summary.tables {
        println!("  {} {} ({} rows) -> {}", "✓".green(), table, rows, path.display());
    }
    println!();

    let messages = summary.messages.to_string();
    let messages = if summary.messages > 0 {
        messages.yellow()
    } else {
        messages.green()
    };
    println!("{} {} -> {}", "Messages:".bold(), messages, summary.message_path.display());
}
