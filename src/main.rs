// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use friendly_debts::{csv_io, logging, Ledger, Settings};

#[derive(Parser)]
#[command(name = "friendly-debts", version, about = "Track informal debts with friends")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides config and FRIENDLY_DEBTS_DB
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the terminal UI (default)
    Ui,
    /// Print the active profile and its debts
    Show,
    /// List all profiles with their totals
    Profiles,
    /// Write the active profile's debts to a CSV file
    Export { path: PathBuf },
    /// Add debts from a CSV file to the active profile
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.database_path = db;
    }
    settings.ensure_database_dir()?;

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => run_ui_mode(&settings)?,
        Command::Show => {
            logging::init_stderr(&settings.log_level)?;
            run_show(&open_ledger(&settings)?);
        }
        Command::Profiles => {
            logging::init_stderr(&settings.log_level)?;
            run_profiles(&open_ledger(&settings)?);
        }
        Command::Export { path } => {
            logging::init_stderr(&settings.log_level)?;
            let ledger = open_ledger(&settings)?;
            let count = csv_io::export_to_path(&ledger, &path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("✓ Exported {} debts to {}", count, path.display());
        }
        Command::Import { path } => {
            logging::init_stderr(&settings.log_level)?;
            let mut ledger = open_ledger(&settings)?;
            let count = csv_io::import_from_path(&mut ledger, &path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            let total = ledger
                .state()
                .active_profile()
                .map(|p| p.total.to_string())
                .unwrap_or_default();
            println!("✓ Imported {} debts, total is now {}", count, total);
        }
    }

    Ok(())
}

fn open_ledger(settings: &Settings) -> Result<Ledger> {
    Ledger::open_path(&settings.database_path, settings.ledger_options())
        .with_context(|| format!("Failed to open database {}", settings.database_path.display()))
}

fn run_show(ledger: &Ledger) {
    let state = ledger.state();
    if let Some(profile) = state.active_profile() {
        println!("{}  (total {})", profile.name, profile.total);
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for debt in &state.debts {
        println!(
            "{}  {:>10}  {}",
            debt.date,
            debt.amount,
            debt.note.as_deref().unwrap_or("")
        );
    }
}

fn run_profiles(ledger: &Ledger) {
    let state = ledger.state();
    for profile in &state.profiles {
        let marker = if profile.focus { "→" } else { " " };
        println!("{} {:<24} {:>10}", marker, profile.name, profile.total);
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(settings: &Settings) -> Result<()> {
    logging::init_file(&settings.log_level, &settings.log_path())?;

    let ledger = open_ledger(settings)?;
    tracing::info!(db = %settings.database_path.display(), "starting terminal UI");

    let mut app = ui::App::new(ledger);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_settings: &Settings) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin friendly-debts-server --features server");
    std::process::exit(1);
}
