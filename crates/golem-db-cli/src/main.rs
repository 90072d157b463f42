//! Golem database CLI
//!
//! Command-line interface for inspecting and maintaining the local
//! database of a Golem node.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use golem_db::{Config, Database, OrdinalEnum, PaymentStatus};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "golem-dbctl")]
#[command(about = "Inspect and maintain a Golem node database")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Database file to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show schema version and row counts
    Status,
    /// Drop and recreate every managed table
    Reset {
        /// Confirm the destructive reset
        #[arg(long)]
        yes: bool,
    },
    /// List outgoing payments
    Payments {
        /// Only payments in this status (awaiting, sent, confirmed)
        #[arg(short, long, value_parser = parse_status)]
        status: Option<PaymentStatus>,
    },
    /// List known hosts, newest first
    Hosts,
    /// List presets
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List hardware presets
    Hardware,
    /// List task presets
    Task {
        /// Only presets for this task type
        #[arg(short = 't', long = "type")]
        task_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, busy_timeout_ms, log_level, max_stored_hosts)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands must work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, &output)
            }
        };
    }

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.log_level);

    let mut db = open_database(cli.db, &config)?;

    let result = match cli.command {
        Commands::Status => commands::status::show(&db, &output),
        Commands::Reset { yes } => commands::reset::reset(&mut db, yes, &output),
        Commands::Payments { status } => commands::payments::list(&db, status, &output),
        Commands::Hosts => commands::hosts::list(&db, &output),
        Commands::Presets { command } => match command {
            PresetCommands::Hardware => commands::presets::hardware(&db, &output),
            PresetCommands::Task { task_type } => {
                commands::presets::task(&db, task_type.as_deref(), &output)
            }
        },
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    db.close().context("Failed to close database")?;
    result
}

/// Open the database at `--db` if given, otherwise the configured one
fn open_database(path: Option<PathBuf>, config: &Config) -> Result<Database> {
    let mut db = match path {
        Some(path) => Database::at_path(path).with_busy_timeout(config.busy_timeout()),
        None => Database::new(config),
    };
    debug!("Opening database {:?}", db.path());

    db.open().map_err(|e| {
        let context = match e.recovery_suggestion() {
            Some(hint) => format!("Failed to open database. {}", hint),
            None => "Failed to open database".to_string(),
        };
        anyhow::Error::new(e).context(context)
    })?;
    Ok(db)
}

/// Log to stderr so stdout stays clean for --json and --quiet
fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::new(format!(
        "golem_db={},golem_dbctl={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_status(s: &str) -> Result<PaymentStatus, String> {
    PaymentStatus::from_symbol(s).ok_or_else(|| {
        let valid: Vec<&str> = PaymentStatus::VARIANTS.iter().map(|v| v.symbol()).collect();
        format!("unknown payment status '{}' (valid: {})", s, valid.join(", "))
    })
}
