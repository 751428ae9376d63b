//! duckconn CLI
//!
//! Opens the named DuckDB connections configured in a TOML secrets file

use clap::{Parser, Subcommand, ValueEnum};
use duckconn_core::errors::ExError;
use duckconn_core::logging_facility::{init, Profile};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "duckconn")]
#[command(about = "duckconn - DuckDB connection manager", long_about = None)]
struct Cli {
    /// TOML file with one [connections.<name>] table per connection
    #[arg(long, global = true, default_value = "secrets.toml")]
    secrets: PathBuf,

    /// Where remote sources are staged before loading
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,

    /// Log output on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Off)]
    log: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Off,
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List configured connections
    List,
    /// Validate a connection's configuration without opening it
    Check(commands::check::CheckArgs),
    /// Run SQL against a connection
    Query(commands::query::QueryArgs),
    /// Show the tables of a connection
    Tables(commands::tables::TablesArgs),
}

fn main() {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.log {
        LogFormat::Off => {}
        LogFormat::Pretty => init(Profile::Development),
        LogFormat::Json => init(Profile::Production),
    }

    let ctx = commands::Context {
        secrets: cli.secrets,
        staging_dir: cli
            .staging_dir
            .unwrap_or_else(|| std::env::temp_dir().join("duckconn-staging")),
    };

    let result = match cli.command {
        Commands::List => commands::list::execute(&ctx),
        Commands::Check(args) => commands::check::execute(&ctx, args),
        Commands::Query(args) => commands::query::execute(&ctx, args),
        Commands::Tables(args) => commands::tables::execute(&ctx, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(ex) = e.downcast_ref::<ExError>() {
            for field_error in ex.field_errors() {
                eprintln!("  - {}", field_error);
            }
        }
        std::process::exit(1);
    }
}
