//! Run SQL against a named connection

use super::Context;
use clap::{Args, ValueEnum};
use duckconn_core::handle::QueryResult;
use std::path::PathBuf;
use std::sync::PoisonError;

const FALLBACK_SQL: &str = "SHOW TABLES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Connection name
    pub name: String,

    /// SQL to run; defaults to the connection's default_query
    #[arg(long, conflicts_with = "file")]
    pub sql: Option<String>,

    /// File holding one SQL statement
    #[arg(long, conflicts_with = "sql")]
    pub file: Option<PathBuf>,

    /// Connect to this target instead of the configured data_uri
    #[arg(long)]
    pub target: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Print build timings after the result
    #[arg(long)]
    pub metrics: bool,
}

pub fn execute(ctx: &Context, args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = ctx.load_secrets()?;
    let manager = ctx.manager(&secrets);

    let shared = manager.connect(&args.name, args.target.as_deref(), secrets.get(&args.name)?)?;
    let mut conn = shared.lock().unwrap_or_else(PoisonError::into_inner);

    let result = match (&args.sql, &args.file) {
        (Some(sql), _) => conn.query(sql)?,
        (None, Some(path)) => conn.query_file(path)?,
        (None, None) => {
            let sql = conn
                .config()
                .default_query
                .clone()
                .unwrap_or_else(|| FALLBACK_SQL.to_string());
            conn.query(&sql)?
        }
    };
    print_result(&result, args.format)?;

    if args.metrics {
        let metrics = serde_json::to_string_pretty(conn.metrics())?;
        eprintln!("{}", metrics);
    }
    Ok(())
}

pub fn print_result(
    result: &QueryResult,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(result)?),
        OutputFormat::Table => {
            println!("{}", result.columns.join("\t"));
            for row in &result.rows {
                let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                println!("{}", cells.join("\t"));
            }
        }
    }
    Ok(())
}
