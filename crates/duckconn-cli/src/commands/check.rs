//! Validate a connection's configuration

use super::Context;
use clap::Args;
use duckconn_core::config::{validate_fields, ProcessEnv, Validation};
use duckconn_core::errors::{ConnError, ExError};
use duckconn_core::intent::TargetKey;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Connection name
    pub name: String,
}

pub fn execute(ctx: &Context, args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = ctx.load_secrets()?;
    let raw = secrets.get(&args.name)?;

    match validate_fields(raw, &ProcessEnv) {
        Validation::Valid(config) => {
            let intent = config.target.clone().rooted_at(secrets.base_dir());
            println!("{}: ok", args.name);
            println!("  target: {} ({})", TargetKey::derive(&intent), intent.kind());
            match config.table_name() {
                Some(table) if config.bootstrap_requested() => {
                    println!("  bootstrap: table {}", table)
                }
                _ => println!("  bootstrap: none"),
            }
            Ok(())
        }
        Validation::Invalid(errors) => {
            let err: ExError = ConnError::InvalidConfig { errors }.into();
            Err(err.into())
        }
    }
}
