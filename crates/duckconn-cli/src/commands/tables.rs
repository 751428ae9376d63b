//! Show the tables of a connection

use super::query::{print_result, OutputFormat};
use super::Context;
use clap::Args;
use std::sync::PoisonError;

#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Connection name
    pub name: String,
}

pub fn execute(ctx: &Context, args: TablesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = ctx.load_secrets()?;
    let manager = ctx.manager(&secrets);

    let conn = manager.connect(&args.name, None, secrets.get(&args.name)?)?;
    let result = conn
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .query("SHOW TABLES")?;
    print_result(&result, OutputFormat::Table)
}
