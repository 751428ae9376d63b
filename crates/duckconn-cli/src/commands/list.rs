//! List configured connections

use super::Context;

pub fn execute(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = ctx.load_secrets()?;
    if secrets.is_empty() {
        println!("No connections configured in {}", ctx.secrets.display());
        return Ok(());
    }

    for name in secrets.names() {
        let raw = secrets.get(name)?;
        let data_uri = raw
            .get("data_uri")
            .and_then(|v| v.as_str())
            .unwrap_or("<missing data_uri>");
        match raw.get("description").and_then(|v| v.as_str()) {
            Some(description) => println!("{}\t{}\t{}", name, data_uri, description),
            None => println!("{}\t{}", name, data_uri),
        }
    }
    Ok(())
}
