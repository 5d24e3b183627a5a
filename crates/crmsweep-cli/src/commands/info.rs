use crate::commands::{auth, print_json, Context};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InfoArgs {}

#[derive(Debug, Serialize)]
struct AppInfoDto {
    name: &'static str,
    version: &'static str,
    db_path: String,
    schema_version: i64,
    authenticated: bool,
}

pub fn info(ctx: &Context<'_>, db_path: &Path, _args: InfoArgs) -> Result<()> {
    let dto = AppInfoDto {
        name: "crmsweep",
        version: env!("CARGO_PKG_VERSION"),
        db_path: db_path.display().to_string(),
        schema_version: ctx.store.schema_version()?,
        authenticated: auth::resolve_token(ctx.config)?.is_some(),
    };

    if ctx.json {
        return print_json(&dto);
    }
    println!("{} {}", dto.name, dto.version);
    println!("database: {} (schema v{})", dto.db_path, dto.schema_version);
    println!(
        "crm: {}",
        if dto.authenticated {
            "authenticated"
        } else {
            "not authenticated"
        }
    );
    Ok(())
}
