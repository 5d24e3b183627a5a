use crate::commands::{print_json, Context};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use crmsweep_client::{CrmClient, HttpCrmClient};
use crmsweep_config::AppConfig;
use crmsweep_store::paths;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CREDENTIALS_FILENAME: &str = "credentials.json";

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store an API token and verify it against the CRM
    Set(SetArgs),
    /// Show the current connection state
    Status(StatusArgs),
    /// Forget the stored API token
    Clear(ClearArgs),
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(long)]
    pub token: String,
}

#[derive(Debug, Args)]
pub struct StatusArgs {}

#[derive(Debug, Args)]
pub struct ClearArgs {}

#[derive(Debug, Serialize, Deserialize)]
struct Credentials {
    token: String,
}

#[derive(Debug, Serialize)]
struct StatusDto {
    connected: bool,
    portal_id: Option<i64>,
}

fn credentials_path() -> Result<PathBuf> {
    Ok(paths::ensure_data_dir()?.join(CREDENTIALS_FILENAME))
}

/// Stored credential first, then the configured environment variable.
pub fn resolve_token(config: &AppConfig) -> Result<Option<String>> {
    let path = credentials_path()?;
    if path.exists() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read credentials {}", path.display()))?;
        let credentials: Credentials =
            serde_json::from_str(&raw).with_context(|| "parse stored credentials")?;
        if !credentials.token.is_empty() {
            return Ok(Some(credentials.token));
        }
    }
    if let Ok(token) = env::var(&config.api.token_env) {
        if !token.is_empty() {
            return Ok(Some(token));
        }
    }
    Ok(None)
}

pub fn set(ctx: &Context<'_>, args: SetArgs) -> Result<()> {
    let client = HttpCrmClient::new(&ctx.config.api.base_url, args.token.clone())?;
    let info = client
        .account_info()
        .with_context(|| "verify credentials against the CRM")?;

    let path = credentials_path()?;
    let body = serde_json::to_string_pretty(&Credentials { token: args.token })?;
    fs::write(&path, body).with_context(|| format!("write credentials {}", path.display()))?;
    restrict_file_permissions(&path)?;

    if ctx.json {
        return print_json(&StatusDto {
            connected: true,
            portal_id: Some(info.portal_id),
        });
    }
    println!("Connected to portal {}", info.portal_id);
    Ok(())
}

pub fn status(ctx: &Context<'_>, _args: StatusArgs) -> Result<()> {
    let Some(token) = resolve_token(ctx.config)? else {
        if ctx.json {
            return print_json(&StatusDto {
                connected: false,
                portal_id: None,
            });
        }
        println!("Not connected.");
        return Ok(());
    };

    let client = HttpCrmClient::new(&ctx.config.api.base_url, token)?;
    match client.account_info() {
        Ok(info) => {
            if ctx.json {
                return print_json(&StatusDto {
                    connected: true,
                    portal_id: Some(info.portal_id),
                });
            }
            println!("Connected to portal {}", info.portal_id);
        }
        Err(err) => {
            if ctx.json {
                return print_json(&StatusDto {
                    connected: false,
                    portal_id: None,
                });
            }
            println!("Credential check failed: {err}");
        }
    }
    Ok(())
}

pub fn clear(ctx: &Context<'_>, _args: ClearArgs) -> Result<()> {
    let path = credentials_path()?;
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("remove credentials {}", path.display()))?;
    }
    if ctx.json {
        return print_json(&StatusDto {
            connected: false,
            portal_id: None,
        });
    }
    println!("Disconnected.");
    Ok(())
}

#[cfg(unix)]
fn restrict_file_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, perms)
        .with_context(|| format!("restrict permissions for {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_file_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
