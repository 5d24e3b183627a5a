use crate::error::invalid_input;
use anyhow::Result;
use clap::ValueEnum;
use crmsweep_client::HttpCrmClient;
use crmsweep_config::AppConfig;
use crmsweep_core::{GroupStatus, RecordKind};
use crmsweep_store::Store;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

pub mod analyze;
pub mod auth;
pub mod export;
pub mod groups;
pub mod history;
pub mod import;
pub mod info;
pub mod merge;
pub mod records;

pub struct Context<'a> {
    pub store: &'a Store,
    pub json: bool,
    pub config: &'a AppConfig,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Contacts,
    Companies,
}

impl KindArg {
    pub fn kind(self) -> RecordKind {
        match self {
            KindArg::Contacts => RecordKind::Contact,
            KindArg::Companies => RecordKind::Company,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Reviewed,
    Merged,
    Dismissed,
}

impl StatusArg {
    pub fn status(self) -> GroupStatus {
        match self {
            StatusArg::Pending => GroupStatus::Pending,
            StatusArg::Reviewed => GroupStatus::Reviewed,
            StatusArg::Merged => GroupStatus::Merged,
            StatusArg::Dismissed => GroupStatus::Dismissed,
        }
    }
}

pub fn crm_client(ctx: &Context<'_>) -> Result<HttpCrmClient> {
    let token = auth::resolve_token(ctx.config)?.ok_or_else(|| {
        invalid_input("not authenticated; run `crmsweep auth set --token <token>`")
    })?;
    Ok(HttpCrmClient::new(&ctx.config.api.base_url, token)?)
}

pub fn backup_dir(ctx: &Context<'_>) -> Result<PathBuf> {
    match &ctx.config.backup.dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            Ok(dir.clone())
        }
        None => Ok(crmsweep_store::paths::backups_dir()?),
    }
}
