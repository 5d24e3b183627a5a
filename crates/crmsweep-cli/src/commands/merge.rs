use crate::commands::{backup_dir, crm_client, print_json, Context};
use crate::util::{now_ms, parse_group_id};
use anyhow::Result;
use clap::Args;
use crmsweep_engine::{prune_old_backups, MergeExecutor, MergeRequest};
use tracing::debug;

#[derive(Debug, Args)]
pub struct MergeArgs {
    pub id: String,
    /// External id of the record that survives the merge
    #[arg(long)]
    pub primary: String,
    /// Preview the merge without touching the CRM or the local store
    #[arg(long)]
    pub dry_run: bool,
    /// Write a JSON snapshot of the group before merging
    #[arg(long)]
    pub backup: bool,
}

pub fn merge(ctx: &Context<'_>, args: MergeArgs) -> Result<()> {
    let client = crm_client(ctx)?;
    let dir = backup_dir(ctx)?;
    if let Err(err) = prune_old_backups(&dir, ctx.config.backup.retention_days, now_ms()) {
        debug!(error = %err, "backup pruning failed");
    }

    let executor = MergeExecutor::new(ctx.store, &client, &dir);
    let report = executor.execute(&MergeRequest {
        group_id: parse_group_id(&args.id)?,
        primary_external_id: args.primary,
        create_backup: args.backup,
        dry_run: args.dry_run,
    })?;

    if ctx.json {
        return print_json(&report);
    }

    if report.dry_run {
        let preview = report.preview.as_ref().expect("dry run carries a preview");
        println!(
            "Dry run: {} record(s) would merge into {} ({}).",
            preview.records_to_merge.len(),
            report.primary,
            preview.primary.display_name
        );
        for change in &preview.estimated_changes {
            println!("  * {change}");
        }
        for warning in &preview.warnings {
            println!("  ! {warning}");
        }
        return Ok(());
    }

    println!(
        "Merged {} record(s) into {}.",
        report.absorbed.len(),
        report.primary
    );
    if let Some(path) = &report.backup_path {
        println!("Backup written to {}", path.display());
    }
    Ok(())
}
