use crate::commands::{crm_client, print_json, Context, KindArg};
use anyhow::Result;
use clap::Args;
use crmsweep_engine::run_import;

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
}

pub fn import(ctx: &Context<'_>, args: ImportArgs) -> Result<()> {
    let client = crm_client(ctx)?;
    let summary = run_import(ctx.store, &client, args.kind.kind())?;

    if ctx.json {
        return print_json(&summary);
    }
    println!(
        "Imported {}/{} {} record(s) over {} page(s); {} failed.",
        summary.imported, summary.total, summary.kind, summary.pages, summary.failed
    );
    Ok(())
}
