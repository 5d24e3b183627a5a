use crate::commands::{print_json, Context, KindArg};
use anyhow::Result;
use clap::{Args, Subcommand};
use crmsweep_core::Record;

#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// List imported records, most recently updated first
    List(RecordsListArgs),
}

#[derive(Debug, Args)]
pub struct RecordsListArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
    #[arg(long)]
    pub limit: Option<i64>,
    #[arg(long, default_value_t = 0)]
    pub offset: i64,
}

pub fn list_records(ctx: &Context<'_>, args: RecordsListArgs) -> Result<()> {
    let records = ctx
        .store
        .records()
        .list(args.kind.kind(), args.limit, args.offset)?;

    if ctx.json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  {}{}",
            record.external_id(),
            record.display_name(),
            identity_hint(record)
                .map(|hint| format!("  <{hint}>"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn identity_hint(record: &Record) -> Option<String> {
    match record {
        Record::Contact(c) => c.email.clone().or_else(|| c.phone.clone()),
        Record::Company(c) => c.domain.clone(),
    }
}
