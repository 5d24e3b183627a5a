use crate::commands::{print_json, Context, KindArg};
use crate::util::format_instant;
use anyhow::Result;
use clap::Args;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
}

#[derive(Debug, Serialize)]
struct HistoryDto {
    id: i64,
    group_id: String,
    primary_external_id: String,
    absorbed_external_ids: Vec<String>,
    merged_at: i64,
    merge_strategy: Option<String>,
}

pub fn history(ctx: &Context<'_>, args: HistoryArgs) -> Result<()> {
    let entries = ctx.store.merge_history().list(args.kind.kind())?;
    let dtos: Vec<HistoryDto> = entries
        .into_iter()
        .map(|entry| HistoryDto {
            id: entry.id,
            group_id: entry.group_id.to_string(),
            primary_external_id: entry.primary_external_id,
            absorbed_external_ids: entry.absorbed_external_ids,
            merged_at: entry.merged_at,
            merge_strategy: entry.merge_strategy,
        })
        .collect();

    if ctx.json {
        return print_json(&dtos);
    }
    if dtos.is_empty() {
        println!("No merges recorded.");
        return Ok(());
    }
    for dto in dtos {
        println!(
            "{}  {} <- [{}]  {}",
            dto.group_id,
            dto.primary_external_id,
            dto.absorbed_external_ids.join(", "),
            format_instant(dto.merged_at)
        );
    }
    Ok(())
}
