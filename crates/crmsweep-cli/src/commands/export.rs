use crate::commands::groups::{group_dto, GroupDto};
use crate::commands::{print_json, Context, KindArg, StatusArg};
use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value = "json")]
    pub format: FormatArg,
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
struct ExportReport {
    groups: usize,
    path: PathBuf,
}

pub fn export(ctx: &Context<'_>, args: ExportArgs) -> Result<()> {
    let status = args.status.map(StatusArg::status);
    let groups = ctx.store.groups().list(args.kind.kind(), status)?;
    let dtos: Vec<GroupDto> = groups.into_iter().map(group_dto).collect();

    match args.format {
        FormatArg::Json => write_json(&args.out, &dtos)?,
        FormatArg::Csv => write_csv(&args.out, &dtos)?,
    }

    let report = ExportReport {
        groups: dtos.len(),
        path: args.out,
    };
    if ctx.json {
        return print_json(&report);
    }
    println!(
        "Exported {} group(s) to {}.",
        report.groups,
        report.path.display()
    );
    Ok(())
}

fn write_json(path: &PathBuf, dtos: &[GroupDto]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create export file {}", path.display()))?;
    serde_json::to_writer_pretty(file, dtos)?;
    Ok(())
}

/// One row per group member, flat enough for a spreadsheet.
fn write_csv(path: &PathBuf, dtos: &[GroupDto]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create export file {}", path.display()))?;
    writer.write_record([
        "group_id",
        "kind",
        "status",
        "confidence",
        "golden_external_id",
        "record_external_id",
        "match_score",
        "is_primary",
        "matched_fields",
    ])?;
    for dto in dtos {
        for member in &dto.members {
            let score = format!("{:.2}", member.match_score);
            let fields = member.matched_fields.join(";");
            writer.write_record([
                dto.id.as_str(),
                dto.kind.as_str(),
                dto.status.as_str(),
                dto.confidence.as_str(),
                dto.golden_external_id.as_deref().unwrap_or(""),
                member.external_id.as_str(),
                score.as_str(),
                if member.is_primary { "1" } else { "0" },
                fields.as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
