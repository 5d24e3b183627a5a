use crate::commands::{print_json, Context, KindArg, StatusArg};
use crate::util::parse_group_id;
use anyhow::Result;
use clap::{Args, Subcommand};
use crmsweep_store::repo::{GroupWithMatches, StatusCounts};
use serde::Serialize;

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List duplicate groups with their members
    List(GroupsListArgs),
    /// Count groups per lifecycle status
    Counts(GroupsCountsArgs),
    /// Move a group through the review lifecycle
    SetStatus(GroupsSetStatusArgs),
}

#[derive(Debug, Args)]
pub struct GroupsListArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
}

#[derive(Debug, Args)]
pub struct GroupsCountsArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
}

#[derive(Debug, Args)]
pub struct GroupsSetStatusArgs {
    pub id: String,
    #[arg(value_enum)]
    pub status: StatusArg,
    /// Override the recommended golden record
    #[arg(long)]
    pub golden: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GroupDto {
    pub id: String,
    pub kind: String,
    pub confidence: String,
    pub status: String,
    pub golden_external_id: Option<String>,
    pub created_at: i64,
    pub merged_at: Option<i64>,
    pub merge_strategy: Option<String>,
    pub members: Vec<MemberDto>,
}

#[derive(Debug, Serialize)]
pub struct MemberDto {
    pub external_id: String,
    pub match_score: f64,
    pub is_primary: bool,
    pub matched_fields: Vec<String>,
}

pub fn group_dto(group: GroupWithMatches) -> GroupDto {
    GroupDto {
        id: group.group.id.to_string(),
        kind: group.group.kind.as_str().to_string(),
        confidence: group.group.confidence.as_str().to_string(),
        status: group.group.status.as_str().to_string(),
        golden_external_id: group.group.golden_external_id,
        created_at: group.group.created_at,
        merged_at: group.group.merged_at,
        merge_strategy: group.group.merge_strategy,
        members: group
            .matches
            .into_iter()
            .map(|m| MemberDto {
                external_id: m.record_external_id,
                match_score: m.match_score,
                is_primary: m.is_primary,
                matched_fields: m.matched_fields.fields,
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
struct CountsDto {
    pending: i64,
    reviewed: i64,
    merged: i64,
    dismissed: i64,
    total: i64,
}

impl From<StatusCounts> for CountsDto {
    fn from(counts: StatusCounts) -> Self {
        Self {
            pending: counts.pending,
            reviewed: counts.reviewed,
            merged: counts.merged,
            dismissed: counts.dismissed,
            total: counts.total(),
        }
    }
}

pub fn list_groups(ctx: &Context<'_>, args: GroupsListArgs) -> Result<()> {
    let status = args.status.map(StatusArg::status);
    let groups = ctx.store.groups().list(args.kind.kind(), status)?;
    let dtos: Vec<GroupDto> = groups.into_iter().map(group_dto).collect();

    if ctx.json {
        return print_json(&dtos);
    }
    if dtos.is_empty() {
        println!("No duplicate groups.");
        return Ok(());
    }
    for dto in dtos {
        println!(
            "{}  {}  {}  {} member(s){}",
            dto.id,
            dto.status,
            dto.confidence,
            dto.members.len(),
            dto.golden_external_id
                .as_ref()
                .map(|id| format!("  golden {id}"))
                .unwrap_or_default()
        );
        for member in &dto.members {
            println!(
                "  - {}  score {:.2}{}",
                member.external_id,
                member.match_score,
                if member.is_primary { "  (primary)" } else { "" }
            );
        }
    }
    Ok(())
}

pub fn group_counts(ctx: &Context<'_>, args: GroupsCountsArgs) -> Result<()> {
    let counts: CountsDto = ctx.store.groups().status_counts(args.kind.kind())?.into();
    if ctx.json {
        return print_json(&counts);
    }
    println!(
        "pending {}  reviewed {}  merged {}  dismissed {}  (total {})",
        counts.pending, counts.reviewed, counts.merged, counts.dismissed, counts.total
    );
    Ok(())
}

pub fn set_status(ctx: &Context<'_>, args: GroupsSetStatusArgs) -> Result<()> {
    let id = parse_group_id(&args.id)?;
    let group = ctx
        .store
        .groups()
        .update_status(id, args.status.status(), args.golden.as_deref())?;

    if ctx.json {
        let dto = ctx
            .store
            .groups()
            .get_with_matches(group.id)?
            .map(group_dto);
        return print_json(&dto);
    }
    println!("Group {} is now {}.", group.id, group.status);
    Ok(())
}
