mod commands;
mod error;
mod util;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use crate::commands::{
    analyze, auth, export, groups, history, import, info, merge, records, Context,
};
use crate::error::{exit_code_for, report_error};
use crmsweep_config as config;
use crmsweep_store::{paths, Store};

#[derive(Debug, Parser)]
#[command(name = "crmsweep", version, about = "CRM duplicate sweeper CLI")]
struct Cli {
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Auth(auth::AuthCommand),
    Import(import::ImportArgs),
    Analyze(analyze::AnalyzeArgs),
    #[command(subcommand)]
    Groups(groups::GroupsCommand),
    Merge(merge::MergeArgs),
    #[command(subcommand)]
    Records(records::RecordsCommand),
    Export(export::ExportArgs),
    History(history::HistoryArgs),
    Info(info::InfoArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, verbose);
            exit_code_for(&err)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        db_path,
        config: config_path,
        json,
        verbose,
        command,
    } = cli;

    let app_config = config::load(config_path).with_context(|| "load config")?;
    let db_path = paths::resolve_db_path(db_path).with_context(|| "resolve database path")?;
    if verbose {
        debug!(path = %db_path.display(), "database path resolved");
    }

    let store = Store::open(&db_path)
        .with_context(|| format!("open database {}", db_path.display()))?;
    store.migrate().with_context(|| "run migrations")?;

    let ctx = Context {
        store: &store,
        json,
        config: &app_config,
    };

    match command {
        Command::Auth(cmd) => match cmd {
            auth::AuthCommand::Set(args) => auth::set(&ctx, args),
            auth::AuthCommand::Status(args) => auth::status(&ctx, args),
            auth::AuthCommand::Clear(args) => auth::clear(&ctx, args),
        },
        Command::Import(args) => import::import(&ctx, args),
        Command::Analyze(args) => analyze::analyze(&ctx, args),
        Command::Groups(cmd) => match cmd {
            groups::GroupsCommand::List(args) => groups::list_groups(&ctx, args),
            groups::GroupsCommand::Counts(args) => groups::group_counts(&ctx, args),
            groups::GroupsCommand::SetStatus(args) => groups::set_status(&ctx, args),
        },
        Command::Merge(args) => merge::merge(&ctx, args),
        Command::Records(cmd) => match cmd {
            records::RecordsCommand::List(args) => records::list_records(&ctx, args),
        },
        Command::Export(args) => export::export(&ctx, args),
        Command::History(args) => history::history(&ctx, args),
        Command::Info(args) => info::info(&ctx, &db_path, args),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
