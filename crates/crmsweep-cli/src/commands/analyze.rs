use crate::commands::{print_json, Context, KindArg};
use crate::error::invalid_input;
use anyhow::Result;
use clap::Args;
use crmsweep_engine::{AnalysisConfig, CancelToken, DedupEngine, ProgressSink, Stage};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
    /// Composite threshold for fuzzy pairs (0-100)
    #[arg(long)]
    pub min_score: Option<u8>,
    #[arg(long)]
    pub no_exact: bool,
    #[arg(long)]
    pub no_fuzzy: bool,
    /// Keep pending groups from earlier runs instead of clearing them
    #[arg(long)]
    pub keep_existing: bool,
}

pub fn analyze(ctx: &Context<'_>, args: AnalyzeArgs) -> Result<()> {
    let defaults = &ctx.config.dedupe;
    let mut config = AnalysisConfig::new(args.kind.kind());
    config.min_score = args.min_score.unwrap_or(defaults.fuzzy_min_score);
    if config.min_score > 100 {
        return Err(invalid_input(format!(
            "min score {} is outside 0-100",
            config.min_score
        )));
    }
    config.chunk_size = defaults.fuzzy_chunk_size;
    config.run_exact = defaults.run_exact && !args.no_exact;
    config.run_fuzzy = defaults.run_fuzzy && !args.no_fuzzy;
    config.clear_existing = defaults.clear_existing && !args.keep_existing;

    let mut sink = StderrProgress::new(!ctx.json);
    let summary = DedupEngine::new(ctx.store).run(&config, &mut sink, &CancelToken::new())?;
    sink.finish();

    if ctx.json {
        return print_json(&summary);
    }
    println!(
        "Analyzed {} {} record(s) in {} ms{}.",
        summary.total_records,
        summary.kind,
        summary.elapsed_ms,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    println!(
        "Found {} group(s): {} exact, {} fuzzy ({} high / {} medium / {} low confidence).",
        summary.total_groups,
        summary.exact_groups,
        summary.fuzzy_groups,
        summary.by_confidence.high,
        summary.by_confidence.medium,
        summary.by_confidence.low
    );
    Ok(())
}

/// Single-line progress on stderr, overwritten in place.
struct StderrProgress {
    enabled: bool,
    wrote: bool,
}

impl StderrProgress {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            wrote: false,
        }
    }

    fn finish(&self) {
        if self.wrote {
            eprintln!();
        }
    }
}

impl ProgressSink for StderrProgress {
    fn progress(&mut self, stage: Stage, current: usize, total: usize) {
        if !self.enabled {
            return;
        }
        eprint!("\r{stage} {current}/{total}    ");
        self.wrote = true;
    }
}
