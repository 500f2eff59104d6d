use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use corpus_matcher::progress;
use corpus_matcher::run::{self, RunConfig};
use corpus_matcher::safety::ConfirmPolicy;
use corpus_matcher::table::DEFAULT_AUDIT_LOG;

#[derive(Parser)]
#[command(name = "corpus-matcher")]
#[command(about = "Match a list of work titles against corpus metadata tables")]
struct Args {
    /// Directory holding corpus metadata tables (.csv or .tsv)
    #[arg(short = 'm', long)]
    metadata_dir: PathBuf,

    /// Table holding the titles to match
    #[arg(short = 't', long)]
    titles: PathBuf,

    /// Zero-based column of the titles table to read titles from
    #[arg(short = 'n', long, default_value_t = 0)]
    title_col: usize,

    /// Treat the first row of the titles table as a header and skip it
    #[arg(short = 'd', long)]
    title_header: bool,

    /// Directory for per-corpus match output
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Audit log of rejected matches, truncated at the start of each run
    #[arg(long, default_value = DEFAULT_AUDIT_LOG)]
    audit_log: PathBuf,

    /// Answer yes to every prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Answer no to every prompt
    #[arg(long, conflicts_with = "yes")]
    no: bool,

    /// Suppress progress bars for tail-friendly output
    #[arg(long)]
    log_only: bool,

    /// Write run statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    progress::set_log_only(args.log_only);

    let metadata_dir = args.metadata_dir.canonicalize().with_context(|| {
        format!(
            "resolving metadata directory {}",
            args.metadata_dir.display()
        )
    })?;
    let titles_path = args
        .titles
        .canonicalize()
        .with_context(|| format!("resolving titles table {}", args.titles.display()))?;

    let confirm = if args.yes {
        ConfirmPolicy::AssumeYes
    } else if args.no {
        ConfirmPolicy::AssumeNo
    } else {
        ConfirmPolicy::Interactive
    };

    let config = RunConfig {
        metadata_dir,
        titles_path,
        title_col: args.title_col,
        title_header: args.title_header,
        out_dir: args.out_dir,
        audit_log: args.audit_log,
        confirm,
        stats_path: args.stats,
    };

    run::run(&config)?;
    Ok(())
}
