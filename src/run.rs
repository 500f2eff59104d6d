//! Run orchestration: read the title list, index each corpus table, match,
//! filter, and write per-corpus output.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::matching;
use crate::models::{Corpus, RunStats};
use crate::progress;
use crate::safety::{self, ConfirmPolicy};
use crate::scoring;
use crate::table::{self, AuditLog};

/// Everything a matching run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub metadata_dir: PathBuf,
    pub titles_path: PathBuf,
    pub title_col: usize,
    pub title_header: bool,
    pub out_dir: PathBuf,
    pub audit_log: PathBuf,
    pub confirm: ConfirmPolicy,
    pub stats_path: Option<PathBuf>,
}

/// Execute a matching run over every corpus table in the metadata directory.
///
/// Returns the run statistics. A declined audit-log truncation ends the run
/// early with empty stats and nothing written.
pub fn run(config: &RunConfig) -> Result<RunStats> {
    let start = Instant::now();
    let mut stats = RunStats::default();

    if config.audit_log.exists() {
        println!(
            "Truncating {} for new matching",
            config.audit_log.display()
        );
        if !config.confirm.confirm("Ok to continue?")? {
            println!("Aborting...");
            return Ok(stats);
        }
    }
    let mut audit = AuditLog::create(&config.audit_log)?;
    let audit_path = config
        .audit_log
        .canonicalize()
        .with_context(|| format!("resolving audit log {}", config.audit_log.display()))?;

    let titles = table::read_titles(&config.titles_path, config.title_col, config.title_header)?;
    stats.titles_requested = titles.len();
    println!(
        "Found {} titles to match from {} starting with:",
        titles.len(),
        config.titles_path.display()
    );
    for title in titles.iter().take(5) {
        println!("  {}", title);
    }

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating output directory {}", config.out_dir.display()))?;
    let out_dir = config
        .out_dir
        .canonicalize()
        .with_context(|| format!("resolving output directory {}", config.out_dir.display()))?;

    for path in corpus_tables(&config.metadata_dir)? {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        println!("\nReading metadata table {}", name);

        // Guard the output path first: a table named so that its output would
        // land on the audit log (or an input) must not be processed at all
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("corpus");
        let out_path = out_dir.join(format!("{}_matches.csv", stem));
        if let Err(err) =
            safety::validate_output_path(&out_path, &[&path, &config.titles_path, &audit_path])
        {
            eprintln!("Skipping {}: {:#}", path.display(), err);
            stats.corpora_skipped += 1;
            continue;
        }

        let table = match table::load_rows(&path) {
            Ok(table) => table,
            Err(err) => {
                eprintln!("Skipping {}: {:#}", path.display(), err);
                stats.corpora_skipped += 1;
                continue;
            }
        };
        println!("Found the following headers: {:?}", table.headers);

        let corpus = match Corpus::build(&path, table) {
            Ok(corpus) => corpus,
            Err(err) => {
                eprintln!("Skipping {}: {}", path.display(), err);
                stats.corpora_skipped += 1;
                continue;
            }
        };
        println!("Title field found: {}", corpus.title_field);
        println!("Indexed {} records from {}", corpus.len(), name);
        stats.rows_indexed += corpus.len();
        stats.key_collisions += corpus.collisions;

        let mut matches = matching::match_titles(&titles, &corpus);
        stats.match_attempts += titles.len();
        stats.matches_accepted += matches.len();

        stats.matches_rejected += scoring::filter_matches(&mut matches, &mut audit)?;
        audit.flush()?;

        let written = table::write_matches(&out_path, &corpus, &matches)?;
        stats.matches_written += written;
        stats.corpora_processed += 1;
        println!("Wrote {} probable matches to {}", written, out_path.display());
    }

    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    println!("\n{:=<60}", "");
    println!("Matching complete!");
    println!(
        "  Corpora: {} processed, {} skipped",
        stats.corpora_processed, stats.corpora_skipped
    );
    println!("  Records indexed: {}", stats.rows_indexed);
    println!("  Titles: {}", stats.titles_requested);
    println!("  Matches written: {}", stats.matches_written);
    println!("  Matches rejected: {}", stats.matches_rejected);
    println!("  Match rate: {:.1}%", stats.match_rate());
    println!("  Audit log: {}", audit.path().display());
    println!("  Elapsed: {}", progress::format_duration(start.elapsed()));
    println!("{:=<60}", "");

    if let Some(stats_path) = &config.stats_path {
        stats.write_to_file(stats_path)?;
        println!("Wrote run stats to {}", stats_path.display());
    }

    Ok(stats)
}

/// Corpus tables under the metadata directory: files with a `.csv` or `.tsv`
/// extension, except previous match output, in sorted order.
fn corpus_tables(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading metadata directory {}", dir.display()))?;
    let mut tables = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("reading metadata directory {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str());
        if !matches!(ext, Some("csv") | Some("tsv")) {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if stem.ends_with("_matches") {
            println!("Skipping previous match output {}", path.display());
            continue;
        }
        tables.push(path);
    }
    tables.sort();
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_tables_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zoo.csv"), "TITLE\n").unwrap();
        fs::write(dir.path().join("archive.tsv"), "TITLE\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a table\n").unwrap();
        fs::write(dir.path().join("zoo_matches.csv"), "stale output\n").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let tables = corpus_tables(dir.path()).unwrap();
        let names: Vec<_> = tables
            .iter()
            .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap())
            .collect();
        assert_eq!(names, vec!["archive.tsv", "zoo.csv"]);
    }
}
