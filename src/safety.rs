//! Safety utilities to prevent accidental file deletion.
//!
//! Match output lands in the same directories as corpus tables, so output
//! names are validated before anything is overwritten, and truncating the
//! audit log requires confirmation.

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// How destructive-action prompts are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Ask on stdin and wait for a Y/N answer.
    Interactive,
    /// Answer yes without prompting.
    AssumeYes,
    /// Answer no without prompting.
    AssumeNo,
}

impl ConfirmPolicy {
    /// Resolve a prompt under this policy. `Interactive` reads stdin.
    pub fn confirm(&self, question: &str) -> Result<bool> {
        match self {
            ConfirmPolicy::Interactive => confirm_from(io::stdin().lock(), question),
            ConfirmPolicy::AssumeYes => Ok(true),
            ConfirmPolicy::AssumeNo => Ok(false),
        }
    }
}

/// Prompt until the reader produces a line starting with y/Y or n/N.
fn confirm_from(mut input: impl BufRead, question: &str) -> Result<bool> {
    loop {
        print!("{} (Y/N): ", question);
        io::stdout().flush().context("flushing prompt")?;
        let mut line = String::new();
        let read = input.read_line(&mut line).context("reading answer")?;
        if read == 0 {
            bail!("no answer on stdin");
        }
        match line.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => return Ok(true),
            Some('n') => return Ok(false),
            _ => println!("Invalid Input"),
        }
    }
}

/// Validates that a match-output path is safe to overwrite.
///
/// Checks:
/// - Output filename must contain "_matches"
/// - Output cannot be the same as any of the provided source paths
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains("_matches") {
        bail!(
            "Safety check failed: output file '{}' must contain '_matches' in the name",
            output.display()
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
