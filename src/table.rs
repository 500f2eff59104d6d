//! Delimited-file I/O: corpus tables, the title list, match output, and the
//! audit log.
//!
//! Corpus tables may be comma- or tab-delimited; the dialect is detected from
//! a leading sample of the file. All output is written fully quoted.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::models::{Corpus, MatchSet, RejectedMatch, Table};

/// Default audit-log path for rejected matches.
pub const DEFAULT_AUDIT_LOG: &str = "bad_matches.csv";

/// Bytes sampled from the head of a table when detecting its delimiter.
const SNIFF_WINDOW: usize = 12_000;

// ============================================================================
// Delimiter Detection
// ============================================================================

/// Detect whether a sample is tab- or comma-delimited.
///
/// Counts unquoted occurrences of each candidate per line; a candidate that
/// appears a consistent nonzero number of times on every line wins, tab
/// checked first. Otherwise the higher total count wins, tab on a tie.
/// Returns `None` when the sample contains neither character.
pub fn detect_delimiter(sample: &[u8]) -> Option<u8> {
    let lines: Vec<&[u8]> = sample
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect();

    let tab_counts: Vec<usize> = lines.iter().map(|l| unquoted_count(l, b'\t')).collect();
    let comma_counts: Vec<usize> = lines.iter().map(|l| unquoted_count(l, b',')).collect();

    if consistent(&tab_counts) {
        return Some(b'\t');
    }
    if consistent(&comma_counts) {
        return Some(b',');
    }

    let tab_total: usize = tab_counts.iter().sum();
    let comma_total: usize = comma_counts.iter().sum();
    if tab_total == 0 && comma_total == 0 {
        None
    } else if tab_total >= comma_total {
        Some(b'\t')
    } else {
        Some(b',')
    }
}

/// Every line shows the same nonzero count.
fn consistent(counts: &[usize]) -> bool {
    match counts.first() {
        Some(&first) if first > 0 => counts.iter().all(|&count| count == first),
        _ => false,
    }
}

/// Occurrences of the candidate outside double-quoted spans.
fn unquoted_count(line: &[u8], delimiter: u8) -> usize {
    let mut count = 0;
    let mut in_quotes = false;
    for &byte in line {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// First `SNIFF_WINDOW` bytes of the table, cut back to the last complete
/// line when the window splits a row.
fn sniff_sample(raw: &[u8]) -> &[u8] {
    if raw.len() <= SNIFF_WINDOW {
        return raw;
    }
    let window = &raw[..SNIFF_WINDOW];
    match window.iter().rposition(|&b| b == b'\n') {
        Some(pos) => &window[..pos],
        None => window,
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Read a corpus table, detecting its delimiter from the leading sample.
/// Rows must match the header width; ragged or non-UTF-8 rows fail the whole
/// table.
pub fn load_rows(path: &Path) -> Result<Table> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let delimiter = detect_delimiter(sniff_sample(&raw)).ok_or_else(|| {
        anyhow!(
            "{}: could not detect a comma or tab delimiter",
            path.display()
        )
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(raw.as_slice());
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading rows of {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table { headers, rows })
}

/// Read the title list: one designated column of a comma-delimited table,
/// with hyphens replaced by spaces. An out-of-range column index fails the
/// run.
pub fn read_titles(path: &Path, column: usize, has_header: bool) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .from_path(path)
        .with_context(|| format!("opening titles table {}", path.display()))?;
    let mut titles = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading titles from {}", path.display()))?;
        let title = record.get(column).ok_or_else(|| {
            anyhow!(
                "{}: row {} has no column {}",
                path.display(),
                row + 1,
                column
            )
        })?;
        titles.push(title.replace('-', " "));
    }
    Ok(titles)
}

// ============================================================================
// Writing
// ============================================================================

/// Write surviving matches for one corpus: the query title followed by the
/// record's original field values, every field quoted. Returns rows written.
pub fn write_matches(path: &Path, corpus: &Corpus, matches: &MatchSet) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(file);

    let mut header: Vec<&str> = Vec::with_capacity(1 + corpus.field_names.len());
    header.push("match_title");
    header.extend(corpus.field_names.iter().map(String::as_str));
    writer.write_record(&header)?;

    let mut written = 0;
    for (query, record) in matches.iter() {
        let mut row: Vec<&str> = Vec::with_capacity(1 + record.fields.len());
        row.push(query);
        row.extend(record.values());
        writer.write_record(&row)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

// ============================================================================
// Audit Log
// ============================================================================

/// Writer for the cross-run audit log of rejected matches. Created once per
/// run, truncating any previous log, and flushed after each corpus so rows
/// from completed tables survive an interrupted run.
pub struct AuditLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl AuditLog {
    pub fn create(path: &Path) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("creating audit log {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .has_headers(false)
            .from_writer(file);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn append(&mut self, entry: &RejectedMatch) -> Result<()> {
        self.writer
            .serialize(entry)
            .with_context(|| format!("appending to audit log {}", self.path.display()))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("flushing audit log {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_comma() {
        assert_eq!(detect_delimiter(b"a,b,c\n1,2,3\n"), Some(b','));
    }

    #[test]
    fn test_detect_tab() {
        assert_eq!(detect_delimiter(b"a\tb\tc\n1\t2\t3\n"), Some(b'\t'));
    }

    #[test]
    fn test_detect_ignores_quoted_delimiters() {
        // Commas inside quoted fields do not break the tab vote
        let sample = b"id\ttitle\n1\t\"Moby, or the Whale\"\n2\t\"No comma\"\n";
        assert_eq!(detect_delimiter(sample), Some(b'\t'));
    }

    #[test]
    fn test_detect_inconsistent_falls_back_to_totals() {
        let sample = b"a,b,c\nx,y\n";
        assert_eq!(detect_delimiter(sample), Some(b','));
    }

    #[test]
    fn test_detect_neither() {
        assert_eq!(
            detect_delimiter(b"plain text lines\nwithout delimiters\n"),
            None
        );
        assert_eq!(detect_delimiter(b""), None);
    }

    #[test]
    fn test_load_rows_csv_and_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("library.csv");
        fs::write(&csv_path, "TITLE,author\nMoby Dick,Herman Melville\n").unwrap();
        let table = load_rows(&csv_path).unwrap();
        assert_eq!(table.headers, vec!["TITLE", "author"]);
        assert_eq!(table.rows, vec![vec!["Moby Dick", "Herman Melville"]]);

        let tsv_path = dir.path().join("archive.tsv");
        fs::write(&tsv_path, "id\tdisplay_title\n9\tsea wolf\n").unwrap();
        let table = load_rows(&tsv_path).unwrap();
        assert_eq!(table.headers, vec!["id", "display_title"]);
        assert_eq!(table.rows, vec![vec!["9", "sea wolf"]]);
    }

    #[test]
    fn test_load_rows_ragged_row_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "TITLE,author\nonly one field\n").unwrap();
        assert!(load_rows(&path).is_err());
    }

    #[test]
    fn test_read_titles_column_and_hyphens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.csv");
        fs::write(&path, "idx,work\n0,moby-dick\n1,the great gatsby\n").unwrap();
        let titles = read_titles(&path, 1, true).unwrap();
        assert_eq!(titles, vec!["moby dick", "the great gatsby"]);
    }

    #[test]
    fn test_read_titles_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titles.csv");
        fs::write(&path, "moby dick\n").unwrap();
        assert!(read_titles(&path, 3, false).is_err());
    }

    #[test]
    fn test_write_matches_quotes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table {
            headers: vec!["TITLE".to_string(), "year".to_string()],
            rows: vec![vec!["Moby Dick".to_string(), "1851".to_string()]],
        };
        let corpus = Corpus::build(Path::new("library.csv"), table).unwrap();
        let mut matches = MatchSet::new();
        matches.insert("moby dick", corpus.get("moby_dick_0").unwrap());

        let out = dir.path().join("library_matches.csv");
        let written = write_matches(&out, &corpus, &matches).unwrap();
        assert_eq!(written, 1);
        let contents = fs::read_to_string(&out).unwrap();
        assert_eq!(
            contents,
            "\"match_title\",\"TITLE\",\"year\"\n\"moby dick\",\"Moby Dick\",\"1851\"\n"
        );
    }

    #[test]
    fn test_audit_log_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_matches.csv");
        fs::write(&path, "stale contents\n").unwrap();
        let mut audit = AuditLog::create(&path).unwrap();
        audit.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
