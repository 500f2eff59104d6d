//! Post-hoc confidence scoring for accepted matches.
//!
//! The overlap ratio counts how many words of the matched record's true title
//! appear inside the raw query string. The containment test is a literal
//! substring check, not word-set membership: short words earn credit from
//! inside longer ones, and the check is case-sensitive against the query as
//! typed. Matches at or below the threshold are removed and logged.

use anyhow::Result;

use crate::models::{MatchSet, RejectedMatch};
use crate::table::AuditLog;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Matches with overlap at or below this ratio are rejected.
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Punctuation stripped from record-title words before the containment test.
/// Differs from the key-generation set: question mark in, quotes out.
const FILTER_EDGE_TRIM: &[char] = &[',', '.', ':', ';', '?'];

// ============================================================================
// Overlap Scoring
// ============================================================================

/// Fraction of the record title's words contained in the raw query string,
/// over the query's word count. A record word that trims to nothing is always
/// counted, since the empty string is a substring of everything.
pub fn overlap_ratio(query: &str, record_title: &str) -> f64 {
    let query_words = query.split_whitespace().count();
    if query_words == 0 {
        return 0.0;
    }
    let matched = record_title
        .split_whitespace()
        .filter(|word| {
            let cleaned = word.trim_matches(FILTER_EDGE_TRIM).to_lowercase();
            query.contains(cleaned.as_str())
        })
        .count();
    matched as f64 / query_words as f64
}

// ============================================================================
// Confidence Filter
// ============================================================================

/// Drop low-confidence matches from the set, reporting each removal and
/// appending it to the audit log. Returns the number removed.
pub fn filter_matches(matches: &mut MatchSet, audit: &mut AuditLog) -> Result<usize> {
    let mut removed = 0;
    for query in matches.queries() {
        let Some(record) = matches.get(&query) else {
            continue;
        };
        let overlap = overlap_ratio(&query, &record.title);
        if overlap <= MATCH_THRESHOLD {
            println!(
                "Removing unlikely match {} -> {} (percent match: {})",
                query, record.title, overlap
            );
            audit.append(&RejectedMatch {
                query: query.clone(),
                matched: record.title.clone(),
                overlap,
            })?;
            matches.remove(&query);
            removed += 1;
        }
    }
    Ok(removed)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Corpus, Table};
    use std::path::Path;

    fn corpus_of(titles: &[&str]) -> Corpus {
        let table = Table {
            headers: vec!["TITLE".to_string()],
            rows: titles.iter().map(|t| vec![t.to_string()]).collect(),
        };
        Corpus::build(Path::new("library.csv"), table).unwrap()
    }

    #[test]
    fn test_overlap_case_sensitive_substring() {
        // Record words are lowercased but the query is checked as typed
        assert_eq!(overlap_ratio("Gatsby", "The Great Gatsby"), 0.0);
        assert_eq!(overlap_ratio("the great gatsby", "The Great Gatsby"), 1.0);
    }

    #[test]
    fn test_overlap_substring_credit_inside_longer_words() {
        // "red" sits inside "hundred"
        assert_eq!(overlap_ratio("hundred years", "Red Tide"), 0.5);
    }

    #[test]
    fn test_overlap_empty_trimmed_word_counts() {
        // "..." trims to nothing and then matches anywhere, so the ratio can
        // exceed one
        assert_eq!(overlap_ratio("moby dick", "moby dick ..."), 1.5);
    }

    #[test]
    fn test_overlap_empty_query() {
        assert_eq!(overlap_ratio("", "Moby Dick"), 0.0);
    }

    #[test]
    fn test_filter_removes_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("bad_matches.csv");
        let mut audit = AuditLog::create(&log_path).unwrap();

        let corpus = corpus_of(&["The Great Gatsby", "Moby Dick"]);
        let gatsby = corpus.get("great_gatsby_0").unwrap();
        let moby = corpus.get("moby_dick_1").unwrap();

        let mut matches = MatchSet::new();
        matches.insert("Gatsby", gatsby);
        matches.insert("moby dick", moby);

        let removed = filter_matches(&mut matches, &mut audit).unwrap();
        audit.flush().unwrap();

        assert_eq!(removed, 1);
        assert_eq!(matches.len(), 1);
        assert!(matches.get("Gatsby").is_none());
        assert!(matches.get("moby dick").is_some());

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log, "\"Gatsby\",\"The Great Gatsby\",\"0.0\"\n");
    }

    #[test]
    fn test_filter_rejects_exactly_half() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("bad_matches.csv");
        let mut audit = AuditLog::create(&log_path).unwrap();

        let corpus = corpus_of(&["dick whales"]);
        let record = corpus.get("dick_whales_0").unwrap();
        let mut matches = MatchSet::new();
        matches.insert("moby dick", record);

        let removed = filter_matches(&mut matches, &mut audit).unwrap();
        audit.flush().unwrap();

        assert_eq!(removed, 1);
        assert!(matches.is_empty());
        let log = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(log, "\"moby dick\",\"dick whales\",\"0.5\"\n");
    }
}
