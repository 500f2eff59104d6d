//! Candidate narrowing: progressive longest-word elimination.
//!
//! Each round filters the surviving keys by one significant word, longest
//! first, until a single candidate remains or the words run out. Ambiguity is
//! never resolved by guessing; an unresolved tie yields no match.

use crate::models::{Corpus, MatchSet, Record};
use crate::normalize;
use crate::progress;

/// Match every title against the corpus. Accepted matches are keyed by the
/// original title text, in title-list order.
pub fn match_titles<'a>(titles: &[String], corpus: &'a Corpus) -> MatchSet<'a> {
    let name = corpus
        .source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("corpus");
    let pb = progress::create_progress_bar(titles.len() as u64, &format!("Matching {}", name));
    let mut matches = MatchSet::new();
    for (done, title) in titles.iter().enumerate() {
        if let Some(record) = find_match(title, corpus) {
            matches.insert(title, record);
        }
        pb.inc(1);
        progress::log_progress("matching", (done + 1) as u64, titles.len() as u64, 100);
    }
    pb.finish_with_message(format!(
        "Matched {} of {} titles in {}",
        matches.len(),
        titles.len(),
        name
    ));
    matches
}

/// Narrow the corpus to the single record consistent with the title's
/// significant words, or nothing.
pub fn find_match<'a>(title: &str, corpus: &'a Corpus) -> Option<&'a Record> {
    let mut words = normalize::significant_words(title);
    if words.is_empty() {
        return None;
    }
    let mut candidates: Vec<&str> = corpus.keys().collect();
    loop {
        let word = words.remove(longest_word_index(&words));
        candidates.retain(|key| key_has_word(key, &word));
        if candidates.len() == 1 {
            return corpus.get(candidates[0]);
        }
        if candidates.is_empty() || words.is_empty() {
            return None;
        }
    }
}

/// Index of the leftmost longest word, length measured in characters.
fn longest_word_index(words: &[String]) -> usize {
    let mut best = 0;
    let mut best_len = 0;
    for (idx, word) in words.iter().enumerate() {
        let len = word.chars().count();
        if len > best_len {
            best = idx;
            best_len = len;
        }
    }
    best
}

/// Whether one of the key's word segments equals the query word. The
/// disambiguator segment is excluded from the comparison.
fn key_has_word(key: &str, word: &str) -> bool {
    normalize::key_words(key)
        .split('_')
        .any(|segment| segment == word)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;
    use std::path::Path;

    fn corpus_of(titles: &[&str]) -> Corpus {
        let table = Table {
            headers: vec!["TITLE".to_string()],
            rows: titles.iter().map(|t| vec![t.to_string()]).collect(),
        };
        Corpus::build(Path::new("library.csv"), table).unwrap()
    }

    #[test]
    fn test_exact_single_candidate() {
        let corpus = corpus_of(&["Moby Dick"]);
        let record = find_match("Moby Dick", &corpus).unwrap();
        assert_eq!(record.key, "moby_dick_0");
        assert_eq!(record.title, "Moby Dick");
    }

    #[test]
    fn test_ambiguity_yields_no_match() {
        // "red" survives in both keys and no further words can split them
        let corpus = corpus_of(&["Red Badge of Courage", "Red Badge"]);
        assert!(find_match("Red", &corpus).is_none());
    }

    #[test]
    fn test_second_round_narrowing() {
        let corpus = corpus_of(&["Alpha Beta", "Alpha Gamma"]);
        let record = find_match("Alpha Gamma", &corpus).unwrap();
        assert_eq!(record.key, "alpha_gamma_1");
    }

    #[test]
    fn test_exhausted_words_stay_ambiguous() {
        let corpus = corpus_of(&["Alpha Beta Gamma", "Alpha Beta Delta"]);
        assert!(find_match("Alpha Beta", &corpus).is_none());
    }

    #[test]
    fn test_no_significant_words() {
        let corpus = corpus_of(&["Moby Dick"]);
        assert!(find_match("The Of", &corpus).is_none());
        assert!(find_match("", &corpus).is_none());
    }

    #[test]
    fn test_stop_words_dropped_from_query() {
        let corpus = corpus_of(&["Great Gatsby"]);
        let record = find_match("The Great Gatsby", &corpus).unwrap();
        assert_eq!(record.key, "great_gatsby_0");
    }

    #[test]
    fn test_unmatched_word_yields_none() {
        let corpus = corpus_of(&["Moby Dick"]);
        assert!(find_match("Treasure Island", &corpus).is_none());
    }

    #[test]
    fn test_disambiguator_never_matches() {
        let corpus = corpus_of(&["1984"]);
        // The counter segment of "1984_0" is not matchable text
        assert!(find_match("0", &corpus).is_none());
        assert!(find_match("1984", &corpus).is_some());
    }

    #[test]
    fn test_longest_word_leftmost_on_ties() {
        let words = vec!["alpha".to_string(), "gamma".to_string()];
        assert_eq!(longest_word_index(&words), 0);
        let words = vec!["ab".to_string(), "cdef".to_string(), "ghij".to_string()];
        assert_eq!(longest_word_index(&words), 1);
    }

    #[test]
    fn test_word_length_counts_characters() {
        // "cafés" is six bytes but five characters; byte length would tie
        let words = vec!["cafés".to_string(), "coffee".to_string()];
        assert_eq!(longest_word_index(&words), 1);
    }

    #[test]
    fn test_match_titles_keeps_query_order() {
        let corpus = corpus_of(&["Moby Dick", "Great Gatsby"]);
        let titles = vec![
            "great gatsby".to_string(),
            "moby dick".to_string(),
            "unknown work".to_string(),
        ];
        let matches = match_titles(&titles, &corpus);
        assert_eq!(matches.len(), 2);
        let queries: Vec<_> = matches.iter().map(|(query, _)| query.to_string()).collect();
        assert_eq!(queries, vec!["great gatsby", "moby dick"]);
    }
}
