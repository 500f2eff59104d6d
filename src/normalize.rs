//! Title normalization and matching-key generation.
//!
//! Keys minted here identify corpus records, and the same cleaning rules feed
//! the candidate narrower. Changes affect both indexing and matching.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

// ============================================================================
// Fixed Tables
// ============================================================================

/// Words dropped from titles before key generation and matching.
pub static STOP_WORDS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| ["the", "of", "a", "an", "in", "on", "and"].into_iter().collect());

/// Punctuation stripped from both ends of each title word.
const WORD_EDGE_TRIM: &[char] = &[',', '.', ':', ';', '\'', '"'];

// ============================================================================
// Word Cleaning
// ============================================================================

/// Lowercase a word and strip edge punctuation.
/// Interior punctuation survives: "don't." becomes "don't".
pub fn clean_word(word: &str) -> String {
    word.to_lowercase().trim_matches(WORD_EDGE_TRIM).to_string()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Cleaned, stop-word-free words of a title, used as matching tokens.
/// Words that clean down to nothing are dropped here (they can never equal a
/// key segment) but are retained by `normalized_key`.
pub fn significant_words(title: &str) -> Vec<String> {
    title
        .split_whitespace()
        .map(clean_word)
        .filter(|word| !word.is_empty() && !is_stop_word(word))
        .collect()
}

// ============================================================================
// Key Generation
// ============================================================================

/// Mint the matching key for a title: cleaned words minus stop words, joined
/// with underscores, with the caller's disambiguator appended as the final
/// segment. A title of nothing but stop words yields just `_<id>`.
pub fn normalized_key(title: &str, id: u64) -> String {
    let words: Vec<String> = title
        .split_whitespace()
        .map(clean_word)
        .filter(|word| !is_stop_word(word))
        .collect();
    format!("{}_{}", words.join("_"), id)
}

/// The word portion of a key, with the disambiguator segment stripped.
/// The counter is an identity artifact and must never match a query word,
/// numeric titles included.
pub fn key_words(key: &str) -> &str {
    key.rsplit_once('_').map_or("", |(words, _)| words)
}

// ============================================================================
// TESTS
// ============================================================================
