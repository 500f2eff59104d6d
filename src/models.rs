//! Core data models for corpus matching.
//!
//! This module contains the parsed-table, record, index, and match-set types
//! shared by the matching pipeline, plus run statistics.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::normalize;

// ============================================================================
// Title Field Detection
// ============================================================================

/// Column names recognized as the title field of a corpus table.
/// Detection scans the header left to right and takes the first hit.
pub const TITLE_FIELDS: [&str; 3] = ["TITLE", "title", "display_title"];

/// A corpus table whose header carries none of the recognized title columns.
#[derive(Debug, Error)]
#[error("no recognized title column in {}", .table.display())]
pub struct MissingTitleField {
    pub table: PathBuf,
}

// ============================================================================
// Parsed Tables
// ============================================================================

/// A delimited table read into memory: the header row plus data rows, every
/// row the same width as the header.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ============================================================================
// Corpus Records
// ============================================================================

/// One metadata record: its matching key, the verbatim title from the
/// detected title field, and the full row as ordered (column, value) pairs.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: String,
    pub title: String,
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// Field values in source column order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }
}

/// All records of one source table, indexed by normalized key.
/// Built once per table, read-only afterwards.
#[derive(Debug)]
pub struct Corpus {
    pub source: PathBuf,
    pub field_names: Vec<String>,
    pub title_field: String,
    pub collisions: usize,
    records: FxHashMap<String, Record>,
    next_id: u64,
}

impl Corpus {
    /// Index a parsed table. Fails when the header carries no recognized
    /// title column; the caller skips the table and moves on.
    pub fn build(source: &Path, table: Table) -> Result<Self, MissingTitleField> {
        let Table { headers, rows } = table;
        let Some(title_idx) = Self::detect_title_field(&headers) else {
            return Err(MissingTitleField {
                table: source.to_path_buf(),
            });
        };
        let title_field = headers[title_idx].clone();

        let mut corpus = Corpus {
            source: source.to_path_buf(),
            field_names: headers,
            title_field,
            collisions: 0,
            records: FxHashMap::default(),
            next_id: 0,
        };
        for row in rows {
            let title = row[title_idx].clone();
            let key = corpus.mint_key(&title);
            let fields = corpus.field_names.iter().cloned().zip(row).collect();
            corpus.try_insert(key.clone(), Record { key, title, fields });
        }
        Ok(corpus)
    }

    /// Index of the first header column named in `TITLE_FIELDS`.
    pub fn detect_title_field(headers: &[String]) -> Option<usize> {
        headers
            .iter()
            .position(|header| TITLE_FIELDS.contains(&header.as_str()))
    }

    fn mint_key(&mut self, title: &str) -> String {
        let key = normalize::normalized_key(title, self.next_id);
        self.next_id += 1;
        key
    }

    /// Store a record unless its key is already taken. The per-row
    /// disambiguator keeps keys unique, so this branch only fires if the key
    /// scheme breaks.
    fn try_insert(&mut self, key: String, record: Record) -> bool {
        if self.records.contains_key(&key) {
            println!("Title collision detected for {}; skipping", record.title);
            self.collisions += 1;
            return false;
        }
        self.records.insert(key, record);
        true
    }

    /// Normalized keys of every indexed record.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Match Results
// ============================================================================

/// Accepted matches for one corpus: query title to matched record, iterated
/// in first-insertion order so output files are deterministic. Re-inserting a
/// query replaces the record but keeps the original position.
pub struct MatchSet<'a> {
    entries: FxHashMap<String, &'a Record>,
    order: Vec<String>,
}

impl<'a> MatchSet<'a> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn insert(&mut self, query: &str, record: &'a Record) {
        if self.entries.insert(query.to_string(), record).is_none() {
            self.order.push(query.to_string());
        }
    }

    pub fn remove(&mut self, query: &str) {
        if self.entries.remove(query).is_some() {
            self.order.retain(|q| q != query);
        }
    }

    pub fn get(&self, query: &str) -> Option<&'a Record> {
        self.entries.get(query).copied()
    }

    /// Snapshot of the query titles in insertion order. The confidence filter
    /// iterates this while removing entries.
    pub fn queries(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &'a Record)> {
        self.order.iter().filter_map(|query| {
            self.entries
                .get(query)
                .map(|record| (query.as_str(), *record))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MatchSet<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// One audit-log row for a match the confidence filter discarded.
/// Field order is the audit file's column order.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedMatch {
    pub query: String,
    pub matched: String,
    pub overlap: f64,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run counters reported in the closing summary and the optional stats
/// JSON export.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub corpora_processed: usize,
    pub corpora_skipped: usize,
    pub rows_indexed: usize,
    pub key_collisions: usize,
    pub titles_requested: usize,
    pub match_attempts: usize,
    pub matches_accepted: usize,
    pub matches_rejected: usize,
    pub matches_written: usize,
    pub elapsed_seconds: f64,
}

impl RunStats {
    /// Percentage of match attempts that survived to an output file.
    pub fn match_rate(&self) -> f64 {
        if self.match_attempts == 0 {
            0.0
        } else {
            100.0 * self.matches_written as f64 / self.match_attempts as f64
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
