//! Corpus title matching library - shared modules for the corpus-matcher binary.

pub mod matching;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod run;
pub mod safety;
pub mod scoring;
pub mod table;
