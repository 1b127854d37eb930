//! ISO-4 journal title abbreviation from the ISSN List of Title Word
//! Abbreviations (LTWA).
//!
//! The LTWA export is parsed into immutable [`TermTables`] (cached as JSON),
//! and a [`JournalAbbreviator`] built over them turns full journal titles into
//! their ISO-4 abbreviations:
//!
//! ```text
//! "Open Journal of Stomatology"  ->  "Open J. Stomatol."
//! ```

mod abbreviator;
mod builder;
mod format;
pub mod lemma;
mod normalize;
mod resolver;
pub mod source;
mod stopwords;
pub mod terms;
mod tokenizer;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use abbreviator::{ENGLISH, JournalAbbreviator};
pub use builder::{CACHE_FILE_NAME, DEFAULT_LTWA_URL, SOURCE_FILE_NAME};
pub use format::Capitalization;
pub use lemma::{EnglishLemmatizer, Lemmatizer};
pub use normalize::{normalize_abbreviation, normalize_word};
pub use terms::{Abbreviation, ByKind, TermKind, TermTables};

#[derive(Error, Debug)]
pub enum LtwaError {
    #[error("download error: {0}")]
    Download(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("cache format error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid multi-word term pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("no LTWA cache at {}", path.display())]
    MissingCache { path: PathBuf },
}

/// A title word whose abbreviation depends on the language and that the
/// active language set does not pin down to exactly one variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("language mapping conflict for {kind} term {term:?} (languages: {})", languages.join(", "))]
pub struct ConflictError {
    pub kind: TermKind,
    pub term: String,
    /// Every language the conflicted term has a variant for.
    pub languages: Vec<String>,
}

/// Progress events emitted while building the cache.
#[derive(Debug, Clone)]
pub enum BuildProgress {
    Downloading {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
    Parsing {
        rows: u64,
    },
    Complete {
        terms: u64,
        conflicts: u64,
        multi_word_terms: u64,
    },
}

/// Download the LTWA export from `url` and (re)build the cache in `cache_dir`.
pub async fn build_cache(
    cache_dir: &Path,
    url: &str,
    progress: impl FnMut(BuildProgress),
) -> Result<TermTables, LtwaError> {
    builder::build(cache_dir, url, progress).await
}

/// Build the cache in `cache_dir` from a local LTWA export.
pub fn build_cache_from_file(
    cache_dir: &Path,
    source_path: &Path,
    progress: impl FnMut(BuildProgress),
) -> Result<TermTables, LtwaError> {
    builder::build_from_file(cache_dir, source_path, progress)
}

/// Load the cached tables from `cache_dir`, or `None` if there is no cache.
pub fn load_cache(cache_dir: &Path) -> Result<Option<TermTables>, LtwaError> {
    builder::load(cache_dir)
}

/// Write `tables` as the cache in `cache_dir`.
pub fn save_cache(cache_dir: &Path, tables: &TermTables) -> Result<(), LtwaError> {
    builder::save(cache_dir, tables)
}

/// Location of the JSON cache inside `cache_dir`.
pub fn cache_path(cache_dir: &Path) -> PathBuf {
    builder::cache_path(cache_dir)
}
