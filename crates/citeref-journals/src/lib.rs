//! Offline ISSN lookup of journal titles and abbreviations.
//!
//! Builds a SQLite index from the NLM Medline journal list (`J_Medline.txt`)
//! and the CrossRef title list (`titleFile.csv`), keyed by canonical ISSN,
//! and answers the four journal lookups by print or electronic ISSN.

mod builder;
pub mod crossref;
mod db;
mod issn;
pub mod medline;

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builder::{DEFAULT_CROSSREF_URL, DEFAULT_MEDLINE_URL};
pub use issn::normalize_issn;

/// Both sources must index more ISSNs than this for the database to count
/// as fully built.
pub const MIN_POPULATED_ISSNS: u64 = 1000;

#[derive(Error, Debug)]
pub enum JournalsError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("download error: {0}")]
    Download(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a journal record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalSource {
    Medline,
    CrossRef,
}

impl JournalSource {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalSource::Medline => "medline",
            JournalSource::CrossRef => "crossref",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            JournalSource::Medline => "J_Medline.txt",
            JournalSource::CrossRef => "titleFile.csv",
        }
    }

    fn metadata_key(self, key: &str) -> String {
        format!("{}_{}", self.as_str(), key)
    }
}

impl fmt::Display for JournalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A journal from the NLM Medline list. ISSNs are kept as published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedlineJournal {
    pub title: String,
    pub medline_abbreviation: Option<String>,
    pub iso_abbreviation: Option<String>,
    pub issn_print: Option<String>,
    pub issn_online: Option<String>,
    pub nlm_id: Option<String>,
}

/// A journal from the CrossRef title list. ISSNs are kept as published
/// (CrossRef strips hyphens and leading zeros).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRefJournal {
    pub title: String,
    pub issn_print: Option<String>,
    pub issn_online: Option<String>,
    pub doi: Option<String>,
}

/// Database build/download statistics.
#[derive(Debug, Clone)]
pub struct DatabaseInfo {
    pub build_date: Option<String>,
    pub schema_version: Option<String>,
    pub medline_count: Option<String>,
    pub crossref_count: Option<String>,
}

/// Progress events emitted during database building.
#[derive(Debug, Clone)]
pub enum BuildProgress {
    Downloading {
        source: JournalSource,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
    Parsing {
        source: JournalSource,
        records_parsed: u64,
        issns_inserted: u64,
    },
    Complete {
        medline_issns: u64,
        crossref_issns: u64,
        skipped: bool,
    },
}

/// Result of a staleness check.
#[derive(Debug, Clone)]
pub struct StalenessCheck {
    pub is_stale: bool,
    pub age_days: Option<u64>,
    pub build_date: Option<String>,
}

/// Handle to an opened journal database.
///
/// Every lookup accepts an ISSN in any common spelling (`0028-0836`,
/// `00280836`, `280836`) and returns `Ok(None)` for an unknown or
/// malformed ISSN.
pub struct JournalDatabase {
    conn: Connection,
    path: PathBuf,
}

impl JournalDatabase {
    /// Open an existing journal database.
    ///
    /// Verifies that the schema tables exist.
    pub fn open(path: &Path) -> Result<Self, JournalsError> {
        let conn = Connection::open(path)?;

        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='journals'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Err(JournalsError::Database(rusqlite::Error::QueryReturnedNoRows));
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn medline_record(&self, issn: &str) -> Result<Option<MedlineJournal>, JournalsError> {
        match normalize_issn(issn) {
            Some(issn) => db::get_medline(&self.conn, &issn),
            None => Ok(None),
        }
    }

    pub fn crossref_record(&self, issn: &str) -> Result<Option<CrossRefJournal>, JournalsError> {
        match normalize_issn(issn) {
            Some(issn) => db::get_crossref(&self.conn, &issn),
            None => Ok(None),
        }
    }

    /// ISO-4 abbreviation from the Medline list (`IsoAbbr`).
    pub fn medline_iso_abbreviation(&self, issn: &str) -> Result<Option<String>, JournalsError> {
        Ok(self.medline_record(issn)?.and_then(|j| j.iso_abbreviation))
    }

    /// NLM title abbreviation (`MedAbbr`).
    pub fn medline_abbreviation(&self, issn: &str) -> Result<Option<String>, JournalsError> {
        Ok(self.medline_record(issn)?.and_then(|j| j.medline_abbreviation))
    }

    pub fn medline_title(&self, issn: &str) -> Result<Option<String>, JournalsError> {
        Ok(self.medline_record(issn)?.map(|j| j.title))
    }

    pub fn crossref_title(&self, issn: &str) -> Result<Option<String>, JournalsError> {
        Ok(self.crossref_record(issn)?.map(|j| j.title))
    }

    /// Number of ISSNs indexed per source: `(medline, crossref)`.
    pub fn counts(&self) -> Result<(u64, u64), JournalsError> {
        let (medline, crossref) = db::get_counts(&self.conn)?;
        Ok((medline as u64, crossref as u64))
    }

    /// Whether both sources look like complete downloads rather than a
    /// truncated or failed one.
    pub fn is_populated(&self) -> Result<bool, JournalsError> {
        let (medline, crossref) = self.counts()?;
        tracing::debug!(medline, crossref, "journal database sizes");
        Ok(medline > MIN_POPULATED_ISSNS && crossref > MIN_POPULATED_ISSNS)
    }

    /// Get database metadata/info.
    pub fn info(&self) -> Result<DatabaseInfo, JournalsError> {
        Ok(DatabaseInfo {
            build_date: db::get_metadata(&self.conn, "last_updated")?,
            schema_version: db::get_metadata(&self.conn, "schema_version")?,
            medline_count: db::get_metadata(&self.conn, "medline_count")?,
            crossref_count: db::get_metadata(&self.conn, "crossref_count")?,
        })
    }

    /// Check if the database is stale (older than `threshold_days`).
    pub fn check_staleness(&self, threshold_days: u64) -> Result<StalenessCheck, JournalsError> {
        let build_date = db::get_metadata(&self.conn, "last_updated")?;

        let age_days = build_date.as_ref().and_then(|ts| {
            let build_secs: u64 = ts.parse().ok()?;
            let now_secs = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .ok()?
                .as_secs();
            Some((now_secs.saturating_sub(build_secs)) / 86400)
        });

        let is_stale = age_days.is_none_or(|days| days >= threshold_days);

        Ok(StalenessCheck {
            is_stale,
            age_days,
            build_date,
        })
    }

    /// Convenience: check staleness with the default 30-day threshold.
    pub fn is_stale(&self) -> Result<bool, JournalsError> {
        Ok(self.check_staleness(30)?.is_stale)
    }

    /// Get the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Download both journal lists and build (or update) the database.
///
/// Uses ETag/Last-Modified per source. Returns `false` if neither list
/// changed since the last build (no work done).
pub async fn build_database(
    db_path: &Path,
    medline_url: &str,
    crossref_url: &str,
    progress: impl FnMut(BuildProgress),
) -> Result<bool, JournalsError> {
    builder::build(db_path, medline_url, crossref_url, progress).await
}

/// Build the database from local copies of `J_Medline.txt` and `titleFile.csv`.
pub fn build_database_from_files(
    db_path: &Path,
    medline_path: &Path,
    crossref_path: &Path,
    progress: impl FnMut(BuildProgress),
) -> Result<(), JournalsError> {
    builder::build_from_files(db_path, medline_path, crossref_path, progress)
}
