//! SQLite storage for the journal lists.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::issn::normalize_issn;
use crate::{CrossRefJournal, JournalSource, JournalsError, MedlineJournal};

/// Initialize the database with the required schema.
pub fn init_database(conn: &Connection) -> Result<(), JournalsError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS journals (
            source TEXT NOT NULL,
            issn TEXT NOT NULL,
            title TEXT NOT NULL,
            medline_abbreviation TEXT,
            iso_abbreviation TEXT,
            issn_print TEXT,
            issn_online TEXT,
            nlm_id TEXT,
            doi TEXT,
            PRIMARY KEY (source, issn)
        );

        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT
        );
        "#,
    )?;

    Ok(())
}

/// Journals waiting to be written, one entry per record (not per ISSN).
#[derive(Default)]
pub struct InsertBatch {
    pub medline: Vec<MedlineJournal>,
    pub crossref: Vec<CrossRefJournal>,
}

impl InsertBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.medline.is_empty() && self.crossref.is_empty()
    }

    pub fn len(&self) -> usize {
        self.medline.len() + self.crossref.len()
    }

    pub fn clear(&mut self) {
        self.medline.clear();
        self.crossref.clear();
    }
}

/// Insert a batch, keyed by every valid ISSN of each record. A later record
/// with the same ISSN replaces an earlier one. Returns the number of rows
/// written.
///
/// Runs on whatever transaction is open on `conn`; a reload wraps the clear
/// and every batch of one source in a single transaction.
pub fn insert_batch(conn: &Connection, batch: &InsertBatch) -> Result<usize, JournalsError> {
    let mut written = 0;

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO journals \
             (source, issn, title, medline_abbreviation, iso_abbreviation, issn_print, issn_online, nlm_id, doi) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL) \
             ON CONFLICT(source, issn) DO UPDATE SET \
             title = excluded.title, \
             medline_abbreviation = excluded.medline_abbreviation, \
             iso_abbreviation = excluded.iso_abbreviation, \
             issn_print = excluded.issn_print, \
             issn_online = excluded.issn_online, \
             nlm_id = excluded.nlm_id",
        )?;
        for journal in &batch.medline {
            for issn in issn_keys(&journal.issn_print, &journal.issn_online) {
                stmt.execute(params![
                    JournalSource::Medline.as_str(),
                    issn,
                    journal.title,
                    journal.medline_abbreviation,
                    journal.iso_abbreviation,
                    journal.issn_print,
                    journal.issn_online,
                    journal.nlm_id,
                ])?;
                written += 1;
            }
        }
    }

    {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO journals (source, issn, title, issn_print, issn_online, doi) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(source, issn) DO UPDATE SET \
             title = excluded.title, \
             issn_print = excluded.issn_print, \
             issn_online = excluded.issn_online, \
             doi = excluded.doi",
        )?;
        for journal in &batch.crossref {
            for issn in issn_keys(&journal.issn_print, &journal.issn_online) {
                stmt.execute(params![
                    JournalSource::CrossRef.as_str(),
                    issn,
                    journal.title,
                    journal.issn_print,
                    journal.issn_online,
                    journal.doi,
                ])?;
                written += 1;
            }
        }
    }

    Ok(written)
}

/// Canonical, de-duplicated ISSNs of a record. Unparseable values are
/// logged and left out.
fn issn_keys(print: &Option<String>, online: &Option<String>) -> Vec<String> {
    let mut keys = Vec::with_capacity(2);
    for raw in [print, online].into_iter().flatten() {
        match normalize_issn(raw) {
            Some(issn) if !keys.contains(&issn) => keys.push(issn),
            Some(_) => {}
            None => tracing::debug!(issn = raw.as_str(), "ignoring malformed ISSN"),
        }
    }
    keys
}

/// Remove every journal of `source`, ahead of a reload.
pub fn clear_source(conn: &Connection, source: JournalSource) -> Result<usize, JournalsError> {
    Ok(conn.execute(
        "DELETE FROM journals WHERE source = ?1",
        params![source.as_str()],
    )?)
}

pub fn get_medline(conn: &Connection, issn: &str) -> Result<Option<MedlineJournal>, JournalsError> {
    let mut stmt = conn.prepare_cached(
        "SELECT title, medline_abbreviation, iso_abbreviation, issn_print, issn_online, nlm_id \
         FROM journals WHERE source = ?1 AND issn = ?2",
    )?;
    let journal = stmt
        .query_row(params![JournalSource::Medline.as_str(), issn], medline_from_row)
        .optional()?;
    Ok(journal)
}

pub fn get_crossref(conn: &Connection, issn: &str) -> Result<Option<CrossRefJournal>, JournalsError> {
    let mut stmt = conn.prepare_cached(
        "SELECT title, issn_print, issn_online, doi \
         FROM journals WHERE source = ?1 AND issn = ?2",
    )?;
    let journal = stmt
        .query_row(params![JournalSource::CrossRef.as_str(), issn], crossref_from_row)
        .optional()?;
    Ok(journal)
}

fn medline_from_row(row: &Row<'_>) -> rusqlite::Result<MedlineJournal> {
    Ok(MedlineJournal {
        title: row.get(0)?,
        medline_abbreviation: row.get(1)?,
        iso_abbreviation: row.get(2)?,
        issn_print: row.get(3)?,
        issn_online: row.get(4)?,
        nlm_id: row.get(5)?,
    })
}

fn crossref_from_row(row: &Row<'_>) -> rusqlite::Result<CrossRefJournal> {
    Ok(CrossRefJournal {
        title: row.get(0)?,
        issn_print: row.get(1)?,
        issn_online: row.get(2)?,
        doi: row.get(3)?,
    })
}

/// Get a metadata value by key.
pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>, JournalsError> {
    let mut stmt = conn.prepare_cached("SELECT value FROM metadata WHERE key = ?1")?;
    let value = stmt
        .query_row(params![key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

/// Set a metadata value (upsert).
pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<(), JournalsError> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Number of ISSNs indexed for each source: `(medline, crossref)`.
pub fn get_counts(conn: &Connection) -> Result<(i64, i64), JournalsError> {
    let count = |source: JournalSource| -> Result<i64, JournalsError> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM journals WHERE source = ?1",
            params![source.as_str()],
            |row| row.get(0),
        )?)
    };
    Ok((count(JournalSource::Medline)?, count(JournalSource::CrossRef)?))
}
