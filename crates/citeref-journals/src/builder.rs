//! Download and build pipeline for the offline journal database.
//!
//! Fetches the NLM Medline journal list and the CrossRef title list, parses
//! them and loads every ISSN into SQLite. Each source is downloaded with a
//! conditional request and only reloaded when it changed upstream.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use rusqlite::Connection;

use crate::crossref::parse_crossref;
use crate::db::{self, InsertBatch};
use crate::medline::parse_medline;
use crate::{BuildProgress, JournalSource, JournalsError};

/// Default NLM journal list URL.
pub const DEFAULT_MEDLINE_URL: &str = "https://ftp.ncbi.nlm.nih.gov/pubmed/J_Medline.txt";

/// Default CrossRef title list URL.
pub const DEFAULT_CROSSREF_URL: &str = "http://ftp.crossref.org/titlelist/titleFile.csv";

const SCHEMA_VERSION: &str = "1";

const BATCH_SIZE: usize = 10_000;

/// HTTP cache validators of a source, as stored after its last load.
#[derive(Default)]
struct Validators {
    etag: Option<String>,
    last_modified: Option<String>,
}

impl Validators {
    fn load(conn: &Connection, source: JournalSource) -> Result<Self, JournalsError> {
        Ok(Self {
            etag: db::get_metadata(conn, &source.metadata_key("etag"))?,
            last_modified: db::get_metadata(conn, &source.metadata_key("last_modified"))?,
        })
    }

    fn store(&self, conn: &Connection, source: JournalSource) -> Result<(), JournalsError> {
        if let Some(etag) = &self.etag {
            db::set_metadata(conn, &source.metadata_key("etag"), etag)?;
        }
        if let Some(lm) = &self.last_modified {
            db::set_metadata(conn, &source.metadata_key("last_modified"), lm)?;
        }
        Ok(())
    }
}

/// A source file fetched in this run.
struct Downloaded {
    path: PathBuf,
    validators: Validators,
}

/// Build (or update) the journal database from the given URLs.
///
/// Returns `Ok(false)` if neither list changed since the last build.
pub async fn build(
    db_path: &Path,
    medline_url: &str,
    crossref_url: &str,
    mut progress: impl FnMut(BuildProgress),
) -> Result<bool, JournalsError> {
    let conn = Connection::open(db_path)?;
    db::init_database(&conn)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("citeref-journals/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| JournalsError::Download(e.to_string()))?;

    let medline_validators = Validators::load(&conn, JournalSource::Medline)?;
    let crossref_validators = Validators::load(&conn, JournalSource::CrossRef)?;

    let db_dir = db_path.parent().unwrap_or(Path::new("."));
    let tmp_dir = tempfile::TempDir::new_in(db_dir)?;

    let medline = download(
        &client,
        JournalSource::Medline,
        medline_url,
        &medline_validators,
        tmp_dir.path(),
        &mut progress,
    )
    .await?;
    let crossref = download(
        &client,
        JournalSource::CrossRef,
        crossref_url,
        &crossref_validators,
        tmp_dir.path(),
        &mut progress,
    )
    .await?;

    if medline.is_none() && crossref.is_none() {
        let (medline_issns, crossref_issns) = db::get_counts(&conn)?;
        progress(BuildProgress::Complete {
            medline_issns: medline_issns as u64,
            crossref_issns: crossref_issns as u64,
            skipped: true,
        });
        return Ok(false);
    }

    // Parsing and SQLite writes are blocking; progress comes back over a channel.
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<BuildProgress>(64);

    let load_handle = tokio::task::spawn_blocking(move || {
        let _tmp_dir = tmp_dir;
        let mut send = |evt: BuildProgress| {
            let _ = progress_tx.blocking_send(evt);
        };
        for (source, downloaded) in [
            (JournalSource::Medline, medline),
            (JournalSource::CrossRef, crossref),
        ] {
            let Some(downloaded) = downloaded else {
                continue;
            };
            load_source(&conn, source, &downloaded.path, &mut send)?;
            downloaded.validators.store(&conn, source)?;
        }
        finish(&conn)
    });

    while let Some(evt) = progress_rx.recv().await {
        progress(evt);
    }

    let (medline_issns, crossref_issns) = load_handle
        .await
        .map_err(|e| JournalsError::Download(format!("load task panicked: {}", e)))??;

    progress(BuildProgress::Complete {
        medline_issns,
        crossref_issns,
        skipped: false,
    });

    Ok(true)
}

/// Build the journal database from local copies of both lists.
pub fn build_from_files(
    db_path: &Path,
    medline_path: &Path,
    crossref_path: &Path,
    mut progress: impl FnMut(BuildProgress),
) -> Result<(), JournalsError> {
    let conn = Connection::open(db_path)?;
    db::init_database(&conn)?;

    load_source(&conn, JournalSource::Medline, medline_path, &mut progress)?;
    load_source(&conn, JournalSource::CrossRef, crossref_path, &mut progress)?;
    let (medline_issns, crossref_issns) = finish(&conn)?;

    progress(BuildProgress::Complete {
        medline_issns,
        crossref_issns,
        skipped: false,
    });
    Ok(())
}

/// Conditionally GET one source into `dir`. `None` when it is unchanged.
async fn download(
    client: &reqwest::Client,
    source: JournalSource,
    url: &str,
    stored: &Validators,
    dir: &Path,
    progress: &mut impl FnMut(BuildProgress),
) -> Result<Option<Downloaded>, JournalsError> {
    let mut request = client.get(url);
    if let Some(ref etag) = stored.etag {
        request = request.header("If-None-Match", etag.as_str());
    }
    if let Some(ref lm) = stored.last_modified {
        request = request.header("If-Modified-Since", lm.as_str());
    }

    let response = request
        .send()
        .await
        .map_err(|e| JournalsError::Download(e.to_string()))?;

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
        tracing::info!(%source, url, "journal list not modified");
        return Ok(None);
    }

    if !response.status().is_success() {
        return Err(JournalsError::Download(format!(
            "HTTP error from {}: {}",
            url,
            response.status()
        )));
    }

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let etag = header("etag");
    let last_modified = header("last-modified");
    let total_bytes = response.content_length();

    let path = dir.join(source.file_name());
    let mut out = File::create(&path)?;
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;

    progress(BuildProgress::Downloading {
        source,
        bytes_downloaded,
        total_bytes,
    });
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| JournalsError::Download(e.to_string()))?;
        out.write_all(&chunk)?;
        bytes_downloaded += chunk.len() as u64;
        progress(BuildProgress::Downloading {
            source,
            bytes_downloaded,
            total_bytes,
        });
    }
    out.flush()?;
    tracing::info!(%source, url, bytes = bytes_downloaded, "downloaded journal list");

    Ok(Some(Downloaded {
        path,
        validators: Validators {
            etag,
            last_modified,
        },
    }))
}

/// Replace every journal of `source` with the contents of `path`.
///
/// The clear and all batches share one transaction, so a file that fails to
/// parse leaves the previous rows of `source` in place.
fn load_source(
    conn: &Connection,
    source: JournalSource,
    path: &Path,
    mut progress: impl FnMut(BuildProgress),
) -> Result<(), JournalsError> {
    let reader = BufReader::new(File::open(path)?);
    let tx = conn.unchecked_transaction()?;
    let removed = db::clear_source(&tx, source)?;
    tracing::debug!(%source, removed, "cleared journal source");

    let mut loader = Loader::new(&tx, source);
    match source {
        JournalSource::Medline => {
            parse_medline(reader, |journal| {
                loader.push(|batch| batch.medline.push(journal), &mut progress)
            })?;
        }
        JournalSource::CrossRef => {
            parse_crossref(reader, |journal| {
                loader.push(|batch| batch.crossref.push(journal), &mut progress)
            })?;
        }
    }
    loader.finish(&mut progress)?;
    tx.commit()?;
    Ok(())
}

/// Accumulates parsed records and writes them in batches.
struct Loader<'c> {
    conn: &'c Connection,
    source: JournalSource,
    batch: InsertBatch,
    records_parsed: u64,
    issns_inserted: u64,
    insert_error: Option<JournalsError>,
}

impl<'c> Loader<'c> {
    fn new(conn: &'c Connection, source: JournalSource) -> Self {
        Self {
            conn,
            source,
            batch: InsertBatch::new(),
            records_parsed: 0,
            issns_inserted: 0,
            insert_error: None,
        }
    }

    fn push(
        &mut self,
        add: impl FnOnce(&mut InsertBatch),
        progress: &mut impl FnMut(BuildProgress),
    ) {
        if self.insert_error.is_some() {
            return;
        }
        self.records_parsed += 1;
        add(&mut self.batch);
        if self.batch.len() >= BATCH_SIZE
            && let Err(e) = self.flush(progress)
        {
            self.insert_error = Some(e);
        }
    }

    fn flush(&mut self, progress: &mut impl FnMut(BuildProgress)) -> Result<(), JournalsError> {
        self.issns_inserted += db::insert_batch(self.conn, &self.batch)? as u64;
        self.batch.clear();
        progress(BuildProgress::Parsing {
            source: self.source,
            records_parsed: self.records_parsed,
            issns_inserted: self.issns_inserted,
        });
        Ok(())
    }

    fn finish(mut self, progress: &mut impl FnMut(BuildProgress)) -> Result<(), JournalsError> {
        if let Some(err) = self.insert_error.take() {
            return Err(err);
        }
        self.flush(progress)?;
        tracing::info!(
            source = %self.source,
            records = self.records_parsed,
            issns = self.issns_inserted,
            "loaded journal list"
        );
        Ok(())
    }
}

/// Record build metadata; returns the ISSN counts per source.
fn finish(conn: &Connection) -> Result<(u64, u64), JournalsError> {
    let (medline_issns, crossref_issns) = db::get_counts(conn)?;
    db::set_metadata(conn, "last_updated", &now_unix_timestamp())?;
    db::set_metadata(conn, "schema_version", SCHEMA_VERSION)?;
    db::set_metadata(conn, "medline_count", &medline_issns.to_string())?;
    db::set_metadata(conn, "crossref_count", &crossref_issns.to_string())?;
    Ok((medline_issns as u64, crossref_issns as u64))
}

/// Unix timestamp as a string (seconds since epoch).
fn now_unix_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}
