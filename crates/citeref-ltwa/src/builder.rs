//! Download, build and cache pipeline for the LTWA term tables.
//!
//! Downloads the ISSN LTWA export (~2 MB, UTF-16LE), folds it into
//! [`TermTables`] and writes them as JSON next to the source file.

use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;

use crate::source;
use crate::terms::TermTables;
use crate::{BuildProgress, LtwaError};

/// Default LTWA export URL (2016-09-15 snapshot).
pub const DEFAULT_LTWA_URL: &str = "https://www.issn.org/wp-content/uploads/2013/09/LTWA_20160915.txt";

/// File name of the JSON cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "iso-ltwa.json";

/// File name the downloaded source is kept under.
pub const SOURCE_FILE_NAME: &str = "LTWA.txt";

/// Download the LTWA export from `url` into `cache_dir` and build the cache.
pub async fn build(
    cache_dir: &Path,
    url: &str,
    mut progress: impl FnMut(BuildProgress),
) -> Result<TermTables, LtwaError> {
    std::fs::create_dir_all(cache_dir)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("citeref-ltwa/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LtwaError::Download(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LtwaError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(LtwaError::Download(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    let total_bytes = response.content_length();
    progress(BuildProgress::Downloading {
        bytes_downloaded: 0,
        total_bytes,
    });

    let mut out = tempfile::NamedTempFile::new_in(cache_dir)?;
    let mut stream = response.bytes_stream();
    let mut bytes_downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LtwaError::Download(e.to_string()))?;
        out.write_all(&chunk)?;
        bytes_downloaded += chunk.len() as u64;
        progress(BuildProgress::Downloading {
            bytes_downloaded,
            total_bytes,
        });
    }
    out.flush()?;

    let source_path = cache_dir.join(SOURCE_FILE_NAME);
    out.persist(&source_path).map_err(|e| LtwaError::Io(e.error))?;
    tracing::info!(url, bytes = bytes_downloaded, path = %source_path.display(), "downloaded LTWA source");

    build_from_file(cache_dir, &source_path, progress)
}

/// Build the cache in `cache_dir` from a local LTWA export.
pub fn build_from_file(
    cache_dir: &Path,
    source_path: &Path,
    mut progress: impl FnMut(BuildProgress),
) -> Result<TermTables, LtwaError> {
    let bytes = std::fs::read(source_path)?;
    let rows = source::read_rows(&bytes)?;
    progress(BuildProgress::Parsing {
        rows: rows.len() as u64,
    });

    let tables = TermTables::from_rows(&rows);
    std::fs::create_dir_all(cache_dir)?;
    save(cache_dir, &tables)?;

    progress(BuildProgress::Complete {
        terms: tables.term_count() as u64,
        conflicts: tables.conflict_count() as u64,
        multi_word_terms: tables.multi_word_terms().len() as u64,
    });
    Ok(tables)
}

pub fn cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(CACHE_FILE_NAME)
}

/// Write the tables atomically: readers see either the old or the new cache.
pub fn save(cache_dir: &Path, tables: &TermTables) -> Result<(), LtwaError> {
    let path = cache_path(cache_dir);
    let mut out = tempfile::NamedTempFile::new_in(cache_dir)?;
    serde_json::to_writer(&mut out, tables)?;
    out.flush()?;
    out.persist(&path).map_err(|e| LtwaError::Io(e.error))?;
    tracing::debug!(path = %path.display(), "wrote LTWA cache");
    Ok(())
}

/// Read the cached tables; `Ok(None)` when no cache has been built yet.
pub fn load(cache_dir: &Path) -> Result<Option<TermTables>, LtwaError> {
    let path = cache_path(cache_dir);
    let file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let tables: TermTables = serde_json::from_reader(std::io::BufReader::new(file))?;
    tracing::debug!(
        path = %path.display(),
        terms = tables.term_count(),
        conflicts = tables.conflict_count(),
        "loaded LTWA cache"
    );
    Ok(Some(tables))
}
