//! Effective settings: environment over config file over built-in defaults.
//! Command-line flags are applied on top by each subcommand.

use std::path::PathBuf;
use std::time::Duration;

use crate::config_file::ConfigFile;

pub const LTWA_CACHE_ENV: &str = "CITEREF_LTWA_CACHE";
pub const JOURNALS_DB_ENV: &str = "CITEREF_JOURNALS_DB";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub ltwa_cache_dir: PathBuf,
    pub journals_db: PathBuf,
    pub ltwa_url: String,
    pub medline_url: String,
    pub crossref_url: String,
    pub pubmed_chunk_size: usize,
    pub pubmed_wait: Duration,
    pub efetch_url: String,
}

impl Settings {
    pub fn from_env(config: &ConfigFile) -> Self {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve against `config`, reading environment variables through `env`.
    pub fn resolve(config: &ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let paths = config.paths.clone().unwrap_or_default();
        let sources = config.sources.clone().unwrap_or_default();
        let pubmed = config.pubmed.clone().unwrap_or_default();

        let ltwa_cache_dir = env(LTWA_CACHE_ENV)
            .filter(|v| !v.is_empty())
            .or(paths.ltwa_cache_dir)
            .map(PathBuf::from)
            .unwrap_or_else(default_ltwa_cache_dir);
        let journals_db = env(JOURNALS_DB_ENV)
            .filter(|v| !v.is_empty())
            .or(paths.journals_db)
            .map(PathBuf::from)
            .unwrap_or_else(default_journals_db);

        let pubmed_wait = pubmed
            .wait_ms
            .map(Duration::from_millis)
            .unwrap_or(citeref_pubmed::DEFAULT_WAIT);

        Self {
            ltwa_cache_dir,
            journals_db,
            ltwa_url: sources
                .ltwa_url
                .unwrap_or_else(|| citeref_ltwa::DEFAULT_LTWA_URL.to_string()),
            medline_url: sources
                .medline_url
                .unwrap_or_else(|| citeref_journals::DEFAULT_MEDLINE_URL.to_string()),
            crossref_url: sources
                .crossref_url
                .unwrap_or_else(|| citeref_journals::DEFAULT_CROSSREF_URL.to_string()),
            pubmed_chunk_size: pubmed
                .chunk_size
                .unwrap_or(citeref_pubmed::DEFAULT_CHUNK_SIZE),
            pubmed_wait,
            efetch_url: pubmed
                .efetch_url
                .unwrap_or_else(|| citeref_pubmed::DEFAULT_EFETCH_URL.to_string()),
        }
    }
}

fn default_ltwa_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("citeref").join("ltwa"))
        .unwrap_or_else(|| PathBuf::from(".citeref-ltwa"))
}

fn default_journals_db() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("citeref").join("journals.db"))
        .unwrap_or_else(|| PathBuf::from("journals.db"))
}
