//! Batch efetch of PubMed records.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::PubMedError;
use crate::reader::{PubMedArticle, parse_articles};

pub const DEFAULT_EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// PMIDs per efetch request.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Spacing between efetch requests.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub efetch_url: String,
    pub chunk_size: usize,
    /// Minimum time between two requests. Zero disables pacing.
    pub wait: Duration,
    /// Keep the raw XML of every successful chunk in [`FetchOutcome::raw_xml`].
    pub save_text: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            efetch_url: DEFAULT_EFETCH_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            wait: DEFAULT_WAIT,
            save_text: false,
        }
    }
}

/// Articles gathered by [`PubMedFetcher::fetch_list`].
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub articles: BTreeMap<String, PubMedArticle>,
    /// Response bodies in request order; empty unless `save_text` was set.
    pub raw_xml: Vec<String>,
    pub chunks: usize,
    pub failed_chunks: usize,
}

impl FetchOutcome {
    /// Write the retained XML bodies, one after another, to `path`.
    pub fn write_raw_xml(&self, path: &Path) -> Result<(), PubMedError> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        for text in &self.raw_xml {
            file.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                file.write_all(b"\n")?;
            }
        }
        file.flush()?;
        Ok(())
    }
}

pub struct PubMedFetcher {
    client: reqwest::Client,
    options: FetchOptions,
    limiter: Option<DirectLimiter>,
}

impl PubMedFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, PubMedError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("citeref/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PubMedError::Download(e.to_string()))?;
        Ok(Self::with_client(client, options))
    }

    pub fn with_client(client: reqwest::Client, mut options: FetchOptions) -> Self {
        options.chunk_size = options.chunk_size.max(1);
        let limiter = Quota::with_period(options.wait).map(DirectLimiter::direct);
        Self {
            client,
            options,
            limiter,
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch every PMID in `ids`, one paced request per chunk.
    ///
    /// A chunk whose request fails, whose body starts with `ERROR`, or whose
    /// XML cannot be read is logged and counted in `failed_chunks`; the
    /// remaining chunks are still fetched.
    pub async fn fetch_list<S: AsRef<str>>(&self, ids: &[S]) -> FetchOutcome {
        let ids = dedupe_ids(ids);
        let mut outcome = FetchOutcome::default();

        for chunk in chunk_ids(&ids, self.options.chunk_size) {
            outcome.chunks += 1;
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            let text = match self.fetch_chunk(chunk).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::info!(ids = chunk.len(), error = %e, "skipping PubMed chunk");
                    outcome.failed_chunks += 1;
                    continue;
                }
            };
            if text.starts_with("ERROR") {
                tracing::info!(
                    ids = chunk.len(),
                    response = text.lines().next().unwrap_or_default(),
                    "skipping PubMed chunk"
                );
                outcome.failed_chunks += 1;
                continue;
            }

            match parse_articles(&text) {
                Ok(articles) => {
                    tracing::debug!(requested = chunk.len(), parsed = articles.len(), "fetched PubMed chunk");
                    outcome.articles.extend(articles);
                }
                Err(e) => {
                    tracing::info!(ids = chunk.len(), error = %e, "unreadable PubMed chunk");
                    outcome.failed_chunks += 1;
                }
            }
            if self.options.save_text {
                outcome.raw_xml.push(text);
            }
        }

        outcome
    }

    async fn fetch_chunk(&self, ids: &[String]) -> Result<String, PubMedError> {
        let joined = ids.join(",");
        let resp = self
            .client
            .get(&self.options.efetch_url)
            .query(&[("db", "pubmed"), ("retmode", "xml"), ("id", joined.as_str())])
            .header("Accept", "application/xml")
            .send()
            .await
            .map_err(|e| PubMedError::Download(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(PubMedError::Download(format!("HTTP {}", resp.status())));
        }

        resp.text()
            .await
            .map_err(|e| PubMedError::Download(e.to_string()))
    }
}

/// Trimmed, non-empty ids in first-seen order with duplicates removed.
pub fn dedupe_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Split `ids` into consecutive chunks of at most `size` (minimum one).
pub fn chunk_ids(ids: &[String], size: usize) -> std::slice::Chunks<'_, String> {
    ids.chunks(size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let ids = ["3", " 1", "3", "", "2", "1 "];
        assert_eq!(dedupe_ids(&ids), ["3", "1", "2"]);
    }

    #[test]
    fn test_chunks() {
        let ids: Vec<String> = (0..450).map(|n| n.to_string()).collect();
        let sizes: Vec<usize> = chunk_ids(&ids, DEFAULT_CHUNK_SIZE).map(<[String]>::len).collect();
        assert_eq!(sizes, [200, 200, 50]);
        assert_eq!(chunk_ids(&ids[..2], 0).count(), 2);
    }

    #[test]
    fn test_zero_wait_disables_pacing() {
        let fetcher = PubMedFetcher::with_client(
            reqwest::Client::new(),
            FetchOptions {
                wait: Duration::ZERO,
                chunk_size: 0,
                ..FetchOptions::default()
            },
        );
        assert!(fetcher.limiter.is_none());
        assert_eq!(fetcher.options().chunk_size, 1);
    }

    #[test]
    fn test_write_raw_xml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.xml");
        let outcome = FetchOutcome {
            raw_xml: vec!["<a/>".into(), "<b/>\n".into()],
            ..FetchOutcome::default()
        };
        outcome.write_raw_xml(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<a/>\n<b/>\n");
    }
}
