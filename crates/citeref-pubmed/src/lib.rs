//! PubMed article metadata by PMID.
//!
//! Fetches `PubmedArticleSet` XML from the NCBI E-utilities `efetch`
//! endpoint in rate-limited chunks and reads it into [`PubMedArticle`]
//! records.

mod fetch;
mod reader;

use thiserror::Error;

pub use fetch::{
    DEFAULT_CHUNK_SIZE, DEFAULT_EFETCH_URL, DEFAULT_WAIT, FetchOptions, FetchOutcome,
    PubMedFetcher, chunk_ids, dedupe_ids,
};
pub use reader::{
    Article, Author, Chemical, Grant, MeshDescriptor, PubMedArticle, RelatedIds, parse_articles,
    read_articles,
};

#[derive(Error, Debug)]
pub enum PubMedError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("download error: {0}")]
    Download(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
