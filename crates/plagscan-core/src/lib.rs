use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One fragment query against a results page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    /// Timeout for the operation (network + processing).
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            timeout_ms: None,
        }
    }
}

/// A candidate result text scraped from a results page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    /// Link of the result, when the page exposes one next to the snippet.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetResponse {
    /// The results-page URL the snippets were read from.
    pub query_url: String,
    pub snippets: Vec<Snippet>,
    pub backend: String,
    pub timings_ms: BTreeMap<String, u128>,
}

/// "Fetch candidate snippets for a fragment."
///
/// Implementations own their session (HTTP client, browser process). Callers construct one
/// source per run, pass it by reference into the checker and call [`SnippetSource::close`]
/// when the run is over.
#[async_trait::async_trait]
pub trait SnippetSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn snippets(&self, q: &SearchQuery) -> Result<SnippetResponse>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A flagged fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    /// Position of the fragment in segmenter output.
    pub index: usize,
    pub fragment: String,
    /// Results-page URL for the fragment query.
    pub url: String,
    /// The first snippet whose run exceeded the threshold.
    pub snippet: String,
    pub run_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FragmentFailure {
    pub index: usize,
    pub fragment: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub matches: Vec<MatchResult>,
    pub failures: Vec<FragmentFailure>,
    pub total: usize,
    /// Fragments shorter than the threshold (never searched).
    pub skipped: usize,
    /// Fragments that were searched successfully.
    pub checked: usize,
    pub interrupted: bool,
}

/// Build the results-page URL for `query` (`{endpoint}?q={query}`).
pub fn search_url(endpoint: &str, query: &str) -> Result<String> {
    let base = url::Url::parse(endpoint.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let u = url::Url::parse_with_params(base.as_str(), &[("q", query)])
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;
    Ok(u.to_string())
}
