use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use plagscan_core::{
    search_url, Error, Result, SearchQuery, Snippet, SnippetResponse, SnippetSource,
};

use crate::config::CheckConfig;

/// Build the shared reqwest client for one run.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(10))
        // Avoid “hang forever” on DNS/TLS stalls; per-request timeouts still apply on top.
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::NotConfigured(e.to_string()))
}

/// Scrapes result snippets out of a search engine's plain HTML results page.
#[derive(Debug, Clone)]
pub struct HttpSnippetSource {
    client: reqwest::Client,
    endpoint: String,
    selector: String,
    timeout_ms: u64,
}

impl HttpSnippetSource {
    pub fn new(client: reqwest::Client, endpoint: &str, selector: &str, timeout_ms: u64) -> Self {
        Self {
            client,
            endpoint: endpoint.trim().to_string(),
            selector: selector.to_string(),
            timeout_ms,
        }
    }

    pub fn from_config(cfg: &CheckConfig) -> Result<Self> {
        let client = http_client(&cfg.user_agent)?;
        Ok(Self::new(
            client,
            &cfg.search_endpoint,
            &cfg.snippet_selector,
            cfg.timeout_ms,
        ))
    }
}

/// Texts of all elements matching `selector`, in document order.
///
/// Text nodes are concatenated without separators (CJK has no word spacing) and trimmed;
/// empty snippets are dropped. The nearest enclosing link, if any, becomes the snippet URL.
pub fn parse_snippets(html: &str, selector: &str) -> Result<Vec<Snippet>> {
    let sel = html_scraper::Selector::parse(selector)
        .map_err(|e| Error::Search(format!("invalid snippet selector {selector:?}: {e:?}")))?;
    let doc = html_scraper::Html::parse_document(html);
    let mut out = Vec::new();
    for el in doc.select(&sel) {
        let text = el.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            continue;
        }
        let url = el
            .ancestors()
            .filter_map(html_scraper::ElementRef::wrap)
            .find(|a| a.value().name() == "a")
            .and_then(|a| a.value().attr("href"))
            .map(|s| s.to_string());
        out.push(Snippet { text, url });
    }
    Ok(out)
}

#[async_trait::async_trait]
impl SnippetSource for HttpSnippetSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn snippets(&self, q: &SearchQuery) -> Result<SnippetResponse> {
        let t0 = Instant::now();
        let timeout_ms = q.timeout_ms.unwrap_or(self.timeout_ms);
        let query_url = search_url(&self.endpoint, &q.query)?;

        let resp = self
            .client
            .get(&query_url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("search HTTP {status}")));
        }
        let html = resp.text().await.map_err(|e| Error::Search(e.to_string()))?;
        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("fetch".to_string(), t0.elapsed().as_millis());

        let t_parse = Instant::now();
        let snippets = parse_snippets(&html, &self.selector)?;
        timings_ms.insert("parse".to_string(), t_parse.elapsed().as_millis());
        tracing::debug!(
            url = %query_url,
            snippets = snippets.len(),
            "fetched results page"
        );

        Ok(SnippetResponse {
            query_url,
            snippets,
            backend: "http".to_string(),
            timings_ms,
        })
    }
}
