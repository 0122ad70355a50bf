use plagscan_core::{Result, SnippetSource};

pub mod check;
pub mod compare;
pub mod config;
pub mod input;
pub mod render_playwright;
pub mod report;
pub mod search;
pub mod segment;
pub mod textprep;

use config::CheckConfig;
use render_playwright::{BrowserOptions, BrowserSession};
use search::HttpSnippetSource;

/// Which snippet source a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Plain HTTP GET of the results page, snippets by CSS selector.
    Http,
    /// Headless Chromium via Node.js + Playwright, snippets from highlighted matches.
    Browser,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }

    /// Construct the session for one run. Callers must `close()` it when done.
    pub async fn open(&self, cfg: &CheckConfig) -> Result<Box<dyn SnippetSource>> {
        match self {
            Self::Http => Ok(Box::new(HttpSnippetSource::from_config(cfg)?)),
            Self::Browser => Ok(Box::new(
                BrowserSession::launch(BrowserOptions::from_config(cfg)).await?,
            )),
        }
    }
}

/// Segment an article with the run configuration.
pub fn segment_article(text: &str, cfg: &CheckConfig) -> Vec<String> {
    segment::segment(
        text,
        &cfg.delimiters,
        &cfg.unwanted_symbols,
        cfg.max_length,
    )
}
