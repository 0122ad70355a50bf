//! Line-oriented `key=value` run configuration.
//!
//! ```text
//! delimiters=。,？,！,……
//! unwanted_symbols=“,”,「,」
//! max_length=64
//! length_threshold=30
//! user_agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64)
//! delay=2
//! ```
//!
//! Values containing a comma are lists; all-digit values are integers; everything else is a
//! string. There is no quoting or escaping. `PLAGSCAN_SEARCH_ENDPOINT`, when set, replaces
//! `search_endpoint` before validation.

use plagscan_core::{Error, Result};
use std::path::Path;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.google.com/search";
pub const DEFAULT_SNIPPET_SELECTOR: &str = "div.BNeawe.s3v9rd.AP7Wnd";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Replaces `search_endpoint` from the file; validated like any other value.
pub const SEARCH_ENDPOINT_ENV: &str = "PLAGSCAN_SEARCH_ENDPOINT";

/// Accepted range for `timeout_ms`, shared by both backends.
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 120_000;

/// A raw config value, typed the way the file syntax types it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Int(u64),
    Str(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn parse(raw: &str) -> Self {
        if raw.contains(',') {
            return Self::List(raw.split(',').map(|s| s.to_string()).collect());
        }
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<u64>() {
                return Self::Int(n);
            }
        }
        Self::Str(raw.to_string())
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Self::List(xs) => xs,
            Self::Str(s) => vec![s],
            Self::Int(n) => vec![n.to_string()],
        }
    }

    /// String keys tolerate commas (e.g. "KHTML, like Gecko" in a user agent).
    fn into_string(self) -> String {
        match self {
            Self::List(xs) => xs.join(","),
            Self::Str(s) => s,
            Self::Int(n) => n.to_string(),
        }
    }

    fn into_int(self, key: &str) -> Result<u64> {
        match self {
            Self::Int(n) => Ok(n),
            other => Err(Error::Config(format!(
                "{key} must be a non-negative integer, got {other:?}"
            ))),
        }
    }

    fn into_usize(self, key: &str) -> Result<usize> {
        let n = self.into_int(key)?;
        usize::try_from(n).map_err(|_| Error::Config(format!("{key} is out of range: {n}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    pub delimiters: Vec<String>,
    pub unwanted_symbols: Vec<String>,
    /// Upper bound on fragment length, in characters.
    pub max_length: usize,
    /// A fragment is flagged when a snippet shares a run strictly longer than this.
    pub length_threshold: usize,
    pub user_agent: String,
    /// Upper bound of the random pause after each search, in seconds.
    pub delay_s: u64,
    pub search_endpoint: String,
    pub snippet_selector: String,
    pub timeout_ms: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            delimiters: ["。", "？", "！", "……"].map(String::from).to_vec(),
            unwanted_symbols: ["“", "”", "「", "」", "『", "』", "\"", "'", "‘", "’", "\n"]
                .map(String::from)
                .to_vec(),
            max_length: 64,
            length_threshold: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            delay_s: 2,
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            snippet_selector: DEFAULT_SNIPPET_SELECTOR.to_string(),
            timeout_ms: 20_000,
        }
    }
}

impl CheckConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        Self::parse(&text)
    }

    /// Built-in defaults plus environment overrides, validated. Used when there is no file.
    pub fn from_env() -> Result<Self> {
        Self::parse("")
    }

    /// Parse config text on top of the defaults, then apply environment overrides.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_env(text, |key| std::env::var(key).ok())
    }

    /// Like [`CheckConfig::parse`], reading overrides through `env` instead of the process
    /// environment.
    pub fn parse_with_env<F>(text: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::Config(format!(
                    "line {}: expected key=value, got {line:?}",
                    lineno + 1
                )));
            };
            cfg.apply(key.trim(), ConfigValue::parse(value))
                .map_err(|e| match e {
                    Error::Config(m) => Error::Config(format!("line {}: {m}", lineno + 1)),
                    other => other,
                })?;
        }
        if let Some(endpoint) = env(SEARCH_ENDPOINT_ENV)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            tracing::debug!(endpoint = %endpoint, "search endpoint overridden from environment");
            cfg.search_endpoint = endpoint;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        match key {
            "delimiters" => self.delimiters = value.into_list(),
            "unwanted_symbols" => self.unwanted_symbols = value.into_list(),
            "max_length" => self.max_length = value.into_usize(key)?,
            "length_threshold" | "threshold_length" => {
                self.length_threshold = value.into_usize(key)?
            }
            "user_agent" => self.user_agent = value.into_string(),
            "delay" => self.delay_s = value.into_int(key)?,
            "search_endpoint" => self.search_endpoint = value.into_string(),
            "snippet_selector" => self.snippet_selector = value.into_string(),
            "timeout_ms" => self.timeout_ms = value.into_int(key)?,
            other => {
                tracing::warn!(key = other, "ignoring unknown config key");
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(Error::Config("max_length must be > 0".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("user_agent must be non-empty".to_string()));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(Error::Config(format!(
                "timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}, got {}",
                self.timeout_ms
            )));
        }
        url::Url::parse(self.search_endpoint.trim()).map_err(|e| {
            Error::Config(format!(
                "search_endpoint {:?} is not an absolute URL: {e}",
                self.search_endpoint
            ))
        })?;
        html_scraper::Selector::parse(&self.snippet_selector).map_err(|e| {
            Error::Config(format!(
                "snippet_selector {:?} is not a valid CSS selector: {e:?}",
                self.snippet_selector
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_format() {
        let cfg = CheckConfig::parse(
            "delimiters=。,？,！\n\
             unwanted_symbols=“,”\n\
             max_length=64\n\
             length_threshold=25\n\
             user_agent=Mozilla/5.0 (X11; Linux x86_64)\n\
             delay=0\n",
        )
        .unwrap();
        assert_eq!(cfg.delimiters, vec!["。", "？", "！"]);
        assert_eq!(cfg.unwanted_symbols, vec!["“", "”"]);
        assert_eq!(cfg.max_length, 64);
        assert_eq!(cfg.length_threshold, 25);
        assert_eq!(cfg.user_agent, "Mozilla/5.0 (X11; Linux x86_64)");
        assert_eq!(cfg.delay_s, 0);
        assert_eq!(cfg.search_endpoint, DEFAULT_SEARCH_ENDPOINT);
    }

    #[test]
    fn value_typing_follows_the_file_syntax() {
        assert_eq!(ConfigValue::parse("42"), ConfigValue::Int(42));
        assert_eq!(ConfigValue::parse("4 2"), ConfigValue::Str("4 2".to_string()));
        assert_eq!(ConfigValue::parse(""), ConfigValue::Str(String::new()));
        assert_eq!(
            ConfigValue::parse("1,2"),
            ConfigValue::List(vec!["1".to_string(), "2".to_string()])
        );
        // Only the first '=' separates key from value.
        let cfg = CheckConfig::parse("user_agent=a=b").unwrap();
        assert_eq!(cfg.user_agent, "a=b");
    }

    #[test]
    fn threshold_length_is_an_alias() {
        let cfg = CheckConfig::parse("threshold_length=20").unwrap();
        assert_eq!(cfg.length_threshold, 20);
    }

    #[test]
    fn single_value_list_keys_become_one_element_lists() {
        let cfg = CheckConfig::parse("delimiters=。").unwrap();
        assert_eq!(cfg.delimiters, vec!["。"]);
    }

    #[test]
    fn string_keys_rejoin_commas() {
        let cfg = CheckConfig::parse("user_agent=Mozilla/5.0 (KHTML, like Gecko)").unwrap();
        assert_eq!(cfg.user_agent, "Mozilla/5.0 (KHTML, like Gecko)");
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let cfg = CheckConfig::parse("\n# tuning\nmax_length=10\n\n").unwrap();
        assert_eq!(cfg.max_length, 10);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg = CheckConfig::parse("colour=blue\nmax_length=12").unwrap();
        assert_eq!(cfg.max_length, 12);
    }

    #[test]
    fn rejects_malformed_lines_with_line_numbers() {
        let err = CheckConfig::parse("max_length=10\nnot a pair").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "msg={msg}");
    }

    #[test]
    fn rejects_wrongly_typed_values() {
        let err = CheckConfig::parse("max_length=ten").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("max_length"));
        assert!(CheckConfig::parse("delay=1,2").is_err());
    }

    #[test]
    fn rejects_values_that_cannot_run() {
        assert!(CheckConfig::parse("max_length=0").is_err());
        assert!(CheckConfig::parse("timeout_ms=0").is_err());
        assert!(CheckConfig::parse("search_endpoint=/search").is_err());
        assert!(CheckConfig::parse("snippet_selector=div[").is_err());
    }

    #[test]
    fn timeout_outside_the_supported_range_is_rejected() {
        let err = CheckConfig::parse_with_env("timeout_ms=300000", |_| None).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"), "err={err}");
        assert!(CheckConfig::parse_with_env("timeout_ms=999", |_| None).is_err());
        let cfg = CheckConfig::parse_with_env("timeout_ms=120000", |_| None).unwrap();
        assert_eq!(cfg.timeout_ms, MAX_TIMEOUT_MS);
    }

    #[test]
    fn endpoint_override_from_env_replaces_the_file_value() {
        let env = |k: &str| {
            (k == SEARCH_ENDPOINT_ENV).then(|| " http://127.0.0.1:9/search ".to_string())
        };
        let cfg =
            CheckConfig::parse_with_env("search_endpoint=https://search.test/q", env).unwrap();
        assert_eq!(cfg.search_endpoint, "http://127.0.0.1:9/search");

        let blank = |_: &str| Some("   ".to_string());
        let cfg = CheckConfig::parse_with_env("", blank).unwrap();
        assert_eq!(cfg.search_endpoint, DEFAULT_SEARCH_ENDPOINT);
    }

    #[test]
    fn relative_endpoint_override_fails_validation() {
        let env = |k: &str| (k == SEARCH_ENDPOINT_ENV).then(|| "/search".to_string());
        let err = CheckConfig::parse_with_env("", env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("search_endpoint"), "err={err}");
    }

    #[test]
    fn integers_beyond_u64_are_rejected() {
        let err = CheckConfig::parse_with_env("max_length=99999999999999999999", |_| None)
            .unwrap_err();
        assert!(err.to_string().contains("max_length"), "err={err}");
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn lengths_that_overflow_usize_are_rejected() {
        let err = CheckConfig::parse_with_env("length_threshold=4294967296", |_| None)
            .unwrap_err();
        assert!(err.to_string().contains("out of range"), "err={err}");
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = CheckConfig::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
