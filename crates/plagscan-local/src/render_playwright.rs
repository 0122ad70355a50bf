//! Browser-automation snippet source: one headless Chromium (Node.js + Playwright) per run.
//!
//! The Node side is a small line-oriented JSON driver. Rust writes one request per line on the
//! child's stdin and reads one reply per line from its stdout:
//!
//! - `{"op":"launch","user_agent":...}` -> `{"ok":true,"ready":true}`
//! - `{"op":"search","id":N,"url":...}` -> `{"id":N,"ok":true,"sections":[{"highlights":[..],"href":..}]}`
//! - `{"op":"close"}` -> the driver closes the browser and exits.
//!
//! Replies carry the request id so a reply that arrives after its request timed out is skipped.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use plagscan_core::{
    search_url, Error, Result, SearchQuery, Snippet, SnippetResponse, SnippetSource,
};

use crate::config::CheckConfig;

/// One organic result block on the results page.
pub const SECTION_SELECTOR: &str = "div.MjjYud";
/// Query terms the engine highlighted inside a result block.
pub const HIGHLIGHT_SELECTOR: &str = "em.t55VCb";

const JS: &str = r#"
const readline = require('readline');

function send(obj) { process.stdout.write(JSON.stringify(obj) + '\n'); }
function bad(id, code, message, hint) { send({ id, ok: false, error: { code, message, hint } }); }

async function main() {
  const rl = readline.createInterface({ input: process.stdin, terminal: false });
  const lines = rl[Symbol.asyncIterator]();

  const first = await lines.next();
  let launch = {};
  try { launch = JSON.parse(first.value || '{}'); } catch (_) {}

  let pw;
  try { pw = require('playwright'); } catch (e) {
    return bad(null, 'not_configured',
      'Playwright is not installed for Node.js (require("playwright") failed)',
      'Install Playwright (Node): `npm i -g playwright` and then `npx playwright install chromium`.');
  }

  let browser;
  let context;
  try {
    browser = await pw.chromium.launch({ headless: true });
    const contextOpts = { serviceWorkers: 'block' };
    if (launch.user_agent) contextOpts.userAgent = String(launch.user_agent);
    context = await browser.newContext(contextOpts);
  } catch (e) {
    return bad(null, 'not_configured', String(e && e.message ? e.message : e),
      'Chromium could not be launched. Try `npx playwright install chromium`.');
  }
  send({ ok: true, ready: true });

  try {
    for (;;) {
      const next = await lines.next();
      if (next.done) break;
      const line = String(next.value || '').trim();
      if (!line) continue;
      let req;
      try { req = JSON.parse(line); } catch (e) { bad(null, 'invalid_params', 'bad JSON request', ''); continue; }
      if (req.op === 'close') break;

      const page = await context.newPage();
      try {
        const resp = await page.goto(String(req.url || ''), { waitUntil: 'domcontentloaded', timeout: Number(req.timeout_ms || 20000) });
        try { await page.waitForTimeout(Number(req.settle_ms || 0)); } catch (_) {}
        const sections = await page.$$eval(String(req.section_selector), (els, hl) => els.map((el) => {
          const a = el.querySelector('a[href]');
          return {
            highlights: Array.from(el.querySelectorAll(hl)).map((e) => e.textContent || ''),
            href: a ? a.href : null,
          };
        }), String(req.highlight_selector));
        send({ id: req.id, ok: true, final_url: page.url(), status: resp ? resp.status() : null, sections });
      } catch (e) {
        bad(req.id, 'fetch_failed', String(e && e.message ? e.message : e), 'Try a longer timeout_ms.');
      } finally {
        try { await page.close(); } catch (_) {}
      }
    }
  } finally {
    try { await browser.close(); } catch (_) {}
  }
}

main().catch((e) => bad(null, 'fetch_failed', String(e && e.message ? e.message : e), ''));
"#;

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Node.js binary (`PLAGSCAN_NODE`, default `node`).
    pub node_bin: String,
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    /// Pause after DOMContentLoaded before reading the page.
    pub settle_ms: u64,
}

impl BrowserOptions {
    pub fn from_config(cfg: &CheckConfig) -> Self {
        Self {
            node_bin: std::env::var("PLAGSCAN_NODE").unwrap_or_else(|_| "node".to_string()),
            endpoint: cfg.search_endpoint.clone(),
            user_agent: cfg.user_agent.clone(),
            timeout_ms: cfg.timeout_ms,
            settle_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    sections: Vec<DriverSection>,
    error: Option<DriverError>,
}

#[derive(Debug, Deserialize)]
struct DriverSection {
    #[serde(default)]
    highlights: Vec<String>,
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriverError {
    code: Option<String>,
    message: Option<String>,
    hint: Option<String>,
}

impl DriverError {
    fn into_error(self) -> Error {
        let message = self
            .message
            .unwrap_or_else(|| "Playwright driver failed".to_string());
        let message = match self.hint.filter(|h| !h.trim().is_empty()) {
            Some(hint) => format!("{message}. {hint}"),
            None => message,
        };
        match self.code.as_deref() {
            Some("not_configured") => Error::NotConfigured(message),
            Some("invalid_params") => Error::InvalidUrl(message),
            _ => Error::Render(message),
        }
    }
}

/// Concatenate each section's highlighted runs into one snippet; sections without highlights
/// carry no match evidence and are skipped.
fn snippets_from_sections(sections: Vec<DriverSection>) -> Vec<Snippet> {
    sections
        .into_iter()
        .filter_map(|s| {
            let text = s.highlights.concat().trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(Snippet { text, url: s.href })
        })
        .collect()
}

struct Driver {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
    closed: bool,
}

impl Driver {
    async fn send(&mut self, line: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::Render("browser session is closed".to_string()))?;
        let mut buf = line.to_string();
        buf.push('\n');
        stdin
            .write_all(buf.as_bytes())
            .await
            .map_err(|e| Error::Render(format!("browser driver stdin: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::Render(format!("browser driver stdin: {e}")))
    }

    async fn recv(&mut self) -> Result<DriverReply> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .stdout
                .read_line(&mut line)
                .await
                .map_err(|e| Error::Render(format!("browser driver stdout: {e}")))?;
            if n == 0 {
                return Err(Error::Render(
                    "browser driver exited unexpectedly".to_string(),
                ));
            }
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(line.trim()).map_err(|e| {
                Error::Render(format!("browser driver returned invalid JSON: {e}"))
            });
        }
    }

    /// Read replies until the one for `id` arrives; stale replies are dropped.
    async fn recv_for(&mut self, id: u64) -> Result<DriverReply> {
        loop {
            let reply = self.recv().await?;
            match reply.id {
                Some(got) if got == id => return Ok(reply),
                Some(got) => tracing::debug!(got, want = id, "dropping stale browser reply"),
                None if !reply.ok => {
                    return Err(reply
                        .error
                        .map(DriverError::into_error)
                        .unwrap_or_else(|| Error::Render("browser driver failed".to_string())))
                }
                None => {}
            }
        }
    }
}

/// A running headless browser. Create with [`BrowserSession::launch`], release with
/// [`SnippetSource::close`]. Dropping an unclosed session kills the driver process.
pub struct BrowserSession {
    driver: Mutex<Driver>,
    opts: BrowserOptions,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    pub async fn launch(opts: BrowserOptions) -> Result<Self> {
        url::Url::parse(&opts.endpoint).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut cmd = tokio::process::Command::new(&opts.node_bin);
        if let Some(node_path) = detect_node_path_for_playwright() {
            cmd.env("NODE_PATH", node_path);
        }
        let mut child = cmd
            .arg("-e")
            .arg(JS)
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::NotConfigured(format!(
                    "browser backend requires Node.js (`{}`) and the Playwright npm package: {e}",
                    opts.node_bin
                ))
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Render("browser driver: missing stdout pipe".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            // Drain stderr so a chatty driver never blocks on a full pipe.
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(l)) = lines.next_line().await {
                    tracing::debug!(target: "plagscan::browser", "{l}");
                }
            });
        }

        let mut driver = Driver {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 1,
            closed: false,
        };

        let t0 = Instant::now();
        let launch = serde_json::json!({ "op": "launch", "user_agent": opts.user_agent });
        driver.send(&launch).await?;
        let ready = tokio::time::timeout(Duration::from_secs(60), driver.recv())
            .await
            .map_err(|_| Error::Render("browser launch timed out after 60s".to_string()))??;
        if !ready.ok {
            return Err(ready
                .error
                .map(DriverError::into_error)
                .unwrap_or_else(|| Error::Render("browser launch failed".to_string())));
        }
        tracing::info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "headless browser ready"
        );

        Ok(Self {
            driver: Mutex::new(driver),
            opts,
        })
    }
}

#[async_trait::async_trait]
impl SnippetSource for BrowserSession {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn snippets(&self, q: &SearchQuery) -> Result<SnippetResponse> {
        let t0 = Instant::now();
        let timeout_ms = q.timeout_ms.unwrap_or(self.opts.timeout_ms);
        let query_url = search_url(&self.opts.endpoint, &q.query)?;

        let mut driver = self.driver.lock().await;
        if driver.closed {
            return Err(Error::Render("browser session is closed".to_string()));
        }
        let id = driver.next_id;
        driver.next_id += 1;
        driver
            .send(&serde_json::json!({
                "op": "search",
                "id": id,
                "url": query_url,
                "timeout_ms": timeout_ms,
                "settle_ms": self.opts.settle_ms,
                "section_selector": SECTION_SELECTOR,
                "highlight_selector": HIGHLIGHT_SELECTOR,
            }))
            .await?;

        // Hard wall-clock bound for navigation + settle + extraction.
        let hard_timeout_ms = timeout_ms
            .saturating_add(self.opts.settle_ms)
            .saturating_add(10_000);
        let reply =
            match tokio::time::timeout(Duration::from_millis(hard_timeout_ms), driver.recv_for(id))
                .await
            {
                Ok(r) => r?,
                Err(_) => {
                    return Err(Error::Render(format!(
                        "browser search hard timeout after {hard_timeout_ms}ms"
                    )))
                }
            };
        if !reply.ok {
            return Err(reply
                .error
                .map(DriverError::into_error)
                .unwrap_or_else(|| Error::Render("browser search failed".to_string())));
        }

        let snippets = snippets_from_sections(reply.sections);
        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("render".to_string(), t0.elapsed().as_millis());
        Ok(SnippetResponse {
            query_url,
            snippets,
            backend: "browser".to_string(),
            timings_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        let mut driver = self.driver.lock().await;
        if driver.closed {
            return Ok(());
        }
        driver.closed = true;
        // Best-effort: the driver may already be gone.
        let _ = driver.send(&serde_json::json!({ "op": "close" })).await;
        if let Some(mut stdin) = driver.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        match tokio::time::timeout(Duration::from_secs(10), driver.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(%status, "browser driver exited");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Render(format!("browser driver wait: {e}"))),
            Err(_) => {
                let _ = driver.child.kill().await;
                let _ = driver.child.wait().await;
                Err(Error::Render(
                    "browser driver did not exit within 10s; killed".to_string(),
                ))
            }
        }
    }
}

fn node_path_candidates() -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    if let Some(home) = std::env::var_os("HOME").map(std::path::PathBuf::from) {
        out.push(home.join(".npm-global").join("lib").join("node_modules"));
    }
    out.push("/opt/homebrew/lib/node_modules".into());
    out.push("/usr/local/lib/node_modules".into());
    out.push("/usr/lib/node_modules".into());
    out
}

/// Make a globally installed Playwright requireable without asking users to set NODE_PATH.
fn detect_node_path_for_playwright() -> Option<String> {
    if let Ok(v) = std::env::var("PLAGSCAN_NODE_PATH") {
        let v = v.trim();
        if !v.is_empty() {
            return Some(v.to_string());
        }
    }

    let existing = std::env::var("NODE_PATH").ok().unwrap_or_default();
    let has_playwright = existing
        .split(':')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| std::path::Path::new(p).join("playwright").is_dir());
    if has_playwright {
        return None;
    }

    let found = node_path_candidates()
        .into_iter()
        .find(|root| root.join("playwright").is_dir())?;
    let found = found.to_string_lossy().to_string();
    if existing.trim().is_empty() {
        Some(found)
    } else {
        Some(format!("{existing}:{found}"))
    }
}
