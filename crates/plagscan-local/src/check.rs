//! The batch loop: one search per fragment, sequentially, with a jittered pause in between.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;

use plagscan_core::{
    CheckOutcome, FragmentFailure, MatchResult, SearchQuery, SnippetSource,
};

use crate::compare::first_match;
use crate::config::CheckConfig;

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub length_threshold: usize,
    /// Upper bound of the random pause after each search.
    pub max_delay: Duration,
    pub timeout_ms: Option<u64>,
}

impl CheckOptions {
    pub fn from_config(cfg: &CheckConfig) -> Self {
        Self {
            length_threshold: cfg.length_threshold,
            max_delay: Duration::from_secs(cfg.delay_s),
            timeout_ms: Some(cfg.timeout_ms),
        }
    }
}

/// Progress over fragments on stderr. indicatif already hides it when stderr is not a terminal.
pub fn progress_bar(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fragments",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Uniform random pause in `[0, max]`.
pub fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let secs = rand::thread_rng().gen_range(0.0..=max.as_secs_f64());
    Duration::from_secs_f64(secs)
}

/// Fragments shorter than the threshold can never produce a longer run, so they are not searched.
pub fn worth_searching(fragment: &str, length_threshold: usize) -> bool {
    !fragment.trim().is_empty() && fragment.chars().count() >= length_threshold
}

/// Check `fragments` in order against `source`.
///
/// A failed search is recorded in `failures` and the batch moves on. When `shutdown`
/// resolves, the loop stops at the next await point and returns what it has so far with
/// `interrupted` set.
pub async fn check_fragments<F>(
    source: &dyn SnippetSource,
    fragments: &[String],
    opts: &CheckOptions,
    progress: &ProgressBar,
    shutdown: F,
) -> CheckOutcome
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut outcome = CheckOutcome {
        total: fragments.len(),
        ..Default::default()
    };

    for (index, fragment) in fragments.iter().enumerate() {
        if !worth_searching(fragment, opts.length_threshold) {
            outcome.skipped += 1;
            progress.inc(1);
            continue;
        }

        let q = SearchQuery {
            query: fragment.clone(),
            timeout_ms: opts.timeout_ms,
        };
        let searched = tokio::select! {
            biased;
            _ = &mut shutdown => {
                outcome.interrupted = true;
                break;
            }
            r = source.snippets(&q) => r,
        };

        match searched {
            Err(e) => {
                tracing::warn!(index, backend = source.name(), error = %e, "search failed; continuing");
                outcome.failures.push(FragmentFailure {
                    index,
                    fragment: fragment.clone(),
                    error: e.to_string(),
                });
            }
            Ok(resp) => {
                outcome.checked += 1;
                tracing::debug!(
                    index,
                    snippets = resp.snippets.len(),
                    timings_ms = ?resp.timings_ms,
                    "searched fragment"
                );
                if let Some((snippet, run_length)) =
                    first_match(fragment, &resp.snippets, opts.length_threshold)
                {
                    tracing::info!(
                        index,
                        run_length,
                        fragment = %fragment,
                        result = %snippet.text,
                        url = %resp.query_url,
                        "fragment flagged"
                    );
                    outcome.matches.push(MatchResult {
                        index,
                        fragment: fragment.clone(),
                        url: resp.query_url,
                        snippet: snippet.text.clone(),
                        run_length,
                    });
                }
            }
        }
        progress.inc(1);

        let pause = jitter(opts.max_delay);
        if !pause.is_zero() {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    outcome.interrupted = true;
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    if outcome.interrupted {
        tracing::warn!(
            checked = outcome.checked,
            total = outcome.total,
            "interrupted; keeping partial results"
        );
    }
    outcome
}
