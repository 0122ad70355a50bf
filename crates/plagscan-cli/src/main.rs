use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plagscan_core::CheckOutcome;
use plagscan_local::check::{check_fragments, progress_bar, CheckOptions};
use plagscan_local::config::CheckConfig;
use plagscan_local::{input, report, segment_article, Backend};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "./config";
const DEFAULT_ARTICLE_PATH: &str = "./article.txt";
const DEFAULT_OUTPUT_HTML: &str = "./plagiarism_results.html";

#[derive(Parser, Debug)]
#[command(name = "plagscan")]
#[command(about = "Check an article sentence by sentence against web search results", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors and hide the progress bar.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every fragment and write an HTML report of flagged fragments.
    Check(CheckCmd),
    /// Print the fragments an article splits into, one per line.
    Segment(SegmentCmd),
    /// Print version info.
    Version,
}

#[derive(clap::Args, Debug)]
struct ArticleArgs {
    /// key=value config file. Defaults to ./config when it exists, else built-in defaults.
    #[arg(long, env = "PLAGSCAN_CONFIG")]
    config: Option<PathBuf>,
    /// Plain-text article to check.
    #[arg(long, default_value = DEFAULT_ARTICLE_PATH, conflicts_with = "stdin")]
    article: PathBuf,
    /// Read the article from stdin, up to an `endinput` / `end input` line.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    stdin: bool,
}

#[derive(clap::Args, Debug)]
struct CheckCmd {
    #[command(flatten)]
    input: ArticleArgs,
    /// HTML report path.
    #[arg(long, default_value = DEFAULT_OUTPUT_HTML)]
    out: PathBuf,
    /// Where snippets come from.
    #[arg(long, value_enum, default_value_t = BackendArg::Http)]
    backend: BackendArg,
}

#[derive(clap::Args, Debug)]
struct SegmentCmd {
    #[command(flatten)]
    input: ArticleArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Http,
    Browser,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Http => Backend::Http,
            BackendArg::Browser => Backend::Browser,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already set; skipping re-initialization.");
    }
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Version => {
            let v = serde_json::json!({
                "schema_version": 1,
                "name": "plagscan",
                "version": env!("CARGO_PKG_VERSION"),
            });
            println!("{v}");
            Ok(0)
        }
        Commands::Segment(args) => {
            let cfg = load_config(args.input.config.as_deref())?;
            let article = load_article(&args.input)?;
            for fragment in segment_article(&article, &cfg) {
                println!("{fragment}");
            }
            Ok(0)
        }
        Commands::Check(args) => run_check(args, cli.quiet).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<CheckConfig> {
    match path {
        Some(p) => CheckConfig::load(p).with_context(|| format!("loading config {}", p.display())),
        None => {
            let p = Path::new(DEFAULT_CONFIG_PATH);
            if p.is_file() {
                CheckConfig::load(p).with_context(|| format!("loading config {}", p.display()))
            } else {
                tracing::info!("no config file; using built-in defaults");
                CheckConfig::from_env().context("validating built-in config")
            }
        }
    }
}

fn load_article(args: &ArticleArgs) -> Result<String> {
    if args.stdin {
        if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
            eprintln!("Paste the article, then finish with a line containing `endinput`:");
        }
        let stdin = std::io::stdin();
        return Ok(input::read_until_sentinel(stdin.lock())?);
    }
    input::read_article(&args.article)
        .with_context(|| format!("reading article {}", args.article.display()))
}

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    schema_version: u32,
    ok: bool,
    backend: &'a str,
    fragments: usize,
    skipped: usize,
    checked: usize,
    matched: usize,
    failed: usize,
    interrupted: bool,
    report: String,
}

impl<'a> RunSummary<'a> {
    fn new(backend: &'a str, outcome: &CheckOutcome, report: &Path) -> Self {
        Self {
            schema_version: 1,
            ok: !outcome.interrupted,
            backend,
            fragments: outcome.total,
            skipped: outcome.skipped,
            checked: outcome.checked,
            matched: outcome.matches.len(),
            failed: outcome.failures.len(),
            interrupted: outcome.interrupted,
            report: report.display().to_string(),
        }
    }
}

async fn run_check(args: CheckCmd, quiet: bool) -> Result<i32> {
    let cfg = load_config(args.input.config.as_deref())?;
    let article = load_article(&args.input)?;
    let fragments = segment_article(&article, &cfg);
    tracing::info!(fragments = fragments.len(), "article segmented");

    let backend = Backend::from(args.backend);
    let source = backend
        .open(&cfg)
        .await
        .with_context(|| format!("starting {} backend", backend.as_str()))?;

    let pb = progress_bar(fragments.len() as u64, quiet);
    let shutdown = async {
        // If the signal handler cannot be installed, never interrupt.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let outcome = check_fragments(
        source.as_ref(),
        &fragments,
        &CheckOptions::from_config(&cfg),
        &pb,
        shutdown,
    )
    .await;
    pb.finish_and_clear();

    if let Err(e) = source.close().await {
        tracing::warn!(error = %e, "closing {} backend failed", backend.as_str());
    }

    report::write_html(&outcome.matches, &args.out)
        .with_context(|| format!("writing report {}", args.out.display()))?;
    tracing::info!(
        matched = outcome.matches.len(),
        failed = outcome.failures.len(),
        report = %args.out.display(),
        "report written"
    );

    let summary = RunSummary::new(backend.as_str(), &outcome, &args.out);
    println!("{}", serde_json::to_string(&summary)?);
    Ok(if outcome.interrupted { 130 } else { 0 })
}
