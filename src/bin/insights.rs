//! CLI binary for report-insights.
//!
//! A thin shim over the library crate: maps flags and environment onto
//! `InsightsConfig`, resolves the LLM provider once, and reads/writes
//! reports as JSON files.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use edgequake_llm::{LLMProvider, ProviderFactory};
use indicatif::{ProgressBar, ProgressStyle};
use report_insights::pipeline::input::{load_upload, report_path};
use report_insights::{
    Analyst, DocumentExtractor, IngestProgressCallback, InsightsConfig, LlmGenerator,
    PdfExtractor, ReportData, ReportPipeline,
};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Model used when a provider is named without a model.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar for `insights report`. Files complete out of order,
/// so each line names its file index.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, _index: usize, _total: usize, filename: &str) {
        self.bar.set_message(filename.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, report_id: &str) {
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(report_id)
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 100 {
            format!("{}\u{2026}", error.chars().take(99).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar
            .println(format!("  {} File {:>3}/{:<3}  {}", red("✗"), index, total, red(&msg)));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} files turned into reports{}",
            if failed == 0 { green("✔") } else { red("⚠") },
            bold(&success_count.to_string()),
            total_files,
            if failed == 0 {
                String::new()
            } else {
                format!("  ({} failed)", red(&failed.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Check a PDF (no API key needed)
  insights inspect weekly-report.pdf

  # Extracted, cleaned text
  insights extract weekly-report.pdf -o report.txt

  # Build reports from several PDFs into ./reports
  insights report a.pdf b.pdf https://example.org/c.pdf --out-dir reports

  # Markdown narrative for one report
  insights narrative reports/energy-prices.json

  # Cross-report storyboard
  insights storyboard reports/*.json -o storyboard.json

  # Ask a question about a report
  insights chat reports/energy-prices.json "What drove the price increase?"

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium
"#;

/// Turn PDF economic reports into structured reports with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "insights",
    version,
    about = "Turn PDF economic reports into structured, chart-ready reports with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, global = true, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default with --provider: gemini-2.5-flash).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Directory containing the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Number of files processed concurrently.
    #[arg(short, long, global = true, env = "INSIGHTS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per LLM call.
    #[arg(long, global = true, env = "INSIGHTS_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true, env = "INSIGHTS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "INSIGHTS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Largest accepted PDF in MiB.
    #[arg(long, global = true, env = "INSIGHTS_MAX_FILE_MB", default_value_t = 50)]
    max_file_mb: u64,

    /// Disable progress bar.
    #[arg(long, global = true, env = "INSIGHTS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "INSIGHTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "INSIGHTS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a PDF and print its page count.
    Inspect {
        /// Local PDF path or HTTP/HTTPS URL.
        input: String,
    },
    /// Print the cleaned text of a PDF.
    Extract {
        input: String,
        /// Write the text to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build reports from PDFs and write them as <id>.json.
    Report {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
    /// Write a Markdown narrative for one report.
    Narrative { report: PathBuf },
    /// Synthesise a storyboard across reports.
    Storyboard {
        #[arg(required = true)]
        reports: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Ask a question about one report.
    Chat { report: PathBuf, message: String },
    /// Show whether AI features are enabled.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match &cli.command {
        Command::Inspect { input } => {
            let upload =
                load_upload(input, config.download_timeout_secs, config.max_file_size).await?;
            let extractor = bind_extractor(&config)?;
            let validation =
                tokio::task::spawn_blocking(move || extractor.validate(&upload.bytes))
                    .await
                    .context("Validation task failed")?;
            println!("File:     {input}");
            println!("Valid:    {}", validation.is_valid);
            println!("Message:  {}", validation.message);
            if !validation.is_valid {
                bail!("{}", validation.message);
            }
        }

        Command::Extract { input, output } => {
            let upload =
                load_upload(input, config.download_timeout_secs, config.max_file_size).await?;
            let extractor = bind_extractor(&config)?;
            let text = tokio::task::spawn_blocking(move || extractor.extract_text(&upload.bytes))
                .await
                .context("Extraction task failed")?;
            if text.is_empty() {
                warn!("No text could be extracted from {input}");
            }
            match output {
                Some(path) => tokio::fs::write(path, &text)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{text}"),
            }
        }

        Command::Report { inputs, out_dir } => {
            let extractor = bind_extractor(&config)?;
            let analyst = build_analyst(&cli, &config);
            if !analyst.is_available() && !cli.quiet {
                eprintln!("{} AI features are disabled; every file will fail analysis", red("⚠"));
            }

            let mut uploads = Vec::with_capacity(inputs.len());
            let mut load_errors = Vec::new();
            for input in inputs {
                match load_upload(input, config.download_timeout_secs, config.max_file_size)
                    .await
                {
                    Ok(upload) => uploads.push(upload),
                    Err(e) => load_errors.push(format!("'{input}': {e}")),
                }
            }

            tokio::fs::create_dir_all(out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;
            let taken = existing_ids(out_dir).await?;

            let mut pipeline =
                ReportPipeline::new(Arc::new(extractor), Arc::new(analyst), config.clone());
            if show_progress {
                pipeline = pipeline.with_progress(CliProgressCallback::new());
            }
            let response = pipeline.ingest(uploads, &taken).await;

            for report in &response.reports {
                let path = report_path(out_dir, &report.id);
                write_json(&path, report).await?;
                info!("Wrote {}", path.display());
                if !cli.quiet {
                    eprintln!("  {} {}", green("→"), path.display());
                }
            }
            for error in load_errors.iter().chain(&response.errors) {
                eprintln!("  {} {}", red("✗"), error);
            }
            if response.success_count == 0 {
                bail!("No reports were created");
            }
        }

        Command::Narrative { report } => {
            let report = read_report(report).await?;
            let narrative = build_analyst(&cli, &config)
                .generate_narrative(&report)
                .await
                .context("Narrative generation failed")?;
            println!("{narrative}");
        }

        Command::Storyboard { reports, output } => {
            let mut loaded = Vec::with_capacity(reports.len());
            for path in reports {
                loaded.push(read_report(path).await?);
            }
            let storyboard = build_analyst(&cli, &config)
                .generate_storyboard(&loaded)
                .await
                .context("Storyboard generation failed")?;
            match output {
                Some(path) => write_json(path, &storyboard).await?,
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&storyboard)
                        .context("Failed to serialise storyboard")?
                ),
            }
        }

        Command::Chat { report, message } => {
            let report = read_report(report).await?;
            let answer = build_analyst(&cli, &config)
                .chat(&report, message)
                .await
                .context("Chat failed")?;
            println!("{answer}");
        }

        Command::Status => {
            let analyst = build_analyst(&cli, &config);
            println!("AI features: {}", analyst.status());
            if let Analyst::Unavailable { reason } = &analyst {
                println!("Reason:      {reason}");
            }
        }
    }

    Ok(())
}

/// Map CLI args to `InsightsConfig`.
fn build_config(cli: &Cli) -> Result<InsightsConfig> {
    let mut builder = InsightsConfig::builder()
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_file_size_mib(cli.max_file_mb);
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    builder.build().context("Invalid configuration")
}

fn bind_extractor(config: &InsightsConfig) -> Result<PdfExtractor> {
    PdfExtractor::bind(config.pdfium_lib_path.as_deref()).context("PDF engine unavailable")
}

/// Resolve the provider once; any failure disables AI features instead of
/// aborting, so extraction-only commands keep working.
fn build_analyst(cli: &Cli, config: &InsightsConfig) -> Analyst {
    match resolve_provider(cli) {
        Ok(provider) => Analyst::new(
            Arc::new(LlmGenerator::new(provider, config)),
            config.clone(),
        ),
        Err(reason) => Analyst::unavailable(reason),
    }
}

/// Named provider (+ model) first, then auto-detection from API key variables.
fn resolve_provider(cli: &Cli) -> Result<Arc<dyn LLMProvider>, String> {
    if let Some(ref name) = cli.provider {
        let model = cli.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return ProviderFactory::create_llm_provider(name, model)
            .map_err(|e| format!("provider '{name}' could not be created: {e}"));
    }

    let (provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        format!("no LLM provider configured (set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY): {e}")
    })?;
    Ok(provider)
}

/// Ids of reports already in `dir`, taken from `<id>.json` file stems.
async fn existing_ids(dir: &Path) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem() {
                ids.insert(stem.to_string_lossy().into_owned());
            }
        }
    }
    Ok(ids)
}

async fn read_report(path: &Path) -> Result<ReportData> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a report", path.display()))
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise JSON")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
