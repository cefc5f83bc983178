//! CLI binary for sentinelcheck.
//!
//! A thin shim over the library crate: maps CLI flags to `AnalysisConfig`,
//! feeds the selected file through the upload surface into a `Session`, and
//! prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sentinelcheck::{
    extraction_json, parse_drop_payload, render_report, AnalysisConfig, AnalysisResult,
    PdfMode, ReportStyle, RiskThresholds, RunId, SelectedFile, Session, UploadEvent,
    UploadSurface, VisionAnalyzer, WorkflowObserver, WorkflowPhase, GENERIC_FAILURE_MESSAGE,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── Spinner observer using indicatif ─────────────────────────────────────────

/// Shows a spinner while a run is Uploading or Analyzing.
///
/// A fresh bar is created per run; it is cleared as soon as the run leaves
/// the busy phases so the report prints on a clean line.
struct SpinnerObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn spinner(prefix: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }
}

impl WorkflowObserver for SpinnerObserver {
    fn on_phase_change(&self, _run: Option<RunId>, phase: WorkflowPhase) {
        let mut slot = self.bar.lock().unwrap_or_else(|p| p.into_inner());
        match phase {
            WorkflowPhase::Uploading => {
                let bar = Self::spinner("Uploading");
                bar.set_message("Encoding document…");
                *slot = Some(bar);
            }
            WorkflowPhase::Analyzing => {
                let bar = slot.get_or_insert_with(|| Self::spinner("Analyzing"));
                bar.set_prefix("Analyzing");
                bar.set_message("Waiting for the model…");
            }
            WorkflowPhase::Complete | WorkflowPhase::Error | WorkflowPhase::Idle => {
                if let Some(bar) = slot.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a scanned check
  sentinelcheck check.jpg

  # PDF from a URL, full JSON result written to a file
  sentinelcheck https://bank.example/scans/check-1042.pdf -o result.json

  # Machine-readable output on stdout
  sentinelcheck --json deposit.png > result.json

  # Copy the extracted fields to the clipboard
  sentinelcheck --copy-json check.webp

  # Drag files onto the terminal one after another
  sentinelcheck --interactive

  # Use an image-only provider; the PDF's first page is rendered via pdfium
  sentinelcheck --provider openai --model gpt-4.1 --pdf-mode rasterise check.pdf

ACCEPTED FILES:
  image/jpeg, image/png, image/webp, application/pdf
  Local paths (or file:// URIs), HTTP/HTTPS URLs, and data: URIs.

RISK COLOURS:
  The gauge, shield and badge colour follow the numeric risk score:
    score > 75 (--high-threshold)       red
    score > 40 (--elevated-threshold)   yellow
    otherwise                           green
  The badge text is the model's risk level, shown unchanged.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  SENTINEL_LLM_PROVIDER   Override provider (gemini, openai, anthropic, ollama)
  SENTINEL_MODEL          Override model ID (default: gemini-2.5-flash)
  PDFIUM_LIB_PATH         Path to libpdfium, for --pdf-mode rasterise
"#;

/// Extract check details and score fraud risk with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "sentinelcheck",
    version,
    about = "Extract bank-check details and score fraud risk with a Vision LLM",
    long_about = "Send a scanned bank check (JPEG, PNG, WEBP or PDF) to a multimodal model, \
which transcribes the check and assesses fraud risk. The result is rendered as a terminal \
report with a colour-coded risk gauge, fraud alerts, and the extracted fields.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Check image or PDF: local path, HTTP/HTTPS URL, or data URI.
    #[arg(required_unless_present = "interactive")]
    input: Option<String>,

    /// Read dropped file paths from stdin, one analysis per line.
    #[arg(short, long, env = "SENTINEL_INTERACTIVE")]
    interactive: bool,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "SENTINEL_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default: gemini-2.5-flash).
    #[arg(long, env = "SENTINEL_MODEL")]
    model: Option<String>,

    /// Print the full result as JSON instead of the report.
    #[arg(long, env = "SENTINEL_JSON")]
    json: bool,

    /// Copy the extracted fields as JSON to the clipboard.
    #[arg(long, env = "SENTINEL_COPY_JSON")]
    copy_json: bool,

    /// Disable ANSI colours in the report.
    #[arg(long, env = "SENTINEL_NO_COLOR")]
    no_color: bool,

    /// How PDFs reach the model.
    #[arg(long, env = "SENTINEL_PDF_MODE", value_enum, default_value = "inline")]
    pdf_mode: PdfModeArg,

    /// Analysis call timeout in seconds.
    #[arg(long, env = "SENTINEL_API_TIMEOUT", default_value_t = 90)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SENTINEL_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SENTINEL_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "SENTINEL_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SENTINEL_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Scores above this are shown red.
    #[arg(long, env = "SENTINEL_HIGH_THRESHOLD", default_value_t = 75)]
    high_threshold: u8,

    /// Scores above this (and not above the high threshold) are shown yellow.
    #[arg(long, env = "SENTINEL_ELEVATED_THRESHOLD", default_value_t = 40)]
    elevated_threshold: u8,

    /// Also write the full result as JSON to this file.
    #[arg(short, long, env = "SENTINEL_OUTPUT")]
    output: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SENTINEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the report and errors.
    #[arg(short, long, env = "SENTINEL_QUIET")]
    quiet: bool,

    /// Disable the spinner.
    #[arg(long, env = "SENTINEL_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PdfModeArg {
    Inline,
    Rasterise,
}

impl From<PdfModeArg> for PdfMode {
    fn from(v: PdfModeArg) -> Self {
        match v {
            PdfModeArg::Inline => PdfMode::Inline,
            PdfModeArg::Rasterise => PdfMode::Rasterise,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config and session ─────────────────────────────────────────
    let config = build_config(&cli).await?;
    config
        .ensure_credentials()
        .context("Cannot start without provider credentials")?;

    let analyzer = VisionAnalyzer::from_config(&config).context("Failed to initialise provider")?;
    let mut session = Session::new(analyzer, config.clone());
    if show_progress {
        session = session.with_observer(SpinnerObserver::new());
    }

    let style = ReportStyle {
        color: !cli.no_color && io::stdout().is_terminal(),
        thresholds: config.thresholds,
        ..ReportStyle::default()
    };
    let status = ReportStyle {
        color: !cli.no_color && io::stderr().is_terminal(),
        ..style.clone()
    };
    let term = Term {
        report: &style,
        status: &status,
    };

    if cli.interactive {
        run_interactive(&cli, &session, &term).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(ref input) = cli.input else {
        anyhow::bail!("No input given");
    };
    let file = match select(UploadEvent::Pick(Some(input.clone()))) {
        Ok(Some(file)) => file,
        Ok(None) => anyhow::bail!("No file selected"),
        Err(reason) => anyhow::bail!(reason),
    };

    // Dropping the session on return removes a failed run's preview.
    if analyze_one(&cli, &session, &term, file).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Styles for stdout (the report) and stderr (status lines).
struct Term<'a> {
    report: &'a ReportStyle,
    status: &'a ReportStyle,
}

/// Read terminal drops from stdin until EOF or `quit`.
async fn run_interactive<A: sentinelcheck::CheckAnalyzer>(
    cli: &Cli,
    session: &Session<A>,
    term: &Term<'_>,
) -> Result<()> {
    let prompt = || {
        eprint!(
            "{} Drop a check (JPEG, PNG, WEBP, PDF) and press Enter, or type quit: ",
            term.status.cyan("◆")
        );
        io::stderr().flush().ok();
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if matches!(line, "q" | "quit" | "exit") {
            break;
        }
        if !line.is_empty() {
            match select(UploadEvent::Drop(parse_drop_payload(line))) {
                Ok(Some(file)) => {
                    analyze_one(cli, session, term, file).await?;
                    session.reset();
                }
                Ok(None) => {}
                Err(reason) => eprintln!("{} {}", term.status.red("✗"), reason),
            }
        }
        prompt();
    }
    eprintln!();
    Ok(())
}

/// Pass one event through a fresh upload surface.
///
/// `Ok(None)` when nothing was selected, `Err` with the reason when the
/// entry was refused.
fn select(event: UploadEvent) -> std::result::Result<Option<SelectedFile>, String> {
    let mut picked = None;
    let mut surface = UploadSurface::new(|file| picked = Some(file));
    let fired = surface.handle(event);
    let rejection = surface.last_rejection().map(str::to_string);
    drop(surface);

    match (fired, rejection) {
        (true, _) => Ok(picked),
        (false, Some(reason)) => Err(reason),
        (false, None) => Ok(None),
    }
}

/// Run one file and print its outcome. Returns `false` if the run ended in
/// the Error phase.
async fn analyze_one<A: sentinelcheck::CheckAnalyzer>(
    cli: &Cli,
    session: &Session<A>,
    term: &Term<'_>,
    file: SelectedFile,
) -> Result<bool> {
    session.submit(file).await.context("Could not start analysis")?;
    let snapshot = session.snapshot();

    let Some(result) = snapshot.result else {
        let message = snapshot
            .error
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        eprintln!("{} {}", term.status.red("✗"), message);
        return Ok(false);
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(render_report(&result, term.report).as_bytes())
            .context("Failed to write to stdout")?;
        // One-shot previews are gone once the process returns.
        if cli.interactive && !cli.quiet {
            if let Some(ref f) = snapshot.file {
                let line = format!("Preview: {}", f.preview_path.display());
                writeln!(handle, "\n{}", term.report.dim(&line)).ok();
            }
        }
    }

    if cli.copy_json {
        copy_extraction(&result, cli.quiet, term.status);
    }

    if let Some(ref path) = cli.output {
        result
            .write_json(path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            let saved = format!("Saved {}", path.display());
            eprintln!("{} {}", term.status.green("✔"), term.status.dim(&saved));
        }
    }

    Ok(true)
}

/// Copy the extracted fields to the system clipboard. Failure is reported
/// but not fatal.
fn copy_extraction(result: &AnalysisResult, quiet: bool, status: &ReportStyle) {
    let copied = extraction_json(&result.extraction)
        .map_err(|e| e.to_string())
        .and_then(|json| {
            arboard::Clipboard::new()
                .and_then(|mut clipboard| clipboard.set_text(json))
                .map_err(|e| e.to_string())
        });

    match copied {
        Ok(()) if !quiet => eprintln!(
            "{} {}",
            status.green("✔"),
            status.dim("Extracted data copied to clipboard")
        ),
        Ok(()) => {}
        Err(e) => eprintln!("{} Could not copy to clipboard: {}", status.red("✗"), e),
    }
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .pdf_mode(cli.pdf_mode.clone().into())
        .thresholds(RiskThresholds {
            high: cli.high_threshold,
            elevated: cli.elevated_threshold,
        });

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }

    builder.build().context("Invalid configuration")
}
