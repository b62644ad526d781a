//! CLI binary for pdfmind.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, uploads one PDF and prints the outline, the raw result,
//! or a mindmap layout.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfmind::{
    layout_flowchart, layout_mindmap, render_outline, resolve_input, ClientConfig, DeploymentMode,
    OutlineOptions, ProgressCallback, UploadFile, UploadProgressCallback, UploadResult, Uploader,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the endpoint being tried and logs each failed attempt.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// The spinner stays hidden until the upload starts.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl UploadProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, filename: &str, candidates: usize) {
        self.bar.set_prefix("Uploading");
        self.bar
            .set_message(format!("{filename} ({candidates} candidate endpoints)"));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_attempt_start(&self, endpoint: &str, transport: &str, attempt: usize) {
        self.bar
            .set_message(format!("#{attempt} {endpoint} {}", dim(transport)));
    }

    fn on_attempt_failed(&self, endpoint: &str, transport: &str, error: &str) {
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<16} {:<9} {}",
            red("✗"),
            endpoint,
            dim(transport),
            dim(&msg)
        ));
    }

    fn on_upload_complete(&self, endpoint: &str, success: bool) {
        self.bar.finish_and_clear();
        if success {
            eprintln!("{} analysed via {}", green("✔"), endpoint);
        } else {
            eprintln!("{} {} answered, but without a usable analysis", yellow("⚠"), endpoint);
        }
    }

    fn on_upload_failed(&self, _error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} every endpoint failed", red("✘"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Outline of a local PDF through the dev proxy
  pdfmind paper.pdf

  # Straight to a production backend
  pdfmind --mode prod --base-url https://analysis.example.org paper.pdf

  # Full result envelope as JSON
  pdfmind --format json paper.pdf -o result.json

  # Mindmap layout with the second section expanded
  pdfmind --format mindmap --focus 2 paper.pdf

  # Concept map with the keyword cluster
  pdfmind --format flowchart paper.pdf

  # Try a specific route first, then only these fallbacks
  pdfmind --endpoint /v2/summarize --endpoints /summarize,/upload paper.pdf

  # Is the backend up? Which routes answer?
  pdfmind --probe
  pdfmind --discover

ENDPOINTS (default order):
  /summarize  /upload  /api/upload  /api/summarize  /process  /analyze

  Each endpoint is tried with the pooled multipart client first and a fresh
  HTTP/1.1 client second. A 404 skips straight to the next endpoint.

ENVIRONMENT VARIABLES:
  PDFMIND_BASE_URL    Backend origin or proxy prefix
  PDFMIND_MODE        dev (default, http://localhost:5173/api) or prod
  PDFMIND_ENDPOINT    Endpoint tried before the candidates
  PDFMIND_ENDPOINTS   Comma-separated candidate list
  PDFMIND_TIMEOUT     Per-attempt timeout in seconds (default: none)
  PDFMIND_FORMAT      outline, json, mindmap or flowchart
  PDFMIND_OUTPUT      Output file
  RUST_LOG            Overrides the log filter
"#;

/// Upload a PDF to an analysis backend and print its structure.
#[derive(Parser, Debug)]
#[command(
    name = "pdfmind",
    version,
    about = "Upload a PDF to an analysis backend and print its structure",
    long_about = "Upload a PDF (local file or URL) to a document-analysis backend, \
normalise whatever shape the answer comes back in, and print it as a Markdown outline, \
the full JSON result, a radial mindmap layout, or a concept-map layout.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present_any = ["probe", "discover"])]
    input: Option<String>,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDFMIND_OUTPUT")]
    output: Option<PathBuf>,

    /// Backend origin (prod) or proxy prefix (dev).
    #[arg(long, env = "PDFMIND_BASE_URL")]
    base_url: Option<String>,

    /// Deployment mode; decides the default base URL.
    #[arg(long, env = "PDFMIND_MODE", value_enum, default_value = "dev")]
    mode: ModeArg,

    /// Endpoint tried before the candidates.
    #[arg(long, env = "PDFMIND_ENDPOINT")]
    endpoint: Option<String>,

    /// Replace the candidate endpoints (comma-separated).
    #[arg(long, env = "PDFMIND_ENDPOINTS", value_delimiter = ',')]
    endpoints: Vec<String>,

    /// Per-attempt timeout in seconds. Default: wait indefinitely.
    #[arg(long, env = "PDFMIND_TIMEOUT")]
    timeout: Option<u64>,

    /// HTTP download timeout in seconds, for URL inputs.
    #[arg(long, env = "PDFMIND_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// What to print.
    #[arg(long, env = "PDFMIND_FORMAT", value_enum, default_value = "outline")]
    format: FormatArg,

    /// Mindmap: expand this section (1-based). Ignored by the other formats.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    focus: Option<u32>,

    /// Upload even if the file does not start with %PDF.
    #[arg(long)]
    allow_any: bool,

    /// Check the health endpoint and exit.
    #[arg(long, conflicts_with = "discover")]
    probe: bool,

    /// List the probe endpoints that answer HTTP 200 and exit.
    #[arg(long)]
    discover: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDFMIND_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFMIND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFMIND_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Dev,
    Prod,
}

impl From<ModeArg> for DeploymentMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Dev => DeploymentMode::Development,
            ModeArg::Prod => DeploymentMode::Production,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Outline,
    Json,
    Mindmap,
    Flowchart,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports each attempt, so INFO logs are only shown
    // when it is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.probe && !cli.discover;
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

    // ── Input ────────────────────────────────────────────────────────────
    // Read before the spinner exists so input errors print on a clean line.
    let file = if cli.probe || cli.discover {
        None
    } else {
        Some(read_input(&cli).await?)
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn UploadProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let uploader = Uploader::new(config.clone()).context("Failed to set up HTTP clients")?;

    // ── Probe / discover ─────────────────────────────────────────────────
    if cli.probe {
        let url = config.url_for(&config.health_endpoint);
        if uploader.probe_health().await {
            println!("{} {}", green("✔"), url);
            return Ok(());
        }
        anyhow::bail!("Backend is not healthy: {}", url);
    }
    if cli.discover {
        let found = uploader.discover_endpoints().await;
        if found.is_empty() && !cli.quiet {
            eprintln!("{} no probe endpoint answered HTTP 200", yellow("⚠"));
        }
        for ep in found {
            println!("{ep}");
        }
        return Ok(());
    }

    // ── Upload ───────────────────────────────────────────────────────────
    let file = file.context("An input file or URL is required")?;
    let result = match uploader.upload_to(&file, cli.endpoint.as_deref()).await {
        Ok(result) => result,
        Err(e) => {
            if cli.format == FormatArg::Json {
                let envelope = serde_json::to_string_pretty(&e.to_envelope())
                    .context("Failed to serialise failure envelope")?;
                emit(&cli, &envelope).await?;
            }
            return Err(e).context("Upload failed");
        }
    };

    if result.degraded && !cli.quiet {
        eprintln!("{} {}", yellow("⚠"), result.message);
    }

    let rendered = render(&cli, &result)?;
    emit(&cli, &rendered).await
}

/// Resolve the input argument and, unless `--allow-any`, check for `%PDF`.
async fn read_input(cli: &Cli) -> Result<UploadFile> {
    let input = cli.input.as_deref().context("An input file or URL is required")?;
    let file = resolve_input(input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to read input '{input}'"))?;
    if !cli.allow_any {
        file.ensure_pdf()
            .context("Refusing to upload (use --allow-any to override)")?;
    }
    Ok(file)
}

/// Turn the result into the selected output format.
fn render(cli: &Cli, result: &UploadResult) -> Result<String> {
    if cli.format == FormatArg::Json {
        return serde_json::to_string_pretty(result).context("Failed to serialise result");
    }

    let Some(doc) = result.analysis() else {
        anyhow::bail!(
            "{} (shape: {:?}); rerun with --format json to see the raw body",
            result.message,
            result.shape
        );
    };

    match cli.format {
        FormatArg::Mindmap => {
            let focus = cli.focus.map(|f| f as usize - 1);
            serde_json::to_string_pretty(&layout_mindmap(doc, focus))
                .context("Failed to serialise mindmap")
        }
        FormatArg::Flowchart => serde_json::to_string_pretty(&layout_flowchart(doc))
            .context("Failed to serialise concept map"),
        _ => Ok(render_outline(
            doc,
            &OutlineOptions {
                title: Some(result.filename.clone()),
                ..Default::default()
            },
        )),
    }
}

async fn emit(cli: &Cli, text: &str) -> Result<()> {
    match cli.output {
        Some(ref path) => {
            tokio::fs::write(path, text)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{} wrote {}", green("✔"), path.display());
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle
                    .write_all(b"\n")
                    .context("Failed to write to stdout")?;
            }
        }
    }
    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .mode(cli.mode.into())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    let endpoints: Vec<&str> = cli
        .endpoints
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();
    if !endpoints.is_empty() {
        builder = builder.endpoints(endpoints);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfmind::{DocumentAnalysis, Heading, ResponseShape};

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pdfmind").chain(args.iter().copied())).unwrap()
    }

    fn result() -> UploadResult {
        UploadResult {
            success: true,
            message: "ok".into(),
            data: Some(DocumentAnalysis {
                summary: "s".into(),
                keywords: vec!["alpha".into(), "beta".into()],
                headings: vec![Heading {
                    title: "Intro".into(),
                    ..Default::default()
                }],
            }),
            filename: "paper.pdf".into(),
            processing_time: 1,
            degraded: false,
            shape: ResponseShape::DirectDocument,
            endpoint: "/summarize".into(),
            raw: None,
        }
    }

    #[tokio::test]
    async fn non_pdf_input_is_refused_before_upload() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"plain text").unwrap();
        let path = tmp.path().to_str().unwrap().to_string();

        let err = read_input(&cli(&[path.as_str()])).await.unwrap_err();
        assert!(format!("{err:#}").contains("--allow-any"), "got: {err:#}");

        let file = read_input(&cli(&["--allow-any", path.as_str()]))
            .await
            .unwrap();
        assert_eq!(file.bytes, b"plain text");
    }

    #[tokio::test]
    async fn missing_input_fails_with_context() {
        let err = read_input(&cli(&["/definitely/not/here.pdf"]))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read input"));
    }

    #[test]
    fn flowchart_format_renders_the_concept_map() {
        let out = render(&cli(&["--format", "flowchart", "x.pdf"]), &result()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["width"], serde_json::json!(1000.0));
        let ids: Vec<&str> = v["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|n| n["id"].as_str())
            .collect();
        assert_eq!(ids, ["root", "heading-0", "keywords", "keyword-0", "keyword-1"]);
    }

    #[test]
    fn outline_is_the_default_format() {
        let out = render(&cli(&["x.pdf"]), &result()).unwrap();
        assert!(out.starts_with("# paper.pdf"), "got: {out}");
        assert!(out.contains("alpha, beta"));
    }
}
