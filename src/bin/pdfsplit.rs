//! CLI binary for edgequake-pdfsplit.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SplitConfig`, range specs and a rotation map, and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfsplit::{
    describe_index, split_ranges_async, BackendPreference, ProgressCallback, RangeSpec,
    RotationMap, Session, SplitConfig, SplitProgressCallback, SplitReport, UploadedFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info_span, Instrument};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the range specs, one log line per finished range.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_split_start(&self, total_ranges: usize, total_pages: u32) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} ranges  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_ranges as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Splitting");
        self.bar.println(dim(&format!(
            "{total_pages} pages in the document set, {total_ranges} range(s)"
        )));
    }

    fn on_range_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_range_complete(&self, index: usize, total: usize, name: &str, pages: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            dim(&format!("{pages} pages")),
        ));
        self.bar.inc(1);
    }

    fn on_range_error(&self, index: usize, total: usize, name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}",
            red("✗"),
            index + 1,
            total,
            name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_split_complete(&self, total: usize, success: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} ranges split", green("✔"), bold(&success.to_string()));
        } else {
            eprintln!(
                "{} {}/{} ranges split  ({} failed)",
                red("⚠"),
                bold(&success.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Two outputs from one scan
  pdfsplit scan.pdf -o out --range "1-3:Invoice 42:INV" --range "4-5:Act"

  # Ranges span documents: page 4 is the first page of b.pdf when a.pdf has 3
  pdfsplit a.pdf b.pdf -o out --range "2-5:Contract"

  # PDFs attached to an Outlook message
  pdfsplit mail.msg -o out --range "1:Cover" --range "2-9:Rest"

  # Ranges and rotations from JSON
  pdfsplit a.pdf -o out --ranges-json ranges.json --rotations-json rot.json

  # Show the global page numbering only
  pdfsplit a.pdf mail.msg --inspect

RANGE SYNTAX:
  "1-3,5,7-9"   pages 1, 2, 3, 5, 7, 8, 9 of the combined document set
  --range "<pages>:<name>[:<type>[:<system number>]]"

  ranges.json:    [{"range": "1-3", "name": "Invoice", "type": "INV", "systemNumber": "42"}]
  rotations.json: {"2": 90, "7": 180}

ENVIRONMENT VARIABLES:
  PDFSPLIT_BACKEND   auto | tool | raster
  PDFSPLIT_TOOL      page-selection tool name or path (default: pdftk)
  PDFIUM_LIB_PATH    libpdfium file or directory for the raster backend
  RUST_LOG           overrides the log filter
"#;

/// Split PDF and Outlook MSG files into new PDFs by global page range.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Split PDF and MSG files into new PDFs by page range",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or .msg files, in page order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Range spec "<pages>:<name>[:<type>[:<system number>]]". Repeatable.
    #[arg(short, long = "range", value_name = "SPEC")]
    ranges: Vec<String>,

    /// JSON file holding an array of range specs.
    #[arg(long, env = "PDFSPLIT_RANGES_JSON")]
    ranges_json: Option<PathBuf>,

    /// JSON file mapping global page numbers to 0/90/180/270 degrees.
    #[arg(long, env = "PDFSPLIT_ROTATIONS_JSON")]
    rotations_json: Option<PathBuf>,

    /// Directory for the output PDFs.
    #[arg(short, long, env = "PDFSPLIT_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Extraction backend: auto, tool or raster.
    #[arg(long, env = "PDFSPLIT_BACKEND", default_value = "auto")]
    backend: BackendPreference,

    /// Page-selection tool name or path.
    #[arg(long, env = "PDFSPLIT_TOOL")]
    tool: Option<String>,

    /// Rasterisation DPI for the raster backend (72–400).
    #[arg(long, env = "PDFSPLIT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// JPEG quality for the raster backend (1–100).
    #[arg(long, env = "PDFSPLIT_QUALITY", default_value_t = 80,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Abort on the first failing range.
    #[arg(long, env = "PDFSPLIT_FAIL_FAST")]
    fail_fast: bool,

    /// Print the JSON report instead of one line per output.
    #[arg(long, env = "PDFSPLIT_JSON")]
    json: bool,

    /// Print the global page index and exit.
    #[arg(long)]
    inspect: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFSPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSPLIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect;
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

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SplitProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    // ── Ingest ───────────────────────────────────────────────────────────
    let uploads = cli
        .inputs
        .iter()
        .map(|p| UploadedFile::from_path(p).with_context(|| format!("Failed to read {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let mut session = Session::new(&config).context("Failed to create session")?;
    session.ingest(uploads).context("Failed to ingest inputs")?;

    // ── Inspect mode ─────────────────────────────────────────────────────
    if cli.inspect {
        let entries = describe_index(session.documents()).context("Failed to index documents")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).context("Failed to serialise index")?
            );
        } else {
            for e in &entries {
                println!(
                    "{:>5}-{:<5} {:>4} pages  {}",
                    e.first_page, e.last_page, e.page_count, e.name
                );
            }
        }
        return Ok(());
    }

    // ── Split ────────────────────────────────────────────────────────────
    let ranges = collect_ranges(&cli).await?;
    let rotations = match cli.rotations_json {
        Some(ref path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read rotations from {}", path.display()))?;
            RotationMap::from_json(&json).context("Invalid rotation map")?
        }
        None => RotationMap::new(),
    };

    let report = split_ranges_async(
        session.documents().to_vec(),
        ranges,
        rotations,
        cli.output.clone(),
        config,
    )
    .instrument(info_span!("split", session = %session.token()))
    .await
    .context("Split failed")?;

    print_report(&cli, &report, show_progress)?;
    Ok(())
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let mut builder = SplitConfig::builder()
        .backend(cli.backend)
        .raster_dpi(cli.dpi)
        .jpeg_quality(cli.quality)
        .fail_fast(cli.fail_fast);

    if let Some(ref tool) = cli.tool {
        let as_path = PathBuf::from(tool);
        builder = if as_path.components().count() > 1 {
            builder.tool_path(as_path)
        } else {
            builder.tool_name(tool.clone())
        };
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// `--range` flags first, then the JSON file's entries.
async fn collect_ranges(cli: &Cli) -> Result<Vec<RangeSpec>> {
    let mut ranges = cli
        .ranges
        .iter()
        .map(|s| parse_range_flag(s))
        .collect::<Result<Vec<_>>>()?;

    if let Some(ref path) = cli.ranges_json {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read ranges from {}", path.display()))?;
        let from_file: Vec<RangeSpec> =
            serde_json::from_str(&json).context("Ranges JSON must be an array of range specs")?;
        ranges.extend(from_file);
    }

    if ranges.is_empty() {
        anyhow::bail!("No ranges given; use --range or --ranges-json");
    }
    Ok(ranges)
}

/// Parse `"<pages>:<name>[:<type>[:<system number>]]"`.
fn parse_range_flag(s: &str) -> Result<RangeSpec> {
    let mut parts = s.splitn(4, ':');
    let range = parts.next().unwrap_or_default().trim();
    let name = parts.next().map(str::trim).unwrap_or_default();
    if range.is_empty() || name.is_empty() {
        anyhow::bail!("Invalid range spec '{}': expected <pages>:<name>", s);
    }

    let mut spec = RangeSpec::new(range, name);
    if let Some(code) = parts.next().map(str::trim).filter(|c| !c.is_empty()) {
        spec = spec.with_classification(code);
    }
    if let Some(number) = parts.next().map(str::trim).filter(|n| !n.is_empty()) {
        spec = spec.with_system_number(number);
    }
    Ok(spec)
}

fn print_report(cli: &Cli, report: &SplitReport, show_progress: bool) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    for doc in &report.documents {
        println!("{}", doc.path.display());
    }
    if !cli.quiet {
        // The progress callback has already listed failures.
        if !show_progress {
            for failure in &report.failures {
                eprintln!("{} {}", red("✗"), failure);
            }
        }
        let stats = &report.stats;
        eprintln!(
            "{}  {}/{} ranges  {}ms  →  {}",
            if report.is_complete() { green("✔") } else { red("⚠") },
            stats.ranges_succeeded,
            stats.ranges_requested,
            stats.duration_ms,
            bold(&cli.output.display().to_string()),
        );
    }
    Ok(())
}
