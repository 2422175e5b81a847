//! CLI binary for pdf2png.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2png::{
    convert, inspect, ConversionConfig, ConversionProgressCallback, ConversionReport, EngineKind,
    FailurePolicy, PageOutput, PagePadding, PngCompression, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one `Saved:` line per page.
///
/// When the bar is hidden (`--no-progress`, or stderr is not a terminal) the
/// per-page lines are still written, straight to stderr.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the page currently being rendered.
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER_TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    /// Per-page lines only, no bar.
    fn new_plain() -> Arc<Self> {
        Arc::new(Self {
            bar: ProgressBar::hidden(),
            page_started: Mutex::new(None),
        })
    }

    /// Print a line above the bar. Hidden bars drop `println`, so those
    /// lines go to stderr directly.
    fn line(&self, msg: String) {
        if self.bar.is_hidden() {
            eprintln!("{msg}");
        } else {
            self.bar.println(msg);
        }
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize, output_dir: &Path) {
        self.activate_bar(total_pages);
        self.line(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages…")),
            dim(&format!("→ {}", output_dir.display()))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page: &PageOutput, _total: usize) {
        let secs = self.page_elapsed_secs();
        self.line(format!(
            "  {} Saved: {} ({}x{}px, {:.1} KB)  {}",
            green("✓"),
            page.file_name,
            page.width,
            page.height,
            page.size_kib(),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.page_elapsed_secs();

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.line(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, _report: &ConversionReport) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default engine (pdfium) at 150 DPI
  pdf2png chapter1.pdf ./chapters/chapter01

  # Explicit DPI
  pdf2png chapter1.pdf ./chapters/chapter01 300

  # Poppler tools at 200 DPI with maximum PNG compression
  pdf2png --engine poppler chapter1.pdf ./out

  # Show pages and planned file names without rendering
  pdf2png --inspect-only chapter1.pdf ./out

  # Machine-readable report on stdout
  pdf2png --json chapter1.pdf ./out > report.json

ENGINES:
  Engine    Default DPI  Compression  Requires
  ───────   ───────────  ───────────  ───────────────────────────────────
  pdfium    150          default      libpdfium (downloaded on first run)
  poppler   200          best         pdfinfo + pdftoppm (poppler-utils)

ENVIRONMENT VARIABLES:
  PDF2PNG_ENGINE          Default engine (pdfium, poppler)
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
  POPPLER_PATH            Directory holding pdfinfo and pdftoppm
  RUST_LOG                Override the log filter (e.g. pdf2png=debug)

  PDFium (~30 MB) is downloaded on first use of the pdfium engine and cached
  in ~/.cache/pdf2png/pdfium-7690/. Pass --offline to skip the download and
  use a cached or system copy instead.
"#;

/// Convert every page of a PDF into numbered PNG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2png",
    version,
    about = "Convert every page of a PDF into numbered PNG images",
    long_about = "Render each page of a PDF, in order, at a chosen DPI and save it as \
<output_dir>/page01.png, page02.png, … Rendering is done by the pdfium library or by the \
poppler-utils command-line tools.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    pdf_path: PathBuf,

    /// Directory for the PNG files; created if missing.
    output_dir: PathBuf,

    /// Rendering resolution in dots per inch [default: 150 pdfium, 200 poppler].
    #[arg(env = "PDF2PNG_DPI", value_parser = clap::value_parser!(u32).range(1..))]
    dpi: Option<u32>,

    /// Rasterisation engine.
    #[arg(long, env = "PDF2PNG_ENGINE", value_enum, default_value = "pdfium")]
    engine: EngineArg,

    /// PNG compression effort [default: engine preset].
    #[arg(long, env = "PDF2PNG_COMPRESSION", value_enum)]
    compression: Option<CompressionArg>,

    /// Page-number padding in file names: auto or a digit count.
    #[arg(long, env = "PDF2PNG_PADDING", default_value = "auto", value_parser = parse_padding)]
    padding: PagePadding,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2PNG_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Delete pages written by this run if a later page fails.
    #[arg(long, env = "PDF2PNG_ROLLBACK")]
    rollback: bool,

    /// Print the conversion report (or inspection) as JSON on stdout.
    #[arg(long, env = "PDF2PNG_JSON")]
    json: bool,

    /// List pages and planned output files without rendering.
    #[arg(long, env = "PDF2PNG_INSPECT_ONLY")]
    inspect_only: bool,

    /// Never download PDFium; use PDFIUM_LIB_PATH, the cache or the system library.
    #[arg(long, env = "PDF2PNG_OFFLINE")]
    offline: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2PNG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PNG_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Pdfium,
    Poppler,
}

impl From<EngineArg> for EngineKind {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Pdfium => EngineKind::Pdfium,
            EngineArg::Poppler => EngineKind::Poppler,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CompressionArg {
    Default,
    Fast,
    Best,
}

impl From<CompressionArg> for PngCompression {
    fn from(v: CompressionArg) -> Self {
        match v {
            CompressionArg::Default => PngCompression::Default,
            CompressionArg::Fast => PngCompression::Fast,
            CompressionArg::Best => PngCompression::Best,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let report_pages = !cli.quiet && !cli.json && !cli.inspect_only;
    let show_progress = report_pages && !cli.no_progress;
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

    let engine = EngineKind::from(cli.engine);

    // ── Fail fast on a missing source ────────────────────────────────────
    // Checked before any PDFium download so a typo costs nothing.
    if !cli.pdf_path.is_file() {
        anyhow::bail!("PDF file not found: {}", cli.pdf_path.display());
    }

    // ── Ensure PDFium engine is available ────────────────────────────────
    if engine == EngineKind::Pdfium && !cli.offline {
        ensure_pdfium(cli.quiet || cli.json)?;
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else if report_pages {
        let cb = CliProgressCallback::new_plain();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, engine, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.pdf_path, &config).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise inspection")?
            );
        } else {
            println!("File:     {}", info.source.display());
            println!("Engine:   {}", info.engine);
            println!("DPI:      {}", info.dpi);
            println!("Pages:    {}", info.page_count);
            for page in &info.pages {
                println!(
                    "  {}  {:>7.1} x {:<7.1} pt  →  {}x{}px",
                    page.file_name, page.width_pt, page.height_pt, page.width_px, page.height_px
                );
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("Converting PDF: {}", cli.pdf_path.display())),
            dim(&format!("({} @ {} DPI)", config.engine, config.dpi)),
        );
    }

    let report = convert(&cli.pdf_path, &cli.output_dir, &config).context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "\n{} Conversion complete! {} images saved to {}",
            green("✔"),
            bold(&report.pages_written.to_string()),
            bold(&report.output_directory.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "{:.1} KB total in {}ms",
                report.total_bytes as f64 / 1024.0,
                report.duration_ms
            )),
        );
    }

    Ok(())
}

/// Download PDFium on first use, with a byte-progress bar unless `silent`.
fn ensure_pdfium(silent: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }

    if silent {
        pdfium_auto::ensure_pdfium_library(None).context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
        if let Some(t) = total {
            if bar.length().unwrap_or(0) != t {
                bar.set_length(t);
            }
        }
        bar.set_position(downloaded);
    }))
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    engine: EngineKind,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder_for(engine)
        .padding(cli.padding)
        .failure_policy(if cli.rollback {
            FailurePolicy::Rollback
        } else {
            FailurePolicy::KeepPartial
        });

    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(compression) = cli.compression {
        builder = builder.compression(compression.into());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--padding`: `auto` or a positive digit count.
fn parse_padding(s: &str) -> std::result::Result<PagePadding, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("auto") {
        return Ok(PagePadding::Auto);
    }
    match s.parse::<usize>() {
        Ok(0) => Err("padding must be at least 1 digit".to_string()),
        Ok(n) => Ok(PagePadding::Fixed(n)),
        Err(_) => Err(format!("expected 'auto' or a digit count, got '{s}'")),
    }
}
