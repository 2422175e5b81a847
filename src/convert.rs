//! Conversion entry points.
//!
//! [`convert`] is the primary API: it validates the source, binds the
//! engine named in the config and runs the page loop. [`convert_with_engine`]
//! runs the same loop against any [`RenderEngine`], which is how embedding
//! applications reuse an already-bound engine and how the pipeline is tested.
//!
//! Pages are processed strictly one after another in document order. The
//! first failure ends the run; see [`crate::config::FailurePolicy`] for what
//! happens to pages written before it.

use crate::config::{ConversionConfig, FailurePolicy};
use crate::error::Pdf2PngError;
use crate::output::{ConversionReport, DocumentInfo, PageInfo, PageOutput};
use crate::pipeline::engine::{engine_for, RenderDocument, RenderEngine, RenderScale};
use crate::pipeline::{encode, input, write};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every page of a PDF into `pageNN.png` files inside `output_dir`.
///
/// # Arguments
/// * `source`    : path of an existing PDF file
/// * `output_dir`: destination directory; created with its parents if missing
/// * `config`    : engine, DPI and output options
///
/// # Errors
/// - [`Pdf2PngError::FileNotFound`] before anything is written
/// - [`Pdf2PngError::EngineUnavailable`] if the engine cannot be loaded
/// - document-open errors if the engine rejects the file
/// - page errors ([`Pdf2PngError::is_page_failure`]) if a page fails; earlier
///   pages stay on disk unless [`FailurePolicy::Rollback`] is configured
///
/// # Example
/// ```rust,no_run
/// use pdf2png::{convert, ConversionConfig};
///
/// let report = convert("sample.pdf", "./out", &ConversionConfig::default())?;
/// println!("{} pages saved to {}", report.pages_written, report.output_directory.display());
/// # Ok::<(), pdf2png::Pdf2PngError>(())
/// ```
pub fn convert(
    source: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2PngError> {
    config.validate()?;
    // A missing source is reported before the engine library is even loaded.
    let source = input::resolve_local(source.as_ref())?;
    let engine = engine_for(config.engine)?;
    convert_with_engine(engine.as_ref(), &source, output_dir, config)
}

/// Run the conversion loop with a caller-supplied engine.
///
/// `config.engine` is only recorded in the report; `engine` does the work.
pub fn convert_with_engine(
    engine: &dyn RenderEngine,
    source: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2PngError> {
    let total_start = Instant::now();
    config.validate()?;

    // ── Step 1: Validate input ───────────────────────────────────────────
    let source = input::resolve_local(source.as_ref())?;
    let output_dir = output_dir.as_ref();
    info!(
        "Starting conversion: {} → {} ({} @ {} DPI)",
        source.display(),
        output_dir.display(),
        engine.name(),
        config.dpi
    );

    // ── Step 2: Prepare output directory ─────────────────────────────────
    write::ensure_output_dir(output_dir)?;

    // ── Step 3: Open document ────────────────────────────────────────────
    let document = engine.open(&source, config.password.as_deref())?;
    let total_pages = document.page_count();
    let width = config.padding.width_for(total_pages);
    let scale = RenderScale::from_dpi(config.dpi);
    info!("Converting {} pages from {}", total_pages, source.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages, output_dir);
    }

    // ── Step 4: Render, encode, write each page in order ─────────────────
    let mut pages: Vec<PageOutput> = Vec::with_capacity(total_pages);
    for index in 0..total_pages {
        let page_num = index + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }

        match convert_page(document.as_ref(), index, width, scale, output_dir, config) {
            Ok(page) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(&page, total_pages);
                }
                pages.push(page);
            }
            Err(e) => {
                warn!("Page {}/{} failed: {}", page_num, total_pages, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page_num, total_pages, &e.to_string());
                }
                drop(document);
                apply_failure_policy(config.failure_policy, &pages);
                return Err(e);
            }
        }
    }

    // ── Step 5: Release document ─────────────────────────────────────────
    drop(document);

    // ── Step 6: Summary ──────────────────────────────────────────────────
    let report = ConversionReport {
        source,
        output_directory: output_dir.to_path_buf(),
        engine: config.engine,
        dpi: config.dpi,
        pages_written: pages.len(),
        total_bytes: pages.iter().map(|p| p.file_size).sum(),
        pages,
        duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} images saved to {} in {}ms",
        report.pages_written,
        report.output_directory.display(),
        report.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&report);
    }

    Ok(report)
}

/// Convert PDF bytes held in memory.
///
/// The bytes are written to a managed temp file that is deleted when this
/// returns; the report's `source` points at that (already removed) file.
pub fn convert_from_bytes(
    bytes: &[u8],
    output_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionReport, Pdf2PngError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("pdf2png-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Pdf2PngError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Pdf2PngError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(tmp.path(), output_dir, config)
}

/// Describe what a conversion would produce without rendering or writing.
///
/// Lists page sizes, the planned file names and the expected pixel
/// dimensions at `config.dpi`.
pub fn inspect(
    source: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentInfo, Pdf2PngError> {
    config.validate()?;
    let source = input::resolve_local(source.as_ref())?;
    let engine = engine_for(config.engine)?;
    inspect_with_engine(engine.as_ref(), &source, config)
}

/// [`inspect`] with a caller-supplied engine.
pub fn inspect_with_engine(
    engine: &dyn RenderEngine,
    source: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentInfo, Pdf2PngError> {
    config.validate()?;
    let source = input::resolve_local(source.as_ref())?;
    let document = engine.open(&source, config.password.as_deref())?;
    let page_count = document.page_count();
    let width = config.padding.width_for(page_count);
    let scale = RenderScale::from_dpi(config.dpi);

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let size = document.page_size(index)?;
        let (width_px, height_px) = size.pixels_at(scale);
        pages.push(PageInfo {
            page_num: index + 1,
            width_pt: size.width_pt,
            height_pt: size.height_pt,
            file_name: write::page_file_name(index + 1, width),
            width_px,
            height_px,
        });
    }

    Ok(DocumentInfo {
        source,
        engine: config.engine,
        dpi: config.dpi,
        page_count,
        pages,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Render, encode and write a single page.
fn convert_page(
    document: &dyn RenderDocument,
    index: usize,
    width: usize,
    scale: RenderScale,
    output_dir: &Path,
    config: &ConversionConfig,
) -> Result<PageOutput, Pdf2PngError> {
    let page_num = index + 1;
    let image = document.render_page(index, scale)?;

    let png = encode::encode_png(&image, config.compression).map_err(|e| Pdf2PngError::Encode {
        page: page_num,
        source: e,
    })?;

    let file_name = write::page_file_name(page_num, width);
    let path = write::write_page(output_dir, &file_name, &png)?;
    debug!("Saved {} ({}x{}px, {} bytes)", file_name, image.width(), image.height(), png.len());

    Ok(PageOutput {
        page_num,
        file_name,
        path,
        width: image.width(),
        height: image.height(),
        file_size: png.len() as u64,
    })
}

fn apply_failure_policy(policy: FailurePolicy, written: &[PageOutput]) {
    match policy {
        FailurePolicy::KeepPartial => {
            if !written.is_empty() {
                info!("Keeping {} pages written before the failure", written.len());
            }
        }
        FailurePolicy::Rollback => {
            let paths: Vec<_> = written.iter().map(|p| p.path.clone()).collect();
            let removed = write::remove_pages(&paths);
            info!("Rolled back {} of {} written pages", removed, written.len());
        }
    }
}
