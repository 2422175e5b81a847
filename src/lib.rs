//! # pdf2png
//!
//! Rasterise every page of a PDF into numbered PNG files.
//!
//! The heavy lifting is done by an external engine: the native pdfium
//! library, or the poppler-utils tools. This crate owns the conversion
//! procedure around them: validating the input, preparing the output
//! directory, rendering pages strictly in order at the requested DPI,
//! encoding and naming each PNG, and reporting progress and errors.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   check the file exists, is readable and starts with %PDF
//!  ├─ 2. Output  create the output directory (and parents)
//!  ├─ 3. Open    load the document through pdfium or poppler
//!  ├─ 4. Render  each page at dpi / 72 scale into an RGB buffer
//!  ├─ 5. Encode  lossless PNG
//!  └─ 6. Write   <output_dir>/page01.png, page02.png, …
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2png::{convert, ConversionConfig, EngineKind};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Poppler preset: 200 DPI, maximum PNG compression.
//!     let config = ConversionConfig::preset(EngineKind::Poppler);
//!     let report = convert("sample.pdf", "./out", &config)?;
//!     for page in &report.pages {
//!         println!("{} ({}x{}px)", page.file_name, page.width, page.height);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2png` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Engines
//!
//! | Engine | Default DPI | Compression | Needs |
//! |--------|-------------|-------------|-------|
//! | `pdfium`  | 150 | default | libpdfium (`PDFIUM_LIB_PATH`, cache, or system) |
//! | `poppler` | 200 | best    | `pdfinfo` + `pdftoppm` on `PATH` or in `POPPLER_PATH` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, EngineKind, FailurePolicy, PagePadding,
    PngCompression, PDFIUM_DEFAULT_DPI, POPPLER_DEFAULT_DPI,
};
pub use convert::{convert, convert_from_bytes, convert_with_engine, inspect, inspect_with_engine};
pub use error::Pdf2PngError;
pub use output::{ConversionReport, DocumentInfo, PageInfo, PageOutput};
pub use pipeline::engine::{PageSize, RenderDocument, RenderEngine, RenderScale};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
