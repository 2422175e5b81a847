//! Configuration types for PDF-to-PNG conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`] or taken from an engine preset with
//! [`ConversionConfig::preset`].
//!
//! The two presets mirror the two ways pages have historically been
//! rasterised for this project: the native pdfium engine at 150 DPI, and the
//! poppler toolkit at 200 DPI with maximum PNG compression. Everything a
//! preset sets can be overridden on the builder.

use crate::error::Pdf2PngError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default DPI of the pdfium preset.
pub const PDFIUM_DEFAULT_DPI: u32 = 150;

/// Default DPI of the poppler preset.
pub const POPPLER_DEFAULT_DPI: u32 = 200;

/// Minimum zero-padding width for page numbers in file names.
pub const MIN_PAGE_NUMBER_WIDTH: usize = 2;

/// Configuration for a PDF-to-PNG conversion.
///
/// # Example
/// ```rust
/// use pdf2png::{ConversionConfig, EngineKind, PngCompression};
///
/// let config = ConversionConfig::builder_for(EngineKind::Poppler)
///     .dpi(300)
///     .compression(PngCompression::Fast)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Which external engine rasterises the pages. Default: [`EngineKind::Pdfium`].
    pub engine: EngineKind,

    /// Rendering resolution. The scale factor applied to the page is
    /// `dpi / 72`, since PDF user space is 72 units per inch.
    ///
    /// Only `dpi > 0` is enforced. Very large values fail downstream when the
    /// engine cannot allocate the bitmap.
    pub dpi: u32,

    /// PNG compression effort. Default: taken from the engine preset.
    pub compression: PngCompression,

    /// Zero-padding of the page number in `pageNN.png`. Default: [`PagePadding::Auto`].
    pub padding: PagePadding,

    /// What happens to already-written pages when a later page fails.
    /// Default: [`FailurePolicy::KeepPartial`].
    pub failure_policy: FailurePolicy,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::preset(EngineKind::Pdfium)
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("engine", &self.engine)
            .field("dpi", &self.dpi)
            .field("compression", &self.compression)
            .field("padding", &self.padding)
            .field("failure_policy", &self.failure_policy)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// The configuration an engine uses when nothing is overridden.
    pub fn preset(engine: EngineKind) -> Self {
        Self {
            engine,
            dpi: engine.default_dpi(),
            compression: engine.default_compression(),
            padding: PagePadding::default(),
            failure_policy: FailurePolicy::default(),
            password: None,
            progress_callback: None,
        }
    }

    /// Create a new builder starting from the pdfium preset.
    pub fn builder() -> ConversionConfigBuilder {
        Self::builder_for(EngineKind::Pdfium)
    }

    /// Create a new builder starting from the given engine's preset.
    pub fn builder_for(engine: EngineKind) -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::preset(engine),
        }
    }

    /// Check the invariants `build()` enforces.
    ///
    /// Fields are public, so the pipeline re-validates before it touches the
    /// filesystem.
    pub fn validate(&self) -> Result<(), Pdf2PngError> {
        if self.dpi == 0 {
            return Err(Pdf2PngError::InvalidConfig(
                "DPI must be a positive integer, got 0".into(),
            ));
        }
        if let PagePadding::Fixed(0) = self.padding {
            return Err(Pdf2PngError::InvalidConfig(
                "Fixed page-number padding must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    /// Switch engine. DPI and compression keep whatever was set so far.
    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn compression(mut self, compression: PngCompression) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn padding(mut self, padding: PagePadding) -> Self {
        self.config.padding = padding;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2PngError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The external rasterisation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Native pdfium library through `pdfium-render`. (default)
    #[default]
    Pdfium,
    /// poppler-utils command-line tools (`pdfinfo`, `pdftoppm`).
    Poppler,
}

impl EngineKind {
    /// Lower-case engine name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Pdfium => "pdfium",
            EngineKind::Poppler => "poppler",
        }
    }

    pub fn default_dpi(self) -> u32 {
        match self {
            EngineKind::Pdfium => PDFIUM_DEFAULT_DPI,
            EngineKind::Poppler => POPPLER_DEFAULT_DPI,
        }
    }

    pub fn default_compression(self) -> PngCompression {
        match self {
            EngineKind::Pdfium => PngCompression::Default,
            EngineKind::Poppler => PngCompression::Best,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// PNG compression effort. Output is lossless and non-interlaced in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    /// Encoder default: balanced size and speed. (default)
    #[default]
    Default,
    /// Fastest encode, largest files.
    Fast,
    /// Smallest files: best deflate level with adaptive row filtering.
    Best,
}

/// Zero-padding width for the page number in output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PagePadding {
    /// Enough digits for the last page, never fewer than two:
    /// `page01.png` for short documents, `page001.png` once there are 100+ pages,
    /// so names always sort in page order. (default)
    #[default]
    Auto,
    /// Always pad to exactly this many digits. Numbers wider than the padding
    /// are written in full.
    Fixed(usize),
}

impl PagePadding {
    /// Padding width for a document with `total_pages` pages.
    pub fn width_for(self, total_pages: usize) -> usize {
        match self {
            PagePadding::Auto => digit_count(total_pages).max(MIN_PAGE_NUMBER_WIDTH),
            PagePadding::Fixed(width) => width,
        }
    }
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// What to do with pages already written when a later page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Leave earlier pages on disk; the output directory is provisional until
    /// the conversion returns `Ok`. (default)
    #[default]
    KeepPartial,
    /// Delete every file written during the failed run before returning the error.
    Rollback,
}
