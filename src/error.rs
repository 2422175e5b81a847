//! Error type for the pdf2png library.
//!
//! Every failure is fatal to the run: there is no per-page recovery and no
//! retry. [`Pdf2PngError`] is returned as `Err` from the top-level `convert*`
//! functions, and the variants are grouped by the stage that produced them so
//! the CLI (or an embedding application) can tell an unreadable input apart
//! from a page that failed half-way through the document.
//!
//! When a page-stage error ([`Pdf2PngError::is_page_failure`]) is returned,
//! files for earlier pages are still on disk unless the rollback policy was
//! selected in [`crate::config::FailurePolicy`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2png library.
#[derive(Debug, Error)]
pub enum Pdf2PngError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// The engine could not open or parse the document.
    #[error("Failed to open PDF '{path}' with {engine}: {detail}")]
    DocumentOpen {
        path: PathBuf,
        engine: &'static str,
        detail: String,
    },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Page errors ───────────────────────────────────────────────────────
    /// The engine failed to rasterise a page (1-indexed).
    #[error("Rasterisation failed for page {page}: {detail}")]
    PageRender { page: usize, detail: String },

    /// PNG encoding failed for a page (1-indexed).
    #[error("PNG encoding failed for page {page}: {source}")]
    Encode {
        page: usize,
        #[source]
        source: image::ImageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory (or one of its parents).
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a page image into the output directory.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The selected rendering engine is not installed or could not be loaded.
    #[error("{engine} rendering engine is unavailable: {detail}")]
    EngineUnavailable { engine: &'static str, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2PngError {
    /// `true` for failures raised inside the page loop.
    ///
    /// These are the only errors after which earlier pages may already be
    /// present in the output directory.
    pub fn is_page_failure(&self) -> bool {
        matches!(
            self,
            Pdf2PngError::PageRender { .. }
                | Pdf2PngError::Encode { .. }
                | Pdf2PngError::OutputWriteFailed { .. }
        )
    }

    /// The 1-indexed page the error refers to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            Pdf2PngError::PageRender { page, .. } | Pdf2PngError::Encode { page, .. } => {
                Some(*page)
            }
            _ => None,
        }
    }
}

impl From<pdfium_auto::PdfiumAutoError> for Pdf2PngError {
    fn from(e: pdfium_auto::PdfiumAutoError) -> Self {
        Pdf2PngError::EngineUnavailable {
            engine: "pdfium",
            detail: format!(
                "{e}\n\n\
libpdfium could not be located.\n\
  • Run `pdf2png` once without --offline to download it automatically.\n\
  • Or set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Or pass --engine poppler to use the poppler-utils tools instead."
            ),
        }
    }
}
