//! The seam between the conversion loop and the external PDF engines.
//!
//! An engine only has to do three things: open a document by path, report
//! its page count, and rasterise one page at a given scale into an RGB
//! buffer. Closing is handled by dropping the [`RenderDocument`]. Anything
//! implementing these traits can drive [`crate::convert::convert_with_engine`],
//! which is also how the pipeline is tested without a real PDF library.

use crate::config::EngineKind;
use crate::error::Pdf2PngError;
use crate::pipeline::{poppler::PopplerEngine, render::PdfiumEngine};
use image::RgbImage;
use std::path::Path;

/// PDF user space units per inch. A scale factor of 1.0 renders at 72 DPI.
pub const POINTS_PER_INCH: f32 = 72.0;

/// A rendering resolution, convertible into the scale factor engines expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderScale {
    dpi: u32,
}

impl RenderScale {
    pub fn from_dpi(dpi: u32) -> Self {
        Self { dpi }
    }

    pub fn dpi(self) -> u32 {
        self.dpi
    }

    /// Multiplier from PDF points to pixels: `dpi / 72`.
    pub fn factor(self) -> f32 {
        self.dpi as f32 / POINTS_PER_INCH
    }

    /// Pixel length of `points` at this scale, rounded, never below one.
    pub fn pixels_for(self, points: f32) -> u32 {
        (points * self.factor()).round().max(1.0) as u32
    }
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// Expected `(width, height)` in pixels at `scale`.
    pub fn pixels_at(self, scale: RenderScale) -> (u32, u32) {
        (scale.pixels_for(self.width_pt), scale.pixels_for(self.height_pt))
    }
}

/// An external PDF rasterisation engine.
pub trait RenderEngine {
    /// Short engine name for logs and errors.
    fn name(&self) -> &'static str;

    /// Open a document. The returned handle borrows the engine and releases
    /// the document when dropped.
    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn RenderDocument + 'a>, Pdf2PngError>;
}

/// An open document owned by one conversion run.
pub trait RenderDocument {
    /// Number of pages, known as soon as the document is open.
    fn page_count(&self) -> usize;

    /// Size of the page at 0-based `index`, in points.
    fn page_size(&self, index: usize) -> Result<PageSize, Pdf2PngError>;

    /// Rasterise the page at 0-based `index` into an RGB buffer without alpha.
    ///
    /// Errors carry the 1-indexed page number.
    fn render_page(&self, index: usize, scale: RenderScale) -> Result<RgbImage, Pdf2PngError>;
}

/// Construct the engine a config asks for.
///
/// For pdfium this binds the shared library (without downloading it); for
/// poppler it only resolves where the tools live, and a missing install is
/// reported when the document is opened.
pub fn engine_for(kind: EngineKind) -> Result<Box<dyn RenderEngine>, Pdf2PngError> {
    match kind {
        EngineKind::Pdfium => Ok(Box::new(PdfiumEngine::bind()?)),
        EngineKind::Poppler => Ok(Box::new(PopplerEngine::from_env())),
    }
}
