//! Result types returned by the conversion entry points.

use crate::config::EngineKind;
use serde::Serialize;
use std::path::PathBuf;

/// Summary of a successful conversion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// The PDF that was converted.
    pub source: PathBuf,
    /// Directory holding the written PNG files.
    pub output_directory: PathBuf,
    /// Engine that rasterised the pages.
    pub engine: EngineKind,
    /// Resolution used for every page.
    pub dpi: u32,
    /// Number of PNG files written. Equals the document's page count.
    pub pages_written: usize,
    /// One entry per page, in page order.
    pub pages: Vec<PageOutput>,
    /// Sum of all PNG file sizes in bytes.
    pub total_bytes: u64,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

/// One written page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageOutput {
    /// 1-indexed page number.
    pub page_num: usize,
    /// File name inside the output directory, e.g. `page01.png`.
    pub file_name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Size of the PNG file in bytes.
    pub file_size: u64,
}

impl PageOutput {
    /// File size in KiB, as shown in progress lines.
    pub fn size_kib(&self) -> f64 {
        self.file_size as f64 / 1024.0
    }
}

/// What a conversion would produce, without rendering anything.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub source: PathBuf,
    pub engine: EngineKind,
    pub dpi: u32,
    pub page_count: usize,
    pub pages: Vec<PageInfo>,
}

/// Page geometry and the file it would be written to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Page width in PDF points (1/72 inch).
    pub width_pt: f32,
    /// Page height in PDF points.
    pub height_pt: f32,
    /// Planned output file name.
    pub file_name: String,
    /// Expected pixel width at the configured DPI.
    pub width_px: u32,
    /// Expected pixel height at the configured DPI.
    pub height_px: u32,
}
