//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline writes each page. The CLI uses this to drive its
//! progress bar; library callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use pdf2png::{ConversionConfig, ConversionProgressCallback, PageOutput};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page: &PageOutput, total_pages: usize) {
//!         let done = self.written.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{} ({}/{})", page.file_name, done, total_pages);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ConversionReport, PageOutput};
use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Pages are processed strictly in order on the calling thread, so events
/// arrive in page order. The `Send + Sync` bound only exists so a config
/// holding the callback can be shared across threads.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the document is open, before the first page is rendered.
    ///
    /// # Arguments
    /// * `total_pages`: number of pages that will be written
    /// * `output_dir` : directory the pages are written into
    fn on_conversion_start(&self, total_pages: usize, output_dir: &Path) {
        let _ = (total_pages, output_dir);
    }

    /// Called just before a page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page's PNG is on disk.
    fn on_page_complete(&self, page: &PageOutput, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page fails. The conversion aborts right after.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages
    /// * `error`      : human-readable error description
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been written.
    fn on_conversion_complete(&self, report: &ConversionReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
