//! Pipeline stages for PDF-to-PNG conversion.
//!
//! Each submodule implements exactly one step. The engines sit behind the
//! [`engine::RenderEngine`] trait so the loop in [`crate::convert`] never
//! knows which library produced the pixels.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ engine ──▶ encode ──▶ write
//! (path)   (pdfium /  (PNG)     (pageNN.png)
//!           poppler)
//! ```
//!
//! 1. [`input`]  : check the source exists, is readable and starts with `%PDF`
//! 2. [`engine`] : open the document and rasterise one page at a time;
//!    implemented by [`render`] (pdfium) and [`poppler`] (poppler-utils)
//! 3. [`encode`] : PNG-encode the RGB buffer
//! 4. [`write`]  : create the output directory, name and write each file

pub mod encode;
pub mod engine;
pub mod input;
pub mod poppler;
pub mod render;
pub mod write;
