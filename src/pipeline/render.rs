//! Native rasterisation through pdfium.
//!
//! `pdfium-render` wraps the pdfium C++ library loaded at runtime. The
//! library is located by the `pdfium-auto` workspace crate; binding here never
//! downloads anything, so an embedding application stays offline unless it
//! calls `pdfium_auto::ensure_pdfium_library` itself (the CLI does).
//!
//! Pages are rendered with a uniform scale of `dpi / 72` rather than a
//! target width, so pixel sizes track the physical page size exactly.

use crate::error::Pdf2PngError;
use crate::pipeline::engine::{PageSize, RenderDocument, RenderEngine, RenderScale};
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// [`RenderEngine`] backed by a bound pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind libpdfium from `PDFIUM_LIB_PATH`, the local cache, or the system
    /// library search path, in that order.
    pub fn bind() -> Result<Self, Pdf2PngError> {
        let pdfium = pdfium_auto::bind_pdfium_offline()?;
        Ok(Self { pdfium })
    }

    /// Wrap an already-bound pdfium instance.
    pub fn from_pdfium(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl RenderEngine for PdfiumEngine {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn open<'a>(
        &'a self,
        path: &Path,
        password: Option<&'a str>,
    ) -> Result<Box<dyn RenderDocument + 'a>, Pdf2PngError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| open_error(path, password.is_some(), &e))?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// Map a pdfium load failure onto the password / corrupt-file variants.
fn open_error(path: &Path, had_password: bool, e: &PdfiumError) -> Pdf2PngError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            Pdf2PngError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2PngError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        Pdf2PngError::DocumentOpen {
            path: path.to_path_buf(),
            engine: "pdfium",
            detail: err_str,
        }
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RenderDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, Pdf2PngError> {
        let page = self
            .document
            .pages()
            .get(index as PdfPageIndex)
            .map_err(|e| Pdf2PngError::PageRender {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        Ok(PageSize {
            width_pt: page.width().value,
            height_pt: page.height().value,
        })
    }

    fn render_page(&self, index: usize, scale: RenderScale) -> Result<RgbImage, Pdf2PngError> {
        let page = self
            .document
            .pages()
            .get(index as PdfPageIndex)
            .map_err(|e| Pdf2PngError::PageRender {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale.factor());

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Pdf2PngError::PageRender {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        // pdfium fills the page background white, so dropping alpha is lossless.
        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );

        Ok(image)
    }
}

impl Drop for PdfiumDocument<'_> {
    fn drop(&mut self) {
        debug!("Closing pdfium document");
    }
}
