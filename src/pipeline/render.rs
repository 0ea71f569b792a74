//! PDF rasterisation via pdfium: render selected pages to `DynamicImage`.
//!
//! ## Binding
//!
//! [`PdfiumRasterizer::new`] binds the pdfium shared library once as a check,
//! so a missing library is [`SplitError::PdfiumBindingFailed`] before any
//! range is processed. The binding handle is not thread-safe, so every
//! [`PageRasterizer::rasterize`] call binds again and drops the handle when it
//! returns. `PDFIUM_LIB_PATH` may name the library file or the directory
//! holding it; otherwise the system library search path is used.
//!
//! ## Resolution
//!
//! Pages are rendered at `dpi / 72` scale, so a US-Letter page at the default
//! 150 DPI comes out at 1275 × 1650 px. The encoder later maps pixels back to
//! points with the same DPI, which keeps the physical page size unchanged.
//!
//! Rendering is blocking and CPU-bound; callers on an async runtime reach it
//! through `spawn_blocking` (see [`crate::split::split_ranges_async`]).

use crate::error::SplitError;
use crate::pipeline::backend::PageRasterizer;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming a pdfium library file or directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind the pdfium library, honouring [`PDFIUM_LIB_PATH_ENV`].
pub fn bind_pdfium() -> Result<Pdfium, SplitError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(raw) => {
            let path = std::path::PathBuf::from(raw);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| SplitError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// [`PageRasterizer`] backed by pdfium. Holds only the render settings.
pub struct PdfiumRasterizer {
    dpi: u32,
}

impl PdfiumRasterizer {
    /// Check that pdfium binds, then render at `dpi`.
    pub fn new(dpi: u32) -> Result<Self, SplitError> {
        bind_pdfium()?;
        Ok(Self { dpi })
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl std::fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumRasterizer")
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf_path: &Path, pages: &[u32]) -> Result<Vec<DynamicImage>, SplitError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| SplitError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let doc_pages = document.pages();
        let total = doc_pages.len() as u32;
        info!("rasterising {} of {} page(s) at {} DPI", pages.len(), total, self.dpi);

        let render_config = PdfRenderConfig::new().scale_page_by_factor(self.dpi as f32 / 72.0);

        let mut images = Vec::with_capacity(pages.len());
        for &page_no in pages {
            let failed = |detail: String| SplitError::Rasterisation {
                path: pdf_path.to_path_buf(),
                page: page_no,
                detail,
            };
            if page_no == 0 || page_no > total {
                return Err(failed(format!("page out of range (document has {total})")));
            }

            let page = doc_pages
                .get((page_no - 1) as u16)
                .map_err(|e| failed(format!("{:?}", e)))?;
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| failed(format!("{:?}", e)))?;

            let image = bitmap.as_image();
            debug!(
                "rendered page {} → {}x{} px",
                page_no,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn rasterizer_is_shareable_across_threads() {
        assert_send_sync::<PdfiumRasterizer>();
    }

    #[test]
    fn rasterizer_holds_no_binding() {
        let r = PdfiumRasterizer { dpi: 150 };
        assert_eq!(r.dpi(), 150);
        assert_eq!(format!("{r:?}"), "PdfiumRasterizer { dpi: 150 }");
    }
}
