//! Raster fallback: render pages to images and rebuild a PDF from them.
//!
//! Used when no page-selection tool is available. Fragments stay in memory
//! as decoded images; rotation turns the images themselves, and the merge
//! step concatenates every fragment's images and encodes them once, so the
//! JPEG round-trip happens a single time per output document.

use super::{BackendKind, ExtractionBackend, Fragment};
use crate::document::{Rotation, SourceDocument};
use crate::error::SplitError;
use crate::pipeline::encode;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Renders 1-based `pages` of the PDF at `pdf_path`, in the given order.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path, pages: &[u32]) -> Result<Vec<DynamicImage>, SplitError>;
}

/// Backend that re-rasterises pages and emits image-only PDFs.
#[derive(Clone)]
pub struct RasterBackend {
    rasterizer: Arc<dyn PageRasterizer>,
    dpi: u32,
    jpeg_quality: u8,
}

impl RasterBackend {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, dpi: u32, jpeg_quality: u8) -> Self {
        Self {
            rasterizer,
            dpi,
            jpeg_quality,
        }
    }
}

impl std::fmt::Debug for RasterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterBackend")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish_non_exhaustive()
    }
}

/// Turn `img` clockwise by `rotation`.
pub fn rotate_image(img: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => img,
        Rotation::Clockwise => img.rotate90(),
        Rotation::UpsideDown => img.rotate180(),
        Rotation::CounterClockwise => img.rotate270(),
    }
}

impl ExtractionBackend for RasterBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Raster
    }

    fn extract(
        &self,
        document: &SourceDocument,
        local_pages: &[u32],
        _scratch: &Path,
    ) -> Result<Fragment, SplitError> {
        let images = self.rasterizer.rasterize(document.path(), local_pages)?;
        if images.len() != local_pages.len() {
            return Err(SplitError::Rasterisation {
                path: document.path().to_path_buf(),
                page: local_pages.get(images.len()).copied().unwrap_or(0),
                detail: format!(
                    "rasteriser returned {} image(s) for {} page(s)",
                    images.len(),
                    local_pages.len()
                ),
            });
        }
        debug!(
            "rasterised {} page(s) of {}",
            images.len(),
            document.original_name()
        );
        Ok(Fragment::Raster(images))
    }

    fn rotate(
        &self,
        fragment: &mut Fragment,
        rotations: &[Rotation],
        _scratch: &Path,
    ) -> Result<(), SplitError> {
        let Fragment::Raster(images) = fragment else {
            return Err(SplitError::Internal(
                "raster backend cannot rotate a PDF fragment".into(),
            ));
        };
        let taken = std::mem::take(images);
        *images = taken
            .into_iter()
            .enumerate()
            .map(|(i, img)| {
                let rotation = rotations.get(i).copied().unwrap_or(Rotation::None);
                rotate_image(img, rotation)
            })
            .collect();
        Ok(())
    }

    fn merge(
        &self,
        fragments: Vec<Fragment>,
        output: &Path,
        _scratch: &Path,
    ) -> Result<(), SplitError> {
        let mut pages = Vec::new();
        for fragment in fragments {
            match fragment {
                Fragment::Raster(images) => pages.extend(images),
                Fragment::Pdf(_) => {
                    return Err(SplitError::Internal(
                        "raster backend cannot merge a PDF fragment".into(),
                    ))
                }
            }
        }

        let pdf = encode::images_to_pdf(&pages, self.dpi, self.jpeg_quality)?;
        std::fs::write(output, &pdf)
            .map_err(|e| SplitError::io(format!("writing {}", output.display()), e))?;
        info!(
            "encoded {} page(s) → {} ({} bytes)",
            pages.len(),
            output.display(),
            pdf.len()
        );
        Ok(())
    }
}
