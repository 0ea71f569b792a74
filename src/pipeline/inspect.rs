//! Structural inspection: open a PDF and report how many pages it has.
//!
//! Page counting goes through `lopdf` so it works without the pdfium shared
//! library; pdfium is only needed once the raster fallback is selected.

use crate::error::SplitError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// The four-byte signature every PDF starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Whether `bytes` begin with the `%PDF` signature.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Open the PDF at `path` and count its pages.
pub fn count_pages(path: &Path) -> Result<u32, SplitError> {
    if !path.exists() {
        return Err(SplitError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let doc = Document::load(path).map_err(|e| SplitError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let pages = doc.get_pages().len() as u32;
    if pages == 0 {
        return Err(SplitError::CorruptPdf {
            path: path.to_path_buf(),
            detail: "document has no pages".into(),
        });
    }
    debug!("{}: {} pages", path.display(), pages);
    Ok(pages)
}

/// Parse PDF bytes held in memory and count pages.
pub fn count_pages_mem(bytes: &[u8]) -> Result<u32, String> {
    let doc = Document::load_mem(bytes).map_err(|e| e.to_string())?;
    match doc.get_pages().len() as u32 {
        0 => Err("document has no pages".into()),
        n => Ok(n),
    }
}
