//! Attachment extraction: email container bytes → zero or more PDFs.
//!
//! Two stages, tried in order:
//!
//! 1. [`msg::extract`] reads the container as an OLE2 compound file and
//!    keeps every attachment named `*.pdf` whose payload is a readable PDF.
//! 2. [`scan::recover`] runs when stage 1 cannot open the container **or**
//!    keeps nothing. It scans the raw bytes for PDF signatures.
//!
//! Neither stage returns an error: rejected attachments and container parse
//! failures are logged and the caller just receives fewer documents.

pub mod msg;
pub mod scan;

use crate::document::DocumentOrigin;
use thiserror::Error;
use tracing::{info, warn};

/// A PDF recovered from a container, validated but not yet stored.
#[derive(Debug, Clone)]
pub struct RecoveredPdf {
    /// Resolved attachment name, or `document_<n>.pdf` from the scan.
    pub name: String,
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub origin: DocumentOrigin,
}

/// Why a candidate was not kept. Logged, never returned.
#[derive(Debug, Error)]
pub enum AttachmentRejected {
    #[error("extension is not .pdf")]
    NotPdfExtension,
    #[error("no binary payload")]
    MissingPayload,
    #[error("payload does not start with %PDF")]
    BadMagic,
    #[error("region of {len} bytes is below the length threshold")]
    TooShort { len: usize },
    #[error("does not open as a PDF: {0}")]
    Unreadable(String),
}

/// Recover every PDF from `bytes`, structured parse first.
///
/// `min_scan_len` is the strict lower bound on scan candidate length.
pub fn extract_attachments(container: &str, bytes: &[u8], min_scan_len: usize) -> Vec<RecoveredPdf> {
    or_scan(container, msg::extract(container, bytes), || {
        scan::recover(container, bytes, min_scan_len)
    })
}

fn or_scan(
    container: &str,
    structured: Result<Vec<RecoveredPdf>, msg::ContainerParseError>,
    scan: impl FnOnce() -> Vec<RecoveredPdf>,
) -> Vec<RecoveredPdf> {
    match structured {
        Ok(found) if !found.is_empty() => found,
        Ok(_) => {
            info!(
                "{}: no PDF attachments via structured parse; scanning bytes",
                container
            );
            scan()
        }
        Err(e) => {
            warn!("{}: {}; scanning bytes", container, e);
            scan()
        }
    }
}
