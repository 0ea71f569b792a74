//! Error types for the edgequake-pdfsplit library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SplitError`]: **Fatal**: the request cannot proceed at all (input
//!   file unreadable, page count unavailable, every range failed). Returned
//!   as `Err(SplitError)` from the top-level `split_*` functions.
//!
//! * [`RangeError`]: **Non-fatal**: one range spec could not be produced,
//!   but the others are fine. Stored in [`crate::output::SplitReport`] so
//!   callers can see which ranges are missing from the bundle.
//!
//! Container-level problems (an unreadable `.msg` structure, an attachment
//! that is not a PDF) never surface here: the attachment extractor logs them
//! and moves on to the next candidate or to the signature scan.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfsplit library.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The bytes do not start with the `%PDF` signature.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// Upload extension is neither `pdf` nor `msg`.
    #[error("Unsupported input '{name}': only PDF and MSG files are accepted")]
    UnsupportedInput { name: String },

    /// Upload exceeds the configured size ceiling.
    #[error("Input '{name}' is {size} bytes; the limit is {limit} bytes")]
    UploadTooLarge { name: String, size: u64, limit: u64 },

    /// The upload set produced no usable source document.
    #[error("None of the uploaded files yielded a readable PDF document")]
    NoDocuments,

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF could not be opened to determine its page count.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A target page has no entry in the global page index.
    #[error("Page {page} is not part of the document set ({total} pages in total)")]
    RangeResolution { page: u32, total: u32 },

    /// A range spec resolved to zero pages after clamping.
    #[error("Range '{range}' for '{name}' selects no pages (document set has {total} pages)")]
    EmptyRange {
        name: String,
        range: String,
        total: u32,
    },

    /// Rotation value outside `{0, 90, 180, 270}`.
    #[error("Rotation of {degrees}° on page {page} is invalid; expected 0, 90, 180 or 270")]
    InvalidRotation { page: u32, degrees: i64 },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The external page-selection tool exited non-zero or wrote nothing.
    #[error("'{tool}' failed ({status}): {stderr}")]
    ToolInvocation {
        tool: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// pdfium could not rasterise a page.
    #[error("Rasterisation failed for page {page} of '{path}': {detail}")]
    Rasterisation {
        path: PathBuf,
        page: u32,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install the page-selection tool \
so the raster fallback is not needed."
    )]
    PdfiumBindingFailed(String),

    /// No usable fragment could be produced for a range spec.
    #[error("Could not extract range '{range}': {source}")]
    ExtractionFailure {
        range: String,
        #[source]
        source: Box<SplitError>,
    },

    /// Every range spec of the request failed.
    #[error("All {total} ranges failed.\nFirst error: {first_error}")]
    AllRangesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SplitError {
    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SplitError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A non-fatal error for a single range spec.
///
/// Stored in [`crate::output::SplitReport::failures`]. The request keeps
/// going unless every range fails or `fail_fast` is set.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Range '{range}' ({name}): {detail}")]
pub struct RangeError {
    /// Zero-based position of the range spec in the request.
    pub index: usize,
    pub name: String,
    pub range: String,
    pub detail: String,
}
