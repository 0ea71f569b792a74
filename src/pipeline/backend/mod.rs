//! Extraction backends: turn `(document, local pages)` into a fragment.
//!
//! Two interchangeable implementations sit behind [`ExtractionBackend`]:
//!
//! | Backend | Fidelity | Needs |
//! |---------|----------|-------|
//! | [`ToolBackend`]   | lossless, byte-stable | page-selection executable (`pdftk`) on `PATH` |
//! | [`RasterBackend`] | lossy re-rasterisation | pdfium shared library |
//!
//! [`select::select_backend`] picks one per request. Every group of the
//! request then goes through that same backend; a tool failure is never
//! retried through the raster path.
//!
//! ## Fragment lifetime
//!
//! A PDF fragment is a [`tempfile::TempPath`] inside the request's scratch
//! directory, so dropping the fragment deletes the file. That holds on the
//! error path too: whatever fragments a failed range had produced are
//! removed when the `Vec<Fragment>` holding them goes out of scope.

pub mod raster;
pub mod select;
pub mod tool;

pub use raster::{PageRasterizer, RasterBackend};
pub use select::{select_backend, PathProbe, ToolProbe};
pub use tool::ToolBackend;

use crate::document::{Rotation, SourceDocument};
use crate::error::SplitError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempPath;

/// Which backend served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Tool,
    Raster,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Tool => f.write_str("tool"),
            BackendKind::Raster => f.write_str("raster"),
        }
    }
}

/// Output of one extraction call. Page *k* is `document.page[local_pages[k]]`.
#[derive(Debug)]
pub enum Fragment {
    /// A temporary PDF written by the page-selection tool.
    Pdf(TempPath),
    /// Rasterised pages held in memory until the final encode.
    Raster(Vec<DynamicImage>),
}

impl Fragment {
    /// Path of the temporary PDF, if this fragment is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Fragment::Pdf(p) => Some(p),
            Fragment::Raster(_) => None,
        }
    }
}

/// Strategy for page extraction, rotation and concatenation.
pub trait ExtractionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Produce a fragment whose pages are `local_pages` of `document`, in
    /// that order. Temporary files go into `scratch`.
    fn extract(
        &self,
        document: &SourceDocument,
        local_pages: &[u32],
        scratch: &Path,
    ) -> Result<Fragment, SplitError>;

    /// Rotate the fragment's pages; `rotations[k]` applies to page `k + 1`.
    fn rotate(
        &self,
        fragment: &mut Fragment,
        rotations: &[Rotation],
        scratch: &Path,
    ) -> Result<(), SplitError>;

    /// Concatenate `fragments` in order into a PDF at `output`.
    fn merge(
        &self,
        fragments: Vec<Fragment>,
        output: &Path,
        scratch: &Path,
    ) -> Result<(), SplitError>;
}

/// Reserve a uniquely named, ASCII-only `.pdf` path inside `dir`.
///
/// The file exists (empty) until the returned path is dropped.
pub(crate) fn scratch_pdf(dir: &Path, prefix: &str) -> Result<TempPath, SplitError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".pdf")
        .tempfile_in(dir)
        .map(|f| f.into_temp_path())
        .map_err(|e| SplitError::io(format!("creating scratch file in {}", dir.display()), e))
}
