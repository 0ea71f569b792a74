//! Output types: the per-range documents and the request report.

use crate::document::{ClassificationCode, RangeSpec};
use crate::error::RangeError;
use crate::pipeline::backend::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One output PDF, produced from one range spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    /// Zero-based position of the range spec in the request.
    pub index: usize,
    /// Range name as given by the caller.
    pub name: String,
    /// Sanitised file name, always ending in `.pdf`.
    pub file_name: String,
    /// Where the PDF was written. The caller owns the file.
    pub path: PathBuf,
    /// Raw range expression.
    pub range: String,
    #[serde(rename = "type")]
    pub classification: ClassificationCode,
    #[serde(rename = "systemNumber", skip_serializing_if = "Option::is_none")]
    pub system_number: Option<String>,
    /// Pages in the output document.
    pub page_count: usize,
    /// Global page numbers, in output order.
    pub source_pages: Vec<u32>,
    /// Size of the written file.
    pub bytes: u64,
}

impl OutputDocument {
    pub(crate) fn from_spec(
        index: usize,
        spec: &RangeSpec,
        file_name: String,
        path: PathBuf,
        source_pages: Vec<u32>,
        bytes: u64,
    ) -> Self {
        Self {
            index,
            name: spec.name.clone(),
            file_name,
            path,
            range: spec.range.clone(),
            classification: spec.classification.clone(),
            system_number: spec.system_number.clone(),
            page_count: source_pages.len(),
            source_pages,
            bytes,
        }
    }
}

/// Aggregate numbers for one split request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitStats {
    /// Pages in the global index.
    pub total_pages: u32,
    pub ranges_requested: usize,
    pub ranges_succeeded: usize,
    pub ranges_failed: usize,
    /// Pages turned by the rotation map, across all outputs.
    pub pages_rotated: usize,
    pub backend: Option<BackendKind>,
    pub duration_ms: u64,
}

/// Everything a split request produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReport {
    /// Token of the request's scratch namespace.
    pub request_id: String,
    /// Outputs in range-spec order.
    pub documents: Vec<OutputDocument>,
    /// Range specs that produced no output.
    pub failures: Vec<RangeError>,
    pub stats: SplitStats,
}

impl SplitReport {
    /// `true` when every range spec produced a document.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One document's slice of the global page index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub path: PathBuf,
    pub page_count: u32,
    /// First and last global page of the document.
    pub first_page: u32,
    pub last_page: u32,
}
