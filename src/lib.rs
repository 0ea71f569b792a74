//! # edgequake-pdfsplit
//!
//! Split an ordered set of PDF documents into new PDFs by page range.
//!
//! ## Why this crate?
//!
//! Scanned mail often arrives as one stack: an invoice, an act and a
//! contract in the same PDF, or spread over several PDFs attached to an
//! Outlook `.msg`. This crate treats every page of every document as one
//! globally numbered sequence, so a caller can say *"pages 2-4 and 9 are the
//! invoice"* without caring which file a page came from, and get back one
//! PDF per named range, with any per-page rotation applied.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (.pdf / .msg)
//!  │
//!  ├─ 1. Ingest    validate, store in the session, recover PDFs from .msg
//!  ├─ 2. Index     documents in order → global page numbers 1..=N
//!  ├─ 3. Parse     "1-3,7" → [1, 2, 3, 7]
//!  ├─ 4. Plan      group pages by source document, first-seen order
//!  ├─ 5. Extract   one fragment per group (pdftk or pdfium raster)
//!  ├─ 6. Rotate    turn fragment pages per the rotation map
//!  └─ 7. Merge     fragments → one output PDF per range
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfsplit::{split_ranges, RangeSpec, RotationMap, Session, SplitConfig, UploadedFile};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SplitConfig::default();
//!     let mut session = Session::new(&config)?;
//!     session.ingest(vec![
//!         UploadedFile::from_path("scan-1.pdf")?,
//!         UploadedFile::from_path("mail.msg")?,
//!     ])?;
//!
//!     let ranges = vec![
//!         RangeSpec::new("1-3", "Invoice 42").with_classification("INV"),
//!         RangeSpec::new("4,6-7", "Act").with_system_number("0042"),
//!     ];
//!     let mut rotations = RotationMap::new();
//!     rotations.set(6, 90)?;
//!
//!     let report = split_ranges(&session, &ranges, &rotations)?;
//!     for doc in &report.documents {
//!         println!("{} → {}", doc.name, doc.path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! | Backend | Needs | Output |
//! |---------|-------|--------|
//! | `tool`  | `pdftk` on `PATH` (or `tool_path`) | original page content, byte-for-byte |
//! | `raster`| a pdfium library | pages re-rendered as JPEG images |
//!
//! [`BackendPreference::Auto`] uses the tool when it is found and falls
//! back to rasterisation otherwise. The choice is made once per request.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsplit` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod attachment;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BackendPreference, SplitConfig, SplitConfigBuilder};
pub use document::{ClassificationCode, DocumentOrigin, RangeSpec, Rotation, RotationMap, SourceDocument};
pub use error::{RangeError, SplitError};
pub use output::{IndexEntry, OutputDocument, SplitReport, SplitStats};
pub use pipeline::backend::{BackendKind, PageRasterizer, ToolProbe};
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use session::{sanitize_filename, LocalStorage, Session, Storage, UploadedFile};
pub use split::{describe_index, split_ranges, split_ranges_async, split_ranges_to_dir, split_with_backend};
