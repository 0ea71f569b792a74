//! Pipeline stages for range splitting.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the extraction backend can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! range ──▶ index ──▶ plan ──▶ backend.extract ──▶ rotate ──▶ merge
//! ("1-3,5") (global   (groups   (tool | raster)    (per-page)  (one PDF
//!           numbering) by doc)                                   per range)
//! ```
//!
//! 1. [`range`]: parse a range expression into global page numbers
//! 2. [`index`]: number every page of the request's documents contiguously
//! 3. [`plan`]: group target pages by source document, first-seen order
//! 4. [`backend`]: extract each group into a fragment; [`render`] and
//!    [`encode`] serve the raster backend
//! 5. [`rotate`]: apply per-page rotations to each fragment
//! 6. [`merge`]: concatenate a range's fragments into its output PDF
//!
//! [`inspect`] opens PDFs for page counts and validation, and is shared by
//! ingestion, attachment extraction and indexing.

pub mod backend;
pub mod encode;
pub mod index;
pub mod inspect;
pub mod merge;
pub mod plan;
pub mod range;
pub mod render;
pub mod rotate;
