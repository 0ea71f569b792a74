//! Request-level data model: source documents, range specs and rotations.
//!
//! A [`SourceDocument`] is one PDF on disk that belongs to a session, either
//! uploaded directly or recovered from an email container. Its page count is
//! computed on first use by opening the file and cached afterwards.

use crate::error::SplitError;
use crate::pipeline::inspect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

// ── Source documents ─────────────────────────────────────────────────────

/// Where a source document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentOrigin {
    /// Uploaded as a PDF by the user.
    Upload,
    /// Attachment recovered by the structured MSG parser.
    Attachment { container: String },
    /// Region recovered by the byte-signature scan.
    SignatureScan { container: String, offset: usize },
}

/// One PDF participating in a split request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    id: Uuid,
    original_name: String,
    path: PathBuf,
    origin: DocumentOrigin,
    #[serde(skip)]
    page_count: OnceLock<u32>,
}

impl SourceDocument {
    /// A document stored at `path`. The page count is not read yet.
    pub fn new(
        original_name: impl Into<String>,
        path: impl Into<PathBuf>,
        origin: DocumentOrigin,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_name: original_name.into(),
            path: path.into(),
            origin,
            page_count: OnceLock::new(),
        }
    }

    /// A document whose page count is already known.
    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = OnceLock::from(pages);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> &DocumentOrigin {
        &self.origin
    }

    /// Number of pages, opening the file the first time it is asked for.
    ///
    /// A document that cannot be opened is an error, never zero pages.
    pub fn page_count(&self) -> Result<u32, SplitError> {
        if let Some(&n) = self.page_count.get() {
            return Ok(n);
        }
        let n = inspect::count_pages(&self.path)?;
        Ok(*self.page_count.get_or_init(|| n))
    }
}

impl PartialEq for SourceDocument {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceDocument {}

// ── Range specs ──────────────────────────────────────────────────────────

/// Archive classification code attached to an output document.
///
/// The engine only carries it through to [`crate::output::OutputDocument`];
/// the set of valid codes belongs to the archive the host talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationCode(pub String);

impl fmt::Display for ClassificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassificationCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A user-defined page selection; each one yields exactly one output PDF.
///
/// JSON shape: `{ "range": "1-3,5", "name": "Invoice", "type": "INV",
/// "systemNumber": "42" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    /// Raw expression, e.g. `"1-3,5,7-7"`.
    pub range: String,
    /// Human name; the output file is named after it.
    pub name: String,
    #[serde(rename = "type", default)]
    pub classification: ClassificationCode,
    #[serde(
        rename = "systemNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub system_number: Option<String>,
}

impl RangeSpec {
    pub fn new(range: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            name: name.into(),
            classification: ClassificationCode::default(),
            system_number: None,
        }
    }

    pub fn with_classification(mut self, code: impl Into<ClassificationCode>) -> Self {
        self.classification = code.into();
        self
    }

    pub fn with_system_number(mut self, number: impl Into<String>) -> Self {
        self.system_number = Some(number.into());
        self
    }
}

// ── Rotation ─────────────────────────────────────────────────────────────

/// Net page rotation, always a quarter turn multiple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    /// 90° clockwise.
    Clockwise,
    /// 180°.
    UpsideDown,
    /// 270° clockwise, i.e. 90° counter-clockwise.
    CounterClockwise,
}

impl Rotation {
    /// Parse a net rotation in degrees. Only `0`, `90`, `180` and `270` are
    /// accepted; incremental deltas such as `-90` are the caller's job.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise),
            180 => Some(Rotation::UpsideDown),
            270 => Some(Rotation::CounterClockwise),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise => 90,
            Rotation::UpsideDown => 180,
            Rotation::CounterClockwise => 270,
        }
    }

    pub fn is_none(self) -> bool {
        self == Rotation::None
    }
}

/// Global page number → net rotation.
///
/// Pages without an entry keep their original orientation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationMap {
    pages: BTreeMap<u32, Rotation>,
}

impl RotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{"3": 90, "7": 180}`.
    pub fn from_json(json: &str) -> Result<Self, SplitError> {
        let raw: BTreeMap<String, i64> = serde_json::from_str(json)
            .map_err(|e| SplitError::InvalidConfig(format!("rotation map: {e}")))?;
        let mut map = Self::new();
        for (key, degrees) in raw {
            let page: u32 = key.trim().parse().map_err(|_| {
                SplitError::InvalidConfig(format!("rotation map key '{key}' is not a page number"))
            })?;
            map.set(page, degrees)?;
        }
        Ok(map)
    }

    /// Record the net rotation for a global page.
    pub fn set(&mut self, page: u32, degrees: i64) -> Result<(), SplitError> {
        let rotation =
            Rotation::from_degrees(degrees).ok_or(SplitError::InvalidRotation { page, degrees })?;
        self.insert(page, rotation);
        Ok(())
    }

    pub fn insert(&mut self, page: u32, rotation: Rotation) {
        if rotation.is_none() {
            self.pages.remove(&page);
        } else {
            self.pages.insert(page, rotation);
        }
    }

    pub fn get(&self, page: u32) -> Rotation {
        self.pages.get(&page).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_keeps_identity_and_cached_page_count() {
        let doc = SourceDocument::new("a.pdf", "/virtual/a.pdf", DocumentOrigin::Upload)
            .with_page_count(7);
        let copy = doc.clone();
        assert_eq!(copy.id(), doc.id());
        // no file behind the path: the count must come from the cache
        assert_eq!(copy.page_count().unwrap(), 7);
    }

    #[test]
    fn rotation_accepts_only_quarter_turns() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Clockwise));
        assert_eq!(Rotation::from_degrees(270), Some(Rotation::CounterClockwise));
        assert_eq!(Rotation::from_degrees(-90), None);
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::from_degrees(360), None);
    }

    #[test]
    fn rotation_map_from_json() {
        let map = RotationMap::from_json(r#"{"2": 90, "5": 0, "9": 270}"#).unwrap();
        assert_eq!(map.get(2), Rotation::Clockwise);
        assert_eq!(map.get(5), Rotation::None);
        assert_eq!(map.get(9), Rotation::CounterClockwise);
        assert_eq!(map.get(1), Rotation::None);
        // zero entries are not stored
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn rotation_map_rejects_deltas() {
        let err = RotationMap::from_json(r#"{"2": -90}"#).unwrap_err();
        assert!(matches!(
            err,
            SplitError::InvalidRotation {
                page: 2,
                degrees: -90
            }
        ));
    }

    #[test]
    fn rotation_map_rejects_bad_keys() {
        assert!(RotationMap::from_json(r#"{"first": 90}"#).is_err());
    }

    #[test]
    fn range_spec_json_shape() {
        let json = r#"{"range":"1-3","name":"Act","type":"ACT","systemNumber":"77"}"#;
        let spec: RangeSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.range, "1-3");
        assert_eq!(spec.classification, ClassificationCode::from("ACT"));
        assert_eq!(spec.system_number.as_deref(), Some("77"));

        let minimal: RangeSpec = serde_json::from_str(r#"{"range":"2","name":"x"}"#).unwrap();
        assert_eq!(minimal.system_number, None);
        assert_eq!(minimal.classification.0, "");
    }

    #[test]
    fn documents_compare_by_identity() {
        let a = SourceDocument::new("a.pdf", "/tmp/a.pdf", DocumentOrigin::Upload);
        let b = SourceDocument::new("a.pdf", "/tmp/a.pdf", DocumentOrigin::Upload);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn known_page_count_skips_opening_the_file() {
        let doc = SourceDocument::new("missing.pdf", "/nonexistent/missing.pdf", DocumentOrigin::Upload)
            .with_page_count(4);
        assert_eq!(doc.page_count().unwrap(), 4);
        assert_eq!(doc.clone().page_count().unwrap(), 4);
    }

    #[test]
    fn unreadable_document_surfaces_error() {
        let doc = SourceDocument::new("missing.pdf", "/nonexistent/missing.pdf", DocumentOrigin::Upload);
        assert!(doc.page_count().is_err());
    }
}
