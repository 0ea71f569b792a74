//! Sessions: the per-user document set and its private scratch directory.
//!
//! A [`Session`] owns a directory named after a random token under
//! [`SplitConfig::temp_root`]. Uploaded PDFs and PDFs recovered from email
//! containers are stored there, and every split request run against the
//! session creates its own token-named sub-directory for fragments. Two
//! sessions never share a path, so concurrent users cannot collide on
//! temporary filenames. Dropping the session removes the directory.
//!
//! Session files are written and removed through the [`Storage`] trait;
//! [`LocalStorage`] is the plain filesystem implementation.

use crate::attachment;
use crate::config::SplitConfig;
use crate::document::{DocumentOrigin, SourceDocument};
use crate::error::SplitError;
use crate::pipeline::inspect::{count_pages_mem, has_pdf_magic};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

// ── Storage ──────────────────────────────────────────────────────────────

/// Where session files are written and removed.
///
/// The extraction backends open session documents by local path (pdftk and
/// pdfium take file names), so an implementation must leave the written bytes
/// readable at exactly the path it was given. Wrappers that add quotas,
/// auditing or mirroring over the local filesystem fit this contract; an
/// object store does not.
pub trait Storage: Send + Sync {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove(&self, path: &Path) -> io::Result<()>;
    fn create_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`Storage`] on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

// ── Uploads ──────────────────────────────────────────────────────────────

/// A file handed to the session by the host.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side filename; its extension decides how the bytes are read.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a local file, keeping its file name as the upload name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SplitError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SplitError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes =
            std::fs::read(path).map_err(|e| SplitError::io(format!("reading {}", path.display()), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Pdf,
    Msg,
}

impl UploadKind {
    fn of(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "msg" => Some(Self::Msg),
            _ => None,
        }
    }
}

// ── Filenames ────────────────────────────────────────────────────────────

static RE_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").unwrap());

fn strip_forbidden(name: &str) -> String {
    let kept = RE_FORBIDDEN.replace_all(name, "");
    RE_SPACES.replace_all(&kept, "_").into_owned()
}

/// Make `name` safe to use as a file name.
///
/// Drops `< > : " / \ | ? *`, turns spaces into `_` and appends `.pdf` when
/// there is no extension. Letters outside ASCII are kept.
pub fn sanitize_filename(name: &str) -> String {
    let mut clean = strip_forbidden(name);
    if clean.trim_matches('.').is_empty() {
        clean = "document".to_string();
    }
    let has_ext = Path::new(&clean)
        .extension()
        .is_some_and(|e| !e.is_empty());
    if !has_ext {
        clean.push_str(".pdf");
    }
    clean
}

/// File name for an output document: the sanitised range name with exactly
/// one `.pdf` suffix.
pub fn output_file_name(range_name: &str) -> String {
    let mut clean = strip_forbidden(range_name.trim());
    if clean.trim_matches('.').is_empty() {
        clean = "range".to_string();
    }
    let is_pdf = Path::new(&clean)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        clean.push_str(".pdf");
    }
    clean
}

/// `a.pdf` → `a_2.pdf`, `a_3.pdf`, … until `taken` says no.
pub(crate) fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2u32..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| format!("{stem}_{}{ext}", Uuid::new_v4().simple()))
}

// ── Validation ───────────────────────────────────────────────────────────

/// A document that passed validation and has not been stored yet.
struct PendingDocument {
    name: String,
    bytes: Vec<u8>,
    page_count: u32,
    origin: DocumentOrigin,
}

fn validate_pdf(file: UploadedFile) -> Result<PendingDocument, SplitError> {
    if !has_pdf_magic(&file.bytes) {
        return Err(SplitError::NotAPdf {
            magic: file.bytes.iter().take(4).copied().collect(),
            name: file.name,
        });
    }
    let page_count = count_pages_mem(&file.bytes).map_err(|detail| SplitError::CorruptPdf {
        path: PathBuf::from(&file.name),
        detail,
    })?;
    Ok(PendingDocument {
        name: file.name,
        bytes: file.bytes,
        page_count,
        origin: DocumentOrigin::Upload,
    })
}

// ── Session ──────────────────────────────────────────────────────────────

/// A user's ordered document set plus its scratch directory.
pub struct Session {
    token: Uuid,
    dir: TempDir,
    storage: Arc<dyn Storage>,
    config: SplitConfig,
    documents: Vec<SourceDocument>,
    names: HashSet<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("dir", &self.dir.path())
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session on the local filesystem.
    pub fn new(config: &SplitConfig) -> Result<Self, SplitError> {
        Self::with_storage(config, Arc::new(LocalStorage))
    }

    pub fn with_storage(config: &SplitConfig, storage: Arc<dyn Storage>) -> Result<Self, SplitError> {
        let token = Uuid::new_v4();
        storage
            .create_dir(&config.temp_root)
            .map_err(|e| SplitError::io(format!("creating {}", config.temp_root.display()), e))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("pdfsplit-{}-", token.simple()))
            .tempdir_in(&config.temp_root)
            .map_err(|e| SplitError::io("creating session directory", e))?;
        info!(session = %token, "session opened at {}", dir.path().display());
        Ok(Self {
            token,
            dir,
            storage,
            config: config.clone(),
            documents: Vec::new(),
            names: HashSet::new(),
        })
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Documents in global-index order.
    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    /// Remove a document from the set; later documents move up.
    pub fn remove_document(&mut self, id: Uuid) -> Option<SourceDocument> {
        let pos = self.documents.iter().position(|d| d.id() == id)?;
        let doc = self.documents.remove(pos);
        if doc.path().starts_with(self.dir.path()) {
            if let Err(e) = self.storage.remove(doc.path()) {
                warn!(session = %self.token, "could not delete {}: {}", doc.path().display(), e);
            }
        }
        Some(doc)
    }

    /// Reorder the set; `order` lists every document id exactly once.
    pub fn reorder(&mut self, order: &[Uuid]) -> Result<(), SplitError> {
        if order.len() != self.documents.len() {
            return Err(SplitError::InvalidConfig(format!(
                "reorder lists {} documents, session has {}",
                order.len(),
                self.documents.len()
            )));
        }
        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            let doc = self
                .documents
                .iter()
                .find(|d| d.id() == *id)
                .ok_or_else(|| SplitError::InvalidConfig(format!("unknown document {id}")))?;
            if reordered.iter().any(|d: &SourceDocument| d.id() == *id) {
                return Err(SplitError::InvalidConfig(format!("document {id} listed twice")));
            }
            reordered.push(doc.clone());
        }
        self.documents = reordered;
        Ok(())
    }

    /// Validate and store `files`, appending their documents in order.
    ///
    /// Every file is validated in memory (extension, size, PDF signature,
    /// page count, attachment recovery) before any is stored. If storing
    /// fails part-way, the files written by this call are removed again and
    /// the session is left as it was. Returns the number of documents added;
    /// zero is [`SplitError::NoDocuments`].
    pub fn ingest(&mut self, files: Vec<UploadedFile>) -> Result<usize, SplitError> {
        let span = info_span!("ingest", session = %self.token);
        let _guard = span.enter();

        let mut kinds = Vec::with_capacity(files.len());
        for file in &files {
            let kind = UploadKind::of(&file.name).ok_or_else(|| SplitError::UnsupportedInput {
                name: file.name.clone(),
            })?;
            let size = file.bytes.len() as u64;
            if size > self.config.max_upload_bytes {
                return Err(SplitError::UploadTooLarge {
                    name: file.name.clone(),
                    size,
                    limit: self.config.max_upload_bytes,
                });
            }
            kinds.push(kind);
        }

        let mut pending = Vec::new();
        for (file, kind) in files.into_iter().zip(kinds) {
            match kind {
                UploadKind::Pdf => pending.push(validate_pdf(file)?),
                UploadKind::Msg => pending.extend(self.recover_from_container(file)),
            }
        }
        if pending.is_empty() {
            return Err(SplitError::NoDocuments);
        }

        let mut stored: Vec<(String, PathBuf)> = Vec::with_capacity(pending.len());
        for doc in &pending {
            match self.store(&doc.name, &doc.bytes) {
                Ok(entry) => stored.push(entry),
                Err(e) => {
                    self.roll_back(&stored);
                    return Err(e);
                }
            }
        }

        let added = pending.len();
        for (doc, (_, path)) in pending.into_iter().zip(stored) {
            debug!("stored {} ({} pages)", doc.name, doc.page_count);
            self.documents
                .push(SourceDocument::new(doc.name, path, doc.origin).with_page_count(doc.page_count));
        }
        info!("{} document(s) added; session now holds {}", added, self.documents.len());
        Ok(added)
    }

    fn recover_from_container(&self, file: UploadedFile) -> Vec<PendingDocument> {
        let recovered =
            attachment::extract_attachments(&file.name, &file.bytes, self.config.min_scan_candidate_len);
        if recovered.is_empty() {
            warn!("{}: no PDF documents recovered", file.name);
        }
        recovered
            .into_iter()
            .map(|pdf| PendingDocument {
                name: pdf.name,
                bytes: pdf.bytes,
                page_count: pdf.page_count,
                origin: pdf.origin,
            })
            .collect()
    }

    /// Remove files written by an ingest call that did not complete.
    fn roll_back(&mut self, stored: &[(String, PathBuf)]) {
        for (file_name, path) in stored {
            if let Err(e) = self.storage.remove(path) {
                warn!("could not remove {} after failed ingest: {}", path.display(), e);
            }
            self.names.remove(file_name);
        }
    }

    /// Write `bytes` under a sanitised, session-unique version of `name`.
    /// Returns the file name taken and the full path.
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<(String, PathBuf), SplitError> {
        let dir = self.dir.path().to_path_buf();
        let storage = Arc::clone(&self.storage);
        let file_name = unique_name(&sanitize_filename(name), |candidate| {
            self.names.contains(candidate) || storage.exists(&dir.join(candidate))
        });
        let path = dir.join(&file_name);
        self.storage
            .write(&path, bytes)
            .map_err(|e| SplitError::io(format!("storing {}", path.display()), e))?;
        self.names.insert(file_name.clone());
        Ok((file_name, path))
    }

    /// Keep the session directory on disk after the session is dropped.
    pub fn into_persistent_dir(self) -> PathBuf {
        self.dir.keep()
    }
}
