//! Outlook `.msg` attachment reader.
//!
//! An MSG file is an OLE2 compound file. Each attachment is a storage named
//! `__attach_version1.0_#XXXXXXXX` whose properties are streams named
//! `__substg1.0_<tag><type>`:
//!
//! | Tag    | Property              | Types read          |
//! |--------|-----------------------|---------------------|
//! | `3707` | attach long filename  | `001F` / `001E`     |
//! | `3001` | display name          | `001F` / `001E`     |
//! | `3704` | attach (8.3) filename | `001F` / `001E`     |
//! | `3701` | attach data           | `0102` (binary)     |
//!
//! `001F` is UTF-16LE, `001E` is an 8-bit string; both may carry trailing
//! NULs. Attachments without a `3701` binary stream (embedded messages, OLE
//! objects) simply have no payload and are rejected later.

use super::{AttachmentRejected, RecoveredPdf};
use crate::document::DocumentOrigin;
use crate::pipeline::inspect::{count_pages_mem, has_pdf_magic};
use cfb::CompoundFile;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const ATTACH_PREFIX: &str = "__attach_version1.0_#";
const PR_ATTACH_LONG_FILENAME: &str = "3707";
const PR_DISPLAY_NAME: &str = "3001";
const PR_ATTACH_FILENAME: &str = "3704";
const PR_ATTACH_DATA_BIN: &str = "37010102";

/// The container could not be read as a compound file at all.
#[derive(Debug, Error)]
pub enum ContainerParseError {
    #[error("not an OLE2 compound file: {0}")]
    NotCompound(#[source] io::Error),
}

/// Typed view of one attachment's properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentProperties {
    pub long_filename: Option<String>,
    pub display_name: Option<String>,
    pub filename: Option<String>,
    pub data: Option<Vec<u8>>,
}

impl AttachmentProperties {
    /// First present name of: long filename, display name, short filename,
    /// else `document_<random>`. `.pdf` is appended when there is no
    /// extension.
    pub fn resolve_filename(&self) -> String {
        let base = [&self.long_filename, &self.display_name, &self.filename]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("document_{}", &Uuid::new_v4().simple().to_string()[..13]));

        if extension_of(&base).is_none() {
            format!("{base}.pdf")
        } else {
            base
        }
    }

    /// Check the acceptance rules and hand back the payload.
    fn accept(self, name: &str) -> Result<Vec<u8>, AttachmentRejected> {
        let ext = extension_of(name).map(|e| e.to_ascii_lowercase());
        if ext.as_deref() != Some("pdf") {
            return Err(AttachmentRejected::NotPdfExtension);
        }
        match self.data {
            None => Err(AttachmentRejected::MissingPayload),
            Some(d) if d.is_empty() => Err(AttachmentRejected::MissingPayload),
            Some(d) if !has_pdf_magic(&d) => Err(AttachmentRejected::BadMagic),
            Some(d) => Ok(d),
        }
    }
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// Read every attachment's properties from an MSG container.
pub fn read_attachments(bytes: &[u8]) -> Result<Vec<AttachmentProperties>, ContainerParseError> {
    let mut comp = CompoundFile::open(Cursor::new(bytes)).map_err(ContainerParseError::NotCompound)?;

    let mut storages: Vec<String> = comp
        .read_root_storage()
        .filter(|e| e.is_storage() && e.name().starts_with(ATTACH_PREFIX))
        .map(|e| e.name().to_string())
        .collect();
    storages.sort();
    debug!("container lists {} attachment storage(s)", storages.len());

    let mut attachments = Vec::with_capacity(storages.len());
    for storage in storages {
        match read_one(&mut comp, &storage) {
            Ok(props) => attachments.push(props),
            Err(e) => warn!("skipping attachment {}: {}", storage, e),
        }
    }
    Ok(attachments)
}

fn read_one<F: Read + Seek>(
    comp: &mut CompoundFile<F>,
    storage: &str,
) -> io::Result<AttachmentProperties> {
    Ok(AttachmentProperties {
        long_filename: read_string(comp, storage, PR_ATTACH_LONG_FILENAME)?,
        display_name: read_string(comp, storage, PR_DISPLAY_NAME)?,
        filename: read_string(comp, storage, PR_ATTACH_FILENAME)?,
        data: read_stream(comp, &format!("/{storage}/__substg1.0_{PR_ATTACH_DATA_BIN}"))?,
    })
}

fn read_stream<F: Read + Seek>(comp: &mut CompoundFile<F>, path: &str) -> io::Result<Option<Vec<u8>>> {
    if !comp.is_stream(path) {
        return Ok(None);
    }
    let mut buf = Vec::new();
    comp.open_stream(path)?.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

fn read_string<F: Read + Seek>(
    comp: &mut CompoundFile<F>,
    storage: &str,
    tag: &str,
) -> io::Result<Option<String>> {
    if let Some(raw) = read_stream(comp, &format!("/{storage}/__substg1.0_{tag}001F"))? {
        return Ok(Some(decode_utf16le(&raw)));
    }
    Ok(read_stream(comp, &format!("/{storage}/__substg1.0_{tag}001E"))?
        .map(|raw| String::from_utf8_lossy(&raw).trim_end_matches('\0').to_string()))
}

fn decode_utf16le(raw: &[u8]) -> String {
    let units = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect::<String>()
        .trim_end_matches('\0')
        .to_string()
}

/// Structured pass: every attachment that is a readable PDF.
///
/// A rejected or unreadable attachment is logged and skipped; only a
/// container that cannot be opened at all is an error.
pub fn extract(container: &str, bytes: &[u8]) -> Result<Vec<RecoveredPdf>, ContainerParseError> {
    let attachments = read_attachments(bytes)?;
    info!("{}: {} attachment(s) found", container, attachments.len());

    let mut recovered = Vec::new();
    for props in attachments {
        let name = props.resolve_filename();
        let data = match props.accept(&name) {
            Ok(d) => d,
            Err(reason) => {
                debug!("{}: skipping attachment '{}': {}", container, name, reason);
                continue;
            }
        };
        match count_pages_mem(&data) {
            Ok(pages) => {
                info!("{}: accepted '{}' ({} pages)", container, name, pages);
                recovered.push(RecoveredPdf {
                    name,
                    bytes: data,
                    page_count: pages,
                    origin: DocumentOrigin::Attachment {
                        container: container.to_string(),
                    },
                });
            }
            Err(detail) => {
                warn!(
                    "{}: discarding '{}': {}",
                    container,
                    name,
                    AttachmentRejected::Unreadable(detail)
                );
            }
        }
    }
    Ok(recovered)
}
