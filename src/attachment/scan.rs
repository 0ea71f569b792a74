//! Last-resort recovery of PDFs embedded in an opaque byte blob.
//!
//! This is a heuristic, not a parser. Every `%PDF` occurrence starts a
//! candidate; the candidate ends 5 bytes past the next `%%EOF`, or at the
//! next `%PDF` if there is no `%%EOF` after it, or at the end of the buffer.
//! The search then resumes 4 bytes past the *start* of the candidate, so
//! nested or overlapping candidates are possible. A candidate must be longer
//! than the configured minimum and must open as a PDF to be kept. Byte runs
//! that merely look like a PDF header can still slip through.

use super::{AttachmentRejected, RecoveredPdf};
use crate::document::DocumentOrigin;
use crate::pipeline::inspect::{count_pages_mem, has_pdf_magic, PDF_MAGIC};
use std::ops::Range;
use tracing::{debug, info};

const EOF_MARKER: &[u8] = b"%%EOF";

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Byte ranges of every candidate longer than `min_len`, in scan order.
pub fn candidate_regions(bytes: &[u8], min_len: usize) -> Vec<Range<usize>> {
    let mut regions = Vec::new();
    let mut offset = 0;

    while let Some(start) = find(bytes, PDF_MAGIC, offset) {
        let end = match find(bytes, EOF_MARKER, start) {
            Some(eof) => eof + EOF_MARKER.len(),
            None => find(bytes, PDF_MAGIC, start + PDF_MAGIC.len()).unwrap_or(bytes.len()),
        };
        let region = &bytes[start..end];
        if region.len() > min_len && has_pdf_magic(region) {
            regions.push(start..end);
        } else {
            debug!(
                "signature at {} rejected: {}",
                start,
                AttachmentRejected::TooShort { len: region.len() }
            );
        }
        offset = start + PDF_MAGIC.len();
    }
    regions
}

/// Recover `document_<n>.pdf` files from `bytes`.
///
/// `n` counts candidates that passed the length check, so a candidate that
/// later fails to open still consumes its number.
pub fn recover(container: &str, bytes: &[u8], min_len: usize) -> Vec<RecoveredPdf> {
    let regions = candidate_regions(bytes, min_len);
    info!(
        "{}: signature scan found {} candidate(s)",
        container,
        regions.len()
    );

    regions
        .into_iter()
        .enumerate()
        .filter_map(|(i, region)| {
            let name = format!("document_{}.pdf", i + 1);
            let data = &bytes[region.clone()];
            match count_pages_mem(data) {
                Ok(pages) => {
                    info!(
                        "{}: recovered '{}' at offset {} ({} bytes, {} pages)",
                        container,
                        name,
                        region.start,
                        data.len(),
                        pages
                    );
                    Some(RecoveredPdf {
                        name,
                        bytes: data.to_vec(),
                        page_count: pages,
                        origin: DocumentOrigin::SignatureScan {
                            container: container.to_string(),
                            offset: region.start,
                        },
                    })
                }
                Err(detail) => {
                    debug!(
                        "{}: candidate '{}' at {} discarded: {}",
                        container,
                        name,
                        region.start,
                        AttachmentRejected::Unreadable(detail)
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::inspect::fixtures::pdf_with_pages;

    #[test]
    fn recovers_pdfs_in_scan_order() {
        let first = pdf_with_pages(2);
        let second = pdf_with_pages(1);
        let mut blob = b"\xD0\xCF\x11\xE0 junk header".to_vec();
        blob.extend_from_slice(&first);
        blob.extend_from_slice(b"\x00\x00 more junk \x00");
        blob.extend_from_slice(&second);
        blob.extend_from_slice(b"trailer");

        let docs = recover("mail.msg", &blob, 100);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "document_1.pdf");
        assert_eq!(docs[0].page_count, 2);
        assert_eq!(docs[1].name, "document_2.pdf");
        assert_eq!(docs[1].page_count, 1);
        assert!(matches!(
            docs[0].origin,
            DocumentOrigin::SignatureScan { offset: 16, .. }
        ));
    }

    #[test]
    fn region_ends_after_eof_marker() {
        let mut blob = vec![b'x'; 3];
        blob.extend_from_slice(b"%PDF");
        blob.extend(std::iter::repeat(b'a').take(200));
        blob.extend_from_slice(b"%%EOF");
        blob.extend_from_slice(b"tail");
        let regions = candidate_regions(&blob, 100);
        assert_eq!(regions, vec![3..3 + 4 + 200 + 5]);
    }

    #[test]
    fn without_eof_the_next_header_ends_the_region() {
        let mut blob = b"%PDF".to_vec();
        blob.extend(std::iter::repeat(b'a').take(150));
        let second = blob.len();
        blob.extend_from_slice(b"%PDF");
        blob.extend(std::iter::repeat(b'b').take(150));

        let regions = candidate_regions(&blob, 100);
        assert_eq!(regions, vec![0..second, second..blob.len()]);
    }

    #[test]
    fn length_threshold_is_strict() {
        // exactly 100 bytes: rejected
        let mut blob = b"%PDF".to_vec();
        blob.extend(std::iter::repeat(b'a').take(91));
        blob.extend_from_slice(b"%%EOF");
        assert_eq!(blob.len(), 100);
        assert!(candidate_regions(&blob, 100).is_empty());

        blob.insert(10, b'a');
        assert_eq!(candidate_regions(&blob, 100).len(), 1);
    }

    #[test]
    fn numbering_counts_unreadable_candidates() {
        let good = pdf_with_pages(1);
        let mut blob = b"%PDF-1.4 ".to_vec();
        blob.extend(std::iter::repeat(b'z').take(120));
        blob.extend_from_slice(b"%%EOF");
        blob.extend_from_slice(&good);

        let docs = recover("mail.msg", &blob, 100);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "document_2.pdf");
    }

    #[test]
    fn nothing_to_find() {
        assert!(recover("mail.msg", b"no signatures here", 100).is_empty());
        assert!(candidate_regions(b"%PD", 0).is_empty());
    }
}
