//! Global page index: one contiguous 1-based numbering over every source
//! document of a request.
//!
//! Document *i* occupies `[offset_i + 1, offset_i + count_i]` where
//! `offset_i` is the sum of the page counts before it. Lookups binary-search
//! the prefix-sum table, so resolving a page is `O(log n)` in the number of
//! documents.

use crate::document::SourceDocument;
use crate::error::SplitError;
use tracing::debug;

/// Where a global page lives.
#[derive(Debug, Clone, Copy)]
pub struct PageLocation<'a> {
    pub document: &'a SourceDocument,
    /// Position of the document in the request's ordered list.
    pub doc_index: usize,
    /// 1-based page number inside `document`.
    pub local_page: u32,
}

/// Contiguous page numbering across an ordered document list.
#[derive(Debug)]
pub struct GlobalPageIndex<'a> {
    documents: &'a [SourceDocument],
    /// `offsets[i]` = pages before document `i`; one extra trailing entry
    /// holds the total.
    offsets: Vec<u32>,
}

impl<'a> GlobalPageIndex<'a> {
    /// Build the index, opening each document whose page count is unknown.
    ///
    /// A document that cannot be opened fails the whole build.
    pub fn build(documents: &'a [SourceDocument]) -> Result<Self, SplitError> {
        let mut offsets = Vec::with_capacity(documents.len() + 1);
        let mut running = 0u32;
        offsets.push(running);
        for doc in documents {
            let count = doc.page_count()?;
            debug!(
                "{} → global pages {}..={}",
                doc.original_name(),
                running + 1,
                running + count
            );
            running = running.checked_add(count).ok_or_else(|| {
                SplitError::Internal("page total overflows u32".to_string())
            })?;
            offsets.push(running);
        }
        Ok(Self { documents, offsets })
    }

    /// Total number of pages across all documents.
    pub fn total_pages(&self) -> u32 {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn documents(&self) -> &'a [SourceDocument] {
        self.documents
    }

    /// First global page of document `doc_index`, if it exists.
    pub fn first_page_of(&self, doc_index: usize) -> Option<u32> {
        (doc_index < self.documents.len()).then(|| self.offsets[doc_index] + 1)
    }

    /// Resolve a global page to its document and local page number.
    pub fn locate(&self, global_page: u32) -> Option<PageLocation<'a>> {
        if global_page == 0 || global_page > self.total_pages() {
            return None;
        }
        // Number of documents that end strictly before this page.
        let doc_index = self.offsets[1..].partition_point(|&end| end < global_page);
        let document = self.documents.get(doc_index)?;
        Some(PageLocation {
            document,
            doc_index,
            local_page: global_page - self.offsets[doc_index],
        })
    }

    /// Like [`locate`](Self::locate) but unresolvable pages are an error.
    pub fn resolve(&self, global_page: u32) -> Result<PageLocation<'a>, SplitError> {
        self.locate(global_page)
            .ok_or(SplitError::RangeResolution {
                page: global_page,
                total: self.total_pages(),
            })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_global_pages_to_local_pages() {
        let docs = fixtures::docs(&[3, 2, 4]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        assert_eq!(index.total_pages(), 9);

        let p4 = index.locate(4).unwrap();
        assert_eq!((p4.doc_index, p4.local_page), (1, 1));
        assert_eq!(p4.document, &docs[1]);

        let p6 = index.locate(6).unwrap();
        assert_eq!((p6.doc_index, p6.local_page), (2, 1));

        let p9 = index.locate(9).unwrap();
        assert_eq!((p9.doc_index, p9.local_page), (2, 4));

        assert!(index.locate(10).is_none());
        assert!(index.locate(0).is_none());
    }

    #[test]
    fn every_page_resolves_exactly_once() {
        let docs = fixtures::docs(&[1, 5, 2]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        let mut per_doc = [0u32; 3];
        for page in 1..=index.total_pages() {
            let loc = index.locate(page).unwrap();
            per_doc[loc.doc_index] += 1;
            assert_eq!(loc.local_page, per_doc[loc.doc_index]);
        }
        assert_eq!(per_doc, [1, 5, 2]);
    }

    #[test]
    fn resolve_reports_missing_pages() {
        let docs = fixtures::docs(&[2]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        assert!(matches!(
            index.resolve(3),
            Err(SplitError::RangeResolution { page: 3, total: 2 })
        ));
    }

    #[test]
    fn first_page_offsets() {
        let docs = fixtures::docs(&[3, 2, 4]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        assert_eq!(index.first_page_of(0), Some(1));
        assert_eq!(index.first_page_of(2), Some(6));
        assert_eq!(index.first_page_of(3), None);
    }

    #[test]
    fn empty_document_list() {
        let docs = Vec::new();
        let index = GlobalPageIndex::build(&docs).unwrap();
        assert_eq!(index.total_pages(), 0);
        assert!(index.locate(1).is_none());
    }

    #[test]
    fn unreadable_document_fails_the_build() {
        use crate::document::{DocumentOrigin, SourceDocument};
        let docs = vec![SourceDocument::new(
            "gone.pdf",
            "/nonexistent/gone.pdf",
            DocumentOrigin::Upload,
        )];
        assert!(GlobalPageIndex::build(&docs).is_err());
    }
}
