//! Extraction planning: group target global pages by source document.
//!
//! Groups are ordered by the first time each document is seen while walking
//! the target pages, and that order is the page order of the merged output.
//! A target sequence that leaves a document and later returns to it appends
//! the later pages to the existing group instead of opening a new one:
//! `[1, 4, 2]` over documents of 3 and 2 pages yields `(doc1, [1, 2])` then
//! `(doc2, [1])`.

use crate::document::SourceDocument;
use crate::error::SplitError;
use crate::pipeline::index::GlobalPageIndex;
use std::collections::HashMap;
use uuid::Uuid;

/// Pages to pull out of one source document.
#[derive(Debug, Clone)]
pub struct ExtractionGroup<'a> {
    pub document: &'a SourceDocument,
    /// Local page numbers, in output order.
    pub local_pages: Vec<u32>,
    /// Global page number for each entry of `local_pages`, same order.
    pub global_pages: Vec<u32>,
}

/// Per-document breakdown of one range spec.
#[derive(Debug, Clone, Default)]
pub struct ExtractionPlan<'a> {
    pub groups: Vec<ExtractionGroup<'a>>,
}

impl<'a> ExtractionPlan<'a> {
    /// Total pages across all groups.
    pub fn page_count(&self) -> usize {
        self.groups.iter().map(|g| g.local_pages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Resolve `targets` against `index` and group them by document.
pub fn plan<'a>(
    targets: &[u32],
    index: &GlobalPageIndex<'a>,
) -> Result<ExtractionPlan<'a>, SplitError> {
    let mut groups: Vec<ExtractionGroup<'a>> = Vec::new();
    let mut slot_of: HashMap<Uuid, usize> = HashMap::new();

    for &global in targets {
        let location = index.resolve(global)?;
        let slot = *slot_of.entry(location.document.id()).or_insert_with(|| {
            groups.push(ExtractionGroup {
                document: location.document,
                local_pages: Vec::new(),
                global_pages: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.local_pages.push(location.local_page);
        group.global_pages.push(global);
    }

    Ok(ExtractionPlan { groups })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::index::fixtures::docs;

    #[test]
    fn groups_in_first_seen_order() {
        let docs = docs(&[3, 2, 4]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        let plan = plan(&[1, 2, 6, 7, 8], &index).unwrap();

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].document, &docs[0]);
        assert_eq!(plan.groups[0].local_pages, vec![1, 2]);
        assert_eq!(plan.groups[0].global_pages, vec![1, 2]);
        assert_eq!(plan.groups[1].document, &docs[2]);
        assert_eq!(plan.groups[1].local_pages, vec![1, 2, 3]);
        assert_eq!(plan.groups[1].global_pages, vec![6, 7, 8]);
        assert_eq!(plan.page_count(), 5);
    }

    #[test]
    fn returning_to_a_document_extends_its_group() {
        let docs = docs(&[3, 2]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        let plan = plan(&[5, 1, 4, 3], &index).unwrap();

        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0].document, &docs[1]);
        assert_eq!(plan.groups[0].local_pages, vec![2, 1]);
        assert_eq!(plan.groups[0].global_pages, vec![5, 4]);
        assert_eq!(plan.groups[1].local_pages, vec![1, 3]);
        assert_eq!(plan.groups[1].global_pages, vec![1, 3]);
    }

    #[test]
    fn unresolvable_target_fails() {
        let docs = docs(&[2]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        assert!(matches!(
            plan(&[1, 3], &index),
            Err(SplitError::RangeResolution { page: 3, .. })
        ));
    }

    #[test]
    fn no_targets_no_groups() {
        let docs = docs(&[2]);
        let index = GlobalPageIndex::build(&docs).unwrap();
        assert!(plan(&[], &index).unwrap().is_empty());
    }
}
