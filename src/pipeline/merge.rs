//! Merge: concatenate a range's fragments into its output document.
//!
//! Fragments arrive in group order, which is the page order of the output.
//! A lone PDF fragment is copied as-is, without another tool run. All
//! fragments are dropped (and so deleted) before this returns, success or
//! failure.

use crate::error::SplitError;
use crate::pipeline::backend::{ExtractionBackend, Fragment};
use std::path::Path;
use tracing::debug;

/// Write `fragments`, concatenated in order, to `output`.
pub fn assemble(
    backend: &dyn ExtractionBackend,
    fragments: Vec<Fragment>,
    output: &Path,
    scratch: &Path,
) -> Result<(), SplitError> {
    if fragments.is_empty() {
        return Err(SplitError::Internal(format!(
            "nothing to merge into {}",
            output.display()
        )));
    }
    if let [Fragment::Pdf(only)] = fragments.as_slice() {
        std::fs::copy(only, output)
            .map_err(|e| SplitError::io(format!("writing {}", output.display()), e))?;
        debug!("single fragment copied to {}", output.display());
        return Ok(());
    }
    debug!(
        "merging {} fragment(s) into {}",
        fragments.len(),
        output.display()
    );
    backend.merge(fragments, output, scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::backend::{scratch_pdf, ToolBackend};

    #[test]
    fn single_fragment_is_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let frag = scratch_pdf(dir.path(), "frag_").unwrap();
        std::fs::write(&frag, b"%PDF-1.7 fragment bytes").unwrap();
        let frag_path = frag.to_path_buf();

        let out = dir.path().join("Invoice.pdf");
        // the tool is never run for a single fragment
        let backend = ToolBackend::new("/nonexistent/pdftk");
        assemble(&backend, vec![Fragment::Pdf(frag)], &out, dir.path()).unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.7 fragment bytes");
        assert!(!frag_path.exists(), "fragment should be cleaned up");
    }

    #[test]
    fn failed_merge_still_removes_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let a = scratch_pdf(dir.path(), "a_").unwrap();
        let b = scratch_pdf(dir.path(), "b_").unwrap();
        let (pa, pb) = (a.to_path_buf(), b.to_path_buf());

        let backend = ToolBackend::new("/nonexistent/pdftk");
        let out = dir.path().join("out.pdf");
        let err = assemble(&backend, vec![Fragment::Pdf(a), Fragment::Pdf(b)], &out, dir.path());
        assert!(matches!(err, Err(SplitError::ToolInvocation { .. })));
        assert!(!pa.exists() && !pb.exists());
        assert!(!out.exists());
    }

    #[test]
    fn no_fragments_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ToolBackend::new("/nonexistent/pdftk");
        assert!(assemble(&backend, Vec::new(), &dir.path().join("x.pdf"), dir.path()).is_err());
    }
}
