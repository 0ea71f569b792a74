//! Rotation: map global-page rotations onto fragment positions.
//!
//! Rotations are keyed by *global* page number, but a fragment only knows
//! its own 1..n positions. Position *k* of a group's fragment holds global
//! page `group.global_pages[k]`, so the per-position list is a straight
//! lookup through that vector.

use crate::document::{Rotation, RotationMap};
use crate::error::SplitError;
use crate::pipeline::backend::{ExtractionBackend, Fragment};
use std::path::Path;
use tracing::debug;

/// Rotation for each position of a fragment built from `global_pages`.
pub fn rotations_for(global_pages: &[u32], map: &RotationMap) -> Vec<Rotation> {
    global_pages.iter().map(|&page| map.get(page)).collect()
}

/// Apply `map` to `fragment`; returns how many pages were turned.
///
/// Nothing is invoked when no page of the fragment has a rotation.
pub fn apply(
    backend: &dyn ExtractionBackend,
    fragment: &mut Fragment,
    global_pages: &[u32],
    map: &RotationMap,
    scratch: &Path,
) -> Result<usize, SplitError> {
    if map.is_empty() {
        return Ok(0);
    }
    let rotations = rotations_for(global_pages, map);
    let turned = rotations.iter().filter(|r| !r.is_none()).count();
    if turned == 0 {
        return Ok(0);
    }
    debug!(
        "rotating {} of {} page(s) (global {:?})",
        turned,
        rotations.len(),
        global_pages
    );
    backend.rotate(fragment, &rotations, scratch)?;
    Ok(turned)
}
