//! Request-level entry points: range specs in, one PDF per range out.
//!
//! A request walks every range spec in order on the calling thread:
//!
//! ```text
//! parse range ─▶ plan groups ─▶ extract + rotate each group ─▶ merge
//! ```
//!
//! The backend is chosen once, before the first range, and every range of
//! the request goes through it. A failing range does not stop the others
//! (unless `fail_fast` is set); it is recorded in [`SplitReport::failures`].
//! Only a request where *no* range produced a document is an `Err`.
//!
//! Fragments live in a scratch directory named after the request token,
//! created under the configured temp root and removed when the request
//! returns, whichever way it returns.

use crate::config::SplitConfig;
use crate::document::{RangeSpec, RotationMap, SourceDocument};
use crate::error::{RangeError, SplitError};
use crate::output::{IndexEntry, OutputDocument, SplitReport, SplitStats};
use crate::pipeline::backend::{select_backend, ExtractionBackend, PathProbe};
use crate::pipeline::index::GlobalPageIndex;
use crate::pipeline::{merge, plan, range, rotate};
use crate::session::{output_file_name, unique_name, Session};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Span};
use uuid::Uuid;

/// Split a session's documents; outputs land in a fresh directory inside
/// the session.
///
/// The output files live as long as the session does.
pub fn split_ranges(
    session: &Session,
    ranges: &[RangeSpec],
    rotations: &RotationMap,
) -> Result<SplitReport, SplitError> {
    let span = info_span!("split", session = %session.token());
    let _guard = span.enter();

    let mut config = session.config().clone();
    config.temp_root = session.dir().to_path_buf();
    let out_dir = session
        .dir()
        .join(format!("output-{}", Uuid::new_v4().simple()));
    split_ranges_to_dir(session.documents(), ranges, rotations, &out_dir, &config)
}

/// Split `documents` and write one PDF per range into `out_dir`.
///
/// Probes for the page-selection tool according to `config.backend`.
pub fn split_ranges_to_dir(
    documents: &[SourceDocument],
    ranges: &[RangeSpec],
    rotations: &RotationMap,
    out_dir: &Path,
    config: &SplitConfig,
) -> Result<SplitReport, SplitError> {
    let backend = select_backend(config, &PathProbe)?;
    split_with_backend(documents, ranges, rotations, out_dir, config, backend.as_ref())
}

/// Async wrapper around [`split_ranges_to_dir`].
///
/// Splitting blocks on subprocesses and CPU-bound rendering, so it runs on
/// tokio's blocking pool instead of a runtime worker. The caller's span is
/// carried over.
pub async fn split_ranges_async(
    documents: Vec<SourceDocument>,
    ranges: Vec<RangeSpec>,
    rotations: RotationMap,
    out_dir: PathBuf,
    config: SplitConfig,
) -> Result<SplitReport, SplitError> {
    let span = Span::current();
    tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        split_ranges_to_dir(&documents, &ranges, &rotations, &out_dir, &config)
    })
    .await
    .map_err(|e| SplitError::Internal(format!("split task panicked: {e}")))?
}

/// Split with an explicitly chosen backend.
pub fn split_with_backend(
    documents: &[SourceDocument],
    ranges: &[RangeSpec],
    rotations: &RotationMap,
    out_dir: &Path,
    config: &SplitConfig,
    backend: &dyn ExtractionBackend,
) -> Result<SplitReport, SplitError> {
    let started = Instant::now();
    let request = Uuid::new_v4();
    let span = info_span!("request", id = %request, backend = %backend.kind());
    let _guard = span.enter();

    if ranges.is_empty() {
        return Err(SplitError::InvalidConfig("no range specs given".into()));
    }

    std::fs::create_dir_all(out_dir)
        .map_err(|e| SplitError::io(format!("creating {}", out_dir.display()), e))?;
    std::fs::create_dir_all(&config.temp_root)
        .map_err(|e| SplitError::io(format!("creating {}", config.temp_root.display()), e))?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("split-{}-", request.simple()))
        .tempdir_in(&config.temp_root)
        .map_err(|e| SplitError::io("creating request scratch directory", e))?;

    let index = GlobalPageIndex::build(documents)?;
    let total_pages = index.total_pages();
    info!(
        "splitting {} document(s), {} page(s) into {} range(s)",
        documents.len(),
        total_pages,
        ranges.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_split_start(ranges.len(), total_pages);
    }

    let mut outputs = Vec::with_capacity(ranges.len());
    let mut failures = Vec::new();
    let mut pages_rotated = 0usize;
    let mut taken: HashSet<String> = HashSet::new();

    for (i, spec) in ranges.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_range_start(i, ranges.len(), &spec.name);
        }
        let file_name = unique_name(&output_file_name(&spec.name), |n| taken.contains(n));
        taken.insert(file_name.clone());

        let job = RangeJob {
            index: i,
            spec,
            file_name,
            out_dir,
            scratch: scratch.path(),
        };
        match job.run(&index, rotations, backend) {
            Ok((doc, rotated)) => {
                info!(
                    "[{}/{}] {} → {} ({} pages)",
                    i + 1,
                    ranges.len(),
                    spec.name,
                    doc.file_name,
                    doc.page_count
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_range_complete(i, ranges.len(), &spec.name, doc.page_count);
                }
                pages_rotated += rotated;
                outputs.push(doc);
            }
            Err(e) => {
                error!("[{}/{}] {} failed: {}", i + 1, ranges.len(), spec.name, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_range_error(i, ranges.len(), &spec.name, &e.to_string());
                }
                if config.fail_fast {
                    return Err(SplitError::ExtractionFailure {
                        range: spec.range.clone(),
                        source: Box::new(e),
                    });
                }
                failures.push(RangeError {
                    index: i,
                    name: spec.name.clone(),
                    range: spec.range.clone(),
                    detail: e.to_string(),
                });
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_split_complete(ranges.len(), outputs.len());
    }

    if outputs.is_empty() {
        let first_error = failures
            .first()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(SplitError::AllRangesFailed {
            total: ranges.len(),
            first_error,
        });
    }

    let stats = SplitStats {
        total_pages,
        ranges_requested: ranges.len(),
        ranges_succeeded: outputs.len(),
        ranges_failed: failures.len(),
        pages_rotated,
        backend: Some(backend.kind()),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "split complete: {}/{} ranges in {}ms",
        stats.ranges_succeeded, stats.ranges_requested, stats.duration_ms
    );

    Ok(SplitReport {
        request_id: request.to_string(),
        documents: outputs,
        failures,
        stats,
    })
}

/// Describe the global page index without splitting anything.
pub fn describe_index(documents: &[SourceDocument]) -> Result<Vec<IndexEntry>, SplitError> {
    let index = GlobalPageIndex::build(documents)?;
    let mut entries = Vec::with_capacity(documents.len());
    for (i, doc) in documents.iter().enumerate() {
        let count = doc.page_count()?;
        let first = index.first_page_of(i).unwrap_or(1);
        entries.push(IndexEntry {
            name: doc.original_name().to_string(),
            path: doc.path().to_path_buf(),
            page_count: count,
            first_page: first,
            last_page: first + count - 1,
        });
    }
    Ok(entries)
}

// ── Per-range work ───────────────────────────────────────────────────────

struct RangeJob<'a> {
    index: usize,
    spec: &'a RangeSpec,
    file_name: String,
    out_dir: &'a Path,
    scratch: &'a Path,
}

impl RangeJob<'_> {
    /// Produce this range's document; returns it with the rotated-page count.
    fn run(
        &self,
        index: &GlobalPageIndex<'_>,
        rotations: &RotationMap,
        backend: &dyn ExtractionBackend,
    ) -> Result<(OutputDocument, usize), SplitError> {
        let parsed = range::parse_detailed(&self.spec.range, index.total_pages());
        if !parsed.ignored.is_empty() {
            warn!(
                "range '{}': ignoring token(s) {:?}",
                self.spec.range, parsed.ignored
            );
        }
        if parsed.is_empty() {
            return Err(SplitError::EmptyRange {
                name: self.spec.name.clone(),
                range: self.spec.range.clone(),
                total: index.total_pages(),
            });
        }

        let plan = plan::plan(&parsed.pages, index)?;
        debug!(
            "range '{}': {} page(s) from {} document(s)",
            self.spec.range,
            plan.page_count(),
            plan.groups.len()
        );

        // Output order is group order, which can differ from written order.
        let source_pages: Vec<u32> = plan
            .groups
            .iter()
            .flat_map(|g| g.global_pages.iter().copied())
            .collect();

        let out_path = self.out_dir.join(&self.file_name);
        let result = self.extract_and_merge(&plan, rotations, backend, &out_path);
        if result.is_err() && out_path.exists() {
            let _ = std::fs::remove_file(&out_path);
        }
        let rotated = result.map_err(|e| SplitError::ExtractionFailure {
            range: self.spec.range.clone(),
            source: Box::new(e),
        })?;

        let bytes = std::fs::metadata(&out_path)
            .map(|m| m.len())
            .map_err(|e| SplitError::io(format!("reading {}", out_path.display()), e))?;
        let doc = OutputDocument::from_spec(
            self.index,
            self.spec,
            self.file_name.clone(),
            out_path,
            source_pages,
            bytes,
        );
        Ok((doc, rotated))
    }

    fn extract_and_merge(
        &self,
        plan: &plan::ExtractionPlan<'_>,
        rotations: &RotationMap,
        backend: &dyn ExtractionBackend,
        out_path: &Path,
    ) -> Result<usize, SplitError> {
        let mut fragments = Vec::with_capacity(plan.groups.len());
        let mut rotated = 0;
        for group in &plan.groups {
            let mut fragment = backend.extract(group.document, &group.local_pages, self.scratch)?;
            rotated += rotate::apply(
                backend,
                &mut fragment,
                &group.global_pages,
                rotations,
                self.scratch,
            )?;
            fragments.push(fragment);
        }
        merge::assemble(backend, fragments, out_path, self.scratch)?;
        Ok(rotated)
    }
}
