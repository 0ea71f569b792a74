//! Integration tests for the split pipeline.
//!
//! The raster tests inject [`common::TaggingRasterizer`] so they need no
//! pdfium; the tool tests run a shell-script stand-in for pdftk (unix only).

mod common;

use common::{msg, page_count, page_sizes, pdf, TaggingRasterizer};
use edgequake_pdfsplit::{
    describe_index, split_ranges, split_ranges_async, BackendKind, BackendPreference, RangeSpec,
    RotationMap, Session, SplitConfig, SplitError, UploadedFile,
};
use std::path::Path;
use std::sync::Arc;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn raster_config(root: &Path) -> SplitConfig {
    SplitConfig::builder()
        .backend(BackendPreference::Raster)
        .rasterizer(Arc::new(TaggingRasterizer))
        .raster_dpi(72)
        .temp_root(root)
        .build()
        .unwrap()
}

/// a.pdf: 3 pages, 100 wide. b.pdf: 2 pages, 200 wide.
fn two_document_session(config: &SplitConfig) -> Session {
    let mut session = Session::new(config).unwrap();
    session
        .ingest(vec![
            UploadedFile::new("a.pdf", pdf(3, 100)),
            UploadedFile::new("b.pdf", pdf(2, 200)),
        ])
        .unwrap();
    session
}

// ── Raster backend ───────────────────────────────────────────────────────────

#[test]
fn range_crosses_document_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let session = two_document_session(&config);

    let report = split_ranges(
        &session,
        &[RangeSpec::new("2-4", "Contract")],
        &RotationMap::new(),
    )
    .unwrap();

    let doc = &report.documents[0];
    assert_eq!(doc.file_name, "Contract.pdf");
    assert_eq!(doc.source_pages, vec![2, 3, 4]);
    assert_eq!(page_sizes(&doc.path), vec![(102, 50), (103, 50), (201, 50)]);
    assert_eq!(report.stats.backend, Some(BackendKind::Raster));
    assert_eq!(report.stats.total_pages, 5);
}

#[test]
fn pages_follow_document_first_seen_order() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let session = two_document_session(&config);

    let report = split_ranges(
        &session,
        &[RangeSpec::new("5,1", "Reversed"), RangeSpec::new("1,5,2", "Regrouped")],
        &RotationMap::new(),
    )
    .unwrap();

    let reversed = &report.documents[0];
    assert_eq!(reversed.source_pages, vec![5, 1]);
    assert_eq!(page_sizes(&reversed.path), vec![(202, 50), (101, 50)]);

    let regrouped = &report.documents[1];
    assert_eq!(regrouped.source_pages, vec![1, 2, 5]);
    assert_eq!(page_sizes(&regrouped.path), vec![(101, 50), (102, 50), (202, 50)]);
}

#[test]
fn rotation_applies_to_global_page() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let session = two_document_session(&config);
    let rotations = RotationMap::from_json(r#"{"4": 90, "3": 180}"#).unwrap();

    let report = split_ranges(&session, &[RangeSpec::new("3-4", "Turned")], &rotations).unwrap();

    assert_eq!(page_sizes(&report.documents[0].path), vec![(103, 50), (50, 201)]);
    assert_eq!(report.stats.pages_rotated, 2);
}

#[test]
fn msg_attachments_extend_the_index() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let attached = pdf(2, 300);
    let mut session = Session::new(&config).unwrap();
    let added = session
        .ingest(vec![
            UploadedFile::new("a.pdf", pdf(1, 100)),
            UploadedFile::new("mail.msg", msg(&[("contract.pdf", &attached)])),
        ])
        .unwrap();
    assert_eq!(added, 2);

    let index = describe_index(session.documents()).unwrap();
    assert_eq!(index[1].name, "contract.pdf");
    assert_eq!((index[1].first_page, index[1].last_page), (2, 3));

    let report = split_ranges(&session, &[RangeSpec::new("2-3", "Attached")], &RotationMap::new())
        .unwrap();
    assert_eq!(page_sizes(&report.documents[0].path), vec![(301, 50), (302, 50)]);
}

#[test]
fn partial_failure_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let session = two_document_session(&config);

    let report = split_ranges(
        &session,
        &[
            RangeSpec::new("1", "Cover").with_classification("LTR"),
            RangeSpec::new("40-50", "Missing"),
        ],
        &RotationMap::new(),
    )
    .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.failures[0].name, "Missing");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["documents"][0]["type"], "LTR");
    assert_eq!(json["failures"][0]["index"], 1);
}

#[test]
fn every_range_failing_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let session = two_document_session(&config);

    let err = split_ranges(
        &session,
        &[RangeSpec::new("0", "Zero"), RangeSpec::new("abc", "Junk")],
        &RotationMap::new(),
    )
    .unwrap_err();
    match err {
        SplitError::AllRangesFailed { total, first_error } => {
            assert_eq!(total, 2);
            assert!(first_error.contains("Zero"), "{first_error}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn async_split_writes_into_caller_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let session = two_document_session(&config);
    let out = tmp.path().join("bundle");

    let report = split_ranges_async(
        session.documents().to_vec(),
        vec![RangeSpec::new("1-3", "A"), RangeSpec::new("4-5", "A")],
        RotationMap::new(),
        out.clone(),
        config,
    )
    .await
    .unwrap();

    assert_eq!(report.documents[0].path, out.join("A.pdf"));
    assert_eq!(report.documents[1].path, out.join("A_2.pdf"));
    assert_eq!(page_count(&out.join("A_2.pdf")), 2);
}

#[test]
fn rejected_upload_stores_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let config = raster_config(tmp.path());
    let mut session = Session::new(&config).unwrap();
    let err = session
        .ingest(vec![
            UploadedFile::new("a.pdf", pdf(1, 100)),
            UploadedFile::new("notes.docx", b"PK".to_vec()),
        ])
        .unwrap_err();
    assert!(matches!(err, SplitError::UnsupportedInput { .. }));
    assert!(session.documents().is_empty());
}

// ── Tool backend ─────────────────────────────────────────────────────────────

#[cfg(unix)]
mod tool {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Logs the page list of each call and copies its first input to the
    /// output path.
    const FAKE_PDFTK: &str = r#"#!/bin/sh
first="$1"
mode=in
pages=""
out=""
for a in "$@"; do
  case "$mode" in
    in) [ "$a" = cat ] && mode=cat ;;
    cat) if [ "$a" = output ]; then mode=out; else pages="$pages $a"; fi ;;
    out) out="$a" ;;
  esac
done
echo "cat$pages" >> "__LOG__"
cp "$first" "$out"
"#;

    /// Like [`FAKE_PDFTK`] but stamps each call's page list into its output,
    /// so the final bytes record every step that produced them.
    const STAMPING_PDFTK: &str = r#"#!/bin/sh
first="$1"
mode=in
pages=""
out=""
for a in "$@"; do
  case "$mode" in
    in) [ "$a" = cat ] && mode=cat ;;
    cat) if [ "$a" = output ]; then mode=out; else pages="$pages $a"; fi ;;
    out) out="$a" ;;
  esac
done
cat "$first" > "$out"
echo "cat$pages" >> "$out"
"#;

    const FAILING_PDFTK: &str = "#!/bin/sh\necho 'Error: unable to find file' >&2\nexit 3\n";

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn tool_config(root: &Path, tool: PathBuf) -> SplitConfig {
        SplitConfig::builder()
            .backend(BackendPreference::Tool)
            .tool_path(tool)
            .temp_root(root)
            .build()
            .unwrap()
    }

    #[test]
    fn invocations_follow_the_plan() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("calls.log");
        let tool = script(
            tmp.path(),
            "pdftk",
            &FAKE_PDFTK.replace("__LOG__", &log.display().to_string()),
        );
        let config = tool_config(tmp.path(), tool);
        let session = two_document_session(&config);
        let rotations = RotationMap::from_json(r#"{"3": 180}"#).unwrap();

        let report =
            split_ranges(&session, &[RangeSpec::new("2-4", "Contract")], &rotations).unwrap();

        assert_eq!(report.stats.backend, Some(BackendKind::Tool));
        assert!(report.documents[0].path.exists());
        let calls: Vec<String> = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(calls, vec!["cat 2 3", "cat 1 2down", "cat 1", "cat"]);
    }

    #[test]
    fn single_fragment_skips_the_merge_call() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("calls.log");
        let tool = script(
            tmp.path(),
            "pdftk",
            &FAKE_PDFTK.replace("__LOG__", &log.display().to_string()),
        );
        let config = tool_config(tmp.path(), tool);
        let session = two_document_session(&config);

        split_ranges(&session, &[RangeSpec::new("1-3", "First")], &RotationMap::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "cat 1 2 3\n");
    }

    #[test]
    fn rerun_gives_byte_identical_output() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = script(tmp.path(), "pdftk", STAMPING_PDFTK);
        let config = tool_config(tmp.path(), tool);
        let session = two_document_session(&config);
        let rotations = RotationMap::from_json(r#"{"3": 180, "5": 90}"#).unwrap();
        let ranges = [RangeSpec::new("2-5", "Contract"), RangeSpec::new("5,1", "Mixed")];

        let first = split_ranges(&session, &ranges, &rotations).unwrap();
        let second = split_ranges(&session, &ranges, &rotations).unwrap();

        assert_eq!(first.documents.len(), 2);
        for (a, b) in first.documents.iter().zip(&second.documents) {
            assert_ne!(a.path, b.path);
            let a_bytes = std::fs::read(&a.path).unwrap();
            let b_bytes = std::fs::read(&b.path).unwrap();
            assert!(!a_bytes.is_empty());
            assert_eq!(a_bytes, b_bytes, "{} differs between runs", a.file_name);
        }
        let stamped = String::from_utf8_lossy(&std::fs::read(&first.documents[0].path).unwrap())
            .into_owned();
        // a.pdf fragment: extracted, rotated, then merged with the b.pdf fragment
        assert!(stamped.ends_with("cat 2 3\ncat 1 2down\ncat\n"), "{stamped}");
    }

    #[test]
    fn tool_failure_carries_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = script(tmp.path(), "pdftk", FAILING_PDFTK);
        let config = tool_config(tmp.path(), tool);
        let session = two_document_session(&config);

        let err = split_ranges(&session, &[RangeSpec::new("1", "One")], &RotationMap::new())
            .unwrap_err();
        match err {
            SplitError::AllRangesFailed { first_error, .. } => {
                assert!(first_error.contains("unable to find file"), "{first_error}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
