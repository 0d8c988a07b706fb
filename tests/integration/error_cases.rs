//! Integration tests for error handling and edge cases.

use pdfmerge::config::{Config, DocumentErrorPolicy, MergeOptions, OverwriteMode};
use pdfmerge::error::MergeError;
use pdfmerge::io::PdfReader;
use pdfmerge::merge::{CancelFlag, Merger, SourceInput};
use pdfmerge::merge_documents;
use pdfmerge::validation::Inspector;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::common::{RawPdf, page_texts, pdf_with_pages, write_file};

fn encrypted_pdf() -> Vec<u8> {
    RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .object(4, "<< /Filter /Standard /V 4 /R 4 >>")
        .xref_table("<< /Size 5 /Root 1 0 R /Encrypt 4 0 R >>")
        .finish()
}

fn skip_options() -> MergeOptions {
    MergeOptions {
        on_document_error: DocumentErrorPolicy::Skip,
        ..Default::default()
    }
}

#[test]
fn test_empty_input() {
    let inputs: Vec<Vec<u8>> = Vec::new();
    let err = merge_documents(&inputs).unwrap_err();
    assert!(matches!(err, MergeError::EmptyInput));
    assert!(err.is_fatal());
}

#[test]
fn test_encrypted_input_fails_with_its_index() {
    let err = merge_documents(&[pdf_with_pages(&["a"]), pdf_with_pages(&["b"]), encrypted_pdf()])
        .unwrap_err();

    assert_eq!(err.document_index(), Some(2));
    assert!(matches!(
        err.root_cause(),
        MergeError::UnsupportedFeature { .. }
    ));
}

#[test]
fn test_garbage_input_fails_with_its_index() {
    let err = merge_documents(&[b"definitely not a pdf".to_vec(), pdf_with_pages(&["b"])])
        .unwrap_err();
    assert_eq!(err.document_index(), Some(0));
    assert!(err.is_recoverable());
}

#[test]
fn test_cyclic_page_tree_is_malformed() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Pages /Kids [2 0 R] /Count 1 >>")
        .xref_table("<< /Size 4 /Root 1 0 R >>")
        .finish();

    let err = merge_documents(&[pdf]).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        MergeError::MalformedPageTree { .. }
    ));
}

#[test]
fn test_skip_policy_reports_skipped_documents() {
    let output = Merger::new(skip_options())
        .merge(&[
            SourceInput::with_label(pdf_with_pages(&["a"]), "a.pdf"),
            SourceInput::with_label(encrypted_pdf(), "locked.pdf"),
            SourceInput::with_label(pdf_with_pages(&["c"]), "c.pdf"),
        ])
        .unwrap();

    assert_eq!(page_texts(&output.bytes), vec!["a", "c"]);
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].index, 1);
    assert_eq!(output.skipped[0].label.as_deref(), Some("locked.pdf"));
    assert_eq!(output.statistics.documents_merged, 2);
}

#[tokio::test]
async fn test_skip_policy_async_matches_sync() {
    let inputs = vec![
        SourceInput::new(b"junk".to_vec()),
        SourceInput::new(pdf_with_pages(&["kept"])),
    ];
    let merger = Merger::new(skip_options());

    let sync = merger.merge(&inputs).unwrap();
    let parallel = merger.merge_async(inputs).await.unwrap();
    assert_eq!(sync.bytes, parallel.bytes);
    assert_eq!(parallel.skipped[0].index, 0);
}

#[tokio::test]
async fn test_cancel_before_merge() {
    let flag = CancelFlag::new();
    let merger = Merger::default().with_cancel_flag(flag.clone());
    flag.cancel();

    let result = merger
        .merge_async(vec![SourceInput::new(pdf_with_pages(&["x"]))])
        .await;
    let err = result.unwrap_err();
    assert!(matches!(err, MergeError::Cancelled));
    assert_eq!(err.exit_code(), 130);
}

#[test]
fn test_zero_jobs_rejected() {
    let options = MergeOptions {
        jobs: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        MergeOptions::from_json(r#"{ "jobs": 0 }"#),
        Err(MergeError::InvalidConfig { .. })
    ));
    assert!(options.validate().is_err());
}

#[tokio::test]
async fn test_nonexistent_input_file() {
    let result = PdfReader::new()
        .load(&PathBuf::from("/nonexistent/file.pdf"))
        .await;
    let err = result.unwrap_err();
    assert!(matches!(err, MergeError::FileNotFound { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_no_clobber_refuses_existing_output() {
    let temp = TempDir::new().unwrap();
    let output = write_file(temp.path(), "out.pdf", b"existing");

    let config = Config {
        inputs: vec![temp.path().join("a.pdf")],
        output,
        dry_run: false,
        verbose: false,
        quiet: true,
        json: false,
        overwrite_mode: OverwriteMode::NoClobber,
        options: MergeOptions::default(),
    };

    let err = Inspector::new().validate_output(&config).await.unwrap_err();
    assert!(matches!(err, MergeError::OutputExists { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_dry_run_inspection_reports_failures() {
    let summary = Inspector::new().inspect_all(&[
        SourceInput::with_label(pdf_with_pages(&["a", "b"]), "ok.pdf"),
        SourceInput::with_label(encrypted_pdf(), "locked.pdf"),
    ]);

    assert_eq!(summary.documents_ok, 1);
    assert_eq!(summary.total_pages, 2);
    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.display_name(), "locked.pdf");
    assert!(failure.error.as_deref().unwrap().contains("encrypt"));
}
