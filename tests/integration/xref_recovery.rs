//! Integration tests for inputs with unusual or damaged cross-reference data.

use pdfmerge::merge::{Merger, SourceInput};
use pdfmerge::merge_documents;
use pdfmerge::pdf::Warning;

use crate::common::{RawPdf, page_texts, pdf_with_pages};

fn one_page(builder: RawPdf) -> RawPdf {
    builder
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
}

#[test]
fn test_incremental_update_replaces_content() {
    let pdf = one_page(RawPdf::new())
        .stream(4, "", b"original")
        .xref_table("<< /Size 5 /Root 1 0 R >>")
        .stream(4, "", b"revised")
        .xref_table("<< /Size 5 /Root 1 0 R /Prev {prev} >>")
        .finish();

    let merged = merge_documents(&[pdf, pdf_with_pages(&["next"])]).unwrap();
    assert_eq!(page_texts(&merged), vec!["revised", "next"]);
}

#[test]
fn test_incremental_update_adds_page() {
    let pdf = one_page(RawPdf::new())
        .stream(4, "", b"one")
        .xref_table("<< /Size 5 /Root 1 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>")
        .object(5, "<< /Type /Page /Parent 2 0 R /Contents 6 0 R >>")
        .stream(6, "", b"two")
        .xref_table("<< /Size 7 /Root 1 0 R /Prev {prev} >>")
        .finish();

    let merged = merge_documents(&[pdf]).unwrap();
    assert_eq!(page_texts(&merged), vec!["one", "two"]);
}

#[test]
fn test_xref_stream_with_object_stream() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object_stream(
            5,
            &[
                (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
                (3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>"),
            ],
        )
        .stream(4, "", b"packed")
        .xref_stream(6, "/Root 1 0 R")
        .finish();

    let output = Merger::default()
        .merge(&[SourceInput::new(pdf), SourceInput::new(pdf_with_pages(&["plain"]))])
        .unwrap();

    assert_eq!(page_texts(&output.bytes), vec!["packed", "plain"]);
    assert!(output.warnings.is_empty());
    // Output never uses object streams or xref streams.
    assert!(!output.bytes.windows(7).any(|w| w == b"/ObjStm"));
    assert!(!output.bytes.windows(5).any(|w| w == b"/XRef"));
}

#[test]
fn test_broken_startxref_is_recovered_by_scanning() {
    let pdf = one_page(RawPdf::new())
        .stream(4, "", b"recovered")
        .xref_table("<< /Size 5 /Root 1 0 R >>")
        .finish_at(7);

    let output = Merger::default().merge(&[SourceInput::new(pdf)]).unwrap();

    assert_eq!(page_texts(&output.bytes), vec!["recovered"]);
    assert!(matches!(
        output.warnings.first(),
        Some(Warning::XrefRebuilt { document: 0, .. })
    ));
}

#[test]
fn test_file_without_xref_is_recovered() {
    let pdf = b"%PDF-1.4\n\
        1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
        2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
        3 0 obj << /Type /Page /Parent 2 0 R /Contents 4 0 R >> endobj\n\
        4 0 obj << /Length 4 >>\nstream\nbare\nendstream\nendobj\n"
        .to_vec();

    let merged = merge_documents(&[pdf]).unwrap();
    assert_eq!(page_texts(&merged), vec!["bare"]);
}

#[test]
fn test_wrong_stream_length_warns_and_keeps_content() {
    let pdf = one_page(RawPdf::new())
        .object(4, "<< /Length 99 >>\nstream\nshort\nendstream")
        .xref_table("<< /Size 5 /Root 1 0 R >>")
        .finish();

    let output = Merger::default().merge(&[SourceInput::new(pdf)]).unwrap();

    assert_eq!(page_texts(&output.bytes), vec!["short"]);
    assert!(
        output
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::StreamLengthMismatch { declared: 99, .. }))
    );
}
