//! Integration tests for end-to-end merges.

use pdfmerge::config::{MergeOptions, Metadata};
use pdfmerge::io::{PdfReader, PdfWriter};
use pdfmerge::merge::{Merger, SourceInput};
use pdfmerge::merge_documents;
use tempfile::TempDir;

use crate::common::{load, lopdf_document, page_texts, pdf_with_pages, write_file};

#[test]
fn test_pages_follow_input_order() {
    let merged = merge_documents(&[
        pdf_with_pages(&["a1", "a2"]),
        pdf_with_pages(&["b1"]),
        pdf_with_pages(&["c1", "c2", "c3"]),
    ])
    .unwrap();

    assert_eq!(page_texts(&merged), vec!["a1", "a2", "b1", "c1", "c2", "c3"]);
}

#[test]
fn test_single_document_round_trip() {
    let merged = merge_documents(&[pdf_with_pages(&["only"])]).unwrap();
    let document = load(&merged);

    assert_eq!(document.page_count(), 1);
    assert!(document.warnings().is_empty());
    assert!(merged.starts_with(b"%PDF-1.7\n"));
    assert!(merged.ends_with(b"%%EOF\n"));
}

#[test]
fn test_same_bytes_twice_gives_two_copies() {
    let input = pdf_with_pages(&["x"]);
    let merged = merge_documents(&[input.clone(), input]).unwrap();
    let document = load(&merged);

    assert_eq!(page_texts(&merged), vec!["x", "x"]);
    let pages = document.pages();
    assert_ne!(pages[0].id, pages[1].id);
}

#[test]
fn test_output_is_deterministic() {
    let inputs = [pdf_with_pages(&["p", "q"]), pdf_with_pages(&["r"])];
    assert_eq!(
        merge_documents(&inputs).unwrap(),
        merge_documents(&inputs).unwrap()
    );
}

#[test]
fn test_merging_merged_output() {
    let first = merge_documents(&[pdf_with_pages(&["1"]), pdf_with_pages(&["2"])]).unwrap();
    let second = merge_documents(&[first, pdf_with_pages(&["3"])]).unwrap();
    assert_eq!(page_texts(&second), vec!["1", "2", "3"]);
}

#[test]
fn test_lopdf_input_is_merged() {
    let merged = merge_documents(&[lopdf_document(&["BT ET", "q Q"]), pdf_with_pages(&["own"])])
        .unwrap();
    assert_eq!(page_texts(&merged), vec!["BT ET", "q Q", "own"]);

    // Inherited MediaBox from the lopdf page tree lands on each page.
    let document = load(&merged);
    let first_page = document.pages()[0].id;
    let page = document.resolve(first_page).as_dict().unwrap();
    assert!(page.has(b"MediaBox"));
}

#[test]
fn test_output_is_readable_by_lopdf() {
    let merged = merge_documents(&[pdf_with_pages(&["a", "b"]), lopdf_document(&["c"])]).unwrap();

    let document = lopdf::Document::load_mem(&merged).unwrap();
    let pages = document.get_pages();
    assert_eq!(pages.len(), 3);

    let contents: Vec<Vec<u8>> = pages
        .values()
        .map(|id| document.get_page_content(*id).unwrap())
        .collect();
    assert_eq!(contents, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_bookmarks_and_metadata() {
    let options = MergeOptions {
        bookmarks: true,
        metadata: Metadata::new(Some("Collected Papers".into()), Some("Ann".into()), None, None),
        ..Default::default()
    };
    let output = Merger::new(options)
        .merge(&[
            SourceInput::with_label(pdf_with_pages(&["a", "b"]), "first.pdf"),
            SourceInput::with_label(pdf_with_pages(&["c"]), "second.pdf"),
        ])
        .unwrap();
    assert_eq!(output.statistics.bookmarks_added, 2);

    let document = load(&output.bytes);
    let info = document.info().unwrap();
    assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Collected Papers");
    assert_eq!(info.get(b"Author").unwrap().as_str().unwrap(), b"Ann");

    let catalog = document.catalog().unwrap();
    let outlines = document.deref(catalog.get(b"Outlines").unwrap()).as_dict().unwrap();
    assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 2);

    // The second bookmark points at the third page.
    let first = document.deref(outlines.get(b"First").unwrap()).as_dict().unwrap();
    let second = document.deref(first.get(b"Next").unwrap()).as_dict().unwrap();
    assert_eq!(second.get(b"Title").unwrap().as_str().unwrap(), b"second.pdf");
    let dest = second.get(b"Dest").unwrap().as_array().unwrap();
    assert_eq!(dest[0].as_reference().unwrap(), document.pages()[2].id);
}

#[test]
fn test_no_info_without_metadata() {
    let merged = merge_documents(&[pdf_with_pages(&["a"])]).unwrap();
    assert!(load(&merged).info().is_none());
}

#[tokio::test]
async fn test_files_to_file() {
    let temp = TempDir::new().unwrap();
    let a = write_file(temp.path(), "a.pdf", &pdf_with_pages(&["from a"]));
    let b = write_file(temp.path(), "b.pdf", &lopdf_document(&["from b"]));
    let output_path = temp.path().join("merged.pdf");

    let (results, stats) = PdfReader::new().load_all(&[a, b], 2).await;
    assert_eq!(stats.success_count, 2);
    let inputs: Vec<SourceInput> = results
        .into_iter()
        .map(|result| result.unwrap().into_source_input())
        .collect();

    let output = Merger::default().merge_async(inputs).await.unwrap();
    let write_stats = PdfWriter::new()
        .save_with_stats(output.bytes, &output_path)
        .await
        .unwrap();

    let written = std::fs::read(&output_path).unwrap();
    assert_eq!(write_stats.file_size, written.len() as u64);
    assert_eq!(page_texts(&written), vec!["from a", "from b"]);
    assert!(!temp.path().join("merged.pdf.tmp").exists());
}
