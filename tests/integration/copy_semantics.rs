//! Integration tests for what gets copied, and how references are rewritten.

use pdfmerge::merge::{Merger, SourceInput};
use pdfmerge::merge_documents;
use pdfmerge::pdf::{Object, SourceDocument, Warning};

use crate::common::{RawPdf, load, page_dicts, page_texts};

/// Two pages under a nested page tree sharing one font, with a link
/// annotation pointing back at its page and a reference to a missing object.
fn shared_resources_pdf() -> Vec<u8> {
    RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 2 /Resources 5 0 R /Rotate 90 /MediaBox [0 0 200 100] >>",
        )
        .object(
            3,
            "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 6 0 R] /Count 2 /CropBox [0 0 50 50] >>",
        )
        .object(4, "<< /Type /Page /Parent 3 0 R /Contents 7 0 R /Extra 42 0 R >>")
        .object(5, "<< /Font << /F1 10 0 R >> >>")
        .object(
            6,
            "<< /Type /Page /Parent 3 0 R /Contents 8 0 R /Rotate 180 /Annots [9 0 R] >>",
        )
        .stream(7, "", b"first")
        .stream(8, "", b"second")
        .object(
            9,
            "<< /Type /Annot /Subtype /Link /Rect [0 0 10 10] /P 6 0 R /Missing 42 0 R >>",
        )
        .object(10, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>")
        .xref_table("<< /Size 11 /Root 1 0 R >>")
        .finish()
}

fn count_fonts(document: &SourceDocument) -> usize {
    document
        .objects()
        .filter(|(_, object)| object.dict().is_some_and(|d| d.type_is(b"Font")))
        .count()
}

#[test]
fn test_shared_font_copied_once_per_document() {
    let merged = merge_documents(&[shared_resources_pdf()]).unwrap();
    let document = load(&merged);
    assert_eq!(count_fonts(&document), 1);

    let pages = page_dicts(&document);
    assert_eq!(pages[0].get(b"Resources"), pages[1].get(b"Resources"));
}

#[test]
fn test_no_sharing_across_documents() {
    let merged = merge_documents(&[shared_resources_pdf(), shared_resources_pdf()]).unwrap();
    let document = load(&merged);

    assert_eq!(document.page_count(), 4);
    assert_eq!(count_fonts(&document), 2);
    assert_eq!(page_texts(&merged), vec!["first", "second", "first", "second"]);
}

#[test]
fn test_inherited_attributes_are_made_explicit() {
    let merged = merge_documents(&[shared_resources_pdf()]).unwrap();
    let document = load(&merged);
    let pages = page_dicts(&document);

    assert_eq!(pages[0].get(b"Rotate"), Some(&Object::Integer(90)));
    assert_eq!(pages[1].get(b"Rotate"), Some(&Object::Integer(180)));
    for page in &pages {
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"CropBox"));
        assert!(page.has(b"Resources"));
    }
}

#[test]
fn test_page_tree_is_flattened() {
    let merged = merge_documents(&[shared_resources_pdf()]).unwrap();
    let document = load(&merged);

    let root = document.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
    for page in document.pages() {
        assert!(page.ancestors == vec![root]);
    }
    let root_dict = document.resolve(root).as_dict().unwrap();
    assert_eq!(root_dict.get(b"Count"), Some(&Object::Integer(2)));
}

#[test]
fn test_back_reference_to_page_is_rewritten() {
    let merged = merge_documents(&[shared_resources_pdf()]).unwrap();
    let document = load(&merged);

    let second_page = document.pages()[1].id;
    let page = document.resolve(second_page).as_dict().unwrap();
    let annots = page.get(b"Annots").unwrap().as_array().unwrap();
    let annot = document.deref(&annots[0]).as_dict().unwrap();

    assert_eq!(annot.get(b"P"), Some(&Object::Reference(second_page)));
}

#[test]
fn test_dangling_reference_becomes_null_with_one_warning() {
    let output = Merger::default()
        .merge(&[
            SourceInput::new(crate::common::pdf_with_pages(&["clean"])),
            SourceInput::new(shared_resources_pdf()),
        ])
        .unwrap();

    assert_eq!(
        output.warnings,
        vec![Warning::UnresolvedReference {
            document: 1,
            id: (42, 0)
        }]
    );

    let document = load(&output.bytes);
    let pages = page_dicts(&document);
    assert_eq!(pages[1].get(b"Extra"), Some(&Object::Null));
}

#[test]
fn test_cyclic_structure_terminates() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Resources 4 0 R >>")
        .object(4, "<< /Loop 5 0 R >>")
        .object(5, "<< /Back 4 0 R /Self 5 0 R >>")
        .xref_table("<< /Size 6 /Root 1 0 R >>")
        .finish();

    let output = Merger::default().merge(&[SourceInput::new(pdf)]).unwrap();
    let document = load(&output.bytes);

    let page = page_dicts(&document)[0];
    let resources_id = page.get(b"Resources").unwrap().as_reference().unwrap();
    let resources = document.resolve(resources_id).as_dict().unwrap();
    let loop_id = resources.get(b"Loop").unwrap().as_reference().unwrap();
    let looped = document.resolve(loop_id).as_dict().unwrap();

    assert_eq!(looped.get(b"Back"), Some(&Object::Reference(resources_id)));
    assert_eq!(looped.get(b"Self"), Some(&Object::Reference(loop_id)));
    assert!(output.warnings.is_empty());
}

#[test]
fn test_unreachable_objects_are_dropped() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R /Metadata 5 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .object(4, "<< /Type /Font /Subtype /Type1 /BaseFont /Orphan >>")
        .stream(5, "/Type /Metadata /Subtype /XML", b"<x/>")
        .xref_table("<< /Size 6 /Root 1 0 R >>")
        .finish();

    let merged = merge_documents(&[pdf]).unwrap();
    let document = load(&merged);
    assert_eq!(count_fonts(&document), 0);
    assert!(!document.catalog().unwrap().has(b"Metadata"));
}

#[test]
fn test_resource_cycle_back_to_page_points_at_new_page() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /Resources << /XObject << /X1 5 0 R >> >> >>",
        )
        .stream(5, "/Type /XObject /Subtype /Form /Page 3 0 R", b"q Q")
        .xref_table("<< /Size 6 /Root 1 0 R >>")
        .finish();

    let output = Merger::default()
        .merge(&[
            SourceInput::new(crate::common::pdf_with_pages(&["before"])),
            SourceInput::new(pdf),
        ])
        .unwrap();
    assert!(output.warnings.is_empty());

    let document = load(&output.bytes);
    let page_id = document.pages()[1].id;
    let page = document.resolve(page_id).as_dict().unwrap();
    let resources = document.deref(page.get(b"Resources").unwrap()).as_dict().unwrap();
    let xobjects = document.deref(resources.get(b"XObject").unwrap()).as_dict().unwrap();
    let form = document.deref(xobjects.get(b"X1").unwrap()).as_stream().unwrap();

    assert_eq!(form.dict.get(b"Page"), Some(&Object::Reference(page_id)));
    assert_eq!(document.page_count(), 2);
}

#[test]
fn test_fractional_font_matrix_is_preserved() {
    let pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Resources << /Font << /T3 4 0 R >> >> >>")
        .object(
            4,
            "<< /Type /Font /Subtype /Type3 /FontMatrix [0.00048828125 0 0 0.00048828125 0 0] >>",
        )
        .xref_table("<< /Size 5 /Root 1 0 R >>")
        .finish();

    let merged = merge_documents(&[pdf]).unwrap();
    let text = String::from_utf8_lossy(&merged);
    assert!(text.contains("/FontMatrix [0.00048828125 0 0 0.00048828125 0 0]"));
}
