//! Integration tests for the command-line front end, without spawning it.

use clap::Parser;
use pdfmerge::cli::Cli;
use pdfmerge::config::DocumentErrorPolicy;
use pdfmerge::io::PdfReader;
use pdfmerge::merge::Merger;
use tempfile::TempDir;

use crate::common::{page_texts, pdf_with_pages, write_file};

#[tokio::test]
async fn test_directory_input_merges_sorted() {
    let temp = TempDir::new().unwrap();
    let chapters = temp.path().join("chapters");
    std::fs::create_dir(&chapters).unwrap();
    write_file(&chapters, "02.pdf", &pdf_with_pages(&["two"]));
    write_file(&chapters, "01.pdf", &pdf_with_pages(&["one"]));
    write_file(&chapters, "notes.txt", b"not a pdf");
    let cover = write_file(temp.path(), "cover.pdf", &pdf_with_pages(&["cover"]));
    let output = temp.path().join("book.pdf");

    let cli = Cli::try_parse_from([
        "pdfmerge",
        cover.to_str().unwrap(),
        chapters.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--continue-on-error",
        "--jobs",
        "2",
    ])
    .unwrap();
    cli.validate().unwrap();
    let config = cli.to_config().await.unwrap();

    assert_eq!(config.inputs.len(), 3);
    assert_eq!(config.options.on_document_error, DocumentErrorPolicy::Skip);

    let (results, _) = PdfReader::new()
        .load_all(config.inputs(), config.effective_jobs())
        .await;
    let inputs = results
        .into_iter()
        .map(|result| result.unwrap().into_source_input())
        .collect();
    let merged = Merger::new(config.options.clone())
        .merge_async(inputs)
        .await
        .unwrap();

    assert_eq!(page_texts(&merged.bytes), vec!["cover", "one", "two"]);
}

#[tokio::test]
async fn test_output_among_inputs_is_rejected() {
    let temp = TempDir::new().unwrap();
    let input = write_file(temp.path(), "a.pdf", &pdf_with_pages(&["a"]));
    let path = input.to_str().unwrap();

    let cli = Cli::try_parse_from(["pdfmerge", path, "-o", path]).unwrap();
    assert!(cli.to_config().await.is_err());
}
