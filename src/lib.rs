//! pdfmerge - merge an ordered set of PDF documents into one.
//!
//! The engine reads each input (classic and stream cross-references,
//! incremental updates, object streams, damaged files by scanning), copies
//! the objects reachable from its pages into a fresh document, and writes
//! a single PDF with one classic cross-reference table. It supports:
//!
//! - Page order preserved across and within inputs
//! - Objects shared between pages of one input copied once
//! - Inherited page attributes made explicit on each copied page
//! - Optional bookmarks per input and document information
//! - Parallel parsing on blocking workers
//!
//! # Examples
//!
//! ## Basic Merge
//!
//! ```no_run
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfmerge::Result<()> {
//! let merged: Vec<u8> = pdfmerge::merge_documents(&[a, b])?;
//! std::fs::write("merged.pdf", merged)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## With Options
//!
//! ```no_run
//! use pdfmerge::config::{DocumentErrorPolicy, MergeOptions, Metadata};
//! use pdfmerge::merge::{Merger, SourceInput};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> pdfmerge::Result<()> {
//! let options = MergeOptions {
//!     on_document_error: DocumentErrorPolicy::Skip,
//!     bookmarks: true,
//!     metadata: Metadata::new(Some("Book".into()), None, None, None),
//!     ..Default::default()
//! };
//! let output = Merger::new(options)
//!     .merge_async(vec![
//!         SourceInput::with_label(a, "chapter-1.pdf"),
//!         SourceInput::with_label(b, "chapter-2.pdf"),
//!     ])
//!     .await?;
//! println!("{} pages, {} skipped", output.statistics.total_pages, output.skipped.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod output;
pub mod pdf;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, MergeOptions};
pub use error::{MergeError, Result};
pub use merge::{MergeOutput, Merger, SourceInput};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Merge complete PDF files, in order, with default options.
///
/// # Errors
///
/// Returns [`MergeError::EmptyInput`] for an empty slice, or the first
/// document's failure wrapped in [`MergeError::Document`] with its index.
pub fn merge_documents<B: AsRef<[u8]>>(inputs: &[B]) -> Result<Vec<u8>> {
    Merger::default()
        .merge_bytes(inputs)
        .map(|output| output.bytes)
}
