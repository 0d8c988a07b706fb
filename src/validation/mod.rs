//! Input inspection for pdfmerge.
//!
//! Parses inputs the same way a merge does and reports what was found,
//! without producing output. Used for dry runs and `--json` reports:
//! - PDF version, page and object counts
//! - first-page dimensions
//! - recoverable warnings and, for unusable inputs, the error
//!
//! It also performs the output-path pre-flight checks of a CLI run.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::merge::SourceInput;
//! use pdfmerge::validation::Inspector;
//!
//! # fn example(bytes: Vec<u8>) {
//! let summary = Inspector::new().inspect_all(&[SourceInput::with_label(bytes, "a.pdf")]);
//! println!("{} pages in {} documents", summary.total_pages, summary.documents_ok);
//! # }
//! ```

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::{Config, OverwriteMode};
use crate::error::{MergeError, Result};
use crate::io::PdfWriter;
use crate::merge::SourceInput;
use crate::pdf::{SourceDocument, Warning};
use crate::utils::format_file_size;

/// What was found in one input document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    /// Position in the input order.
    pub index: usize,

    /// Label of the input, usually its file name.
    pub label: Option<String>,

    /// Header version, e.g. `1.7`.
    pub version: Option<String>,

    /// Number of leaf pages.
    pub page_count: usize,

    /// Number of indirect objects.
    pub object_count: usize,

    /// Size of the input in bytes.
    pub file_size: u64,

    /// Width and height of the first page in points.
    pub page_dimensions: Option<(f64, f64)>,

    /// Recoverable anomalies found while parsing.
    pub warnings: Vec<Warning>,

    /// Why the document cannot be merged, if it cannot.
    pub error: Option<String>,
}

impl DocumentReport {
    fn from_document(document: &SourceDocument, label: Option<String>, file_size: u64) -> Self {
        Self {
            index: document.index(),
            label,
            version: Some(document.version().to_string()),
            page_count: document.page_count(),
            object_count: document.object_count(),
            file_size,
            page_dimensions: first_page_dimensions(document),
            warnings: document.warnings().to_vec(),
            error: None,
        }
    }

    fn failed(index: usize, label: Option<String>, file_size: u64, err: &MergeError) -> Self {
        Self {
            index,
            label,
            version: None,
            page_count: 0,
            object_count: 0,
            file_size,
            page_dimensions: None,
            warnings: Vec::new(),
            error: Some(err.root_cause().to_string()),
        }
    }

    /// Whether the document can be merged.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Label if present, else `#index`.
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("#{}", self.index))
    }
}

/// Width and height of the first page's effective `/MediaBox`.
fn first_page_dimensions(document: &SourceDocument) -> Option<(f64, f64)> {
    let page = document.pages().first()?;
    let media_box = document.inherited_attribute(page, b"MediaBox")?;
    let corners = document.deref(media_box).as_array().ok()?;
    if corners.len() < 4 {
        return None;
    }
    let value = |i: usize| document.deref(&corners[i]).as_f64().ok();
    let width = (value(2)? - value(0)?).abs();
    let height = (value(3)? - value(1)?).abs();
    Some((width, height))
}

/// Summary of inspection results for multiple inputs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionSummary {
    /// Individual reports, in input order.
    pub reports: Vec<DocumentReport>,

    /// Total number of pages across usable documents.
    pub total_pages: usize,

    /// Total input size in bytes.
    pub total_size: u64,

    /// Number of documents that parsed.
    pub documents_ok: usize,

    /// Number of documents that failed.
    pub documents_failed: usize,

    /// Number of warnings across all documents.
    pub warning_count: usize,
}

impl InspectionSummary {
    /// Create a summary from reports.
    pub fn from_reports(reports: Vec<DocumentReport>) -> Self {
        let total_pages = reports.iter().map(|r| r.page_count).sum();
        let total_size = reports.iter().map(|r| r.file_size).sum();
        let documents_ok = reports.iter().filter(|r| r.is_ok()).count();
        let warning_count = reports.iter().map(|r| r.warnings.len()).sum();

        Self {
            documents_failed: reports.len() - documents_ok,
            reports,
            total_pages,
            total_size,
            documents_ok,
            warning_count,
        }
    }

    /// Format the total size as a human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }

    /// Reports of documents that cannot be merged.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentReport> {
        self.reports.iter().filter(|r| !r.is_ok())
    }
}

/// Inspector for inputs and output paths.
#[derive(Debug, Clone, Default)]
pub struct Inspector;

impl Inspector {
    pub fn new() -> Self {
        Self
    }

    /// Parse one input and report on it. Never fails; parse errors end up in
    /// [`DocumentReport::error`].
    pub fn inspect(&self, index: usize, input: &SourceInput) -> DocumentReport {
        let file_size = input.bytes.len() as u64;
        match SourceDocument::load(index, &input.bytes) {
            Ok(document) => DocumentReport::from_document(&document, input.label.clone(), file_size),
            Err(err) => DocumentReport::failed(index, input.label.clone(), file_size, &err),
        }
    }

    /// Inspect inputs in order on the calling thread.
    pub fn inspect_all(&self, inputs: &[SourceInput]) -> InspectionSummary {
        let reports = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| self.inspect(index, input))
            .collect();
        InspectionSummary::from_reports(reports)
    }

    /// Inspect inputs on blocking workers, at most `jobs` at a time.
    pub async fn inspect_all_async(&self, inputs: Vec<SourceInput>, jobs: usize) -> InspectionSummary {
        let tasks = inputs.into_iter().enumerate().map(|(index, input)| {
            let inspector = self.clone();
            async move {
                let label = input.label.clone();
                let file_size = input.bytes.len() as u64;
                tokio::task::spawn_blocking(move || inspector.inspect(index, &input))
                    .await
                    .unwrap_or_else(|err| {
                        let err = MergeError::Io(std::io::Error::other(err));
                        DocumentReport::failed(index, label, file_size, &err)
                    })
            }
        });

        let reports: Vec<DocumentReport> =
            stream::iter(tasks).buffered(jobs.max(1)).collect().await;
        InspectionSummary::from_reports(reports)
    }

    /// Validate the output path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Output file exists and no-clobber is set
    /// - Output directory doesn't exist or is not writable
    pub async fn validate_output(&self, config: &Config) -> Result<()> {
        let writer = PdfWriter::new();
        if config.overwrite_mode == OverwriteMode::NoClobber && writer.exists(&config.output).await
        {
            return Err(MergeError::OutputExists {
                path: config.output.clone(),
            });
        }
        writer.can_write(&config.output).await
    }
}
