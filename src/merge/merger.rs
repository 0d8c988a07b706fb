//! Merge orchestration.
//!
//! A merge runs in three phases:
//! 1. parse every input into a [`SourceDocument`] (sequentially, or on
//!    blocking workers with bounded concurrency),
//! 2. copy pages in caller order into one [`TargetDocument`],
//! 3. serialize the target.
//!
//! Per-document failures are handled according to
//! [`MergeOptions::on_document_error`]. No output is produced unless every
//! phase completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{DocumentErrorPolicy, MergeOptions};
use crate::error::{MergeError, Result};
use crate::io::serializer::serialize;
use crate::merge::builder::TargetDocument;
use crate::merge::copier::Copier;
use crate::merge::outline::OutlineEntry;
use crate::pdf::{SourceDocument, Warning};
use crate::utils::format_file_size;

/// One input document: its raw bytes and an optional label.
///
/// Labels name the document in reports and become outline titles when
/// bookmarks are enabled.
#[derive(Debug, Clone, Default)]
pub struct SourceInput {
    /// Complete PDF file contents.
    pub bytes: Vec<u8>,
    /// Display name, usually the file name.
    pub label: Option<String>,
}

impl SourceInput {
    /// Unlabelled input.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, label: None }
    }

    /// Labelled input.
    pub fn with_label(bytes: Vec<u8>, label: impl Into<String>) -> Self {
        Self {
            bytes,
            label: Some(label.into()),
        }
    }
}

impl From<Vec<u8>> for SourceInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Borrowed view of an input so byte slices can be merged without copying.
struct InputRef<'a> {
    bytes: &'a [u8],
    label: Option<&'a str>,
}

/// Cooperative cancellation shared between a caller and a running merge.
///
/// The merge checks the flag between documents and between pages and stops
/// with [`MergeError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MergeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Statistics about a merge operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeStatistics {
    /// Number of documents that contributed pages.
    pub documents_merged: usize,

    /// Number of documents left out under the skip policy.
    pub documents_skipped: usize,

    /// Total number of pages in the merged document.
    pub total_pages: usize,

    /// Number of indirect objects in the output.
    pub objects_written: usize,

    /// Total size of all inputs.
    pub input_bytes: u64,

    /// Size of the serialized output.
    pub output_bytes: u64,

    /// Number of outline entries added.
    pub bookmarks_added: usize,

    /// Number of warnings raised.
    pub warnings: usize,

    /// Time taken to parse the inputs.
    pub parse_time: Duration,

    /// Time taken to copy pages and serialize.
    pub merge_time: Duration,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_bytes)
    }

    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_bytes)
    }

    /// Parse and merge time together.
    pub fn total_time(&self) -> Duration {
        self.parse_time + self.merge_time
    }
}

/// A document that was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    /// Position in the caller's input order.
    pub index: usize,
    /// Label of the input, if it had one.
    pub label: Option<String>,
    /// Why the document could not be used.
    pub reason: String,
}

/// Result of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// The merged PDF file.
    pub bytes: Vec<u8>,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,

    /// Recoverable anomalies, in input order.
    pub warnings: Vec<Warning>,

    /// Documents left out under [`DocumentErrorPolicy::Skip`].
    pub skipped: Vec<SkippedDocument>,
}

/// PDF merger that combines multiple documents.
///
/// # Examples
///
/// ```no_run
/// use pdfmerge::config::MergeOptions;
/// use pdfmerge::merge::{Merger, SourceInput};
///
/// # fn example(a: Vec<u8>, b: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
/// let merger = Merger::new(MergeOptions::default());
/// let output = merger.merge(&[SourceInput::new(a), SourceInput::new(b)])?;
/// println!("{} pages, {} warnings", output.statistics.total_pages, output.warnings.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Merger {
    options: MergeOptions,
    cancel: CancelFlag,
}

impl Merger {
    /// Create a merger with the given options.
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Use `flag` to cancel this merger's operations.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// A handle that cancels merges run by this merger.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge `inputs` in order on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `inputs` is empty
    /// - a document fails and the policy is [`DocumentErrorPolicy::Abort`]
    /// - every document fails under [`DocumentErrorPolicy::Skip`] (the first
    ///   failure is returned)
    /// - the merge is cancelled
    /// - the output cannot be serialized
    pub fn merge(&self, inputs: &[SourceInput]) -> Result<MergeOutput> {
        let inputs: Vec<InputRef<'_>> = inputs
            .iter()
            .map(|input| InputRef {
                bytes: &input.bytes,
                label: input.label.as_deref(),
            })
            .collect();
        self.merge_refs(&inputs)
    }

    /// Merge unlabelled byte buffers in order on the calling thread.
    pub fn merge_bytes<B: AsRef<[u8]>>(&self, inputs: &[B]) -> Result<MergeOutput> {
        let inputs: Vec<InputRef<'_>> = inputs
            .iter()
            .map(|bytes| InputRef {
                bytes: bytes.as_ref(),
                label: None,
            })
            .collect();
        self.merge_refs(&inputs)
    }

    fn merge_refs(&self, inputs: &[InputRef<'_>]) -> Result<MergeOutput> {
        self.options.validate()?;
        if inputs.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        let parse_start = Instant::now();
        let mut parsed = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            self.cancel.check()?;
            parsed.push(SourceDocument::load(index, input.bytes));
        }
        let parse_time = parse_start.elapsed();

        let labels = inputs
            .iter()
            .map(|input| input.label.map(str::to_string))
            .collect();
        let input_bytes = inputs.iter().map(|input| input.bytes.len() as u64).sum();
        self.assemble(parsed, labels, input_bytes, parse_time)
    }

    /// Merge `inputs`, parsing documents concurrently on blocking workers.
    ///
    /// At most [`MergeOptions::effective_jobs`] documents are parsed at once.
    /// Copying and serialization run on one blocking worker after all parses
    /// have finished. Output is identical to [`Merger::merge`].
    ///
    /// # Errors
    ///
    /// Same as [`Merger::merge`].
    pub async fn merge_async(&self, inputs: Vec<SourceInput>) -> Result<MergeOutput> {
        self.options.validate()?;
        if inputs.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        let labels: Vec<Option<String>> = inputs.iter().map(|input| input.label.clone()).collect();
        let input_bytes = inputs.iter().map(|input| input.bytes.len() as u64).sum();
        let jobs = self.options.effective_jobs();
        debug!("parsing {} documents with {jobs} workers", inputs.len());

        let parse_start = Instant::now();
        let parsed: Vec<Result<SourceDocument>> = stream::iter(
            inputs
                .into_iter()
                .enumerate()
                .map(|(index, input)| parse_blocking(index, input, self.cancel.clone())),
        )
        .buffered(jobs)
        .collect()
        .await;
        let parse_time = parse_start.elapsed();

        let merger = self.clone();
        tokio::task::spawn_blocking(move || merger.assemble(parsed, labels, input_bytes, parse_time))
            .await
            .map_err(join_error)?
    }

    /// Copy phase and serialization over already-parsed documents.
    fn assemble(
        &self,
        parsed: Vec<Result<SourceDocument>>,
        labels: Vec<Option<String>>,
        input_bytes: u64,
        parse_time: Duration,
    ) -> Result<MergeOutput> {
        let merge_start = Instant::now();

        let mut documents = Vec::with_capacity(parsed.len());
        let mut skipped = Vec::new();
        let mut first_failure = None;
        for (index, result) in parsed.into_iter().enumerate() {
            match result {
                Ok(document) => documents.push(document),
                Err(err)
                    if self.options.on_document_error == DocumentErrorPolicy::Skip
                        && err.is_recoverable() =>
                {
                    warn!("Skipping document #{index}: {err}");
                    skipped.push(SkippedDocument {
                        index,
                        label: labels.get(index).cloned().flatten(),
                        reason: err.root_cause().to_string(),
                    });
                    first_failure.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        if documents.is_empty() {
            return Err(first_failure.unwrap_or(MergeError::EmptyInput));
        }

        let mut target = TargetDocument::new();
        let mut copier = Copier::new();
        let mut warnings = Vec::new();
        let mut outline = Vec::new();

        for document in &documents {
            self.cancel.check()?;
            warnings.extend(document.warnings().iter().cloned());

            let reserved = copier.register_document(document, &mut target);
            for page in document.pages() {
                self.cancel.check()?;
                let id = copier.copy_page(document, page, &mut target)?;
                target.append_page(id)?;
            }
            warnings.extend(copier.take_warnings());

            if self.options.bookmarks
                && let Some(Some(label)) = labels.get(document.index())
                && let Some(first_page) = reserved.first()
            {
                outline.push(OutlineEntry::new(label.clone(), *first_page));
            }
            debug!(
                "document #{}: copied {} pages",
                document.index(),
                document.page_count()
            );
        }

        let bookmarks_added = match target.add_document_outline(&outline)? {
            Some(_) => outline.len(),
            None => 0,
        };
        if !self.options.metadata.is_empty() {
            target.set_info(&self.options.metadata);
        }

        self.cancel.check()?;
        let bytes = serialize(&target)?;

        let statistics = MergeStatistics {
            documents_merged: documents.len(),
            documents_skipped: skipped.len(),
            total_pages: target.page_count(),
            objects_written: target.len(),
            input_bytes,
            output_bytes: bytes.len() as u64,
            bookmarks_added,
            warnings: warnings.len(),
            parse_time,
            merge_time: merge_start.elapsed(),
        };
        info!(
            "Merged {} documents ({} pages) into {}",
            statistics.documents_merged,
            statistics.total_pages,
            statistics.format_output_size()
        );

        Ok(MergeOutput {
            bytes,
            statistics,
            warnings,
            skipped,
        })
    }
}

async fn parse_blocking(
    index: usize,
    input: SourceInput,
    cancel: CancelFlag,
) -> Result<SourceDocument> {
    cancel.check()?;
    tokio::task::spawn_blocking(move || SourceDocument::load(index, &input.bytes))
        .await
        .map_err(join_error)?
}

fn join_error(err: tokio::task::JoinError) -> MergeError {
    MergeError::Io(std::io::Error::other(err))
}
