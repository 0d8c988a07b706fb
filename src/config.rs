//! Configuration for pdfmerge.
//!
//! Two layers live here:
//! - [`MergeOptions`] drives the engine and is all a library caller needs.
//! - [`Config`] is a validated command-line run: inputs, output path,
//!   console behaviour, plus the engine options.
//!
//! Both serialize with serde so options can be read from a JSON file and
//! echoed back in `--json` reports.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MergeError, Result};

/// What to do when one input document cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentErrorPolicy {
    /// Fail the whole merge (default).
    #[default]
    Abort,
    /// Leave the document out and report it in the merge output.
    Skip,
}

/// Document information to set on the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
        }
    }

    /// Fields of `other` that are set replace those of `self`.
    pub fn overridden_by(self, other: Metadata) -> Self {
        Self {
            title: other.title.or(self.title),
            author: other.author.or(self.author),
            subject: other.subject.or(self.subject),
            keywords: other.keywords.or(self.keywords),
        }
    }
}

/// Options for one merge.
///
/// # Examples
///
/// ```
/// use pdfmerge::config::{DocumentErrorPolicy, MergeOptions};
///
/// let options: MergeOptions =
///     serde_json::from_str(r#"{ "jobs": 2, "on_document_error": "skip" }"#).unwrap();
/// assert_eq!(options.on_document_error, DocumentErrorPolicy::Skip);
/// assert!(!options.bookmarks);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Number of documents parsed concurrently by the async entry point
    /// (None = one per CPU core).
    pub jobs: Option<usize>,

    /// Failure policy for individual documents.
    pub on_document_error: DocumentErrorPolicy,

    /// Add one outline entry per labelled input, pointing at its first page.
    pub bookmarks: bool,

    /// Document information for the output.
    pub metadata: Metadata,
}

impl MergeOptions {
    /// Check the options for values the engine cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidConfig`] if `jobs` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            return Err(MergeError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }
        Ok(())
    }

    /// Get the effective number of parallel parse jobs.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| MergeError::invalid_config(format!("Invalid options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            MergeError::invalid_config(format!(
                "Cannot read options file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Complete configuration for a command-line merge.
///
/// Derived and validated from CLI arguments.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Input PDF file paths (in merge order).
    pub inputs: Vec<PathBuf>,

    /// Output PDF file path.
    pub output: PathBuf,

    /// Dry run mode - inspect inputs without creating output.
    pub dry_run: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Print machine-readable JSON reports instead of text.
    pub json: bool,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Engine options.
    pub options: MergeOptions,
}

impl Config {
    /// Returns a reference to inputs.
    pub fn inputs(&self) -> &[PathBuf] {
        self.inputs.as_ref()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input files are specified
    /// - Verbose and quiet modes are both enabled
    /// - Jobs count is zero
    /// - The output path is also an input
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(MergeError::invalid_config("No input files specified"));
        }

        if self.verbose && self.quiet {
            return Err(MergeError::invalid_config(
                "Cannot use both --verbose and --quiet",
            ));
        }

        self.options.validate()?;

        if self.inputs.iter().any(|input| input == &self.output) {
            return Err(MergeError::invalid_config(format!(
                "Output file cannot be the same as an input file: {}",
                self.output.display()
            )));
        }

        Ok(())
    }

    /// Get the effective number of parallel jobs.
    pub fn effective_jobs(&self) -> usize {
        self.options.effective_jobs()
    }

    /// Check if output should be displayed.
    ///
    /// Returns false if in quiet mode and not doing a dry run.
    pub fn should_print(&self) -> bool {
        !self.quiet || self.dry_run
    }
}
