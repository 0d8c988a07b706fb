//! CLI argument parsing for pdfmerge.
//!
//! This module defines the command-line interface using `clap` and turns
//! parsed arguments into a validated [`Config`].
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::cli::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! println!("Merging {} inputs", cli.inputs.len());
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::{Config, DocumentErrorPolicy, MergeOptions, Metadata, OverwriteMode};
use crate::error::{MergeError, Result};
use crate::utils::collect_input_paths;

/// Merge PDF documents into a single document.
///
/// Pages are appended in input order. Objects shared between pages of one
/// input are copied once; nothing is deduplicated across inputs.
#[derive(Parser, Debug)]
#[command(name = "pdfmerge")]
#[command(version)]
#[command(about = "Merge PDF documents into a single document", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input PDF files, glob patterns or directories (in order)
    ///
    /// Directories are searched recursively for *.pdf files, sorted by path.
    /// Glob matches are sorted too.
    ///
    /// Examples:
    ///   pdfmerge a.pdf b.pdf -o out.pdf
    ///   pdfmerge 'chapter-*.pdf' appendix/ -o book.pdf
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Output PDF file path
    ///
    /// Written atomically through a temporary file next to it.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Inspect inputs and report what a merge would do, without writing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show per-document details and timings
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing output file without asking
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite an existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Number of documents parsed concurrently (default: CPU cores)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Leave out documents that fail to parse instead of aborting
    ///
    /// Skipped documents are reported with their position and the reason.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Add one bookmark per input, named after its file
    #[arg(short, long)]
    pub bookmarks: bool,

    /// Set title metadata for the output
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for the output
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for the output
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for the output (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,

    /// Read merge options from a JSON file
    ///
    /// Flags given on the command line take precedence over the file.
    ///
    /// Example file:
    ///   { "jobs": 4, "on_document_error": "skip", "bookmarks": true }
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Read additional inputs from a file (one per line)
    ///
    /// Lines starting with '#' and blank lines are ignored. Entries are
    /// appended after the positional inputs.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// Print a JSON report on stdout instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Validate arguments that need no file I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if no inputs are given at all, or `--jobs 0`.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() {
            return Err(MergeError::invalid_config("No input files specified"));
        }

        if self.jobs == Some(0) {
            return Err(MergeError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }

        Ok(())
    }

    /// Build the merge options: the `--options` file if given, then flags.
    pub fn merge_options(&self) -> Result<MergeOptions> {
        let mut options = match &self.options {
            Some(path) => MergeOptions::from_json_file(path)?,
            None => MergeOptions::default(),
        };

        if self.jobs.is_some() {
            options.jobs = self.jobs;
        }
        if self.continue_on_error {
            options.on_document_error = DocumentErrorPolicy::Skip;
        }
        options.bookmarks |= self.bookmarks;
        options.metadata = options.metadata.overridden_by(Metadata::new(
            self.title.clone(),
            self.author.clone(),
            self.subject.clone(),
            self.keywords.clone(),
        ));

        Ok(options)
    }

    fn overwrite_mode(&self) -> OverwriteMode {
        if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        }
    }

    /// Convert CLI arguments into a validated Config.
    ///
    /// Inputs are expanded (globs, directories) and the input list, if any,
    /// is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input list or options file cannot be read
    /// - A glob pattern matches nothing
    /// - Configuration validation fails
    pub async fn to_config(&self) -> Result<Config> {
        let mut raw_inputs = self.inputs.clone();
        if let Some(list) = &self.input_list {
            raw_inputs.extend(read_input_list(list).await?);
        }

        let config = Config {
            inputs: collect_input_paths(&raw_inputs)?,
            output: self.output.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            json: self.json,
            overwrite_mode: self.overwrite_mode(),
            options: self.merge_options()?,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Read input entries from a file, one per line.
async fn read_input_list(path: &Path) -> Result<Vec<String>> {
    use tokio::fs::File;
    use tokio::io::{AsyncBufReadExt, BufReader};

    let read_error = |e: std::io::Error| {
        MergeError::invalid_config(format!("Cannot read input list {}: {e}", path.display()))
    };

    let file = File::open(path).await.map_err(read_error)?;
    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();

    while let Some(line) = lines.next_line().await.map_err(read_error)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        entries.push(line.to_string());
    }

    Ok(entries)
}
