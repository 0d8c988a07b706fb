//! Utilities for input path collection and size formatting.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{MergeError, Result};

/// Expand command-line inputs into an ordered list of files.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.
/// `&[&str]` or `Vec<String>`. Each item is handled by kind:
/// - an existing directory is walked recursively for `*.pdf` files
///   (case-insensitive), sorted by path
/// - a pattern containing `*`, `?` or `[` is expanded with `glob`, sorted
/// - anything else is passed through unchanged, to be checked when read
///
/// The groups are concatenated in argument order.
///
/// # Errors
///
/// Returns an error if a glob pattern is invalid or matches nothing, or if a
/// directory cannot be walked.
pub fn collect_input_paths<T>(inputs: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);
        if path.is_dir() {
            resolved.extend(collect_directory(path)?);
        } else if is_pattern(input) {
            resolved.extend(collect_pattern(input)?);
        } else {
            resolved.push(path.to_path_buf());
        }
    }
    Ok(resolved)
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn pdf_matcher() -> Result<GlobMatcher> {
    let glob = GlobBuilder::new("*.pdf")
        .case_insensitive(true)
        .literal_separator(false)
        .build()
        .map_err(|e| MergeError::invalid_config(e.to_string()))?;
    Ok(glob.compile_matcher())
}

/// All `*.pdf` files below `dir`, sorted.
fn collect_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let matcher = pdf_matcher()?;
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| MergeError::Io(std::io::Error::other(e)))?;
        if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Files matching a glob pattern, sorted.
///
/// Pattern examples:
/// - `"**/*.pdf"`
/// - `"./docs/chapter-?.pdf"`
fn collect_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|err| MergeError::invalid_config(format!("Invalid pattern {pattern}: {err}")))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| MergeError::Io(err.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(MergeError::invalid_config(format!(
            "Pattern matched no files: {pattern}"
        )));
    }
    files.sort();
    Ok(files)
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
