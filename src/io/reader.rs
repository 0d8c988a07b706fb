//! Loading input files from disk.
//!
//! Files are read asynchronously and handed to the engine as
//! [`SourceInput`]s labelled with their file names. Parsing happens later,
//! inside the merge.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::io::reader::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (results, stats) = reader.load_all(&paths, 4).await;
//! println!("read {} of {} files", stats.success_count, results.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::debug;

use crate::error::{MergeError, Result};
use crate::merge::SourceInput;
use crate::utils::format_file_size;

/// An input file read into memory.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Path to the source file.
    pub path: PathBuf,

    /// File contents.
    pub bytes: Vec<u8>,

    /// Time taken to read the file.
    pub load_time: Duration,
}

impl LoadedFile {
    /// File size in bytes.
    pub fn file_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name used as the input's label.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Convert into an engine input labelled with the file name.
    pub fn into_source_input(self) -> SourceInput {
        let label = self.label();
        SourceInput::with_label(self.bytes, label)
    }
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedFile>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone)]
pub struct LoadStatistics {
    /// Number of files successfully read.
    pub success_count: usize,

    /// Number of files that failed to read.
    pub failure_count: usize,

    /// Total time taken for all loads.
    pub total_time: Duration,

    /// Average time per successful load.
    pub average_time: Duration,

    /// Total size of successfully read files.
    pub total_size: u64,
}

impl LoadStatistics {
    /// Create statistics from load results.
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut success_count = 0;
        let mut failure_count = 0;
        let mut total_size = 0;
        let mut total_load_time = Duration::ZERO;

        for result in results {
            match result {
                Ok(loaded) => {
                    success_count += 1;
                    total_size += loaded.file_size();
                    total_load_time += loaded.load_time;
                }
                Err(_) => {
                    failure_count += 1;
                }
            }
        }

        let average_time = if success_count > 0 {
            total_load_time / success_count as u32
        } else {
            Duration::ZERO
        };

        Self {
            success_count,
            failure_count,
            total_time,
            average_time,
            total_size,
        }
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Reads input files for a merge.
#[derive(Debug, Clone, Default)]
pub struct PdfReader;

impl PdfReader {
    pub fn new() -> Self {
        Self
    }

    /// Check that `path` exists and is a regular file.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::FileNotFound`] or [`MergeError::NotAFile`].
    pub async fn check_path(path: &Path) -> Result<()> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| MergeError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        if !metadata.is_file() {
            return Err(MergeError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Read a single file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the PDF file
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist, is not a file, or cannot
    /// be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfmerge::io::reader::PdfReader;
    /// # use std::path::Path;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let loaded = PdfReader::new().load(Path::new("document.pdf")).await?;
    /// println!("read {} bytes in {:?}", loaded.file_size(), loaded.load_time);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load(&self, path: &Path) -> Result<LoadedFile> {
        let start = Instant::now();
        Self::check_path(path).await?;
        let bytes = tokio::fs::read(path).await?;
        let load_time = start.elapsed();
        debug!("read {} ({} bytes)", path.display(), bytes.len());

        Ok(LoadedFile {
            path: path.to_path_buf(),
            bytes,
            load_time,
        })
    }

    /// Read several files, at most `workers` at a time.
    ///
    /// Results come back in the same order as `paths`, together with
    /// aggregate statistics.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();
        let workers = workers.max(1);

        let results: Vec<LoadResult> = stream::iter(paths.iter().map(|path| self.load(path)))
            .buffered(workers)
            .collect()
            .await;

        let stats = LoadStatistics::from_results(&results, start.elapsed());
        (results, stats)
    }
}
