//! Error types for pdfmerge.
//!
//! This module defines every error the merge engine and its command-line
//! front end can produce. Errors carry enough context (byte offset, object
//! id, document index) to be actionable on their own.
//!
//! # Error Categories
//!
//! - **Syntax Errors**: malformed tokens, objects or cross-reference data
//! - **Structure Errors**: missing catalog, broken or cyclic page trees
//! - **Policy Errors**: empty input, unsupported features such as encryption
//! - **Output Errors**: serialization and file-system failures

use std::io;
use std::path::PathBuf;

use crate::pdf::ObjectId;

/// Result type alias for pdfmerge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Main error type for pdfmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Lexical syntax violation (unterminated string, bad escape, stray delimiter).
    #[error("Malformed token at byte {offset}: {reason}")]
    MalformedToken {
        /// Byte offset where the token starts.
        offset: usize,
        /// What was wrong with the token.
        reason: String,
    },

    /// Token stream does not form a valid object.
    #[error("Malformed object at byte {offset}: {reason}")]
    MalformedObject {
        /// Byte offset where parsing failed.
        offset: usize,
        /// What was expected or found.
        reason: String,
    },

    /// No cross-reference chain could be recovered, even by scanning the file.
    #[error("Malformed cross-reference data: {reason}")]
    MalformedXref {
        /// Details about the failure.
        reason: String,
    },

    /// Missing catalog or page-tree root, or a reference cycle in the page tree.
    #[error("Malformed page tree: {reason}")]
    MalformedPageTree {
        /// Details about the failure.
        reason: String,
    },

    /// An indirect reference points at an object that does not exist.
    #[error("Unresolved reference {} {} R", .id.0, .id.1)]
    UnresolvedReference {
        /// The dangling reference.
        id: ObjectId,
    },

    /// No documents were supplied.
    #[error("No input documents to merge")]
    EmptyInput,

    /// The document uses a feature the engine refuses to process.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// Name of the feature.
        feature: String,
    },

    /// A typed accessor was applied to an object of another type.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the caller asked for.
        expected: &'static str,
        /// The type actually present.
        found: &'static str,
    },

    /// A failure attributed to one input document.
    #[error("Document #{index}: {source}")]
    Document {
        /// Zero-based position of the document in the caller's input order.
        index: usize,
        /// The underlying failure.
        #[source]
        source: Box<MergeError>,
    },

    /// The target document could not be written.
    #[error("Serialization failed: {reason}")]
    Serialization {
        /// Details about the failure.
        reason: String,
    },

    /// The merge was cancelled before completion.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input path is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error("Output file already exists: {}\n  Use --force to overwrite or choose a different output path", .path.display())]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Failed to write the output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MergeError {
    /// Create a MalformedToken error.
    pub fn malformed_token(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a MalformedObject error.
    pub fn malformed_object(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedObject {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a MalformedXref error.
    pub fn malformed_xref(reason: impl Into<String>) -> Self {
        Self::MalformedXref {
            reason: reason.into(),
        }
    }

    /// Create a MalformedPageTree error.
    pub fn malformed_page_tree(reason: impl Into<String>) -> Self {
        Self::MalformedPageTree {
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedFeature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Attribute this error to the input document at `index`.
    ///
    /// Errors already attributed to a document are returned unchanged.
    pub fn in_document(self, index: usize) -> Self {
        match self {
            Self::Document { .. } => self,
            other => Self::Document {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Index of the input document this error is attributed to, if any.
    pub fn document_index(&self) -> Option<usize> {
        match self {
            Self::Document { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The innermost error, with document attribution stripped.
    pub fn root_cause(&self) -> &MergeError {
        match self {
            Self::Document { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if this error only affects one document's contribution.
    ///
    /// Returns true for errors a caller may choose to skip past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::MalformedToken { .. }
                | Self::MalformedObject { .. }
                | Self::MalformedXref { .. }
                | Self::MalformedPageTree { .. }
                | Self::UnsupportedFeature { .. }
                | Self::TypeMismatch { .. }
        ) && self.document_index().is_some()
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::EmptyInput
                | Self::Serialization { .. }
                | Self::Cancelled
                | Self::FailedToWrite { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.root_cause() {
            Self::FileNotFound { .. } | Self::NotAFile { .. } => 2,
            Self::MalformedToken { .. }
            | Self::MalformedObject { .. }
            | Self::MalformedXref { .. }
            | Self::MalformedPageTree { .. }
            | Self::UnresolvedReference { .. }
            | Self::TypeMismatch { .. } => 3,
            Self::UnsupportedFeature { .. } => 3,
            Self::EmptyInput | Self::InvalidConfig { .. } => 1,
            Self::OutputExists { .. } => 4,
            Self::FailedToWrite { .. } | Self::Io(_) => 5,
            Self::Serialization { .. } => 6,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Document { .. } => 1,
        }
    }
}
