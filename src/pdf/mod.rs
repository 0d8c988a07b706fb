//! Reading side of the engine: PDF syntax, cross-reference data and the
//! per-source document model.

pub mod document;
pub mod filter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod reader;
pub mod xref;

#[cfg(test)]
pub(crate) mod fixtures;

use std::fmt;

use serde::Serialize;

pub use document::{PageNode, SourceDocument};
pub use object::{Dictionary, Object, ObjectId, Stream, StringFormat};

/// A recoverable anomaly found while reading or copying a source document.
///
/// Warnings never abort a merge. They are collected per merge and mirrored to
/// the `log` facade at the point where they are raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A reference points at an object that does not exist; it was replaced by `null`.
    UnresolvedReference { document: usize, id: ObjectId },

    /// The declared stream `/Length` did not land on `endstream`.
    StreamLengthMismatch {
        document: usize,
        offset: usize,
        declared: i64,
        actual: usize,
    },

    /// The cross-reference chain was unusable and the object table was
    /// rebuilt by scanning the file.
    XrefRebuilt { document: usize, reason: String },

    /// An object listed in the cross-reference data could not be parsed and was dropped.
    ObjectParseFailed {
        document: usize,
        id: ObjectId,
        reason: String,
    },

    /// A page-tree node was reached a second time without forming a cycle.
    DuplicatePageNode { document: usize, id: ObjectId },

    /// An indirect object was not terminated by `endobj`.
    MissingEndobj { document: usize, id: ObjectId },
}

impl Warning {
    /// Index of the input document the warning belongs to.
    pub fn document(&self) -> usize {
        match self {
            Warning::UnresolvedReference { document, .. }
            | Warning::StreamLengthMismatch { document, .. }
            | Warning::XrefRebuilt { document, .. }
            | Warning::ObjectParseFailed { document, .. }
            | Warning::DuplicatePageNode { document, .. }
            | Warning::MissingEndobj { document, .. } => *document,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedReference { document, id } => write!(
                f,
                "document #{document}: unresolved reference {} {} R replaced by null",
                id.0, id.1
            ),
            Warning::StreamLengthMismatch {
                document,
                offset,
                declared,
                actual,
            } => write!(
                f,
                "document #{document}: stream at byte {offset} declares /Length {declared} but endstream follows {actual} bytes"
            ),
            Warning::XrefRebuilt { document, reason } => write!(
                f,
                "document #{document}: cross-reference table rebuilt by scanning ({reason})"
            ),
            Warning::ObjectParseFailed {
                document,
                id,
                reason,
            } => write!(
                f,
                "document #{document}: object {} {} dropped: {reason}",
                id.0, id.1
            ),
            Warning::DuplicatePageNode { document, id } => write!(
                f,
                "document #{document}: page-tree node {} {} reached twice, skipped",
                id.0, id.1
            ),
            Warning::MissingEndobj { document, id } => write!(
                f,
                "document #{document}: object {} {} is missing endobj",
                id.0, id.1
            ),
        }
    }
}
