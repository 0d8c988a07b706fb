//! PDF merging operations.
//!
//! This module provides the core functionality for combining multiple
//! PDF documents into one:
//! - [`Copier`] deep-copies pages with their resources
//! - [`TargetDocument`] holds the output object table and page tree
//! - [`Merger`] drives a whole merge, from bytes in to bytes out

pub mod builder;
pub mod copier;
pub mod merger;
pub mod metadata;
pub mod outline;

pub use builder::TargetDocument;
pub use copier::Copier;
pub use merger::{
    CancelFlag, MergeOutput, MergeStatistics, Merger, SkippedDocument, SourceInput,
};
pub use outline::OutlineEntry;
