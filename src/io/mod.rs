//! Input/output: reading files, serializing the merged document, writing it.

pub mod reader;
pub mod serializer;
pub mod writer;

pub use reader::{LoadResult, LoadStatistics, LoadedFile, PdfReader};
pub use serializer::serialize;
pub use writer::{PdfWriter, WriteOptions, WriteStatistics};
