//! Document information (`/Info`) for the output.
//!
//! Only the caller-supplied fields plus `/Producer` are written. Dates are
//! left out so that identical inputs give identical bytes.

use crate::config::Metadata;
use crate::merge::builder::TargetDocument;
use crate::pdf::{Dictionary, Object, ObjectId, StringFormat};

/// Value written to `/Producer`.
pub const PRODUCER: &str = "pdfmerge";

impl TargetDocument {
    /// Write an `/Info` dictionary built from `metadata`.
    ///
    /// Calling it again replaces the previous dictionary in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmerge::config::Metadata;
    /// use pdfmerge::merge::TargetDocument;
    ///
    /// let mut target = TargetDocument::new();
    /// let metadata = Metadata::new(Some("Report".to_string()), None, None, None);
    /// let info = target.set_info(&metadata);
    /// assert_eq!(target.info_id(), Some(info));
    /// ```
    pub fn set_info(&mut self, metadata: &Metadata) -> ObjectId {
        let mut info = Dictionary::new();
        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info.set(key, text_string(value));
            }
        }
        info.set("Producer", text_string(PRODUCER));

        match self.info_id() {
            Some(id) => {
                self.insert(id, info);
                id
            }
            None => {
                let id = self.add_object(info);
                self.set_info_id(id);
                id
            }
        }
    }
}

/// Encode `text` as a PDF text string.
///
/// Printable ASCII stays a literal string; anything else is written as
/// UTF-16BE with a byte-order mark, in hex form.
pub fn text_string(text: &str) -> Object {
    if text.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        return Object::string_literal(text);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
