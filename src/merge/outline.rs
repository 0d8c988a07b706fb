//! Document outline (bookmarks) for merged output.
//!
//! One top-level entry per labelled source document, pointing at the first
//! page that document contributed.

use log::debug;

use crate::error::Result;
use crate::merge::builder::TargetDocument;
use crate::merge::metadata::text_string;
use crate::pdf::{Dictionary, Object, ObjectId};

/// A top-level outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Title shown in the viewer's bookmark panel.
    pub title: String,
    /// Target page the entry jumps to.
    pub page: ObjectId,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, page: ObjectId) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

impl TargetDocument {
    /// Build a flat `/Outlines` tree from `entries` and attach it to the catalog.
    ///
    /// Each entry gets `/Dest [page /Fit]`. The catalog also gets
    /// `/PageMode /UseOutlines` so viewers open the panel. Does nothing when
    /// `entries` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is missing from the document.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmerge::merge::{OutlineEntry, TargetDocument};
    /// use pdfmerge::pdf::{Dictionary, Object};
    ///
    /// let mut target = TargetDocument::new();
    /// let page = target.add_object(Dictionary::new());
    /// target.append_page(page).unwrap();
    /// let outline = target
    ///     .add_document_outline(&[OutlineEntry::new("chapter-1.pdf", page)])
    ///     .unwrap();
    /// assert!(outline.is_some());
    /// ```
    pub fn add_document_outline(&mut self, entries: &[OutlineEntry]) -> Result<Option<ObjectId>> {
        if entries.is_empty() {
            return Ok(None);
        }

        let root_id = self.allocate();
        let item_ids: Vec<ObjectId> = entries.iter().map(|_| self.allocate()).collect();

        for (i, (entry, &item_id)) in entries.iter().zip(&item_ids).enumerate() {
            let mut item = Dictionary::new();
            item.set("Title", text_string(&entry.title));
            item.set("Parent", root_id);
            item.set(
                "Dest",
                vec![Object::Reference(entry.page), Object::name("Fit")],
            );
            if i > 0 {
                item.set("Prev", item_ids[i - 1]);
            }
            if let Some(next) = item_ids.get(i + 1) {
                item.set("Next", *next);
            }
            self.insert(item_id, item);
        }

        let mut root = Dictionary::new();
        root.set("Type", Object::name("Outlines"));
        root.set("First", item_ids[0]);
        root.set("Last", item_ids[item_ids.len() - 1]);
        root.set("Count", item_ids.len());
        self.insert(root_id, root);

        let catalog = self.catalog_mut()?;
        catalog.set("Outlines", root_id);
        catalog.set("PageMode", Object::name("UseOutlines"));

        debug!("added outline with {} entries", entries.len());
        Ok(Some(root_id))
    }
}
