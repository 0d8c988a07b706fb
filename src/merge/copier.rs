//! Copying pages and everything they depend on into the target document.
//!
//! The copier owns the object map for one merge session. Each distinct
//! source object is copied at most once, so objects shared by several pages
//! (fonts, images, colour spaces) stay shared in the output.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::{MergeError, Result};
use crate::merge::builder::TargetDocument;
use crate::pdf::document::INHERITABLE_ATTRIBUTES;
use crate::pdf::{Object, ObjectId, PageNode, SourceDocument, Warning};

/// Rewrite table from `(document index, source id)` to target id.
#[derive(Debug, Clone, Default)]
struct ObjectMap {
    entries: BTreeMap<(usize, ObjectId), ObjectId>,
}

impl ObjectMap {
    fn get(&self, document: usize, id: ObjectId) -> Option<ObjectId> {
        self.entries.get(&(document, id)).copied()
    }

    /// Record a mapping. An existing mapping for the same key is kept.
    fn insert(&mut self, document: usize, id: ObjectId, target: ObjectId) -> ObjectId {
        *self.entries.entry((document, id)).or_insert(target)
    }
}

/// Deep-copies pages from source documents into one [`TargetDocument`].
///
/// Call [`register_document`](Copier::register_document) once per source
/// before copying its pages, then [`copy_page`](Copier::copy_page) for each
/// page in order.
#[derive(Debug, Default)]
pub struct Copier {
    map: ObjectMap,
    dangling: BTreeSet<(usize, ObjectId)>,
    warnings: Vec<Warning>,
    copied: usize,
}

impl Copier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve target ids for the pages of `source` and map its structural
    /// nodes onto the target's.
    ///
    /// Leaf pages get consecutive target ids in page order. Interior page-tree
    /// nodes map to the target page-tree root and the source catalog maps to the
    /// target catalog, so a reference to either never pulls a second page tree
    /// into the output.
    ///
    /// Returns the reserved page ids in page order.
    pub fn register_document(
        &mut self,
        source: &SourceDocument,
        target: &mut TargetDocument,
    ) -> Vec<ObjectId> {
        let index = source.index();
        let page_ids: Vec<ObjectId> = source
            .pages()
            .iter()
            .map(|page| {
                let reserved = target.allocate();
                self.map.insert(index, page.id, reserved)
            })
            .collect();

        for node in source.page_tree_nodes() {
            self.map.insert(index, *node, target.pages_id());
        }
        if let Ok(catalog) = source.catalog_id() {
            self.map.insert(index, catalog, target.catalog_id());
        }

        debug!(
            "document #{index}: reserved {} page ids, mapped {} page-tree nodes",
            page_ids.len(),
            source.page_tree_nodes().len()
        );
        page_ids
    }

    /// Copy one page and its transitive dependencies into `target`.
    ///
    /// Inheritable attributes the page does not carry itself are copied down
    /// from its nearest ancestor. `/Parent` is dropped; the caller links the
    /// page with [`TargetDocument::append_page`].
    ///
    /// Returns the target id of the copied page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page object is missing or is not a dictionary.
    pub fn copy_page(
        &mut self,
        source: &SourceDocument,
        page: &PageNode,
        target: &mut TargetDocument,
    ) -> Result<ObjectId> {
        let index = source.index();
        let mut dict = source
            .get_object(page.id)
            .and_then(Object::dict)
            .cloned()
            .ok_or_else(|| {
                MergeError::malformed_page_tree(format!(
                    "page {} {} is not a dictionary",
                    page.id.0, page.id.1
                ))
                .in_document(index)
            })?;

        dict.remove(b"Parent");
        for key in INHERITABLE_ATTRIBUTES {
            if !dict.has(key)
                && let Some(value) = source.inherited_attribute(page, key)
            {
                dict.set(key, value.clone());
            }
        }

        let page_target = match self.map.get(index, page.id) {
            Some(id) => id,
            None => {
                let id = target.allocate();
                self.map.insert(index, page.id, id)
            }
        };

        let mut pending = Vec::new();
        let mut page_object = Object::Dictionary(dict);
        page_object
            .rewrite_references(&mut |id| self.map_reference(source, target, &mut pending, id));
        target.insert(page_target, page_object);
        self.copied += 1;

        while let Some((source_id, target_id)) = pending.pop() {
            let Some(original) = source.get_object(source_id) else {
                continue;
            };
            let mut object = original.clone();
            if let Object::Stream(stream) = &mut object {
                stream.dict.set("Length", stream.content.len());
            }
            object.rewrite_references(&mut |id| {
                self.map_reference(source, target, &mut pending, id)
            });
            target.insert(target_id, object);
            self.copied += 1;
        }

        Ok(page_target)
    }

    /// Target value for a reference found while copying.
    ///
    /// Unmapped objects are allocated and queued before their own children are
    /// visited, which keeps cyclic graphs finite.
    fn map_reference(
        &mut self,
        source: &SourceDocument,
        target: &mut TargetDocument,
        pending: &mut Vec<(ObjectId, ObjectId)>,
        id: ObjectId,
    ) -> Object {
        let index = source.index();
        if let Some(mapped) = self.map.get(index, id) {
            return Object::Reference(mapped);
        }

        if source.get_object(id).is_none() {
            if self.dangling.insert((index, id)) {
                warn!(
                    "document #{index}: unresolved reference {} {} R replaced by null",
                    id.0, id.1
                );
                self.warnings
                    .push(Warning::UnresolvedReference { document: index, id });
            }
            return Object::Null;
        }

        let allocated = target.allocate();
        self.map.insert(index, id, allocated);
        pending.push((id, allocated));
        Object::Reference(allocated)
    }

    /// Number of objects written to the target so far, pages included.
    pub fn copied_objects(&self) -> usize {
        self.copied
    }

    /// Drain the warnings raised since the last call.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
