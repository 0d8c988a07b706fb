//! In-memory model of one source document.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::error::{MergeError, Result};
use crate::pdf::Warning;
use crate::pdf::object::{Dictionary, Object, ObjectId};
use crate::pdf::reader::Reader;

static NULL_OBJECT: Object = Object::Null;

/// Page attributes a page may inherit from its ancestors.
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A leaf of the page tree together with its interior ancestors, nearest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    pub id: ObjectId,
    pub ancestors: Vec<ObjectId>,
}

/// Result of walking a page tree.
#[derive(Debug, Default)]
pub struct PageWalk {
    pub pages: Vec<PageNode>,
    pub nodes: BTreeSet<ObjectId>,
    pub warnings: Vec<Warning>,
}

/// Whether the trailer declares encryption.
pub fn is_encrypted(trailer: &Dictionary) -> bool {
    trailer.has(b"Encrypt")
}

/// A fully parsed source document.
///
/// Immutable once loaded. Every object listed by the cross-reference data
/// (or found by scanning) lives in the arena; references are resolved by id.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    index: usize,
    version: String,
    objects: BTreeMap<ObjectId, Object>,
    trailer: Dictionary,
    pages: Vec<PageNode>,
    page_tree_nodes: BTreeSet<ObjectId>,
    warnings: Vec<Warning>,
}

impl SourceDocument {
    /// Parse `bytes` as the document at position `index` in the merge.
    pub fn load(index: usize, bytes: &[u8]) -> Result<Self> {
        Reader::new(bytes, index)
            .read()
            .map_err(|err| err.in_document(index))
    }

    pub(crate) fn from_parts(
        index: usize,
        version: String,
        objects: BTreeMap<ObjectId, Object>,
        trailer: Dictionary,
        warnings: Vec<Warning>,
    ) -> Result<Self> {
        let mut document = Self {
            index,
            version,
            objects,
            trailer,
            pages: Vec::new(),
            page_tree_nodes: BTreeSet::new(),
            warnings,
        };
        let walk = document.walk_page_tree()?;
        document.pages = walk.pages;
        document.page_tree_nodes = walk.nodes;
        document.warnings.extend(walk.warnings);
        Ok(document)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Highest object number in the arena, 0 when empty.
    pub fn max_object_number(&self) -> u32 {
        self.objects.keys().next_back().map_or(0, |id| id.0)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Object `id`, or `null` if the document has no such object.
    pub fn resolve(&self, id: ObjectId) -> &Object {
        match self.objects.get(&id) {
            Some(object) => object,
            None => {
                warn!(
                    "document #{}: reference {} {} R does not resolve",
                    self.index, id.0, id.1
                );
                &NULL_OBJECT
            }
        }
    }

    /// Follow `object` if it is a reference; otherwise return it unchanged.
    pub fn deref<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.resolve(*id),
            other => other,
        }
    }

    pub fn catalog_id(&self) -> Result<ObjectId> {
        match self.trailer.get(b"Root") {
            Some(Object::Reference(id)) => Ok(*id),
            _ => Err(MergeError::malformed_page_tree("trailer has no /Root reference")),
        }
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        let id = self.catalog_id()?;
        self.get_object(id)
            .and_then(Object::dict)
            .ok_or_else(|| {
                MergeError::malformed_page_tree(format!(
                    "catalog {} {} is missing or not a dictionary",
                    id.0, id.1
                ))
            })
    }

    /// Leaf pages in document order.
    pub fn pages(&self) -> &[PageNode] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Interior `/Pages` nodes of the page tree.
    pub fn page_tree_nodes(&self) -> &BTreeSet<ObjectId> {
        &self.page_tree_nodes
    }

    pub fn info(&self) -> Option<&Dictionary> {
        self.trailer
            .get(b"Info")
            .and_then(|info| self.deref(info).dict())
    }

    /// Value of `key` on the page itself, or on its nearest ancestor that has it.
    pub fn inherited_attribute(&self, page: &PageNode, key: &[u8]) -> Option<&Object> {
        std::iter::once(page.id)
            .chain(page.ancestors.iter().copied())
            .find_map(|id| self.get_object(id)?.dict()?.get(key))
    }

    /// Depth-first walk of the page tree from the catalog's `/Pages`.
    ///
    /// A node that is its own ancestor is a cycle and fails the walk. A node
    /// reached a second time by another path is skipped with a warning, as is
    /// a kid that does not resolve.
    pub fn walk_page_tree(&self) -> Result<PageWalk> {
        let root = match self.catalog()?.get(b"Pages") {
            Some(Object::Reference(id)) => *id,
            _ => {
                return Err(MergeError::malformed_page_tree(
                    "catalog has no /Pages reference",
                ));
            }
        };
        if self.get_object(root).and_then(Object::dict).is_none() {
            return Err(MergeError::malformed_page_tree(format!(
                "page-tree root {} {} is missing or not a dictionary",
                root.0, root.1
            )));
        }

        let mut walk = PageWalk::default();
        let mut visited = BTreeSet::new();
        let mut stack: Vec<(ObjectId, Vec<ObjectId>)> = vec![(root, Vec::new())];

        while let Some((id, ancestors)) = stack.pop() {
            if ancestors.contains(&id) {
                return Err(MergeError::malformed_page_tree(format!(
                    "page-tree node {} {} is its own ancestor",
                    id.0, id.1
                )));
            }
            if !visited.insert(id) {
                warn!(
                    "document #{}: page-tree node {} {} reached twice",
                    self.index, id.0, id.1
                );
                walk.warnings.push(Warning::DuplicatePageNode {
                    document: self.index,
                    id,
                });
                continue;
            }

            let Some(object) = self.get_object(id) else {
                warn!(
                    "document #{}: page-tree kid {} {} R does not resolve",
                    self.index, id.0, id.1
                );
                walk.warnings.push(Warning::UnresolvedReference {
                    document: self.index,
                    id,
                });
                continue;
            };
            let Some(dict) = object.dict() else {
                warn!(
                    "document #{}: page-tree node {} {} is a {}, skipped",
                    self.index,
                    id.0,
                    id.1,
                    object.type_name()
                );
                continue;
            };

            let is_interior = dict.type_is(b"Pages") || (!dict.type_is(b"Page") && dict.has(b"Kids"));
            if !is_interior {
                walk.pages.push(PageNode { id, ancestors });
                continue;
            }
            walk.nodes.insert(id);

            let kids = match dict.get(b"Kids").map(|kids| self.deref(kids)) {
                Some(Object::Array(kids)) => kids.as_slice(),
                _ => {
                    warn!(
                        "document #{}: page-tree node {} {} has no /Kids array",
                        self.index, id.0, id.1
                    );
                    &[][..]
                }
            };

            let mut chain = Vec::with_capacity(ancestors.len() + 1);
            chain.push(id);
            chain.extend_from_slice(&ancestors);
            for kid in kids.iter().rev() {
                match kid {
                    Object::Reference(kid) => stack.push((*kid, chain.clone())),
                    other => warn!(
                        "document #{}: ignoring direct {} in /Kids of {} {}",
                        self.index,
                        other.type_name(),
                        id.0,
                        id.1
                    ),
                }
            }
        }

        Ok(walk)
    }
}
