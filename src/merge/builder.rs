//! The output document under construction.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{MergeError, Result};
use crate::pdf::{Dictionary, Object, ObjectId};

/// Object number of the output catalog.
pub const CATALOG_ID: ObjectId = (1, 0);

/// Object number of the output page-tree root.
pub const PAGES_ID: ObjectId = (2, 0);

/// A PDF document being assembled from copied objects.
///
/// Every object has generation 0. Numbers are handed out densely by
/// [`TargetDocument::allocate`], so the table only has gaps where an
/// allocated number was never filled.
///
/// # Examples
///
/// ```
/// use pdfmerge::merge::TargetDocument;
/// use pdfmerge::pdf::{Dictionary, Object};
///
/// let mut target = TargetDocument::new();
/// let mut page = Dictionary::new();
/// page.set("Type", Object::name("Page"));
/// let id = target.add_object(page);
/// target.append_page(id).unwrap();
/// assert_eq!(target.page_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TargetDocument {
    objects: BTreeMap<u32, Object>,
    next_number: u32,
    info_id: Option<ObjectId>,
    pages: Vec<ObjectId>,
}

impl TargetDocument {
    /// Create a document holding only an empty catalog and page-tree root.
    pub fn new() -> Self {
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::name("Catalog"));
        catalog.set("Pages", PAGES_ID);

        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set("Kids", Vec::<Object>::new());
        pages.set("Count", 0i64);

        let mut objects = BTreeMap::new();
        objects.insert(CATALOG_ID.0, Object::Dictionary(catalog));
        objects.insert(PAGES_ID.0, Object::Dictionary(pages));

        Self {
            objects,
            next_number: PAGES_ID.0 + 1,
            info_id: None,
            pages: Vec::new(),
        }
    }

    /// Reserve the next free object number.
    pub fn allocate(&mut self) -> ObjectId {
        let id = (self.next_number, 0);
        self.next_number += 1;
        id
    }

    /// Store `object` under an id previously returned by [`allocate`](Self::allocate).
    pub fn insert(&mut self, id: ObjectId, object: impl Into<Object>) {
        self.objects.insert(id.0, object.into());
    }

    /// Allocate a number and store `object` under it.
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = self.allocate();
        self.insert(id, object);
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        if id.1 != 0 {
            return None;
        }
        self.objects.get(&id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        if id.1 != 0 {
            return None;
        }
        self.objects.get_mut(&id.0)
    }

    pub fn catalog_id(&self) -> ObjectId {
        CATALOG_ID
    }

    pub fn pages_id(&self) -> ObjectId {
        PAGES_ID
    }

    pub fn info_id(&self) -> Option<ObjectId> {
        self.info_id
    }

    pub(crate) fn set_info_id(&mut self, id: ObjectId) {
        self.info_id = Some(id);
    }

    /// Mutable access to the catalog dictionary.
    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        self.dictionary_mut(CATALOG_ID)
    }

    fn dictionary_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        self.get_mut(id)
            .ok_or_else(|| {
                MergeError::serialization(format!("object {} {} is missing", id.0, id.1))
            })?
            .as_dict_mut()
    }

    /// Append a copied page as the last leaf of the page tree.
    ///
    /// Sets the page's `/Parent`, pushes it onto the root `/Kids` and updates
    /// `/Count`. The tree stays flat.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a dictionary in this document.
    pub fn append_page(&mut self, id: ObjectId) -> Result<()> {
        self.dictionary_mut(id)?.set("Parent", PAGES_ID);

        self.pages.push(id);
        let count = self.pages.len();
        let root = self.dictionary_mut(PAGES_ID)?;
        match root.get_mut(b"Kids") {
            Some(Object::Array(kids)) => kids.push(Object::Reference(id)),
            _ => root.set("Kids", vec![Object::Reference(id)]),
        }
        root.set("Count", count);

        debug!("appended page {} as leaf #{count}", id.0);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Leaf pages in output order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    /// All stored objects in increasing object number.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(number, object)| ((*number, 0), object))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Highest allocated object number.
    pub fn max_object_number(&self) -> u32 {
        self.next_number - 1
    }
}

impl Default for TargetDocument {
    fn default() -> Self {
        Self::new()
    }
}
