//! PDF object model.
//!
//! A closed tagged union over the PDF primitive types. Dictionaries use an
//! ordered map so that anything built from them (in particular the serialized
//! output) is deterministic.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::{MergeError, Result};

/// Identity of an indirect object: (object number, generation number).
pub type ObjectId = (u32, u16);

/// Syntax a string was written with, kept so it can be written back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringFormat {
    /// `(...)` literal string.
    #[default]
    Literal,
    /// `<...>` hexadecimal string.
    Hexadecimal,
}

/// A PDF object value.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The null object.
    Null,
    /// `true` or `false`.
    Boolean(bool),
    /// Integer number.
    Integer(i64),
    /// Real number.
    Real(f64),
    /// Byte string together with the syntax it was written in.
    String(Vec<u8>, StringFormat),
    /// Name, without the leading slash and with `#xx` escapes decoded.
    Name(Vec<u8>),
    /// Ordered sequence of objects.
    Array(Vec<Object>),
    /// Name to object mapping.
    Dictionary(Dictionary),
    /// Dictionary plus raw (still encoded) payload.
    Stream(Stream),
    /// Indirect reference `N G R`.
    Reference(ObjectId),
}

impl Object {
    /// Build a name object.
    pub fn name(name: impl Into<Vec<u8>>) -> Self {
        Object::Name(name.into())
    }

    /// Build a literal string object.
    pub fn string_literal(text: impl Into<Vec<u8>>) -> Self {
        Object::String(text.into(), StringFormat::Literal)
    }

    /// Name of this object's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "boolean",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(..) => "string",
            Object::Name(_) => "name",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    fn mismatch<T>(&self, expected: &'static str) -> Result<T> {
        Err(MergeError::TypeMismatch {
            expected,
            found: self.type_name(),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(value) => Ok(*value),
            _ => self.mismatch("boolean"),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(value) => Ok(*value),
            _ => self.mismatch("integer"),
        }
    }

    /// Numeric value of an integer or real.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Object::Integer(value) => Ok(*value as f64),
            Object::Real(value) => Ok(*value),
            _ => self.mismatch("number"),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(name) => Ok(name),
            _ => self.mismatch("name"),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(bytes, _) => Ok(bytes),
            _ => self.mismatch("string"),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Object>> {
        match self {
            Object::Array(items) => Ok(items),
            _ => self.mismatch("array"),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(items) => Ok(items),
            _ => self.mismatch("array"),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            _ => self.mismatch("dictionary"),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            _ => self.mismatch("dictionary"),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            _ => self.mismatch("stream"),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => self.mismatch("reference"),
        }
    }

    /// The dictionary of a dictionary or stream object.
    pub fn dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// Call `visit` for every indirect reference nested in this object.
    ///
    /// Stream payloads are opaque and never inspected.
    pub fn for_each_reference(&self, visit: &mut impl FnMut(ObjectId)) {
        match self {
            Object::Reference(id) => visit(*id),
            Object::Array(items) => {
                for item in items {
                    item.for_each_reference(visit);
                }
            }
            Object::Dictionary(dict) => dict.for_each_reference(visit),
            Object::Stream(stream) => stream.dict.for_each_reference(visit),
            _ => {}
        }
    }

    /// Replace every nested reference with the object returned by `rewrite`.
    pub fn rewrite_references(&mut self, rewrite: &mut impl FnMut(ObjectId) -> Object) {
        match self {
            Object::Reference(id) => *self = rewrite(*id),
            Object::Array(items) => {
                for item in items {
                    item.rewrite_references(rewrite);
                }
            }
            Object::Dictionary(dict) => dict.rewrite_references(rewrite),
            Object::Stream(stream) => stream.dict.rewrite_references(rewrite),
            _ => {}
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Object::Integer(value.into())
    }
}

impl From<usize> for Object {
    fn from(value: usize) -> Self {
        Object::Integer(value as i64)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Real(value)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Object::Array(items)
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dictionary(dict)
    }
}

impl From<Stream> for Object {
    fn from(stream: Stream) -> Self {
        Object::Stream(stream)
    }
}

/// A PDF dictionary keyed by decoded name bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(BTreeMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Object> {
        self.0.get_mut(key)
    }

    /// Like [`Dictionary::get`], but a missing key is a typed error.
    pub fn require(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| MergeError::TypeMismatch {
            expected: "dictionary entry",
            found: "nothing",
        })
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Object>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.remove(key)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Object> {
        self.0.iter()
    }

    /// The value of `key` if it is a name.
    pub fn get_name(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).and_then(|value| value.as_name().ok())
    }

    /// Check whether `/Type` is the given name.
    pub fn type_is(&self, type_name: &[u8]) -> bool {
        self.get_name(b"Type") == Some(type_name)
    }

    fn for_each_reference(&self, visit: &mut impl FnMut(ObjectId)) {
        for value in self.0.values() {
            value.for_each_reference(visit);
        }
    }

    fn rewrite_references(&mut self, rewrite: &mut impl FnMut(ObjectId) -> Object) {
        for value in self.0.values_mut() {
            value.rewrite_references(rewrite);
        }
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a Object);
    type IntoIter = btree_map::Iter<'a, Vec<u8>, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<Vec<u8>>, V: Into<Object>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Dictionary(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// A stream object: its dictionary and the raw payload bytes exactly as
/// they appeared between `stream` and `endstream`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Self { dict, content }
    }
}
