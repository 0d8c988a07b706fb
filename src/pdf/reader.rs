//! Per-document parse session.
//!
//! A [`Reader`] owns all mutable state of one parse: the input slice, the
//! document's caller-order index and the warnings raised so far. Independent
//! readers share nothing, so documents can be parsed on separate workers.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::{MergeError, Result};
use crate::pdf::Warning;
use crate::pdf::document::{SourceDocument, is_encrypted};
use crate::pdf::filter::{self, FilterError};
use crate::pdf::lexer::TokenKind;
use crate::pdf::object::{Dictionary, Object, ObjectId, Stream};
use crate::pdf::parser::{Parser, find, object_id};
use crate::pdf::xref::{self, XrefEntry, XrefTable};

/// Version assumed when the header is missing.
const DEFAULT_VERSION: &str = "1.4";

pub struct Reader<'a> {
    data: &'a [u8],
    document: usize,
    warnings: Vec<Warning>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], document: usize) -> Self {
        Self {
            data,
            document,
            warnings: Vec::new(),
        }
    }

    /// Parse the whole document into an arena.
    pub fn read(mut self) -> Result<SourceDocument> {
        let version = header_version(self.data).unwrap_or_else(|| {
            debug!("document #{}: no %PDF- header, assuming {DEFAULT_VERSION}", self.document);
            DEFAULT_VERSION.to_string()
        });

        let (table, rebuilt) = match self.read_xref() {
            Ok(table) => (table, false),
            Err(err) => {
                warn!(
                    "document #{}: {err}; rebuilding cross-reference table",
                    self.document
                );
                self.warnings.push(Warning::XrefRebuilt {
                    document: self.document,
                    reason: err.to_string(),
                });
                (xref::rebuild(self.data, self.document)?, true)
            }
        };

        if is_encrypted(&table.trailer) {
            return Err(MergeError::unsupported("encrypted document"));
        }

        let mut objects = self.load_uncompressed(&table);
        self.load_compressed(&table, &mut objects);
        if rebuilt {
            self.expand_object_streams(&mut objects);
        }

        let mut trailer = table.trailer;
        if !trailer.has(b"Root") {
            match recover_root(&objects) {
                Some(root) => {
                    debug!(
                        "document #{}: using {} {} as catalog",
                        self.document, root.0, root.1
                    );
                    trailer.set("Root", Object::Reference(root));
                }
                None => warn!("document #{}: no catalog found", self.document),
            }
        }

        debug!(
            "document #{}: parsed {} objects (PDF {version})",
            self.document,
            objects.len()
        );
        SourceDocument::from_parts(self.document, version, objects, trailer, self.warnings)
    }

    fn read_xref(&mut self) -> Result<XrefTable> {
        let start = xref::find_startxref(self.data)?;
        let table = xref::read_chain(self.data, start, self.document, &mut self.warnings)?;
        if table.is_empty() {
            return Err(MergeError::malformed_xref("cross-reference data lists no objects"));
        }
        Ok(table)
    }

    fn load_uncompressed(&mut self, table: &XrefTable) -> BTreeMap<ObjectId, Object> {
        let mut objects = BTreeMap::new();
        let mut scan_index: Option<BTreeMap<u32, XrefEntry>> = None;

        for (&number, entry) in &table.entries {
            let XrefEntry::InUse { offset, generation } = *entry else {
                continue;
            };
            let id = (number, generation);

            let err = match self.load_at(table, offset, id) {
                Ok(object) => {
                    objects.insert(id, object);
                    continue;
                }
                Err(err) => err,
            };

            // The listed offset is stale; try wherever the object really is.
            let index = scan_index.get_or_insert_with(|| xref::scan_objects(self.data));
            let retry = match index.get(&number) {
                Some(&XrefEntry::InUse {
                    offset: found_at,
                    generation: found_generation,
                }) if found_at != offset => {
                    let found_id = (number, found_generation);
                    self.load_at(table, found_at, found_id)
                        .ok()
                        .map(|object| (found_id, object))
                }
                _ => None,
            };

            match retry {
                Some((found_id, object)) => {
                    debug!(
                        "document #{}: object {number} found by scanning",
                        self.document
                    );
                    objects.insert(found_id, object);
                }
                None => self.parse_failed(id, err.to_string()),
            }
        }
        objects
    }

    fn load_at(&mut self, table: &XrefTable, offset: usize, id: ObjectId) -> Result<Object> {
        if offset >= self.data.len() {
            return Err(MergeError::malformed_object(
                offset,
                "offset is past the end of the file",
            ));
        }

        let data = self.data;
        let document = self.document;
        let lengths = |length_id: ObjectId| resolve_length(data, table, document, length_id);
        let mut parser = Parser::at(data, offset, document).with_lengths(&lengths);
        let (_, object) = parser.parse_indirect_object(Some(id))?;
        self.warnings.extend(parser.take_warnings());
        Ok(object)
    }

    fn load_compressed(&mut self, table: &XrefTable, objects: &mut BTreeMap<ObjectId, Object>) {
        let mut wanted: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
        for (&number, entry) in &table.entries {
            if let XrefEntry::Compressed { container, index } = *entry {
                wanted.entry(container).or_default().push((number, index));
            }
        }

        for (container, members) in wanted {
            let offset = match table.get(container) {
                Some(XrefEntry::InUse { offset, .. }) => *offset,
                _ => 0,
            };
            let parsed = match objects.get(&(container, 0)) {
                Some(Object::Stream(stream)) => self.parse_object_stream(container, offset, stream),
                _ => Err(MergeError::malformed_object(
                    offset,
                    format!("object stream {container} is missing"),
                )),
            };

            let parsed = match parsed {
                Ok(parsed) => parsed,
                Err(err) => {
                    let reason = err.to_string();
                    for (number, _) in members {
                        self.parse_failed((number, 0), reason.clone());
                    }
                    continue;
                }
            };

            for (number, index) in members {
                let found = usize::try_from(index)
                    .ok()
                    .and_then(|index| parsed.get(index));
                match found {
                    Some((member, Ok(object))) if *member == number => {
                        objects.insert((number, 0), object.clone());
                    }
                    Some((member, Err(reason))) if *member == number => {
                        self.parse_failed((number, 0), reason.clone());
                    }
                    _ => self.parse_failed(
                        (number, 0),
                        format!("not at index {index} of object stream {container}"),
                    ),
                }
            }
        }
    }

    /// After a rebuild nothing lists compressed objects, so every object
    /// stream is unpacked and fills in whatever the scan did not find.
    fn expand_object_streams(&mut self, objects: &mut BTreeMap<ObjectId, Object>) {
        let containers: Vec<(u32, Stream)> = objects
            .iter()
            .filter_map(|(id, object)| match object {
                Object::Stream(stream) if stream.dict.type_is(b"ObjStm") => {
                    Some((id.0, stream.clone()))
                }
                _ => None,
            })
            .collect();

        for (container, stream) in containers {
            match self.parse_object_stream(container, 0, &stream) {
                Ok(members) => {
                    for (number, object) in members {
                        if let Ok(object) = object {
                            objects.entry((number, 0)).or_insert(object);
                        }
                    }
                }
                Err(err) => warn!(
                    "document #{}: object stream {container}: {err}",
                    self.document
                ),
            }
        }
    }

    /// Decode an object stream into its members, in index order.
    fn parse_object_stream(
        &mut self,
        container: u32,
        offset: usize,
        stream: &Stream,
    ) -> Result<Vec<(u32, std::result::Result<Object, String>)>> {
        let malformed = |reason: String| {
            MergeError::malformed_object(offset, format!("object stream {container}: {reason}"))
        };

        if !stream.dict.type_is(b"ObjStm") {
            return Err(malformed("not of /Type /ObjStm".into()));
        }
        let count = int_entry(&stream.dict, b"N").ok_or_else(|| malformed("missing /N".into()))?;
        let first =
            int_entry(&stream.dict, b"First").ok_or_else(|| malformed("missing /First".into()))?;

        let decoded = filter::decode_stream(stream).map_err(|err| match err {
            FilterError::Unsupported(name) => MergeError::unsupported(format!("filter {name}")),
            FilterError::Corrupt(reason) => malformed(reason),
        })?;

        let mut header = Parser::new(&decoded, self.document);
        // Each header pair takes at least two bytes.
        let mut pairs = Vec::with_capacity(count.min(decoded.len() / 2));
        for _ in 0..count {
            let number = header.next_token()?.kind;
            let relative = header.next_token()?.kind;
            match (number, relative) {
                (TokenKind::Integer(number), TokenKind::Integer(relative)) => {
                    let id = object_id(number, 0)
                        .ok_or_else(|| malformed(format!("bad object number {number}")))?;
                    let relative = usize::try_from(relative)
                        .map_err(|_| malformed(format!("bad offset {relative}")))?;
                    pairs.push((id.0, relative));
                }
                _ => return Err(malformed("bad header".into())),
            }
        }

        let members = pairs
            .into_iter()
            .map(|(number, relative)| {
                let mut parser =
                    Parser::at(&decoded, first.saturating_add(relative), self.document);
                let object = parser.parse_object().map_err(|err| err.to_string());
                (number, object)
            })
            .collect();
        Ok(members)
    }

    fn parse_failed(&mut self, id: ObjectId, reason: String) {
        warn!(
            "document #{}: dropping object {} {}: {reason}",
            self.document, id.0, id.1
        );
        self.warnings.push(Warning::ObjectParseFailed {
            document: self.document,
            id,
            reason,
        });
    }
}

fn int_entry(dict: &Dictionary, key: &[u8]) -> Option<usize> {
    dict.get(key)
        .and_then(|value| value.as_i64().ok())
        .and_then(|value| usize::try_from(value).ok())
}

/// Look up an indirect stream `/Length` without going through the arena.
fn resolve_length(data: &[u8], table: &XrefTable, document: usize, id: ObjectId) -> Option<i64> {
    let XrefEntry::InUse { offset, generation } = *table.get(id.0)? else {
        return None;
    };
    if generation != id.1 || offset >= data.len() {
        return None;
    }
    let mut parser = Parser::at(data, offset, document);
    match parser.parse_indirect_object(Some(id)) {
        Ok((_, Object::Integer(length))) => Some(length),
        _ => None,
    }
}

/// Version from the `%PDF-x.y` header in the first kilobyte.
fn header_version(data: &[u8]) -> Option<String> {
    let head = &data[..data.len().min(1024)];
    let at = find(head, 0, b"%PDF-")? + b"%PDF-".len();
    let version: String = head[at..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| char::from(b))
        .collect();
    (!version.is_empty()).then_some(version)
}

/// Catalog for a trailer without `/Root`: the `/Root` of the last
/// cross-reference stream, else the first `/Type /Catalog` object.
fn recover_root(objects: &BTreeMap<ObjectId, Object>) -> Option<ObjectId> {
    let from_xref_stream = objects.values().rev().find_map(|object| match object {
        Object::Stream(stream) if stream.dict.type_is(b"XRef") => {
            stream.dict.get(b"Root")?.as_reference().ok()
        }
        _ => None,
    });

    from_xref_stream.or_else(|| {
        objects.iter().find_map(|(id, object)| {
            object
                .dict()
                .filter(|dict| dict.type_is(b"Catalog"))
                .map(|_| *id)
        })
    })
}
