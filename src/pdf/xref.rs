//! Cross-reference data: classic tables, cross-reference streams, the
//! incremental-update chain, and the linear-scan rebuild used when the chain
//! is unusable.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::error::{MergeError, Result};
use crate::pdf::Warning;
use crate::pdf::filter;
use crate::pdf::lexer::{Keyword, TokenKind, is_regular, is_whitespace, next_token_at};
use crate::pdf::object::{Dictionary, Object};
use crate::pdf::parser::{Parser, find, rfind};

/// Where an object lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free,
    InUse { offset: usize, generation: u16 },
    /// Object `index` inside object stream `container`; generation is always 0.
    Compressed { container: u32, index: u32 },
}

/// Merged view of every cross-reference section in a file.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Dictionary,
}

impl XrefTable {
    pub fn get(&self, number: u32) -> Option<&XrefEntry> {
        self.entries.get(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `xref` table or cross-reference stream and its trailer dictionary.
#[derive(Debug, Clone, Default)]
pub struct XrefSection {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Dictionary,
}

/// Offset recorded after the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    let at = rfind(data, data.len(), b"startxref")
        .ok_or_else(|| MergeError::malformed_xref("startxref not found"))?;

    let (token, _) = next_token_at(data, at + b"startxref".len())?;
    match token.kind {
        TokenKind::Integer(offset) => usize::try_from(offset)
            .ok()
            .filter(|&offset| offset < data.len())
            .ok_or_else(|| {
                MergeError::malformed_xref(format!("startxref offset {offset} out of range"))
            }),
        _ => Err(MergeError::malformed_xref("startxref is not followed by an offset")),
    }
}

/// Follow the `/Prev` chain from `start`.
///
/// Sections are visited newest first; an entry already present is never
/// replaced, so the most recent update wins.
pub fn read_chain(
    data: &[u8],
    start: usize,
    document: usize,
    warnings: &mut Vec<Warning>,
) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    let mut visited = BTreeSet::new();
    let mut next = Some(start);
    let mut newest = true;

    while let Some(offset) = next {
        if !visited.insert(offset) {
            warn!("document #{document}: /Prev chain loops back to byte {offset}");
            break;
        }

        let mut section = read_section(data, offset, document, warnings)?;

        // Hybrid-reference files list some objects only in the /XRefStm stream.
        if let Some(stream_at) = offset_entry(&section.trailer, b"XRefStm") {
            match read_section(data, stream_at, document, warnings) {
                Ok(hidden) => {
                    for (number, entry) in hidden.entries {
                        let slot = section.entries.entry(number).or_insert(XrefEntry::Free);
                        if *slot == XrefEntry::Free {
                            *slot = entry;
                        }
                    }
                }
                Err(err) => warn!("document #{document}: ignoring /XRefStm at byte {stream_at}: {err}"),
            }
        }

        debug!(
            "document #{document}: xref section at byte {offset} with {} entries",
            section.entries.len()
        );

        for (number, entry) in section.entries {
            table.entries.entry(number).or_insert(entry);
        }

        next = offset_entry(&section.trailer, b"Prev");

        if newest {
            table.trailer = section.trailer;
            newest = false;
        } else {
            for (key, value) in &section.trailer {
                if !table.trailer.has(key) && key.as_slice() != b"Prev" {
                    table.trailer.set(key.clone(), value.clone());
                }
            }
        }
    }

    Ok(table)
}

fn offset_entry(dict: &Dictionary, key: &[u8]) -> Option<usize> {
    dict.get(key)
        .and_then(|value| value.as_i64().ok())
        .and_then(|value| usize::try_from(value).ok())
}

/// Read the section at `offset`, either a classic table or a stream.
pub fn read_section(
    data: &[u8],
    offset: usize,
    document: usize,
    warnings: &mut Vec<Warning>,
) -> Result<XrefSection> {
    if offset >= data.len() {
        return Err(MergeError::malformed_xref(format!(
            "section offset {offset} is past the end of the file"
        )));
    }

    let (token, _) = next_token_at(data, offset)?;
    match token.kind {
        TokenKind::Keyword(Keyword::Xref) => read_table(data, offset, document),
        TokenKind::Integer(_) => read_stream(data, offset, document, warnings),
        _ => Err(MergeError::malformed_xref(format!(
            "no cross-reference section at byte {offset}"
        ))),
    }
}

fn read_table(data: &[u8], offset: usize, document: usize) -> Result<XrefSection> {
    let mut parser = Parser::at(data, offset, document);
    parser.next_token()?;

    let mut entries = BTreeMap::new();
    loop {
        let token = parser.next_token()?;
        match token.kind {
            TokenKind::Keyword(Keyword::Trailer) => {
                let trailer = match parser.parse_object()? {
                    Object::Dictionary(dict) => dict,
                    other => {
                        return Err(MergeError::malformed_xref(format!(
                            "trailer is a {}",
                            other.type_name()
                        )));
                    }
                };
                return Ok(XrefSection { entries, trailer });
            }
            TokenKind::Integer(first) => {
                let count = match parser.next_token()?.kind {
                    TokenKind::Integer(count) => count,
                    _ => {
                        return Err(MergeError::malformed_xref(format!(
                            "bad subsection header at byte {}",
                            token.span.start
                        )));
                    }
                };
                let first = u32::try_from(first)
                    .map_err(|_| MergeError::malformed_xref("negative subsection start"))?;

                for i in 0..count.max(0) {
                    let entry_at = parser.position();
                    let fields = (
                        parser.next_token()?.kind,
                        parser.next_token()?.kind,
                        parser.next_token()?.kind,
                    );
                    let entry = match fields {
                        (
                            TokenKind::Integer(field1),
                            TokenKind::Integer(field2),
                            TokenKind::Keyword(Keyword::Other(kind)),
                        ) => match kind.as_slice() {
                            b"n" if field1 > 0 => XrefEntry::InUse {
                                offset: usize::try_from(field1).unwrap_or(usize::MAX),
                                generation: u16::try_from(field2).unwrap_or(u16::MAX),
                            },
                            b"n" | b"f" => XrefEntry::Free,
                            _ => return Err(bad_entry(entry_at)),
                        },
                        _ => return Err(bad_entry(entry_at)),
                    };
                    let number = u32::try_from(i)
                        .ok()
                        .and_then(|i| first.checked_add(i))
                        .ok_or_else(|| MergeError::malformed_xref("object number overflow"))?;
                    let entry = if number == 0 { XrefEntry::Free } else { entry };
                    entries.insert(number, entry);
                }
            }
            _ => {
                return Err(MergeError::malformed_xref(format!(
                    "unexpected token in xref table at byte {}",
                    token.span.start
                )));
            }
        }
    }
}

fn bad_entry(offset: usize) -> MergeError {
    MergeError::malformed_xref(format!("bad xref entry at byte {offset}"))
}

fn read_stream(
    data: &[u8],
    offset: usize,
    document: usize,
    warnings: &mut Vec<Warning>,
) -> Result<XrefSection> {
    let mut parser = Parser::at(data, offset, document);
    let (id, object) = parser.parse_indirect_object(None)?;
    warnings.extend(parser.take_warnings());

    let stream = match object {
        Object::Stream(stream) if stream.dict.type_is(b"XRef") => stream,
        _ => {
            return Err(MergeError::malformed_xref(format!(
                "object {} {} at byte {offset} is not a cross-reference stream",
                id.0, id.1
            )));
        }
    };

    let decoded = filter::decode_stream(&stream).map_err(|err| {
        MergeError::malformed_xref(format!("xref stream {} {}: {err}", id.0, id.1))
    })?;

    let widths: Vec<usize> = stream
        .dict
        .get(b"W")
        .and_then(|w| w.as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_i64().ok())
                .filter_map(|item| usize::try_from(item).ok())
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(MergeError::malformed_xref("xref stream /W must be three widths of at most 8 bytes"));
    }
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(MergeError::malformed_xref("xref stream /W is all zeros"));
    }

    let size = stream
        .dict
        .get(b"Size")
        .and_then(|size| size.as_i64().ok())
        .ok_or_else(|| MergeError::malformed_xref("xref stream without /Size"))?;

    let index: Vec<(i64, i64)> = match stream.dict.get(b"Index").and_then(|i| i.as_array().ok()) {
        Some(items) => items
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_i64().ok()?, pair[1].as_i64().ok()?)))
            .collect(),
        None => vec![(0, size)],
    };

    let mut rows = decoded.chunks_exact(row_len);
    let mut entries = BTreeMap::new();
    'subsections: for (first, count) in index {
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                warn!("document #{document}: xref stream {} {} is shorter than its /Index", id.0, id.1);
                break 'subsections;
            };
            let Some(number) = first.checked_add(i).and_then(|n| u32::try_from(n).ok()) else {
                continue;
            };

            let (type_bytes, rest) = row.split_at(widths[0]);
            let (field2, field3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_be(type_bytes) };
            let field2 = read_be(field2);
            let field3 = read_be(field3);

            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::InUse {
                    offset: usize::try_from(field2).unwrap_or(usize::MAX),
                    generation: u16::try_from(field3).unwrap_or(u16::MAX),
                },
                2 => XrefEntry::Compressed {
                    container: u32::try_from(field2).unwrap_or(u32::MAX),
                    index: u32::try_from(field3).unwrap_or(u32::MAX),
                },
                // Unknown entry types read as references to the null object.
                _ => continue,
            };
            entries.insert(number, entry);
        }
    }

    Ok(XrefSection {
        entries,
        trailer: stream.dict,
    })
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

/// Find every `N G obj` header in the file. Later occurrences of the same
/// object number win, matching incremental-update semantics.
pub fn scan_objects(data: &[u8]) -> BTreeMap<u32, XrefEntry> {
    let mut found = BTreeMap::new();
    let mut from = 0;

    while let Some(at) = find(data, from, b"obj") {
        from = at + 3;
        if data.get(at + 3).is_some_and(|&byte| is_regular(byte)) {
            continue;
        }
        if let Some((start, number, generation)) = header_before(data, at) {
            found.insert(
                number,
                XrefEntry::InUse {
                    offset: start,
                    generation,
                },
            );
        }
    }
    found
}

/// Given the offset of an `obj` keyword, locate the `N G` in front of it.
fn header_before(data: &[u8], obj_at: usize) -> Option<(usize, u32, u16)> {
    let skip_space = |mut at: usize| {
        let end = at;
        while at > 0 && is_whitespace(data[at - 1]) {
            at -= 1;
        }
        (at < end).then_some(at)
    };
    let digits = |mut at: usize| {
        let end = at;
        while at > 0 && data[at - 1].is_ascii_digit() {
            at -= 1;
        }
        (at < end).then_some((at, end))
    };

    let (gen_start, gen_end) = digits(skip_space(obj_at)?)?;
    let (num_start, num_end) = digits(skip_space(gen_start)?)?;
    if num_start > 0 && is_regular(data[num_start - 1]) {
        return None;
    }

    let number = std::str::from_utf8(&data[num_start..num_end]).ok()?.parse().ok()?;
    let generation = std::str::from_utf8(&data[gen_start..gen_end]).ok()?.parse().ok()?;
    Some((num_start, number, generation))
}

/// Rebuild the table by scanning for object headers.
///
/// The trailer is the last `trailer` dictionary in the file, if any parses.
pub fn rebuild(data: &[u8], document: usize) -> Result<XrefTable> {
    let entries = scan_objects(data);
    if entries.is_empty() {
        return Err(MergeError::malformed_xref(
            "no cross-reference data and no objects found by scanning",
        ));
    }

    let mut trailer = Dictionary::new();
    let mut before = data.len();
    while let Some(at) = rfind(data, before, b"trailer") {
        let mut parser = Parser::at(data, at + b"trailer".len(), document);
        if let Ok(Object::Dictionary(dict)) = parser.parse_object() {
            trailer = dict;
            break;
        }
        before = at;
    }

    debug!(
        "document #{document}: rebuilt cross-reference table with {} objects",
        entries.len()
    );
    Ok(XrefTable { entries, trailer })
}
