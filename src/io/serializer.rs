//! Writing a [`TargetDocument`] as PDF bytes.
//!
//! Output is a single revision: header, objects in increasing number, one
//! classic cross-reference table, trailer. No object streams, no
//! compression of our own; stream payloads are written exactly as copied.

use std::io::Write;

use log::debug;

use crate::error::{MergeError, Result};
use crate::merge::TargetDocument;
use crate::pdf::{Dictionary, Object, ObjectId, StringFormat};

/// File header: version line plus a comment with high-bit bytes so transfer
/// tools treat the file as binary.
pub const HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

/// Serialize `document` to PDF bytes.
///
/// Every reference in the document is checked first; nothing is written
/// unless all of them resolve.
///
/// # Errors
///
/// Returns [`MergeError::Serialization`] if the catalog is missing or any
/// reference points at an object that was never stored.
///
/// # Examples
///
/// ```
/// use pdfmerge::io::serialize;
/// use pdfmerge::merge::TargetDocument;
///
/// let bytes = serialize(&TargetDocument::new()).unwrap();
/// assert!(bytes.starts_with(b"%PDF-1.7"));
/// assert!(bytes.ends_with(b"%%EOF\n"));
/// ```
pub fn serialize(document: &TargetDocument) -> Result<Vec<u8>> {
    verify_references(document)?;

    let mut out = Vec::new();
    out.extend_from_slice(HEADER);

    let size = document.max_object_number() + 1;
    let mut offsets: Vec<Option<usize>> = vec![None; size as usize];
    for (id, object) in document.objects() {
        offsets[id.0 as usize] = Some(out.len());
        write!(out, "{} {} obj\n", id.0, id.1)?;
        write_indirect(&mut out, object)?;
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    write!(out, "xref\n0 {size}\n")?;
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        match offset {
            Some(at) => write!(out, "{at:010} 00000 n \n")?,
            None => out.extend_from_slice(b"0000000000 00000 f \n"),
        }
    }

    let mut trailer = Dictionary::new();
    trailer.set("Size", i64::from(size));
    trailer.set("Root", document.catalog_id());
    if let Some(info) = document.info_id() {
        trailer.set("Info", info);
    }
    out.extend_from_slice(b"trailer\n");
    write_dictionary(&mut out, &trailer)?;
    write!(out, "\nstartxref\n{xref_offset}\n%%EOF\n")?;

    debug!(
        "serialized {} objects into {} bytes",
        document.len(),
        out.len()
    );
    Ok(out)
}

fn verify_references(document: &TargetDocument) -> Result<()> {
    let catalog = document.catalog_id();
    if document.get(catalog).and_then(Object::dict).is_none() {
        return Err(MergeError::serialization("catalog is missing"));
    }
    if let Some(info) = document.info_id()
        && document.get(info).is_none()
    {
        return Err(MergeError::serialization("document information dictionary is missing"));
    }

    for (id, object) in document.objects() {
        let mut dangling: Option<ObjectId> = None;
        object.for_each_reference(&mut |target| {
            if dangling.is_none() && document.get(target).is_none() {
                dangling = Some(target);
            }
        });
        if let Some(target) = dangling {
            return Err(MergeError::serialization(format!(
                "object {} {} references {} {} R, which does not exist",
                id.0, id.1, target.0, target.1
            )));
        }
    }
    Ok(())
}

/// Top-level object body. Streams get an exact direct `/Length`.
fn write_indirect(out: &mut Vec<u8>, object: &Object) -> Result<()> {
    match object {
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", stream.content.len());
            write_dictionary(out, &dict)?;
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
            Ok(())
        }
        other => write_object(out, other),
    }
}

/// Write one direct object.
pub fn write_object(out: &mut Vec<u8>, object: &Object) -> Result<()> {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(value) => write!(out, "{value}")?,
        Object::Integer(value) => write!(out, "{value}")?,
        Object::Real(value) => out.extend_from_slice(format_real(*value).as_bytes()),
        Object::String(bytes, StringFormat::Literal) => write_literal_string(out, bytes),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.push(b'<');
            for byte in bytes {
                write!(out, "{byte:02X}")?;
            }
            out.push(b'>');
        }
        Object::Name(name) => write_name(out, name),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item)?;
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict)?,
        Object::Stream(_) => {
            return Err(MergeError::serialization(
                "stream objects must be indirect",
            ));
        }
        Object::Reference(id) => write!(out, "{} {} R", id.0, id.1)?,
    }
    Ok(())
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) -> Result<()> {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        out.push(b' ');
        write_name(out, key);
        out.push(b' ');
        write_object(out, value)?;
    }
    out.extend_from_slice(b" >>");
    Ok(())
}

/// Shortest decimal that reads back as the same value, never with an
/// exponent. Whole numbers keep a trailing `.0` so they read back as reals.
pub fn format_real(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0.0".to_string();
    }
    // `Display` for f64 never switches to exponent notation.
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) {
    out.push(b'/');
    for &byte in name {
        let plain = (0x21..=0x7E).contains(&byte)
            && !matches!(
                byte,
                b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
            );
        if plain {
            out.push(byte);
        } else {
            out.push(b'#');
            out.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
    }
}

fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            other => out.push(other),
        }
    }
    out.push(b')');
}
