//! Shared helpers for integration tests.
//!
//! Inputs are assembled byte by byte so every test controls the exact file
//! layout: offsets, cross-reference form, update sections.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use pdfmerge::pdf::{Dictionary, SourceDocument};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Offset(usize),
    InStream(u32, u32),
}

/// Writes a PDF file section by section, recording object offsets.
pub struct RawPdf {
    buf: Vec<u8>,
    pending: BTreeMap<u32, Slot>,
    highest: u32,
    last_xref: Option<usize>,
}

impl RawPdf {
    pub fn new() -> Self {
        let mut buf = b"%PDF-1.6\n".to_vec();
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            pending: BTreeMap::new(),
            highest: 0,
            last_xref: None,
        }
    }

    fn record(&mut self, number: u32, slot: Slot) {
        self.pending.insert(number, slot);
        self.highest = self.highest.max(number);
    }

    pub fn object(mut self, number: u32, body: &str) -> Self {
        self.record(number, Slot::Offset(self.buf.len()));
        write!(self.buf, "{number} 0 obj\n{body}\nendobj\n").unwrap();
        self
    }

    pub fn stream(mut self, number: u32, entries: &str, content: &[u8]) -> Self {
        self.record(number, Slot::Offset(self.buf.len()));
        write!(
            self.buf,
            "{number} 0 obj\n<< {entries} /Length {} >>\nstream\n",
            content.len()
        )
        .unwrap();
        self.buf.extend_from_slice(content);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Compressed object stream `number` holding `members`.
    pub fn object_stream(mut self, number: u32, members: &[(u32, &str)]) -> Self {
        let mut offsets = String::new();
        let mut bodies = String::new();
        for (position, (member, text)) in members.iter().enumerate() {
            offsets.push_str(&format!("{member} {} ", bodies.len()));
            bodies.push_str(text);
            bodies.push('\n');
            self.record(*member, Slot::InStream(number, position as u32));
        }
        let entries = format!(
            "/Type /ObjStm /N {} /First {} /Filter /FlateDecode",
            members.len(),
            offsets.len()
        );
        let payload = deflate(format!("{offsets}{bodies}").as_bytes());
        self.stream(number, &entries, &payload)
    }

    /// Classic table for everything added since the last section.
    /// `{prev}` in `trailer` becomes the previous section's offset.
    pub fn xref_table(mut self, trailer: &str) -> Self {
        let at = self.buf.len();
        let mut text = String::from("xref\n");
        if self.last_xref.is_none() {
            text.push_str("0 1\n0000000000 65535 f \n");
        }
        for (number, slot) in &self.pending {
            let Slot::Offset(offset) = slot else {
                panic!("object {number} lives in an object stream");
            };
            text.push_str(&format!("{number} 1\n{offset:010} 00000 n \n"));
        }
        let prev = self.last_xref.unwrap_or(0).to_string();
        text.push_str(&format!("trailer\n{}\n", trailer.replace("{prev}", &prev)));
        self.buf.extend_from_slice(text.as_bytes());
        self.pending.clear();
        self.last_xref = Some(at);
        self
    }

    /// Cross-reference stream `number` with `/W [1 4 2]` and PNG Up rows.
    pub fn xref_stream(mut self, number: u32, extra: &str) -> Self {
        let at = self.buf.len();
        self.record(number, Slot::Offset(at));

        let mut index = String::from("0 1 ");
        let mut rows: Vec<[u8; 7]> = vec![[0, 0, 0, 0, 0, 0xFF, 0xFF]];
        for (number, slot) in &self.pending {
            index.push_str(&format!("{number} 1 "));
            let (kind, second, third) = match *slot {
                Slot::Offset(offset) => (1u8, offset as u32, 0u16),
                Slot::InStream(container, position) => (2u8, container, position as u16),
            };
            let mut row = [kind, 0, 0, 0, 0, 0, 0];
            row[1..5].copy_from_slice(&second.to_be_bytes());
            row[5..7].copy_from_slice(&third.to_be_bytes());
            rows.push(row);
        }

        let mut data = Vec::new();
        let mut above = [0u8; 7];
        for row in rows {
            data.push(2);
            data.extend(row.iter().zip(above.iter()).map(|(r, a)| r.wrapping_sub(*a)));
            above = row;
        }

        let entries = format!(
            "/Type /XRef /Size {} /W [1 4 2] /Index [{index}] /Filter /FlateDecode \
             /DecodeParms << /Predictor 12 /Columns 7 >> {extra}",
            self.highest + 1
        );
        let payload = deflate(&data);
        self = self.stream(number, &entries, &payload);
        self.pending.clear();
        self.last_xref = Some(at);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let at = self.last_xref.unwrap_or(0);
        self.finish_at(at)
    }

    pub fn finish_at(mut self, startxref: usize) -> Vec<u8> {
        write!(self.buf, "startxref\n{startxref}\n%%EOF\n").unwrap();
        self.buf
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// One page per entry of `contents`, each with its own content stream.
pub fn pdf_with_pages(contents: &[&str]) -> Vec<u8> {
    let count = contents.len() as u32;
    let kids: Vec<String> = (0..count).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    let mut pdf = RawPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {count} /MediaBox [0 0 595 842] >>",
                kids.join(" ")
            ),
        );
    for (i, content) in contents.iter().enumerate() {
        let page = 3 + 2 * i as u32;
        pdf = pdf
            .object(
                page,
                &format!("<< /Type /Page /Parent 2 0 R /Contents {} 0 R >>", page + 1),
            )
            .stream(page + 1, "", content.as_bytes());
    }
    pdf.xref_table(&format!("<< /Size {} /Root 1 0 R >>", 3 + 2 * count))
        .finish()
}

/// A document produced by an independent PDF library.
pub fn lopdf_document(contents: &[&str]) -> Vec<u8> {
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn load(bytes: &[u8]) -> SourceDocument {
    SourceDocument::load(0, bytes).unwrap()
}

/// Page dictionaries of a merged file, in page order.
pub fn page_dicts(document: &SourceDocument) -> Vec<&Dictionary> {
    document
        .pages()
        .iter()
        .map(|page| document.resolve(page.id).as_dict().unwrap())
        .collect()
}

/// Content stream payload of every page, as text.
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let document = load(bytes);
    page_dicts(&document)
        .into_iter()
        .map(|page| {
            let contents = document.deref(page.get(b"Contents").unwrap());
            String::from_utf8(contents.as_stream().unwrap().content.clone()).unwrap()
        })
        .collect()
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
