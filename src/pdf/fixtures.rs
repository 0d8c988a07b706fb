//! Hand-assembled PDF files for unit tests, with exact byte offsets.

use std::collections::BTreeMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

#[derive(Debug, Clone, Copy)]
enum Entry {
    InUse(usize),
    Compressed(u32, u32),
}

pub struct PdfBuilder {
    buf: Vec<u8>,
    pending: BTreeMap<u32, Entry>,
    max_number: u32,
    last_section: Option<usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::with_version("1.7")
    }

    pub fn with_version(version: &str) -> Self {
        let mut buf = format!("%PDF-{version}\n").into_bytes();
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            pending: BTreeMap::new(),
            max_number: 0,
            last_section: None,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    fn note(&mut self, number: u32, entry: Entry) {
        self.pending.insert(number, entry);
        self.max_number = self.max_number.max(number);
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// `number 0 obj <body> endobj`.
    pub fn object(mut self, number: u32, body: &str) -> Self {
        let offset = self.buf.len();
        self.note(number, Entry::InUse(offset));
        write!(self.buf, "{number} 0 obj\n{body}\nendobj\n").unwrap();
        self
    }

    /// Stream object with an exact `/Length`; `dict` holds the other entries.
    pub fn stream(mut self, number: u32, dict: &str, content: &[u8]) -> Self {
        let offset = self.buf.len();
        self.note(number, Entry::InUse(offset));
        write!(
            self.buf,
            "{number} 0 obj\n<< {dict} /Length {} >>\nstream\n",
            content.len()
        )
        .unwrap();
        self.buf.extend_from_slice(content);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Object stream `number` holding `objects`, flate-compressed.
    pub fn object_stream(mut self, number: u32, objects: &[(u32, &str)]) -> Self {
        let mut header = String::new();
        let mut body = String::new();
        for (index, (member, text)) in objects.iter().enumerate() {
            header.push_str(&format!("{member} {} ", body.len()));
            body.push_str(text);
            body.push(' ');
            self.note(*member, Entry::Compressed(number, index as u32));
        }
        let first = header.len();
        let payload = zlib(format!("{header}{body}").as_bytes());
        let dict = format!(
            "/Type /ObjStm /N {} /First {first} /Filter /FlateDecode",
            objects.len()
        );
        self.stream(number, &dict, &payload)
    }

    fn rows(&self) -> Vec<(u32, Option<Entry>)> {
        let mut rows: Vec<(u32, Option<Entry>)> = Vec::new();
        if self.last_section.is_none() {
            rows.push((0, None));
        }
        rows.extend(self.pending.iter().map(|(number, entry)| (*number, Some(*entry))));
        rows
    }

    fn subsections(rows: &[(u32, Option<Entry>)]) -> Vec<(u32, Vec<Option<Entry>>)> {
        let mut groups: Vec<(u32, Vec<Option<Entry>>)> = Vec::new();
        for (number, entry) in rows {
            match groups.last_mut() {
                Some((first, entries)) if *first + entries.len() as u32 == *number => {
                    entries.push(*entry)
                }
                _ => groups.push((*number, vec![*entry])),
            }
        }
        groups
    }

    fn fill_prev(&self, text: &str) -> String {
        let prev = self.last_section.unwrap_or(0);
        text.replace("{prev}", &prev.to_string())
    }

    /// Classic `xref` table for the objects added since the previous section.
    /// `{prev}` in the trailer is replaced by the previous section's offset.
    pub fn xref_table(mut self, trailer: &str) -> Self {
        let offset = self.buf.len();
        let rows = self.rows();
        let mut text = String::from("xref\n");
        for (first, entries) in Self::subsections(&rows) {
            text.push_str(&format!("{first} {}\n", entries.len()));
            for entry in entries {
                match entry {
                    None => text.push_str("0000000000 65535 f \n"),
                    Some(Entry::InUse(at)) => text.push_str(&format!("{at:010} 00000 n \n")),
                    Some(Entry::Compressed(..)) => panic!("compressed objects need an xref stream"),
                }
            }
        }
        text.push_str(&format!("trailer\n{}\n", self.fill_prev(trailer)));
        self.buf.extend_from_slice(text.as_bytes());
        self.pending.clear();
        self.last_section = Some(offset);
        self
    }

    /// Cross-reference stream object `number` for the objects added since the
    /// previous section, with `/W [1 4 2]`. With `predictor`, rows use the
    /// PNG Up filter.
    pub fn xref_stream(mut self, number: u32, extra: &str, predictor: bool) -> Self {
        let offset = self.buf.len();
        self.note(number, Entry::InUse(offset));

        let rows = self.rows();
        let mut index = String::new();
        let mut data = Vec::new();
        let mut previous = [0u8; 7];
        for (first, entries) in Self::subsections(&rows) {
            index.push_str(&format!("{first} {} ", entries.len()));
            for entry in entries {
                let (kind, field2, field3): (u8, u32, u16) = match entry {
                    None => (0, 0, 65535),
                    Some(Entry::InUse(at)) => (1, at as u32, 0),
                    Some(Entry::Compressed(container, idx)) => (2, container, idx as u16),
                };
                let mut row = [0u8; 7];
                row[0] = kind;
                row[1..5].copy_from_slice(&field2.to_be_bytes());
                row[5..7].copy_from_slice(&field3.to_be_bytes());
                if predictor {
                    data.push(2);
                    data.extend(row.iter().zip(previous.iter()).map(|(r, p)| r.wrapping_sub(*p)));
                    previous = row;
                } else {
                    data.extend_from_slice(&row);
                }
            }
        }

        let parms = if predictor {
            "/DecodeParms << /Predictor 12 /Columns 7 >>"
        } else {
            ""
        };
        let dict = format!(
            "/Type /XRef /Size {} /W [1 4 2] /Index [{index}] /Filter /FlateDecode {parms} {}",
            self.max_number + 1,
            self.fill_prev(extra)
        );
        let payload = zlib(&data);
        self = self.stream(number, &dict, &payload);
        self.pending.clear();
        self.last_section = Some(offset);
        self
    }

    /// `startxref` pointing at the last section.
    pub fn finish(self) -> Vec<u8> {
        let at = self.last_section.unwrap_or(0);
        self.finish_with_startxref(at)
    }

    pub fn finish_with_startxref(mut self, at: usize) -> Vec<u8> {
        write!(self.buf, "startxref\n{at}\n%%EOF\n").unwrap();
        self.buf
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A minimal valid document whose pages carry the given content streams.
pub fn simple_pdf(contents: &[&str]) -> Vec<u8> {
    let page_count = contents.len() as u32;
    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", 3 + i * 2)).collect();
    let mut builder = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {page_count} /MediaBox [0 0 612 792] >>",
                kids.join(" ")
            ),
        );
    for (i, content) in contents.iter().enumerate() {
        let page = 3 + i as u32 * 2;
        builder = builder
            .object(
                page,
                &format!("<< /Type /Page /Parent 2 0 R /Contents {} 0 R >>", page + 1),
            )
            .stream(page + 1, "", content.as_bytes());
    }
    builder
        .xref_table(&format!("<< /Size {} /Root 1 0 R >>", 3 + page_count * 2))
        .finish()
}
