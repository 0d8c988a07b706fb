//! PDF tokenizer.
//!
//! Works directly on the input byte slice. Every token carries the byte span
//! it was read from so the parser can locate stream payloads and report
//! offsets in errors.

use std::ops::Range;

use crate::error::{MergeError, Result};

/// Keywords recognised by the object parser. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Obj,
    EndObj,
    Stream,
    EndStream,
    R,
    True,
    False,
    Null,
    Xref,
    Trailer,
    StartXref,
    Other(Vec<u8>),
}

impl Keyword {
    fn classify(word: &[u8]) -> Self {
        match word {
            b"obj" => Keyword::Obj,
            b"endobj" => Keyword::EndObj,
            b"stream" => Keyword::Stream,
            b"endstream" => Keyword::EndStream,
            b"R" => Keyword::R,
            b"true" => Keyword::True,
            b"false" => Keyword::False,
            b"null" => Keyword::Null,
            b"xref" => Keyword::Xref,
            b"trailer" => Keyword::Trailer,
            b"startxref" => Keyword::StartXref,
            other => Keyword::Other(other.to_vec()),
        }
    }
}

/// Classified lexical unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Real(f64),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    /// Decoded name bytes, without the leading slash.
    Name(Vec<u8>),
    ArrayOpen,
    ArrayClose,
    DictOpen,
    DictClose,
    Keyword(Keyword),
    Eof,
}

/// A token and the bytes it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    pub fn is_keyword(&self, keyword: &Keyword) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if k == keyword)
    }
}

/// PDF whitespace: NUL, TAB, LF, FF, CR, SPACE.
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// PDF delimiters: `( ) < > [ ] { } / %`.
pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Read the token starting at or after `offset`.
///
/// Returns the token and the offset just past it.
pub fn next_token_at(data: &[u8], offset: usize) -> Result<(Token, usize)> {
    let mut lexer = Lexer::at(data, offset);
    let token = lexer.next_token()?;
    Ok((token, lexer.position()))
}

/// Cursor over a byte slice producing [`Token`]s.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor to an absolute offset (clamped to the input length).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    fn current(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Skip whitespace and `%` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(byte) = self.current() {
            if byte == b'%' {
                while let Some(byte) = self.current() {
                    if byte == b'\n' || byte == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else if is_whitespace(byte) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Skip the end-of-line marker that follows the `stream` keyword.
    ///
    /// Accepts CRLF, LF, or a lone CR, with stray spaces before it.
    /// Returns the payload start offset.
    pub fn skip_stream_eol(&mut self) -> usize {
        while matches!(self.current(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        match self.current() {
            Some(b'\r') => {
                self.pos += 1;
                if self.current() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
        self.pos
    }

    /// Read the next token without consuming it.
    pub fn peek_token(&self) -> Result<Token> {
        self.clone().next_token()
    }

    /// Read the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(byte) = self.current() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: start..start,
            });
        };

        let kind = match byte {
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.read_number_or_keyword(),
            b'(' => self.read_literal_string()?,
            b'/' => self.read_name()?,
            b'[' => {
                self.pos += 1;
                TokenKind::ArrayOpen
            }
            b']' => {
                self.pos += 1;
                TokenKind::ArrayClose
            }
            b'<' => {
                if self.data.get(self.pos + 1) == Some(&b'<') {
                    self.pos += 2;
                    TokenKind::DictOpen
                } else {
                    self.read_hex_string()?
                }
            }
            b'>' => {
                if self.data.get(self.pos + 1) == Some(&b'>') {
                    self.pos += 2;
                    TokenKind::DictClose
                } else {
                    return Err(MergeError::malformed_token(start, "stray '>'"));
                }
            }
            b')' | b'{' | b'}' => {
                return Err(MergeError::malformed_token(
                    start,
                    format!("stray '{}'", byte as char),
                ));
            }
            _ => {
                let word = self.read_regular();
                TokenKind::Keyword(Keyword::classify(word))
            }
        };

        Ok(Token {
            kind,
            span: start..self.pos,
        })
    }

    fn read_regular(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(byte) = self.current() {
            if !is_regular(byte) {
                break;
            }
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Numbers are `[+-]?(digits[.digits*]|.digits)`. A run of regular
    /// characters that does not match is returned as a keyword.
    fn read_number_or_keyword(&mut self) -> TokenKind {
        let word = self.read_regular();
        parse_number(word).unwrap_or_else(|| TokenKind::Keyword(Keyword::classify(word)))
    }

    fn read_literal_string(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1usize;

        loop {
            let Some(byte) = self.current() else {
                return Err(MergeError::malformed_token(
                    start,
                    "unterminated literal string",
                ));
            };
            self.pos += 1;

            match byte {
                b'(' => {
                    depth += 1;
                    out.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(byte);
                }
                b'\\' => self.read_escape(start, &mut out)?,
                b'\r' => {
                    // Unescaped end-of-line markers read as a single LF.
                    if self.current() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(byte),
            }
        }

        Ok(TokenKind::LiteralString(out))
    }

    fn read_escape(&mut self, start: usize, out: &mut Vec<u8>) -> Result<()> {
        let Some(byte) = self.current() else {
            return Err(MergeError::malformed_token(
                start,
                "unterminated literal string",
            ));
        };
        self.pos += 1;

        match byte {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(byte),
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.current() {
                        Some(digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                // High-order overflow is ignored.
                out.push((value & 0xFF) as u8);
            }
            b'\r' => {
                if self.current() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            // Unknown escapes drop the backslash.
            other => out.push(other),
        }
        Ok(())
    }

    fn read_hex_string(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        let mut out = Vec::new();
        let mut high: Option<u8> = None;

        loop {
            let Some(byte) = self.current() else {
                return Err(MergeError::malformed_token(start, "unterminated hex string"));
            };
            self.pos += 1;

            if byte == b'>' {
                break;
            }
            if is_whitespace(byte) {
                continue;
            }
            let Some(nibble) = hex_value(byte) else {
                return Err(MergeError::malformed_token(
                    self.pos - 1,
                    format!("invalid hex digit '{}'", byte.escape_ascii()),
                ));
            };
            match high.take() {
                Some(h) => out.push(h << 4 | nibble),
                None => high = Some(nibble),
            }
        }

        // An odd final digit is padded with 0.
        if let Some(h) = high {
            out.push(h << 4);
        }
        Ok(TokenKind::HexString(out))
    }

    fn read_name(&mut self) -> Result<TokenKind> {
        self.pos += 1;
        let mut out = Vec::new();

        while let Some(byte) = self.current() {
            if !is_regular(byte) {
                break;
            }
            if byte == b'#' {
                let escape_at = self.pos;
                let decoded = self
                    .data
                    .get(self.pos + 1..self.pos + 3)
                    .and_then(|pair| Some(hex_value(pair[0])? << 4 | hex_value(pair[1])?));
                let Some(decoded) = decoded else {
                    return Err(MergeError::malformed_token(
                        escape_at,
                        "invalid #xx escape in name",
                    ));
                };
                out.push(decoded);
                self.pos += 3;
            } else {
                out.push(byte);
                self.pos += 1;
            }
        }

        Ok(TokenKind::Name(out))
    }
}

fn parse_number(word: &[u8]) -> Option<TokenKind> {
    let (negative, digits) = match word.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, word),
    };

    let dot = digits.iter().position(|&b| b == b'.');
    let (int_part, frac_part) = match dot {
        Some(at) => (&digits[..at], Some(&digits[at + 1..])),
        None => (digits, None),
    };

    let all_digits = |part: &[u8]| part.iter().all(u8::is_ascii_digit);
    if !all_digits(int_part) || !frac_part.is_none_or(all_digits) {
        return None;
    }
    if int_part.is_empty() && frac_part.is_none_or(<[u8]>::is_empty) {
        return None;
    }

    // Only ASCII digits, sign and dot remain.
    let text = std::str::from_utf8(word).ok()?;
    if frac_part.is_none()
        && let Ok(value) = text.parse::<i64>()
    {
        return Some(TokenKind::Integer(value));
    }

    let mut normalized = String::with_capacity(word.len() + 2);
    if negative {
        normalized.push('-');
    }
    normalized.push('0');
    normalized.push_str(std::str::from_utf8(int_part).ok()?);
    if let Some(frac) = frac_part {
        normalized.push('.');
        normalized.push_str(std::str::from_utf8(frac).ok()?);
        normalized.push('0');
    }
    normalized.parse::<f64>().ok().map(TokenKind::Real)
}
