//! Object parser.
//!
//! Builds [`Object`] values from the token stream. The parser keeps up to two
//! tokens of lookahead, filled lazily, which is enough to fold `N G R` into a
//! reference and to notice a `stream` keyword after a dictionary without ever
//! tokenizing stream payload bytes.

use std::collections::VecDeque;

use log::warn;

use crate::error::{MergeError, Result};
use crate::pdf::Warning;
use crate::pdf::lexer::{Keyword, Lexer, Token, TokenKind, is_whitespace};
use crate::pdf::object::{Dictionary, Object, ObjectId, Stream, StringFormat};

/// Maximum nesting of arrays and dictionaries.
pub const MAX_DEPTH: usize = 256;

/// Looks up the value of an indirect `/Length` while a stream is being parsed.
pub trait LengthResolver {
    fn resolve_length(&self, id: ObjectId) -> Option<i64>;
}

/// Resolver for contexts where indirect lengths cannot be looked up.
pub struct NoLengths;

impl LengthResolver for NoLengths {
    fn resolve_length(&self, _id: ObjectId) -> Option<i64> {
        None
    }
}

impl<F: Fn(ObjectId) -> Option<i64>> LengthResolver for F {
    fn resolve_length(&self, id: ObjectId) -> Option<i64> {
        self(id)
    }
}

/// Convert a pair of integers into an object id, if both are in range.
pub fn object_id(number: i64, generation: i64) -> Option<ObjectId> {
    Some((u32::try_from(number).ok()?, u16::try_from(generation).ok()?))
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
    lengths: &'a dyn LengthResolver,
    document: usize,
    warnings: Vec<Warning>,
}

impl<'a> Parser<'a> {
    /// Parser positioned at `offset` in `data`, reporting warnings against `document`.
    pub fn at(data: &'a [u8], offset: usize, document: usize) -> Self {
        Self {
            lexer: Lexer::at(data, offset),
            lookahead: VecDeque::with_capacity(2),
            lengths: &NoLengths,
            document,
            warnings: Vec::new(),
        }
    }

    pub fn new(data: &'a [u8], document: usize) -> Self {
        Self::at(data, 0, document)
    }

    /// Use `lengths` to resolve indirect stream lengths.
    pub fn with_lengths(mut self, lengths: &'a dyn LengthResolver) -> Self {
        self.lengths = lengths;
        self
    }

    /// Offset of the next unconsumed token.
    pub fn position(&self) -> usize {
        self.lookahead
            .front()
            .map_or(self.lexer.position(), |token| token.span.start)
    }

    /// Warnings raised so far, leaving the parser's list empty.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn peek(&mut self, n: usize) -> Result<&Token> {
        while self.lookahead.len() <= n {
            let token = self.lexer.next_token()?;
            self.lookahead.push_back(token);
        }
        Ok(&self.lookahead[n])
    }

    fn peek_kind(&mut self, n: usize) -> Option<&TokenKind> {
        self.peek(n).ok().map(|token| &token.kind)
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        match self.lookahead.pop_front() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    /// Check whether the next token is `keyword`, without consuming it.
    pub fn at_keyword(&mut self, keyword: &Keyword) -> bool {
        matches!(self.peek(0), Ok(token) if token.is_keyword(keyword))
    }

    /// Parse one complete object.
    pub fn parse_object(&mut self) -> Result<Object> {
        self.parse_value(0)
    }

    /// Parse `N G obj <object> endobj`.
    ///
    /// When `expected` is given, the header must carry that id. A missing
    /// `endobj` is tolerated with a warning.
    pub fn parse_indirect_object(&mut self, expected: Option<ObjectId>) -> Result<(ObjectId, Object)> {
        let start = self.position();
        let number = self.next_token()?;
        let generation = self.next_token()?;
        let keyword = self.next_token()?;

        let id = match (&number.kind, &generation.kind) {
            (TokenKind::Integer(n), TokenKind::Integer(g)) if keyword.is_keyword(&Keyword::Obj) => {
                object_id(*n, *g)
            }
            _ => None,
        }
        .ok_or_else(|| MergeError::malformed_object(start, "expected 'N G obj' header"))?;

        if let Some(expected) = expected
            && expected != id
        {
            return Err(MergeError::malformed_object(
                start,
                format!(
                    "expected object {} {} but found {} {}",
                    expected.0, expected.1, id.0, id.1
                ),
            ));
        }

        let object = self.parse_object()?;

        if self.at_keyword(&Keyword::EndObj) {
            self.next_token()?;
        } else {
            warn!(
                "document #{}: object {} {} at byte {start} has no endobj",
                self.document, id.0, id.1
            );
            self.warnings.push(Warning::MissingEndobj {
                document: self.document,
                id,
            });
        }

        Ok((id, object))
    }

    fn parse_value(&mut self, depth: usize) -> Result<Object> {
        let token = self.next_token()?;
        let offset = token.span.start;

        match token.kind {
            TokenKind::Integer(number) => {
                let is_reference = matches!(self.peek_kind(0), Some(TokenKind::Integer(_)))
                    && matches!(self.peek_kind(1), Some(TokenKind::Keyword(Keyword::R)));
                if !is_reference {
                    return Ok(Object::Integer(number));
                }
                let TokenKind::Integer(generation) = self.next_token()?.kind else {
                    return Err(MergeError::malformed_object(offset, "broken reference"));
                };
                self.next_token()?;
                object_id(number, generation)
                    .map(Object::Reference)
                    .ok_or_else(|| {
                        MergeError::malformed_object(
                            offset,
                            format!("reference {number} {generation} R out of range"),
                        )
                    })
            }
            TokenKind::Real(value) => Ok(Object::Real(value)),
            TokenKind::LiteralString(bytes) => {
                Ok(Object::String(bytes, StringFormat::Literal))
            }
            TokenKind::HexString(bytes) => {
                Ok(Object::String(bytes, StringFormat::Hexadecimal))
            }
            TokenKind::Name(name) => Ok(Object::Name(name)),
            TokenKind::ArrayOpen => {
                Self::check_depth(offset, depth)?;
                self.parse_array(offset, depth + 1)
            }
            TokenKind::DictOpen => {
                Self::check_depth(offset, depth)?;
                let dict = self.parse_dictionary(offset, depth + 1)?;
                if self.at_keyword(&Keyword::Stream) {
                    let keyword = self.next_token()?;
                    self.parse_stream(dict, keyword).map(Object::Stream)
                } else {
                    Ok(Object::Dictionary(dict))
                }
            }
            TokenKind::Keyword(Keyword::True) => Ok(Object::Boolean(true)),
            TokenKind::Keyword(Keyword::False) => Ok(Object::Boolean(false)),
            TokenKind::Keyword(Keyword::Null) => Ok(Object::Null),
            TokenKind::Keyword(keyword) => Err(MergeError::malformed_object(
                offset,
                format!("unexpected keyword {keyword:?}"),
            )),
            TokenKind::ArrayClose => Err(MergeError::malformed_object(offset, "unexpected ']'")),
            TokenKind::DictClose => Err(MergeError::malformed_object(offset, "unexpected '>>'")),
            TokenKind::Eof => Err(MergeError::malformed_object(offset, "unexpected end of input")),
        }
    }

    fn check_depth(offset: usize, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(MergeError::malformed_object(
                offset,
                format!("nesting deeper than {MAX_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn parse_array(&mut self, offset: usize, depth: usize) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            match self.peek_kind(0) {
                Some(TokenKind::ArrayClose) => {
                    self.next_token()?;
                    return Ok(Object::Array(items));
                }
                Some(TokenKind::Eof) => {
                    return Err(MergeError::malformed_object(offset, "unterminated array"));
                }
                _ => items.push(self.parse_value(depth)?),
            }
        }
    }

    fn parse_dictionary(&mut self, offset: usize, depth: usize) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let token = self.next_token()?;
            let key = match token.kind {
                TokenKind::DictClose => return Ok(dict),
                TokenKind::Name(key) => key,
                TokenKind::Eof => {
                    return Err(MergeError::malformed_object(offset, "unterminated dictionary"));
                }
                other => {
                    return Err(MergeError::malformed_object(
                        token.span.start,
                        format!("dictionary key must be a name, found {other:?}"),
                    ));
                }
            };

            // A key directly followed by '>>' has no value.
            if matches!(self.peek_kind(0), Some(TokenKind::DictClose)) {
                dict.set(key, Object::Null);
                continue;
            }
            let value = self.parse_value(depth)?;
            dict.set(key, value);
        }
    }

    fn parse_stream(&mut self, dict: Dictionary, keyword: Token) -> Result<Stream> {
        // Nothing past the keyword may have been tokenized.
        self.lookahead.clear();
        self.lexer.seek(keyword.span.end);

        let data = self.lexer.data();
        let start = self.lexer.skip_stream_eol();

        let declared = match dict.get(b"Length") {
            Some(Object::Integer(length)) => Some(*length),
            Some(Object::Reference(id)) => self.lengths.resolve_length(*id),
            _ => None,
        };

        let by_length = declared
            .and_then(|length| usize::try_from(length).ok())
            .and_then(|length| start.checked_add(length))
            .filter(|&end| end <= data.len())
            .and_then(|end| endstream_after(data, end).map(|keyword| (end, keyword)));

        let (end, keyword_at) = match by_length {
            Some(found) => found,
            None => {
                let keyword_at = find(data, start, b"endstream").ok_or_else(|| {
                    MergeError::malformed_object(keyword.span.start, "stream without endstream")
                })?;
                let end = trim_eol_before(data, start, keyword_at);
                if let Some(declared) = declared {
                    warn!(
                        "document #{}: stream at byte {start} declares /Length {declared}, found {} bytes",
                        self.document,
                        end - start
                    );
                    self.warnings.push(Warning::StreamLengthMismatch {
                        document: self.document,
                        offset: start,
                        declared,
                        actual: end - start,
                    });
                }
                (end, keyword_at)
            }
        };

        self.lexer.seek(keyword_at + b"endstream".len());
        Ok(Stream::new(dict, data[start..end].to_vec()))
    }
}

/// Offset of an `endstream` keyword following `at` after optional whitespace.
fn endstream_after(data: &[u8], at: usize) -> Option<usize> {
    let keyword_at = at + data[at..].iter().take_while(|&&b| is_whitespace(b)).count();
    data[keyword_at..]
        .starts_with(b"endstream")
        .then_some(keyword_at)
}

/// First occurrence of `needle` at or after `from`.
pub fn find(data: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    data.get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|at| from + at)
}

/// Last occurrence of `needle` before `before`.
pub fn rfind(data: &[u8], before: usize, needle: &[u8]) -> Option<usize> {
    data.get(..before.min(data.len()))?
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// Drop the end-of-line marker that precedes `endstream`.
fn trim_eol_before(data: &[u8], start: usize, end: usize) -> usize {
    let mut end = end;
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    end
}
