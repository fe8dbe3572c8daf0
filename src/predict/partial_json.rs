//! Tolerant parser for JSON text that may be cut off at any byte.
//!
//! Unclosed objects and arrays are returned with whatever members were fully
//! received. Scalars that were still streaming when the input ended (strings
//! without a closing quote, numbers at end of input, half-written literals)
//! are dropped instead of guessed, so a recovered value never contains text
//! the producer has not finished writing. Malformed input is an error.

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartialJsonError {
    #[error("empty input")]
    Empty,
    #[error("no complete value could be recovered")]
    Incomplete,
    #[error("unexpected character {found:?} at byte {position}")]
    Unexpected { found: char, position: usize },
    #[error("trailing characters at byte {0}")]
    TrailingCharacters(usize),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
    #[error("nesting deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Parse `input`, recovering the value implied by its well-formed prefix.
pub fn parse_partial(input: &str) -> Result<Value, PartialJsonError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(PartialJsonError::Empty);
    }
    match parser.value()? {
        Parsed::Complete(value) => {
            parser.skip_whitespace();
            if parser.at_end() {
                Ok(value)
            } else {
                Err(PartialJsonError::TrailingCharacters(parser.pos))
            }
        }
        Parsed::Truncated(Some(value)) => Ok(value),
        Parsed::Truncated(None) => Err(PartialJsonError::Incomplete),
    }
}

enum Parsed {
    Complete(Value),
    /// Input ended inside this value; carries the recovered container, if any.
    Truncated(Option<Value>),
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> PartialJsonError {
        let found = self.src[self.pos..].chars().next().unwrap_or('\0');
        PartialJsonError::Unexpected {
            found,
            position: self.pos,
        }
    }

    fn value(&mut self) -> Result<Parsed, PartialJsonError> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(Parsed::Truncated(None)),
            Some(b'{') => self.nested(Self::object),
            Some(b'[') => self.nested(Self::array),
            Some(b'"') => Ok(match self.string()? {
                Some(text) => Parsed::Complete(Value::String(text)),
                None => Parsed::Truncated(None),
            }),
            Some(b't') => self.literal("true", Value::Bool(true)),
            Some(b'f') => self.literal("false", Value::Bool(false)),
            Some(b'n') => self.literal("null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Parsed, PartialJsonError>,
    ) -> Result<Parsed, PartialJsonError> {
        if self.depth >= MAX_DEPTH {
            return Err(PartialJsonError::TooDeep);
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn object(&mut self) -> Result<Parsed, PartialJsonError> {
        self.pos += 1;
        let mut map = Map::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Parsed::Complete(Value::Object(map)));
        }
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
                Some(b'"') => {}
                Some(_) => return Err(self.unexpected()),
            }
            let Some(key) = self.string()? else {
                return Ok(Parsed::Truncated(Some(Value::Object(map))));
            };

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
                Some(b':') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }

            match self.value()? {
                Parsed::Complete(value) => {
                    map.insert(key, value);
                }
                Parsed::Truncated(partial) => {
                    if let Some(value) = partial {
                        map.insert(key, value);
                    }
                    return Ok(Parsed::Truncated(Some(Value::Object(map))));
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Object(map)))),
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Object(map)));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn array(&mut self) -> Result<Parsed, PartialJsonError> {
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Parsed::Complete(Value::Array(items)));
        }
        loop {
            match self.value()? {
                Parsed::Complete(value) => items.push(value),
                Parsed::Truncated(partial) => {
                    items.extend(partial);
                    return Ok(Parsed::Truncated(Some(Value::Array(items))));
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Truncated(Some(Value::Array(items)))),
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Array(items)));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    /// Returns `None` when the input ends before the closing quote.
    fn string(&mut self) -> Result<Option<String>, PartialJsonError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let run_start = self.pos;
            while let Some(byte) = self.peek() {
                if byte == b'"' || byte == b'\\' {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&self.src[run_start..self.pos]);

            match self.peek() {
                None => return Ok(None),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(Some(out));
                }
                Some(_) => {
                    let escape_at = self.pos;
                    self.pos += 1;
                    let Some(escaped) = self.peek() else {
                        return Ok(None);
                    };
                    self.pos += 1;
                    match escaped {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'b' => out.push('\u{0008}'),
                        b'f' => out.push('\u{000C}'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'u' => match self.unicode_escape(escape_at)? {
                            Some(ch) => out.push(ch),
                            None => return Ok(None),
                        },
                        _ => return Err(PartialJsonError::InvalidEscape(escape_at)),
                    }
                }
            }
        }
    }

    /// Decodes the code point after `\u`, including surrogate pairs.
    fn unicode_escape(&mut self, escape_at: usize) -> Result<Option<char>, PartialJsonError> {
        let Some(high) = self.hex4(escape_at)? else {
            return Ok(None);
        };
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high)
                .map(Some)
                .ok_or(PartialJsonError::InvalidEscape(escape_at));
        }

        match (self.peek(), self.bytes.get(self.pos + 1).copied()) {
            (None, _) | (Some(b'\\'), None) => return Ok(None),
            (Some(b'\\'), Some(b'u')) => self.pos += 2,
            _ => return Err(PartialJsonError::InvalidEscape(escape_at)),
        }
        let Some(low) = self.hex4(escape_at)? else {
            return Ok(None);
        };
        if !(0xDC00..0xE000).contains(&low) {
            return Err(PartialJsonError::InvalidEscape(escape_at));
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code)
            .map(Some)
            .ok_or(PartialJsonError::InvalidEscape(escape_at))
    }

    fn hex4(&mut self, escape_at: usize) -> Result<Option<u32>, PartialJsonError> {
        let end = self.pos + 4;
        if end > self.bytes.len() {
            let tail = &self.bytes[self.pos..];
            if tail.iter().all(u8::is_ascii_hexdigit) {
                self.pos = self.bytes.len();
                return Ok(None);
            }
            return Err(PartialJsonError::InvalidEscape(escape_at));
        }
        let digits = &self.src[self.pos..end];
        let code = u32::from_str_radix(digits, 16)
            .map_err(|_| PartialJsonError::InvalidEscape(escape_at))?;
        self.pos = end;
        Ok(Some(code))
    }

    fn literal(&mut self, word: &'static str, value: Value) -> Result<Parsed, PartialJsonError> {
        let rest = &self.bytes[self.pos..];
        let expected = word.as_bytes();
        if rest.len() < expected.len() {
            if expected.starts_with(rest) {
                self.pos = self.bytes.len();
                return Ok(Parsed::Truncated(None));
            }
            return Err(self.unexpected());
        }
        if &rest[..expected.len()] == expected {
            self.pos += expected.len();
            Ok(Parsed::Complete(value))
        } else {
            Err(self.unexpected())
        }
    }

    fn number(&mut self) -> Result<Parsed, PartialJsonError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.pos += 1;
        }
        if self.at_end() {
            // More digits may still be on their way.
            return Ok(Parsed::Truncated(None));
        }
        let text = &self.src[start..self.pos];
        serde_json::from_str::<Number>(text)
            .map(|number| Parsed::Complete(Value::Number(number)))
            .map_err(|_| PartialJsonError::InvalidNumber(text.to_string()))
    }
}
