//! PHP literal reader
//!
//! Parses the right-hand side of a PHP assignment as plain data. Only
//! literals are accepted: `array(...)` / `[...]` with optional `key =>`
//! entries, single and double quoted strings, integers, floats, `true`,
//! `false` and `null`. Anything else (function calls, constants,
//! concatenation, variable interpolation) is rejected, so nothing in the
//! source is ever evaluated.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as JsonValue};

/// Deepest array nesting accepted
const MAX_DEPTH: usize = 64;

/// Array key. PHP normalizes decimal-integer string keys to integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhpKey {
    Int(i64),
    Str(String),
}

impl PhpKey {
    fn from_string(s: String) -> Self {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => PhpKey::Int(n),
            _ => PhpKey::Str(s),
        }
    }
}

impl std::fmt::Display for PhpKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhpKey::Int(n) => write!(f, "{}", n),
            PhpKey::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Ordered map, as PHP arrays preserve insertion order
    Array(IndexMap<PhpKey, PhpValue>),
}

impl PhpValue {
    /// Convert into JSON the way `json_encode` would: arrays keyed
    /// `0..n` in order become lists, every other array becomes an object.
    pub fn into_json(self) -> JsonValue {
        match self {
            PhpValue::Null => JsonValue::Null,
            PhpValue::Bool(b) => JsonValue::Bool(b),
            PhpValue::Int(n) => JsonValue::Number(n.into()),
            PhpValue::Float(f) => Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            PhpValue::Str(s) => JsonValue::String(s),
            PhpValue::Array(entries) => {
                let is_list = entries
                    .keys()
                    .enumerate()
                    .all(|(i, key)| *key == PhpKey::Int(i as i64));
                if is_list {
                    JsonValue::Array(entries.into_values().map(PhpValue::into_json).collect())
                } else {
                    let object: Map<String, JsonValue> = entries
                        .into_iter()
                        .map(|(key, value)| (key.to_string(), value.into_json()))
                        .collect();
                    JsonValue::Object(object)
                }
            }
        }
    }
}

/// Error type for literal parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhpLiteralError {
    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Unexpected character '{found}' at byte {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Unsupported expression at byte {position}: {found}")]
    Unsupported { found: String, position: usize },

    #[error("Invalid number at byte {position}: {text}")]
    InvalidNumber { text: String, position: usize },

    #[error("Invalid array key at byte {position}")]
    InvalidKey { position: usize },

    #[error("Arrays nested deeper than {} levels at byte {position}", MAX_DEPTH)]
    TooDeep { position: usize },
}

/// Parse a complete literal. Only whitespace, comments and an optional
/// `;` may follow it.
#[cfg(test)]
pub(crate) fn parse_literal(source: &str) -> Result<PhpValue, PhpLiteralError> {
    let mut parser = LiteralParser::new(source, 0);
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.peek() == Some(';') {
        parser.bump();
        parser.skip_trivia()?;
    }
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(PhpLiteralError::UnexpectedChar {
            found,
            position: parser.pos,
        }),
    }
}

pub(crate) struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    pub(crate) fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos, depth: 0 }
    }

    /// Advance past the first `$<variable> =` that is real code, skipping
    /// comments and string literals. Returns `false` if there is none.
    pub(crate) fn seek_assignment(&mut self, variable: &str) -> Result<bool, PhpLiteralError> {
        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Ok(false),
                Some(quote @ ('\'' | '"' | '`')) => self.skip_quoted(quote)?,
                Some('$') => {
                    self.bump();
                    let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    if name != variable {
                        continue;
                    }
                    self.skip_trivia()?;
                    let rest = self.rest();
                    if rest.starts_with('=') && !rest.starts_with("==") && !rest.starts_with("=>") {
                        self.bump();
                        return Ok(true);
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Skip a quoted string without interpreting it
    fn skip_quoted(&mut self, quote: char) -> Result<(), PhpLiteralError> {
        self.bump();
        loop {
            match self.bump() {
                None => return Err(PhpLiteralError::UnexpectedEof),
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), PhpLiteralError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(PhpLiteralError::UnexpectedChar {
                found,
                position: self.pos,
            }),
            None => Err(PhpLiteralError::UnexpectedEof),
        }
    }

    /// Consume the `;` terminating an assignment statement.
    pub(crate) fn expect_statement_end(&mut self) -> Result<(), PhpLiteralError> {
        self.skip_trivia()?;
        self.expect(';')
    }

    /// Skip whitespace and `//`, `#`, `/* */` comments
    fn skip_trivia(&mut self) -> Result<(), PhpLiteralError> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") || trimmed.starts_with('#') {
                match trimmed.find('\n') {
                    Some(end) => self.pos += end + 1,
                    None => self.pos = self.src.len(),
                }
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                let end = body.find("*/").ok_or(PhpLiteralError::UnexpectedEof)?;
                self.pos += 2 + end + 2;
            } else {
                return Ok(());
            }
        }
    }

    pub(crate) fn parse_value(&mut self) -> Result<PhpValue, PhpLiteralError> {
        self.skip_trivia()?;
        let position = self.pos;
        match self.peek() {
            None => Err(PhpLiteralError::UnexpectedEof),
            Some('\'') => self.parse_single_quoted().map(PhpValue::Str),
            Some('"') => self.parse_double_quoted().map(PhpValue::Str),
            Some('[') => {
                self.bump();
                self.parse_array(']')
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                match ident.to_ascii_lowercase().as_str() {
                    "array" => {
                        self.skip_trivia()?;
                        self.expect('(')?;
                        self.parse_array(')')
                    }
                    "true" => Ok(PhpValue::Bool(true)),
                    "false" => Ok(PhpValue::Bool(false)),
                    "null" => Ok(PhpValue::Null),
                    _ => Err(PhpLiteralError::Unsupported {
                        found: ident.to_string(),
                        position,
                    }),
                }
            }
            Some(found) => Err(PhpLiteralError::UnexpectedChar { found, position }),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn parse_array(&mut self, close: char) -> Result<PhpValue, PhpLiteralError> {
        if self.depth >= MAX_DEPTH {
            return Err(PhpLiteralError::TooDeep { position: self.pos });
        }
        self.depth += 1;
        let result = self.parse_array_entries(close);
        self.depth -= 1;
        result
    }

    fn parse_array_entries(&mut self, close: char) -> Result<PhpValue, PhpLiteralError> {
        let mut entries = IndexMap::new();
        let mut next_index: i64 = 0;

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(close) {
                self.bump();
                break;
            }

            let key_position = self.pos;
            let first = self.parse_value()?;
            self.skip_trivia()?;

            if self.rest().starts_with("=>") {
                self.pos += 2;
                let key = Self::to_key(first, key_position)?;
                let value = self.parse_value()?;
                if let PhpKey::Int(n) = key
                    && n >= next_index
                {
                    next_index = n + 1;
                }
                entries.insert(key, value);
            } else {
                entries.insert(PhpKey::Int(next_index), first);
                next_index += 1;
            }

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {
                    self.bump();
                    break;
                }
                Some(found) => {
                    return Err(PhpLiteralError::UnexpectedChar {
                        found,
                        position: self.pos,
                    });
                }
                None => return Err(PhpLiteralError::UnexpectedEof),
            }
        }

        Ok(PhpValue::Array(entries))
    }

    fn to_key(value: PhpValue, position: usize) -> Result<PhpKey, PhpLiteralError> {
        match value {
            PhpValue::Int(n) => Ok(PhpKey::Int(n)),
            PhpValue::Str(s) => Ok(PhpKey::from_string(s)),
            PhpValue::Bool(b) => Ok(PhpKey::Int(i64::from(b))),
            PhpValue::Null => Ok(PhpKey::Str(String::new())),
            PhpValue::Float(_) | PhpValue::Array(_) => Err(PhpLiteralError::InvalidKey { position }),
        }
    }

    fn parse_single_quoted(&mut self) -> Result<String, PhpLiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(PhpLiteralError::UnexpectedEof),
                Some('\'') => return Ok(out),
                Some('\\') => match self.peek() {
                    Some(c @ ('\'' | '\\')) => {
                        self.bump();
                        out.push(c);
                    }
                    _ => out.push('\\'),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_double_quoted(&mut self) -> Result<String, PhpLiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            let position = self.pos;
            match self.bump() {
                None => return Err(PhpLiteralError::UnexpectedEof),
                Some('"') => return Ok(out),
                Some('$') => {
                    if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '{')
                    {
                        return Err(PhpLiteralError::Unsupported {
                            found: "variable interpolation".to_string(),
                            position,
                        });
                    }
                    out.push('$');
                }
                Some('{') if self.peek() == Some('$') => {
                    return Err(PhpLiteralError::Unsupported {
                        found: "variable interpolation".to_string(),
                        position,
                    });
                }
                Some('\\') => {
                    let escaped = match self.peek() {
                        Some('n') => Some('\n'),
                        Some('t') => Some('\t'),
                        Some('r') => Some('\r'),
                        Some('v') => Some('\x0B'),
                        Some('e') => Some('\x1B'),
                        Some('f') => Some('\x0C'),
                        Some('0') => Some('\0'),
                        Some(c @ ('\\' | '$' | '"')) => Some(c),
                        _ => None,
                    };
                    match escaped {
                        Some(c) => {
                            self.bump();
                            out.push(c);
                        }
                        None => out.push('\\'),
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Result<PhpValue, PhpLiteralError> {
        let position = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };
        self.skip_trivia()?;

        let start = self.pos;
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-') && (prev == 'e' || prev == 'E');
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.bump();
                prev = c;
            } else {
                break;
            }
        }

        let raw = &self.src[start..self.pos];
        let text: String = raw.chars().filter(|&c| c != '_').collect();
        let invalid = || PhpLiteralError::InvalidNumber {
            text: raw.to_string(),
            position,
        };

        let lower = text.to_ascii_lowercase();
        let radix_digits = [("0x", 16), ("0b", 2), ("0o", 8)]
            .into_iter()
            .find_map(|(prefix, radix)| lower.strip_prefix(prefix).map(|digits| (digits, radix)));

        let magnitude = if let Some((digits, radix)) = radix_digits {
            PhpValue::Int(i64::from_str_radix(digits, radix).map_err(|_| invalid())?)
        } else if lower.contains(['.', 'e']) {
            PhpValue::Float(lower.parse::<f64>().map_err(|_| invalid())?)
        } else if lower.len() > 1 && lower.starts_with('0') {
            PhpValue::Int(i64::from_str_radix(&lower[1..], 8).map_err(|_| invalid())?)
        } else {
            PhpValue::Int(lower.parse::<i64>().map_err(|_| invalid())?)
        };

        Ok(match (magnitude, negative) {
            (PhpValue::Int(n), true) => PhpValue::Int(-n),
            (PhpValue::Float(f), true) => PhpValue::Float(-f),
            (value, _) => value,
        })
    }
}
