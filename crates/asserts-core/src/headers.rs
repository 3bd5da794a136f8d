//! Assertion headers: the ordered value tree and its text syntax.
//!
//! A header block is a sequence of `name: value` lines. A line ending in `:`
//! introduces a nested value whose shape is decided by the next line:
//!
//! - indented two further spaces and starting with `-`: a list
//! - indented four further spaces: multi-line text
//! - indented two further spaces otherwise: a map of `key: value` entries
//!
//! Parsing preserves the order of entries; writing sorts map entries.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use thiserror::Error;

static HEADER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z](?:-?[a-z0-9])*$").expect("static regex"));

/// Errors from the header block syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header block is not utf8")]
    NotUtf8,

    #[error("header entry missing ':' separator: {0:?}")]
    MissingSeparator(String),

    #[error("invalid header name: {0:?}")]
    InvalidName(String),

    #[error("repeated header: {0:?}")]
    Repeated(String),

    #[error("header entry should have a space or newline (for multiline) before value: {0:?}")]
    MissingSpace(String),

    #[error("expected nested list, map or text after {0:?}")]
    MissingNested(String),

    #[error("unexpected header line: {0:?}")]
    UnexpectedLine(String),
}

/// A header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    String(String),
    List(Vec<HeaderValue>),
    Map(Headers),
}

impl HeaderValue {
    /// Build a list of string values.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(
            items
                .into_iter()
                .map(|s| Self::String(s.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HeaderValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Headers> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<HeaderValue>> for HeaderValue {
    fn from(items: Vec<HeaderValue>) -> Self {
        Self::List(items)
    }
}

impl From<Headers> for HeaderValue {
    fn from(map: Headers) -> Self {
        Self::Map(map)
    }
}

/// An ordered mapping from header names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// The value of `name` if it is present and a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name`, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry parsed from text, refusing repeats.
    fn push_unique(&mut self, name: String, value: HeaderValue) -> Result<(), HeaderError> {
        if self.contains(&name) {
            return Err(HeaderError::Repeated(name));
        }
        self.entries.push((name, value));
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<HeaderValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Parse a header block (the bytes before the first blank line).
pub fn parse_headers(head: &[u8]) -> Result<Headers, HeaderError> {
    let text = std::str::from_utf8(head).map_err(|_| HeaderError::NotUtf8)?;
    let mut parser = Parser {
        lines: text.split('\n').collect(),
        pos: 0,
    };
    let headers = parser.map(0)?;
    if let Some(line) = parser.lines.get(parser.pos) {
        return Err(HeaderError::UnexpectedLine(line.to_string()));
    }
    if headers.is_empty() {
        return Err(HeaderError::MissingSeparator(String::new()));
    }
    Ok(headers)
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

fn indented(line: &str, indent: usize) -> Option<&str> {
    let bytes = line.as_bytes();
    if bytes.len() >= indent && bytes[..indent].iter().all(|&b| b == b' ') {
        Some(&line[indent..])
    } else {
        None
    }
}

impl<'a> Parser<'a> {
    /// Entries at exactly `indent` spaces, stopping at the first line that
    /// belongs to an outer level.
    fn map(&mut self, indent: usize) -> Result<Headers, HeaderError> {
        let mut headers = Headers::new();
        while let Some(&line) = self.lines.get(self.pos) {
            let Some(rest) = indented(line, indent) else {
                break;
            };
            if rest.starts_with(' ') || rest.starts_with('-') {
                break;
            }
            let (name, after) = rest
                .split_once(':')
                .ok_or_else(|| HeaderError::MissingSeparator(line.to_string()))?;
            if !HEADER_NAME.is_match(name) {
                return Err(HeaderError::InvalidName(name.to_string()));
            }
            self.pos += 1;
            let value = self.value(after, line, indent)?;
            headers.push_unique(name.to_string(), value)?;
        }
        Ok(headers)
    }

    fn value(&mut self, after: &str, line: &str, indent: usize) -> Result<HeaderValue, HeaderError> {
        if after.is_empty() {
            return self.nested(line, indent);
        }
        match after.strip_prefix(' ') {
            Some(value) => Ok(HeaderValue::String(value.to_string())),
            None => Err(HeaderError::MissingSpace(line.to_string())),
        }
    }

    fn nested(&mut self, intro: &str, indent: usize) -> Result<HeaderValue, HeaderError> {
        let missing = || HeaderError::MissingNested(intro.to_string());
        let next = *self.lines.get(self.pos).ok_or_else(missing)?;
        match indented(next, indent + 2) {
            Some(rest) if rest.starts_with('-') => Ok(HeaderValue::List(self.list(indent + 2)?)),
            Some(rest) if rest.starts_with("  ") => Ok(HeaderValue::String(self.text(indent + 4))),
            Some(rest) if !rest.is_empty() && !rest.starts_with(' ') => {
                Ok(HeaderValue::Map(self.map(indent + 2)?))
            }
            _ => Err(missing()),
        }
    }

    fn list(&mut self, indent: usize) -> Result<Vec<HeaderValue>, HeaderError> {
        let mut items = Vec::new();
        while let Some(&line) = self.lines.get(self.pos) {
            let Some(after) = indented(line, indent).and_then(|rest| rest.strip_prefix('-')) else {
                break;
            };
            self.pos += 1;
            items.push(self.value(after, line, indent)?);
        }
        Ok(items)
    }

    fn text(&mut self, indent: usize) -> String {
        let mut lines = Vec::new();
        while let Some(rest) = self.lines.get(self.pos).and_then(|l| indented(l, indent)) {
            lines.push(rest);
            self.pos += 1;
        }
        lines.join("\n")
    }
}

/// Append one entry, preceded by a newline, in the canonical layout.
///
/// `intro` is either `name:` or a list item marker; `indent` is the column
/// of the intro. Empty lists and maps are omitted.
pub(crate) fn write_entry(buf: &mut String, intro: &str, value: &HeaderValue, indent: usize) {
    match value {
        HeaderValue::String(s) => {
            buf.push('\n');
            buf.push_str(intro);
            if s.contains('\n') {
                let prefix = " ".repeat(indent + 4);
                buf.push('\n');
                buf.push_str(&prefix);
                buf.push_str(&s.replace('\n', &format!("\n{prefix}")));
            } else {
                buf.push(' ');
                buf.push_str(s);
            }
        }
        HeaderValue::List(items) => {
            if items.is_empty() {
                return;
            }
            buf.push('\n');
            buf.push_str(intro);
            let marker = format!("{}-", " ".repeat(indent + 2));
            for item in items {
                write_entry(buf, &marker, item, indent + 2);
            }
        }
        HeaderValue::Map(map) => {
            if map.is_empty() {
                return;
            }
            buf.push('\n');
            buf.push_str(intro);
            let pad = " ".repeat(indent + 2);
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (name, value) in entries {
                write_entry(buf, &format!("{pad}{name}:"), value, indent + 2);
            }
        }
    }
}
