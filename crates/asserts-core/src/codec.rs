//! Text encoding of assertions.
//!
//! An encoded assertion is its content, a blank line and the signature. The
//! content is the header block, optionally followed by a blank line and the
//! body:
//!
//! ```text
//! type: account
//! authority-id: canonical
//! ...
//! sign-key-sha3-384: <key id>
//!
//! <signature>
//! ```
//!
//! [`Decoder`] and [`Encoder`] handle streams of assertions separated by
//! blank lines, using `body-length` to delimit bodies.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use bytes::Bytes;

use crate::assertion::{Assertion, AssertionType};
use crate::checks::{check_int_with_default, check_not_empty_string};
use crate::error::{DecodeError, Result};
use crate::headers::{parse_headers, Headers};
use crate::registry::{standard_registry, TypeRegistry};

const NL: &[u8] = b"\n";
const NLNL: &[u8] = b"\n\n";

fn find_first(data: &[u8], pat: &[u8]) -> Option<usize> {
    data.windows(pat.len()).position(|w| w == pat)
}

fn find_last(data: &[u8], pat: &[u8]) -> Option<usize> {
    data.windows(pat.len()).rposition(|w| w == pat)
}

/// Decode one assertion using the standard types.
pub fn decode(data: &[u8]) -> Result<Assertion> {
    decode_with(data, standard_registry())
}

/// Decode one assertion using the types of `registry`.
pub fn decode_with(data: &[u8], registry: &TypeRegistry) -> Result<Assertion> {
    let split = find_last(data, NLNL).ok_or(DecodeError::MissingSignatureSeparator)?;
    let content = &data[..split];
    let signature = &data[split + 2..];
    if signature.is_empty() {
        return Err(DecodeError::EmptySignature);
    }

    let (head, body) = match find_first(content, NLNL) {
        Some(i) => (&content[..i], &content[i + 2..]),
        None => (content, &[][..]),
    };
    let headers = parse_headers(head)?;

    registry.assemble(
        headers,
        Bytes::copy_from_slice(body),
        Bytes::copy_from_slice(content),
        Bytes::copy_from_slice(signature),
        None,
    )
}

/// Encode an assertion. The inverse of [`decode`].
pub fn encode(assertion: &Assertion) -> Vec<u8> {
    assertion.encode()
}

/// Reads a stream of assertions.
///
/// Assertions are separated by one or more blank lines. A trailing newline
/// after a signature belongs to the separator, not to the signature.
pub struct Decoder<'r, R> {
    reader: R,
    registry: &'r TypeRegistry,
    max_body_sizes: HashMap<AssertionType, usize>,
    done: bool,
}

impl<R: BufRead> Decoder<'static, R> {
    pub fn new(reader: R) -> Self {
        Self::with_registry(reader, standard_registry())
    }
}

impl<'r, R: BufRead> Decoder<'r, R> {
    pub fn with_registry(reader: R, registry: &'r TypeRegistry) -> Self {
        Self {
            reader,
            registry,
            max_body_sizes: HashMap::new(),
            done: false,
        }
    }

    /// Bound the body size of the given types, overriding the registry.
    pub fn with_type_max_body_size(mut self, sizes: HashMap<AssertionType, usize>) -> Self {
        self.max_body_sizes.extend(sizes);
        self
    }

    /// Read the next assertion; `Ok(None)` at the end of the stream.
    pub fn decode_next(&mut self) -> Result<Option<Assertion>> {
        let Some(head) = self.read_head()? else {
            return Ok(None);
        };
        let headers = parse_headers(&head)?;

        let length = check_int_with_default(&headers, "body-length", 0).map_err(DecodeError::Generic)?;
        let length = usize::try_from(length).map_err(|_| DecodeError::BodyLengthMismatch {
            actual: 0,
            declared: length,
        })?;
        // The body is read only once its type bounds it.
        let (max, type_name) = self.limit_for(&headers)?;
        if length > max {
            return Err(DecodeError::BodyTooLarge {
                length,
                max,
                type_name,
            });
        }

        let mut content = head;
        let mut body = Vec::new();
        if length > 0 {
            body = vec![0u8; length];
            self.reader
                .read_exact(&mut body)
                .map_err(|_| DecodeError::UnexpectedEof("body"))?;
            let mut sep = [0u8; 2];
            self.reader
                .read_exact(&mut sep)
                .map_err(|_| DecodeError::UnexpectedEof("body"))?;
            if sep != NLNL {
                return Err(DecodeError::MissingSignatureSeparator);
            }
            content.extend_from_slice(NLNL);
            content.extend_from_slice(&body);
        }

        let signature = self.read_signature()?;
        if signature.is_empty() {
            return Err(DecodeError::EmptySignature);
        }

        self.registry
            .assemble(
                headers,
                Bytes::from(body),
                Bytes::from(content),
                Bytes::from(signature),
                Some(max),
            )
            .map(Some)
    }

    fn limit_for(&self, headers: &Headers) -> Result<(usize, &'static str)> {
        let name = check_not_empty_string(headers, "type").map_err(DecodeError::Generic)?;
        let descriptor = self
            .registry
            .lookup(name)
            .ok_or_else(|| DecodeError::UnknownType(name.to_string()))?;
        let max = self
            .max_body_sizes
            .get(&descriptor.kind)
            .copied()
            .unwrap_or(descriptor.max_body_size);
        Ok((max, descriptor.name()))
    }

    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        self.reader
            .read_until(b'\n', buf)
            .map_err(|e| DecodeError::Io(e.to_string()))
    }

    /// The header block without its terminating blank line, skipping leading
    /// blank lines.
    fn read_head(&mut self) -> Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }
        let mut head = Vec::new();
        loop {
            let start = head.len();
            if self.read_line(&mut head)? == 0 {
                if head.is_empty() {
                    self.done = true;
                    return Ok(None);
                }
                return Err(DecodeError::UnexpectedEof("header block"));
            }
            if &head[start..] == NL {
                head.truncate(start);
                if head.is_empty() {
                    continue;
                }
                head.pop();
                return Ok(Some(head));
            }
        }
    }

    /// Signature lines up to a blank line or the end of the stream.
    fn read_signature(&mut self) -> Result<Vec<u8>> {
        let mut signature = Vec::new();
        loop {
            let start = signature.len();
            let n = self.read_line(&mut signature)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if &signature[start..] == NL {
                signature.truncate(start);
                break;
            }
        }
        if signature.ends_with(NL) {
            signature.pop();
        }
        Ok(signature)
    }
}

impl<R: BufRead> Iterator for Decoder<'_, R> {
    type Item = Result<Assertion>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.decode_next() {
            Ok(Some(assertion)) => Some(Ok(assertion)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Writes a stream of assertions readable by [`Decoder`].
pub struct Encoder<W> {
    writer: W,
    started: bool,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            started: false,
        }
    }

    pub fn encode(&mut self, assertion: &Assertion) -> std::io::Result<()> {
        self.append(&assertion.encode())
    }

    /// Write an already encoded assertion.
    pub fn append(&mut self, encoded: &[u8]) -> std::io::Result<()> {
        if self.started {
            self.writer.write_all(NL)?;
        }
        self.writer.write_all(encoded)?;
        if !encoded.ends_with(NL) {
            self.writer.write_all(NL)?;
        }
        self.started = true;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::registry::DEFAULT_MAX_BODY_SIZE;
    use crate::types::testutil::SIGN_KEY_ID;

    fn repair_text(body: &str) -> String {
        let mut text = format!(
            "type: repair\n\
             authority-id: acme\n\
             brand-id: acme\n\
             repair-id: 7\n\
             summary: a repair\n\
             timestamp: 2017-03-30T12:22:16Z\n\
             sign-key-sha3-384: {SIGN_KEY_ID}"
        );
        if !body.is_empty() {
            text = format!("{text}\nbody-length: {}\n\n{body}", body.len());
        }
        text + "\n\nAXNpZw=="
    }

    #[test]
    fn test_decode_encode_exact() {
        for body in ["", "script\n", "two\n\nparagraphs"] {
            let text = repair_text(body);
            let doc = decode(text.as_bytes()).unwrap();
            assert_eq!(&doc.body()[..], body.as_bytes());
            assert_eq!(&doc.signature()[..], b"AXNpZw==");
            assert_eq!(encode(&doc), text.as_bytes());
        }
    }

    #[test]
    fn test_decode_errors() {
        let cases: Vec<(String, &str)> = vec![
            ("type: repair".into(), "assertion content/signature separator not found"),
            ("type: repair\n\n".into(), "empty assertion signature"),
            ("Type: repair\n\nsig".into(), r#"parsing assertion headers: invalid header name: "Type""#),
            (
                format!("series: 16\nsign-key-sha3-384: {SIGN_KEY_ID}\n\nsig"),
                r#"assertion: "type" header is mandatory"#,
            ),
            (
                format!("type: snap-build\nsign-key-sha3-384: {SIGN_KEY_ID}\n\nsig"),
                r#"unknown assertion type: "snap-build""#,
            ),
            (
                "type: repair\nbody-length: 5\n\nabc\n\nsig".into(),
                "assertion body length and declared body-length don't match: 3 != 5",
            ),
            (
                "type: repair\nsign-key-sha3-384: abc\n\nsig".into(),
                r#"assertion: "sign-key-sha3-384" header does not have the expected bit length: 16"#,
            ),
            (
                repair_text("").replace("repair-id: 7", "repair-id: 7\nrevision: -1"),
                r#"assertion: "revision" header must be >=0: -1"#,
            ),
            (
                repair_text("").replace("authority-id: acme\n", ""),
                r#"assertion: "authority-id" header is mandatory"#,
            ),
        ];
        for (text, expected) in cases {
            let err = decode(text.as_bytes()).unwrap_err();
            assert_eq!(err.to_string(), expected, "{text:?}");
        }
    }

    #[test]
    fn test_registry_max_body_size() {
        let registry = TypeRegistry::standard().with_max_body_size(AssertionType::Repair, 4);
        let err = decode_with(repair_text("script\n").as_bytes(), &registry).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"assertion body length 7 exceeds maximum body size 4 for "repair" assertions"#
        );
        assert!(decode_with(repair_text("ok").as_bytes(), &registry).is_ok());
    }

    #[test]
    fn test_stream_roundtrip() {
        let docs: Vec<_> = ["", "script\n", "x"]
            .iter()
            .map(|body| decode(repair_text(body).as_bytes()).unwrap())
            .collect();

        let mut encoder = Encoder::new(Vec::new());
        for doc in &docs {
            encoder.encode(doc).unwrap();
        }
        let stream = encoder.into_inner();

        let decoded: Vec<_> = Decoder::new(Cursor::new(stream))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, docs);
    }

    #[test]
    fn test_stream_skips_blank_lines() {
        let text = format!("\n\n{}\n\n\n{}\n", repair_text(""), repair_text("abc"));
        let decoded: Vec<_> = Decoder::new(Cursor::new(text))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(&decoded[1].body()[..], b"abc");
    }

    #[test]
    fn test_stream_errors() {
        let mut sizes = HashMap::new();
        sizes.insert(AssertionType::Repair, 4);
        let mut decoder = Decoder::new(Cursor::new(repair_text("script\n")))
            .with_type_max_body_size(sizes);
        let err = decoder.next().unwrap().unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"assertion body length 7 exceeds maximum body size 4 for "repair" assertions"#
        );
        assert!(decoder.next().is_none());

        let truncated = "type: repair\nbody-length: 10\n\nabc";
        let err = Decoder::new(Cursor::new(truncated)).next().unwrap().unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEof("body"));

        let err = Decoder::new(Cursor::new("type: repair\n")).next().unwrap().unwrap_err();
        assert_eq!(err, DecodeError::UnexpectedEof("header block"));

        assert!(Decoder::new(Cursor::new("\n\n")).next().is_none());
    }

    #[test]
    fn test_stream_bounds_body_before_reading() {
        let huge = "body-length: 4000000000000\n\nabc\n\nsig\n";

        let err = Decoder::new(Cursor::new(format!("type: bogus\n{huge}")))
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err, DecodeError::UnknownType("bogus".into()));

        let err = Decoder::new(Cursor::new(format!("series: 16\n{huge}")))
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.to_string(), r#"assertion: "type" header is mandatory"#);

        let err = Decoder::new(Cursor::new(format!("type: repair\n{huge}")))
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                r#"assertion body length 4000000000000 exceeds maximum body size {DEFAULT_MAX_BODY_SIZE} for "repair" assertions"#
            )
        );
    }
}
