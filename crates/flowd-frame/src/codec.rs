use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::header::{
    canonical_header_name, is_reserved, is_valid_name, CONTENT_LENGTH, CONTENT_TYPE, PORT, TYPE,
};

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

/// Default maximum size of the header block, terminator included: 64 KiB.
pub const DEFAULT_MAX_HEADER: usize = 64 * 1024;

/// One framed message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Coarse category, e.g. `data` or `control`.
    pub frame_type: String,
    /// Subtype, e.g. `FileLine` or `PortClose`.
    pub body_type: String,
    /// Logical endpoint name.
    pub port: String,
    /// Optional MIME-like description of the body; empty when unset.
    pub content_type: String,
    /// Non-reserved headers, keyed by canonical header name.
    pub extensions: BTreeMap<String, String>,
    /// Raw body bytes.
    pub body: Bytes,
}

impl Frame {
    /// Create a frame with the given type pair and body.
    pub fn new(
        frame_type: impl Into<String>,
        body_type: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            frame_type: frame_type.into(),
            body_type: body_type.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create a `data` frame.
    pub fn data(body_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new("data", body_type, body)
    }

    /// Create a `control` frame.
    pub fn control(body_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new("control", body_type, body)
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Add an extension header; the name is stored in canonical form.
    pub fn with_extension(mut self, name: &str, value: impl Into<String>) -> Self {
        self.extensions
            .insert(canonical_header_name(name), value.into());
        self
    }

    /// Look up an extension header by case-insensitive name.
    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions
            .get(&canonical_header_name(name))
            .map(String::as_str)
    }

    /// The wire value of the `Type` header.
    pub fn type_header(&self) -> String {
        format!("{}.{}", self.frame_type, self.body_type)
    }
}

/// Limits applied while decoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted `Content-Length`. Default: 16 MiB.
    pub max_body_size: usize,
    /// Maximum header block size. Default: 64 KiB.
    pub max_header_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
            max_header_size: DEFAULT_MAX_HEADER,
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// Type: <frame_type>.<body_type>\r\n
/// Port: <port>\r\n
/// Content-Type: <content_type>\r\n
/// Content-Length: <body length>\r\n
/// <Extension-Name>: <value>\r\n     (zero or more)
/// \r\n
/// <body>
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    validate_type(&frame.frame_type, &frame.body_type)?;
    for (name, value) in &frame.extensions {
        if !is_valid_name(name) {
            return Err(FrameError::InvalidHeaderName(name.clone()));
        }
        if is_reserved(name) {
            return Err(FrameError::ReservedExtension(name.clone()));
        }
        // The decoder keys extensions by canonical name.
        if canonical_header_name(name) != *name {
            return Err(FrameError::InvalidHeaderName(name.clone()));
        }
        validate_value(name, value)?;
    }
    validate_value(PORT, &frame.port)?;
    validate_value(CONTENT_TYPE, &frame.content_type)?;

    dst.reserve(128 + frame.body.len());
    put_header(dst, TYPE, &frame.type_header());
    put_header(dst, PORT, &frame.port);
    put_header(dst, CONTENT_TYPE, &frame.content_type);
    put_header(dst, CONTENT_LENGTH, &frame.body.len().to_string());
    for (name, value) in &frame.extensions {
        put_header(dst, name, value);
    }
    dst.put_slice(b"\r\n");
    dst.put_slice(&frame.body);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes exactly the frame bytes from the buffer; anything
/// after the body stays in place for the next call.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    let head_len = match header_block_len(src) {
        Some(len) => len,
        None => {
            if src.len() > config.max_header_size {
                return Err(FrameError::HeaderTooLarge {
                    max: config.max_header_size,
                });
            }
            return Ok(None);
        }
    };
    if head_len > config.max_header_size {
        return Err(FrameError::HeaderTooLarge {
            max: config.max_header_size,
        });
    }

    let head = parse_head(&src[..head_len], config)?;
    let total = head_len + head.content_length;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(head_len);
    let body = src.split_to(head.content_length).freeze();
    Ok(Some(head.into_frame(body)))
}

/// Classify what is left in the buffer once the stream has ended.
///
/// An empty buffer is a clean close; anything else is a frame cut short.
pub(crate) fn decode_eof(src: &mut BytesMut, config: &FrameConfig) -> Result<Frame> {
    if src.is_empty() {
        return Err(FrameError::ConnectionClosed);
    }
    if let Some(frame) = decode_frame(src, config)? {
        return Ok(frame);
    }
    match header_block_len(src) {
        Some(head_len) => {
            let head = parse_head(&src[..head_len], config)?;
            Err(FrameError::TruncatedBody {
                expected: head.content_length,
                received: src.len() - head_len,
            })
        }
        None => Err(FrameError::UnexpectedEof),
    }
}

struct Head {
    frame_type: String,
    body_type: String,
    port: String,
    content_type: String,
    extensions: BTreeMap<String, String>,
    content_length: usize,
}

impl Head {
    fn into_frame(self, body: Bytes) -> Frame {
        Frame {
            frame_type: self.frame_type,
            body_type: self.body_type,
            port: self.port,
            content_type: self.content_type,
            extensions: self.extensions,
            body,
        }
    }
}

/// Length of the header block including its blank terminator line, if the
/// terminator is already buffered. Lines may end in CRLF or a bare LF.
fn header_block_len(src: &[u8]) -> Option<usize> {
    let mut start = 0;
    while let Some(offset) = src[start..].iter().position(|&b| b == b'\n') {
        let end = start + offset;
        let line = &src[start..end];
        if line.is_empty() || line == b"\r" {
            return Some(end + 1);
        }
        start = end + 1;
    }
    None
}

fn parse_head(block: &[u8], config: &FrameConfig) -> Result<Head> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut last: Option<String> = None;

    for raw in block.split(|&b| b == b'\n') {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            break;
        }
        let line = std::str::from_utf8(raw)
            .map_err(|_| FrameError::MalformedHeader(String::from_utf8_lossy(raw).into_owned()))?;

        // Obsolete line folding: continuation of the previous value.
        if line.starts_with([' ', '\t']) {
            let name = last
                .as_ref()
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            if let Some(value) = headers.get_mut(name) {
                let more = line.trim_matches([' ', '\t']);
                if !more.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(more);
                }
            }
            continue;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
        if !is_valid_name(name) {
            return Err(FrameError::MalformedHeader(line.to_string()));
        }
        let name = canonical_header_name(name);
        headers.insert(name.clone(), value.trim_matches([' ', '\t']).to_string());
        last = Some(name);
    }

    let type_value = headers
        .remove(TYPE)
        .ok_or(FrameError::MissingHeader(TYPE))?;
    let (frame_type, body_type) = type_value
        .split_once('.')
        .ok_or_else(|| FrameError::MissingTypeSeparator(type_value.clone()))?;
    if frame_type.is_empty() || body_type.is_empty() {
        return Err(FrameError::EmptyTypePart(type_value.clone()));
    }

    let length_value = headers
        .remove(CONTENT_LENGTH)
        .ok_or(FrameError::MissingHeader(CONTENT_LENGTH))?;
    let content_length = parse_content_length(&length_value)?;
    if content_length > config.max_body_size {
        return Err(FrameError::BodyTooLarge {
            size: content_length,
            max: config.max_body_size,
        });
    }

    let port = headers.remove(PORT).unwrap_or_default();
    let content_type = headers.remove(CONTENT_TYPE).unwrap_or_default();

    Ok(Head {
        frame_type: frame_type.to_string(),
        body_type: body_type.to_string(),
        port,
        content_type,
        extensions: headers,
        content_length,
    })
}

fn parse_content_length(value: &str) -> Result<usize> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::InvalidContentLength(value.to_string()));
    }
    value
        .parse()
        .map_err(|_| FrameError::InvalidContentLength(value.to_string()))
}

fn validate_type(frame_type: &str, body_type: &str) -> Result<()> {
    if frame_type.is_empty()
        || body_type.is_empty()
        || frame_type.contains('.')
        || has_edge_whitespace(frame_type)
        || has_edge_whitespace(body_type)
    {
        return Err(FrameError::InvalidType {
            frame_type: frame_type.to_string(),
            body_type: body_type.to_string(),
        });
    }
    validate_value(TYPE, frame_type)?;
    validate_value(TYPE, body_type)
}

/// The decoder trims spaces and tabs around values, so a value must not
/// carry any of its own.
fn validate_value(name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) || has_edge_whitespace(value) {
        return Err(FrameError::InvalidHeaderValue {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn has_edge_whitespace(value: &str) -> bool {
    value.starts_with([' ', '\t']) || value.ends_with([' ', '\t'])
}

fn put_header(dst: &mut BytesMut, name: &str, value: &str) {
    dst.put_slice(name.as_bytes());
    dst.put_slice(b": ");
    dst.put_slice(value.as_bytes());
    dst.put_slice(b"\r\n");
}
