//! Reserved header names and header-name canonicalization.
//!
//! Header names are case-insensitive on input. On output, and as keys of
//! [`Frame::extensions`](crate::Frame::extensions), they use the canonical
//! MIME form: first letter and every letter after a `-` upper-case, the
//! rest lower-case (`content-length` becomes `Content-Length`).

/// Frame category and subtype, joined by `.` (`data.FileLine`).
pub const TYPE: &str = "Type";

/// Logical endpoint name.
pub const PORT: &str = "Port";

/// Optional MIME-like body description.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Exact body length in bytes, decimal.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Names that never appear as extension headers.
pub const RESERVED: [&str; 4] = [TYPE, PORT, CONTENT_TYPE, CONTENT_LENGTH];

/// Returns true if `name` is one of the reserved headers, ignoring case.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Returns true if `name` is a non-empty RFC 7230 token.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_token_byte)
}

/// Canonical form of a header name.
///
/// Names containing bytes outside the token alphabet are returned unchanged.
pub fn canonical_header_name(name: &str) -> String {
    if !is_valid_name(name) {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
