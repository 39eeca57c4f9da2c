/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A required header is absent from the header block.
    #[error("missing {0} header field")]
    MissingHeader(&'static str),

    /// The `Type` header has no `.` between category and subtype.
    #[error("missing separator in Type header field: {0:?}")]
    MissingTypeSeparator(String),

    /// A received `Type` header has an empty category or subtype.
    #[error("empty category or subtype in Type header field: {0:?}")]
    EmptyTypePart(String),

    /// An outgoing frame's category or subtype is empty, padded with
    /// whitespace, or the category itself contains a `.`.
    #[error("invalid frame type {frame_type:?}.{body_type:?}")]
    InvalidType {
        frame_type: String,
        body_type: String,
    },

    /// `Content-Length` is not a non-negative decimal integer.
    #[error("invalid Content-Length header value: {0:?}")]
    InvalidContentLength(String),

    /// A header line has no `:` or an unusable name.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The header block grew past the configured bound without terminating.
    #[error("header block too large (more than {max} bytes)")]
    HeaderTooLarge { max: usize },

    /// The declared body exceeds the configured maximum.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The stream ended before the declared body was complete.
    #[error("short read: got {received} of {expected} body bytes")]
    TruncatedBody { expected: usize, received: usize },

    /// The stream ended inside the header block.
    #[error("unexpected end of stream inside frame header")]
    UnexpectedEof,

    /// An extension header name cannot be written on the wire, or is not
    /// in canonical form.
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    /// A header value contains a line break or starts or ends with
    /// whitespace.
    #[error("invalid value for header {name}: line breaks and edge whitespace are not allowed")]
    InvalidHeaderValue { name: String },

    /// An extension uses one of the reserved header names.
    #[error("extension header {0:?} collides with a reserved header")]
    ReservedExtension(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for the clean end-of-stream signal, which is not a failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, FrameError::ConnectionClosed)
    }

    /// True for errors raised while parsing incoming bytes.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            FrameError::MissingHeader(_)
                | FrameError::MissingTypeSeparator(_)
                | FrameError::EmptyTypePart(_)
                | FrameError::InvalidContentLength(_)
                | FrameError::MalformedHeader(_)
                | FrameError::HeaderTooLarge { .. }
                | FrameError::BodyTooLarge { .. }
                | FrameError::TruncatedBody { .. }
                | FrameError::UnexpectedEof
        )
    }

    /// True for errors raised while validating or writing an outgoing frame.
    pub fn is_marshal_error(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidType { .. }
                | FrameError::InvalidHeaderName(_)
                | FrameError::InvalidHeaderValue { .. }
                | FrameError::ReservedExtension(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
