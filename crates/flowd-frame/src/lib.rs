//! Self-delimiting framed messages for flow-based components.
//!
//! Every message on a pipe, file descriptor or standard stream looks like:
//! - zero or more `Name: value` header lines terminated by CRLF
//! - an empty line closing the header block
//! - exactly `Content-Length` raw body bytes
//!
//! The body is binary-safe and the reader never consumes a byte past the
//! declared length, so any number of frames can share one stream.

pub mod codec;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_BODY, DEFAULT_MAX_HEADER,
};
pub use error::{FrameError, Result};
pub use header::{canonical_header_name, is_reserved, CONTENT_LENGTH, CONTENT_TYPE, PORT, TYPE};
pub use reader::{FrameReader, Frames};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
