use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame};
use crate::error::{FrameError, Result};

/// Room for a header block plus a short body.
const ENCODE_BUFFER_CAPACITY: usize = 8 * 1024;

/// Frame sender for one outport: a FIFO, a file or a standard stream.
///
/// A frame is encoded in full before the first byte goes out, so an invalid
/// frame never leaves a partial message on the pipe. Each frame is flushed
/// before `write_frame` returns.
pub struct FrameWriter<T> {
    inner: T,
    encoded: BytesMut,
    sent: u64,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            encoded: BytesMut::with_capacity(ENCODE_BUFFER_CAPACITY),
            sent: 0,
        }
    }

    /// Encode `frame` and block until all of it is written and flushed.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.encoded.clear();
        encode_frame(frame, &mut self.encoded)?;
        send_all(&mut self.inner, &self.encoded)?;
        self.sent += 1;

        tracing::trace!(
            frame_type = %frame.frame_type,
            body_type = %frame.body_type,
            port = %frame.port,
            len = frame.body.len(),
            "frame written"
        );
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(e) if retryable(e.kind()) => continue,
                Err(e) => return Err(FrameError::Io(e)),
            }
        }
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.sent
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn send_all<T: Write>(out: &mut T, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        match out.write(bytes) {
            // The reading side is gone.
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => bytes = &bytes[n..],
            Err(e) if retryable(e.kind()) => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(())
}

fn retryable(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::Interrupted | ErrorKind::WouldBlock)
}
