use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_eof, decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Bytes requested from the stream per read call.
const FILL_SIZE: usize = 8 * 1024;

/// Frame receiver for one inport.
///
/// Never hands out a frame before its whole body has arrived. Bytes past
/// the end of a frame stay buffered, so frames may straddle reads freely.
pub struct FrameReader<T> {
    inner: T,
    pending: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Reader enforcing the header and body limits in `config`.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(FILL_SIZE),
            config,
        }
    }

    /// Block until the next frame is complete.
    ///
    /// A stream that ends exactly between frames gives
    /// [`FrameError::ConnectionClosed`]; one that ends inside a frame gives
    /// [`FrameError::TruncatedBody`] or [`FrameError::UnexpectedEof`].
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.pending, &self.config)? {
                return Ok(frame);
            }
            if self.fill()? == 0 {
                return decode_eof(&mut self.pending, &self.config);
            }
        }
    }

    /// Append one read's worth of bytes to the pending buffer.
    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; FILL_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FrameError::Io(e)),
            }
        }
    }

    /// Frames until the stream closes cleanly.
    pub fn frames(&mut self) -> Frames<'_, T> {
        Frames {
            reader: self,
            done: false,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Drops bytes already read past the last frame; see
    /// [`FrameReader::into_parts`].
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// The stream plus the bytes read past the last returned frame.
    pub fn into_parts(self) -> (T, BytesMut) {
        (self.inner, self.pending)
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Iterator returned by [`FrameReader::frames`].
///
/// Ends on clean end of stream. Yields at most one error, then ends.
pub struct Frames<'a, T> {
    reader: &'a mut FrameReader<T>,
    done: bool,
}

impl<T: Read> Iterator for Frames<'_, T> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = self.reader.read_frame();
        self.done = next.is_err();
        match next {
            Err(e) if e.is_end_of_stream() => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_frame;
    use crate::writer::FrameWriter;

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            encode_frame(frame, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    /// Replays a fixed sequence of read results, then reports end of stream.
    struct ScriptedStream {
        steps: VecDeque<std::io::Result<Vec<u8>>>,
    }

    impl ScriptedStream {
        fn byte_by_byte(bytes: &[u8]) -> Self {
            Self {
                steps: bytes.iter().map(|b| Ok(vec![*b])).collect(),
            }
        }

        fn failing_first(kind: ErrorKind, bytes: Vec<u8>) -> Self {
            Self {
                steps: VecDeque::from([Err(kind.into()), Ok(bytes)]),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    #[test]
    fn reads_frame_addressed_to_inport() {
        let bytes = wire(&[Frame::data("FileLine", "hello").with_port("IN")]);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.type_header(), "data.FileLine");
        assert_eq!(frame.port, "IN");
        assert_eq!(frame.body.as_ref(), b"hello");
    }

    #[test]
    fn back_to_back_frames_then_close() {
        let bytes = wire(&[
            Frame::data("A", "one"),
            Frame::data("B", "two"),
            Frame::control("PortClose", ""),
        ]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let types: Vec<String> = (0..3)
            .map(|_| reader.read_frame().unwrap().type_header())
            .collect();
        assert_eq!(types, ["data.A", "data.B", "control.PortClose"]);
        assert!(reader.read_frame().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn body_larger_than_one_fill() {
        let body = vec![0xAB; 5 * FILL_SIZE + 17];
        let bytes = wire(&[Frame::data("Blob", body.clone())]);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_frame().unwrap().body.as_ref(), body.as_slice());
    }

    #[test]
    fn frame_trickling_in_one_byte_at_a_time() {
        let bytes = wire(&[Frame::data("Slow", "a\r\n\r\nb").with_extension("X-K", "v")]);
        let mut reader = FrameReader::new(ScriptedStream::byte_by_byte(&bytes));

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.body.as_ref(), b"a\r\n\r\nb");
        assert_eq!(frame.extension("x-k"), Some("v"));
    }

    #[test]
    fn empty_stream_is_clean_close() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn stream_ends_mid_body() {
        let bytes = b"Type: data.X\r\nContent-Length: 10\r\n\r\nabc".to_vec();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedBody {
                expected: 10,
                received: 3
            }
        ));
        assert!(err.is_parse_error());
    }

    #[test]
    fn stream_ends_mid_header() {
        let mut reader = FrameReader::new(Cursor::new(b"Type: data.X\r\nCont".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::UnexpectedEof));
    }

    #[test]
    fn missing_type_is_reported() {
        let mut reader = FrameReader::new(Cursor::new(b"Port: IN\r\nContent-Length: 0\r\n\r\n".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::MissingHeader("Type")));
    }

    #[test]
    fn frames_end_at_clean_close() {
        let bytes = wire(&[Frame::data("A", "1"), Frame::data("A", "2")]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let bodies: Vec<Vec<u8>> = reader.frames().map(|f| f.unwrap().body.to_vec()).collect();
        assert_eq!(bodies, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn frames_stop_after_first_error() {
        let mut bytes = wire(&[Frame::data("A", "1")]);
        bytes.extend_from_slice(b"Type: broken\r\nContent-Length: 0\r\n\r\n");
        bytes.extend_from_slice(&wire(&[Frame::data("A", "never")]));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let items: Vec<_> = reader.frames().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(FrameError::MissingTypeSeparator(_))));
    }

    #[test]
    fn into_parts_keeps_unread_bytes() {
        let mut bytes = wire(&[Frame::data("A", "1")]);
        bytes.extend_from_slice(b"trailing");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        reader.read_frame().unwrap();

        let (_, rest) = reader.into_parts();
        assert_eq!(rest.as_ref(), b"trailing");
    }

    #[test]
    fn interrupted_read_is_retried() {
        let bytes = wire(&[Frame::data("A", "ok")]);
        let mut reader = FrameReader::new(ScriptedStream::failing_first(ErrorKind::Interrupted, bytes));
        assert_eq!(reader.read_frame().unwrap().body.as_ref(), b"ok");
    }

    #[test]
    fn would_block_reaches_the_caller() {
        let bytes = wire(&[Frame::data("A", "ok")]);
        let mut reader = FrameReader::new(ScriptedStream::failing_first(ErrorKind::WouldBlock, bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn writer_thread_feeds_reader_over_socket() {
        let (tx, rx) = std::os::unix::net::UnixStream::pair().unwrap();

        let producer = std::thread::spawn(move || {
            let mut writer = FrameWriter::new(tx);
            for i in 0..64u32 {
                writer
                    .write_frame(&Frame::data("Seq", format!("msg-{i}")).with_port("OUT"))
                    .unwrap();
            }
        });

        let mut reader = FrameReader::new(rx);
        let bodies: Vec<String> = reader
            .frames()
            .map(|f| String::from_utf8(f.unwrap().body.to_vec()).unwrap())
            .collect();
        producer.join().unwrap();

        let expected: Vec<String> = (0..64).map(|i| format!("msg-{i}")).collect();
        assert_eq!(bodies, expected);
    }
}
