use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Frame, Scanner};
use crate::reply::{Reply, ReplyEncoder};
use crate::Error;

pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Turns a byte stream into [`Frame`]s and writes [`Frame`]s and [`Reply`]s back.
#[derive(Clone, Debug)]
pub struct FrameCodec {
    max_frame_size: usize,
    replies: ReplyEncoder,
    /// Progress through the frame at the front of the read buffer.
    scanner: Scanner,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize, replies: ReplyEncoder) -> Self {
        Self {
            max_frame_size,
            replies,
            scanner: Scanner::default(),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE, ReplyEncoder::default())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // Only the bytes that arrived since the last call get looked at until the frame is
        // known to be whole, then it is parsed once.
        if !self.scanner.advance(&src[..])? {
            // Check the size only while still buffering, so that one huge request can't
            // grow the buffer without bound.
            if src.len() > self.max_frame_size {
                return Err("frame size exceeds limit".into());
            }
            return Ok(None);
        }

        let length = self.scanner.offset();
        self.scanner = Scanner::default();

        let mut cursor = Cursor::new(&src[..length]);
        let frame = Frame::parse(&mut cursor)?;

        // Remove the parsed frame from the buffer.
        src.advance(length);

        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            // The peer went away in the middle of sending a frame.
            None if !src.is_empty() => Err("connection reset by peer".into()),
            None => Ok(None),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        frame.write_to(dst);
        Ok(())
    }
}

impl Encoder<Reply> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.replies.encode(&reply, dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn decodes_frames_one_at_a_time() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&b"+OK\r\n:12\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Simple("OK".to_string()))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Integer(12)));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_incomplete_frames() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nfo"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        // Nothing is consumed until the whole frame arrived.
        assert_eq!(buf.len(), 19);

        buf.extend_from_slice(b"o\r\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Array(vec![
                Frame::Bulk(Bytes::from("GET")),
                Frame::Bulk(Bytes::from("foo")),
            ]))
        );
    }

    #[test]
    fn large_requests_arriving_in_chunks_are_scanned_once() {
        let members: Vec<String> = (0..20_000).map(|i| format!("member:{i}")).collect();
        let mut parts = vec!["SADD".to_string(), "s".to_string()];
        parts.extend(members);
        let request = Frame::request(parts);
        let data = request.serialize();

        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        let mut offset = 0;

        let chunks: Vec<&[u8]> = data.chunks(4096).collect();
        let (last, rest) = chunks.split_last().unwrap();
        for chunk in rest {
            buf.extend_from_slice(chunk);
            assert_eq!(codec.decode(&mut buf).unwrap(), None);

            // Every call moves forward to within one element of the end of the buffer.
            assert!(codec.scanner.offset() >= offset);
            assert!(buf.len() - codec.scanner.offset() < 32);
            offset = codec.scanner.offset();
        }

        buf.extend_from_slice(last);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(request));
        assert!(buf.is_empty());
        assert_eq!(codec.scanner.offset(), 0);
    }

    #[test]
    fn scanning_restarts_for_each_frame() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&b"*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n*1\r\n$4\r\nPI"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::request(["ECHO", "hi"]))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.scanner.offset(), 4);

        buf.extend_from_slice(b"NG\r\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::request(["PING"]))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_deeply_nested_frames_before_they_finish() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&b"*1\r\n".repeat(1000)[..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.to_string(), "protocol error; nesting too deep");
    }

    #[test]
    fn rejects_oversized_frames() {
        let mut codec = FrameCodec::new(8, ReplyEncoder::default());
        let mut buf = BytesMut::from(&b"$100\r\nabcdefghij"[..]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn partial_frame_at_eof_is_an_error() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&b"$5\r\nhel"[..]);

        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert_eq!(err.to_string(), "connection reset by peer");

        let mut empty = BytesMut::new();
        assert_eq!(codec.decode_eof(&mut empty).unwrap(), None);
    }

    #[test]
    fn rejects_unknown_types() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&b"?what\r\n"[..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.to_string(), "unknown type: 63");
    }

    #[test]
    fn encodes_replies_with_configured_threshold() {
        let mut codec = FrameCodec::new(DEFAULT_MAX_FRAME_SIZE, ReplyEncoder::new(2));
        let mut buf = BytesMut::new();

        codec.encode(Reply::Text("ab".into()), &mut buf).unwrap();
        codec.encode(Reply::Text("abc".into()), &mut buf).unwrap();

        assert_eq!(&buf[..], b"+ab\r\n$3\r\nabc\r\n");
    }

    #[test]
    fn encodes_frames() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();

        codec
            .encode(Frame::request(["PING"]), &mut buf)
            .unwrap();

        assert_eq!(&buf[..], b"*1\r\n$4\r\nPING\r\n");
    }
}
