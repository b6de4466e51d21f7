// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::{Buf, BufMut, Bytes};
use itertools::Itertools;
use std::io::Cursor;
use std::string::FromUtf8Error;
use thiserror::Error as ThisError;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

/// How many arrays may be nested inside each other. Requests only ever need one.
pub const MAX_NESTING_DEPTH: usize = 128;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("unknown type: {0}")]
    InvalidDataType(u8),
    /// Invalid message encoding.
    #[error("{0}")]
    Other(crate::Error),
}

/// A single value on the wire, used for requests as well as replies.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// The nil bulk string, `$-1\r\n`.
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Builds the array of bulk strings clients use to send a command.
    pub fn request<I, T>(parts: I) -> Frame
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Frame::Array(
            parts
                .into_iter()
                .map(|part| Frame::Bulk(part.into()))
                .collect(),
        )
    }

    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::parse_nested(src, 0)
    }

    fn parse_nested(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Self, Error> {
        // The first byte of every frame identifies its type, the rest of the line (and, for
        // bulk strings, the payload that follows) constitutes its contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            DataType::SimpleString => {
                let line = get_line(src)?.to_vec();
                Ok(Frame::Simple(String::from_utf8(line)?))
            }
            DataType::SimpleError => {
                let line = get_line(src)?.to_vec();
                Ok(Frame::Error(String::from_utf8(line)?))
            }
            // Unparsable integers are read as zero rather than failing the whole frame.
            DataType::Integer => {
                let line = get_line(src)?;
                let integer = std::str::from_utf8(line)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(0);

                Ok(Frame::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => {
                let length = get_length(src)?;

                if length == -1 {
                    return Ok(Frame::Null);
                }
                if length < 0 {
                    return Ok(Frame::Bulk(Bytes::new()));
                }

                let data = get_exact(src, length as usize)?;
                Ok(Frame::Bulk(Bytes::copy_from_slice(data)))
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                let length = get_length(src)?;

                if length == -1 {
                    return Ok(Frame::Null);
                }

                if depth >= MAX_NESTING_DEPTH {
                    return Err(nesting_too_deep());
                }

                let length = length.max(0) as usize;
                let mut frames = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    frames.push(Self::parse_nested(src, depth + 1)?);
                }

                Ok(Frame::Array(frames))
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    pub(crate) fn write_to<B: BufMut>(&self, dst: &mut B) {
        match self {
            Frame::Simple(s) => write_line(dst, DataType::SimpleString, s.as_bytes()),
            Frame::Error(s) => write_line(dst, DataType::SimpleError, s.as_bytes()),
            Frame::Integer(i) => write_line(dst, DataType::Integer, i.to_string().as_bytes()),
            Frame::Bulk(data) => {
                write_line(dst, DataType::BulkString, data.len().to_string().as_bytes());
                dst.put_slice(data);
                dst.put_slice(CRLF);
            }
            Frame::Null => write_line(dst, DataType::BulkString, b"-1"),
            Frame::Array(frames) => {
                write_line(dst, DataType::Array, frames.len().to_string().as_bytes());
                for frame in frames {
                    frame.write_to(dst);
                }
            }
        }
    }

    /// Returns the textual content of a string-like frame.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Frame::Simple(s) => Some(s),
            Frame::Bulk(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => write!(f, "*{}[{}]", arr.len(), arr.iter().join(", ")),
        }
    }
}

/// Walks a frame that may still be arriving without building it, remembering how far it got
/// so that the next call picks up from there instead of from the first byte.
#[derive(Debug, Default, Clone)]
pub(crate) struct Scanner {
    /// End of the last element that was read completely.
    offset: usize,
    /// Elements still expected by each array that is open at `offset`.
    pending: Vec<usize>,
}

impl Scanner {
    /// Returns `Ok(true)` once `buf` holds a whole frame, ending at [`Scanner::offset`].
    pub(crate) fn advance(&mut self, buf: &[u8]) -> Result<bool, Error> {
        loop {
            let mut src = Cursor::new(buf);
            src.set_position(self.offset as u64);

            let elements = match skip_element(&mut src) {
                Ok(elements) => elements,
                Err(Error::Incomplete) => return Ok(false),
                Err(err) => return Err(err),
            };
            self.offset = src.position() as usize;

            if elements > 0 {
                if self.pending.len() >= MAX_NESTING_DEPTH {
                    return Err(nesting_too_deep());
                }
                self.pending.push(elements);
                continue;
            }

            // A finished element may finish its enclosing arrays as well.
            loop {
                match self.pending.last_mut() {
                    None => return Ok(true),
                    Some(remaining) if *remaining > 1 => {
                        *remaining -= 1;
                        break;
                    }
                    Some(_) => {}
                }
                self.pending.pop();
            }
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

/// Moves past one element. Arrays only have their header consumed, and the number of
/// elements they announce is returned instead.
fn skip_element(src: &mut Cursor<&[u8]>) -> Result<usize, Error> {
    match DataType::try_from(get_byte(src)?)? {
        DataType::SimpleString | DataType::SimpleError | DataType::Integer => {
            get_line(src)?;
            Ok(0)
        }
        DataType::BulkString => {
            let length = get_length(src)?;
            if length >= 0 {
                get_exact(src, length as usize)?;
            }
            Ok(0)
        }
        DataType::Array => Ok(get_length(src)?.max(0) as usize),
    }
}

fn nesting_too_deep() -> Error {
    "protocol error; nesting too deep".into()
}

pub(crate) fn write_line<B: BufMut>(dst: &mut B, data_type: DataType, payload: &[u8]) {
    dst.put_u8(u8::from(data_type));
    dst.put_slice(payload);
    dst.put_slice(CRLF);
}

/// Reads up to the next CRLF and returns the line without it.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf = *src.get_ref();

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_length(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            format!(
                "protocol error; invalid length prefix {:?}",
                String::from_utf8_lossy(line)
            )
            .into()
        })
}

/// Reads exactly `length` payload bytes followed by the terminating CRLF.
fn get_exact<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf = *src.get_ref();

    if length > buf.len() - start {
        return Err(Error::Incomplete);
    }

    let end = start + length;
    if buf.len() < end + CRLF.len() {
        return Err(Error::Incomplete);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err("protocol error; bulk payload is not terminated by CRLF".into());
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        "protocol error; invalid frame format".into()
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<String> for Error {
    fn from(src: String) -> Error {
        Error::Other(src.into())
    }
}
