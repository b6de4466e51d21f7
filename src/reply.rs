use bytes::{BufMut, Bytes};

use crate::frame::{write_line, DataType, CRLF};

/// Text up to this many bytes is written as a simple string, anything longer as a bulk string.
pub const DEFAULT_SIMPLE_STRING_THRESHOLD: usize = 100;

/// The value a command handler answers with.
///
/// Unlike [`Frame`](crate::frame::Frame), which mirrors the wire format one to one, a `Reply`
/// describes *what* is being returned and leaves the choice of representation (simple vs bulk
/// string, array flattening) to the encoder.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Text(String),
    Bytes(Bytes),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Error(String),
    Nil,
    Sequence(Vec<Reply>),
    Pairs(Vec<(Reply, Reply)>),
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Text("OK".to_string())
    }

    pub fn error(msg: impl std::fmt::Display) -> Reply {
        Reply::Error(format!("ERR {}", msg))
    }

    /// Maps a missing value to `Nil`.
    pub fn bytes_or_nil(value: Option<Bytes>) -> Reply {
        value.map_or(Reply::Nil, Reply::Bytes)
    }

    pub fn texts<I, S>(items: I) -> Reply
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply::Sequence(items.into_iter().map(|s| Reply::Text(s.into())).collect())
    }

    /// Number of array elements this value contributes when passed as one of several arguments.
    fn flat_len(&self) -> usize {
        match self {
            Reply::Sequence(items) => items.len(),
            Reply::Pairs(pairs) => pairs.len() * 2,
            _ => 1,
        }
    }
}

impl From<usize> for Reply {
    fn from(n: usize) -> Self {
        Reply::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self {
        Reply::Integer(n)
    }
}

impl From<bool> for Reply {
    fn from(b: bool) -> Self {
        Reply::Boolean(b)
    }
}

/// Writes [`Reply`] values to a buffer.
#[derive(Clone, Copy, Debug)]
pub struct ReplyEncoder {
    simple_string_threshold: usize,
}

impl Default for ReplyEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_SIMPLE_STRING_THRESHOLD)
    }
}

impl ReplyEncoder {
    pub fn new(simple_string_threshold: usize) -> Self {
        Self {
            simple_string_threshold,
        }
    }

    /// Encodes a single reply. Sequences and pairs become one array.
    pub fn encode<B: BufMut>(&self, reply: &Reply, dst: &mut B) {
        match reply {
            Reply::Text(s) => self.write_text(s.as_bytes(), dst),
            Reply::Bytes(b) => self.write_text(b, dst),
            Reply::Integer(i) => write_line(dst, DataType::Integer, i.to_string().as_bytes()),
            Reply::Float(f) => write_line(dst, DataType::Integer, format!("{:.6}", f).as_bytes()),
            Reply::Boolean(b) => {
                write_line(dst, DataType::SimpleString, if *b { b"1" } else { b"0" })
            }
            Reply::Error(msg) => write_line(dst, DataType::SimpleError, msg.as_bytes()),
            Reply::Nil => write_line(dst, DataType::BulkString, b"-1"),
            Reply::Sequence(_) | Reply::Pairs(_) => self.encode_args(std::slice::from_ref(reply), dst),
        }
    }

    /// Encodes several arguments as one array. Sequences and pairs among the arguments are
    /// flattened one level, so the declared element count matches what follows it.
    pub fn encode_args<B: BufMut>(&self, args: &[Reply], dst: &mut B) {
        let count: usize = args.iter().map(Reply::flat_len).sum();
        write_line(dst, DataType::Array, count.to_string().as_bytes());

        for arg in args {
            match arg {
                Reply::Sequence(items) => {
                    for item in items {
                        self.encode(item, dst);
                    }
                }
                Reply::Pairs(pairs) => {
                    for (key, value) in pairs {
                        self.encode(key, dst);
                        self.encode(value, dst);
                    }
                }
                other => self.encode(other, dst),
            }
        }
    }

    fn write_text<B: BufMut>(&self, text: &[u8], dst: &mut B) {
        // A simple string cannot carry line breaks, those always go out as bulk strings.
        let fits_line = !text.iter().any(|b| *b == b'\r' || *b == b'\n');

        if text.len() <= self.simple_string_threshold && fits_line {
            write_line(dst, DataType::SimpleString, text);
        } else {
            write_line(dst, DataType::BulkString, text.len().to_string().as_bytes());
            dst.put_slice(text);
            dst.put_slice(CRLF);
        }
    }
}
