use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite};
use uuid::Uuid;

use crate::codec::FrameCodec;
use crate::frame::Frame;
use crate::reply::Reply;
use crate::Error;

/// One client socket, split so that the reading and the writing side each own their half.
///
/// Reads and writes are optionally bounded by a timeout, which starts over for every frame.
pub struct Connection {
    pub id: Uuid,
    pub client_address: Option<SocketAddr>,
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection::with_codec(stream, FrameCodec::default())
    }

    pub fn with_codec(stream: TcpStream, codec: FrameCodec) -> Connection {
        let client_address = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();

        Connection {
            id: Uuid::new_v4(),
            client_address,
            reader: FramedRead::new(reader, codec.clone()),
            writer: FramedWrite::new(writer, codec),
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn with_timeouts(mut self, read: Option<Duration>, write: Option<Duration>) -> Connection {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    /// Waits for the next complete frame. `None` means the peer closed the connection cleanly.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        let next = within(self.read_timeout, "read", self.reader.next()).await?;
        next.transpose()
    }

    pub async fn write_reply(&mut self, reply: Reply) -> Result<(), Error> {
        within(self.write_timeout, "write", self.writer.send(reply)).await?
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        within(self.write_timeout, "write", self.writer.send(frame)).await?
    }
}

async fn within<F: Future>(limit: Option<Duration>, op: &str, fut: F) -> Result<F::Output, Error> {
    match limit {
        Some(limit) => time::timeout(limit, fut)
            .await
            .map_err(|_| format!("{} timed out after {:?}", op, limit).into()),
        None => Ok(fut.await),
    }
}
