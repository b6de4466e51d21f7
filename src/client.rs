use bytes::Bytes;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::connection::Connection;
use crate::frame::Frame;
use crate::Error;

/// A minimal client: sends commands as arrays of bulk strings and reads back raw frames.
pub struct Client {
    connection: Connection,
}

impl Client {
    pub async fn connect<T: ToSocketAddrs>(addr: T) -> Result<Client, Error> {
        let socket = TcpStream::connect(addr).await?;
        let connection = Connection::new(socket);

        Ok(Client { connection })
    }

    /// Sends one command and waits for its reply.
    ///
    /// ```no_run
    /// # async fn example() -> simpledb::Result<()> {
    /// let mut client = simpledb::client::Client::connect("127.0.0.1:6379").await?;
    /// let reply = client.request(["SET", "greeting", "hello"]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request<I, T>(&mut self, args: I) -> Result<Frame, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        self.send_frame(Frame::request(args)).await?;
        self.read_frame().await
    }

    pub async fn send_frame(&mut self, frame: Frame) -> Result<(), Error> {
        self.connection.write_frame(frame).await
    }

    pub async fn read_frame(&mut self) -> Result<Frame, Error> {
        match self.connection.read_frame().await? {
            Some(frame) => Ok(frame),
            None => Err("connection closed by server".into()),
        }
    }
}
