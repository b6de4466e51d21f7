use futures::stream::{self, Stream, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::CommandTable;
use crate::config::Config;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Installs the global subscriber, binds the configured address and serves forever.
pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;

    serve(listener, config).await
}

/// Accepts connections on an already bound listener, one task per connection.
pub async fn serve(listener: TcpListener, config: Config) -> Result<(), Error> {
    let commands = Arc::new(CommandTable::new());
    let store = Store::new();
    let config = Arc::new(config);

    info!(
        commands = commands.len(),
        "simpledb server listening on {}",
        listener.local_addr()?
    );

    accept_loop(incoming(listener), commands, store, config).await;
    Ok(())
}

/// Pause after a failed accept, so that running out of file descriptors doesn't spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

fn incoming(listener: TcpListener) -> impl Stream<Item = io::Result<(TcpStream, SocketAddr)>> {
    stream::unfold(listener, |listener| async move {
        let accepted = listener.accept().await;
        Some((accepted, listener))
    })
}

async fn accept_loop<S>(
    incoming: S,
    commands: Arc<CommandTable>,
    store: Store,
    config: Arc<Config>,
) where
    S: Stream<Item = io::Result<(TcpStream, SocketAddr)>>,
{
    let mut incoming = Box::pin(incoming);

    while let Some(accepted) = incoming.next().await {
        let (socket, client_address) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let commands = commands.clone();
        let store = store.clone();
        let config = config.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, commands, store, config).await
            {
                error!(error = %e, "Connection failed");
            }
        });
    }
}

#[instrument(
    name = "connection",
    skip(stream, commands, store, config),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    commands: Arc<CommandTable>,
    store: Store,
    config: Arc<Config>,
) -> Result<(), Error> {
    let mut conn = Connection::with_codec(stream, config.codec())
        .with_timeouts(config.read_timeout(), config.write_timeout());

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    // One request at a time: the reply to a request is written before the next one is read, so
    // pipelined requests are answered in order.
    while let Some(frame) = conn.read_frame().await? {
        debug!("Received frame from client: {}", frame);

        match frame {
            Frame::Array(parts) => {
                let reply = commands.dispatch(&store, parts);
                debug!("Sending reply to client: {:?}", reply);
                conn.write_reply(reply).await?;
            }
            other => conn.write_frame(other).await?,
        }
    }

    info!("Connection closed");
    Ok(())
}
