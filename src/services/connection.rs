use std::{future::Future, net::SocketAddr, time::Duration};

use futures::{SinkExt, StreamExt, stream::SplitSink};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{Message, protocol::Role},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ConnectionError;

/// Identifier of a registered relay client.
pub type ConnectionId = Uuid;

/// Channel on which connections report that their peer went away.
pub type RemovalSender = mpsc::UnboundedSender<ConnectionId>;

/// A registered spectator endpoint.
pub trait RelayClient: Send {
    /// Stable identifier used by the registry.
    fn id(&self) -> ConnectionId;

    /// Deliver one broadcast payload.
    fn process(&mut self, payload: &str)
    -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Close the connection; must be safe to call on an already broken peer.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Relay client speaking WebSocket frames over an already upgraded stream.
pub struct WsConnection<S> {
    id: ConnectionId,
    remote: SocketAddr,
    sink: SplitSink<WebSocketStream<S>, Message>,
    watcher: JoinHandle<()>,
    write_timeout: Duration,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap `stream`, on which the 101 response has already been written.
    ///
    /// Spawns a watcher that reads (and discards) inbound frames and reports
    /// the connection id on `removals` once the peer closes or errors.
    pub async fn establish(
        stream: S,
        remote: SocketAddr,
        removals: RemovalSender,
        write_timeout: Duration,
    ) -> Self {
        let id = Uuid::new_v4();
        let socket = WebSocketStream::from_raw_socket(stream, Role::Server, None).await;
        let (sink, mut inbound) = socket.split();

        let watcher = tokio::spawn(async move {
            while let Some(frame) = inbound.next().await {
                match frame {
                    Ok(Message::Close(_)) => {
                        debug!(%id, "relay client sent close");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        debug!(%id, error = %err, "relay client read error");
                        break;
                    }
                }
            }
            let _ = removals.send(id);
        });

        info!(%id, %remote, "relay client connected");
        Self {
            id,
            remote,
            sink,
            watcher,
            write_timeout,
        }
    }
}

impl<S> RelayClient for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn process(&mut self, payload: &str) -> Result<(), ConnectionError> {
        let frame = Message::text(payload.to_owned());
        match timeout(self.write_timeout, self.sink.send(frame)).await {
            Ok(result) => result.map_err(ConnectionError::from),
            Err(_) => Err(ConnectionError::WriteTimeout),
        }
    }

    async fn close(&mut self) {
        self.watcher.abort();
        let _ = timeout(self.write_timeout, self.sink.close()).await;
        info!(id = %self.id, remote = %self.remote, "relay client closed");
    }
}
