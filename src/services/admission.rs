use std::{net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    dto::http::{TOO_MANY_CONNECTIONS, switching_protocols},
    error::HandshakeError,
    services::{
        assets::StaticAssets,
        connection::{RemovalSender, WsConnection},
        handshake::{accept_token, read_request_head},
    },
};

/// Grace period letting a rejection reach the peer before the socket closes.
const REJECT_LINGER: Duration = Duration::from_millis(100);

/// What became of an accepted socket.
pub enum Admission<S> {
    /// Handshake succeeded; the connection is ready to register.
    Upgraded(WsConnection<BufReader<S>>),
    /// A plain request was answered from the web root and closed.
    Served,
    /// The registry was full; the peer got a 503.
    Rejected,
    /// The request head was unusable; the socket was closed without a response.
    Dropped(HandshakeError),
}

/// Classifies freshly accepted sockets and performs the upgrade handshake.
pub struct Admitter {
    assets: StaticAssets,
    handshake_timeout: Duration,
    write_timeout: Duration,
    removals: RemovalSender,
}

impl Admitter {
    /// Build an admitter that serves plain requests from `assets`.
    pub fn new(
        assets: StaticAssets,
        handshake_timeout: Duration,
        write_timeout: Duration,
        removals: RemovalSender,
    ) -> Self {
        Self {
            assets,
            handshake_timeout,
            write_timeout,
            removals,
        }
    }

    /// Admit one socket. `registry_full` is checked before any byte is read.
    pub async fn admit<S>(&self, stream: S, remote: SocketAddr, registry_full: bool) -> Admission<S>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut stream = BufReader::new(stream);

        if registry_full {
            warn!(%remote, "too many relay clients; rejecting connection");
            if let Err(err) = self.write_bounded(stream.get_mut(), TOO_MANY_CONNECTIONS).await {
                debug!(%remote, error = %err, "failed to write rejection");
            }
            sleep(REJECT_LINGER).await;
            let _ = stream.get_mut().shutdown().await;
            return Admission::Rejected;
        }

        let head = match timeout(self.handshake_timeout, read_request_head(&mut stream)).await {
            Ok(Ok(head)) => head,
            Ok(Err(err)) => return drop_connection(stream, remote, err).await,
            Err(_) => return drop_connection(stream, remote, HandshakeError::Timeout).await,
        };

        if !head.wants_upgrade() {
            debug!(%remote, path = %head.path, "serving static asset");
            let respond = self.assets.respond(stream.get_mut(), &head.path);
            match timeout(self.write_timeout, respond).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => debug!(%remote, error = %err, "failed to write static response"),
                Err(_) => warn!(%remote, path = %head.path, "static response stalled; closing"),
            }
            let _ = stream.get_mut().shutdown().await;
            return Admission::Served;
        }

        let key = match head.websocket_key() {
            Ok(key) => key,
            Err(err) => return drop_connection(stream, remote, err).await,
        };

        let response = switching_protocols(&accept_token(key));
        if let Err(err) = self.write_bounded(stream.get_mut(), response.as_bytes()).await {
            return drop_connection(stream, remote, err).await;
        }

        info!(%remote, path = %head.path, "relay handshake complete");
        let connection =
            WsConnection::establish(stream, remote, self.removals.clone(), self.write_timeout)
                .await;
        Admission::Upgraded(connection)
    }

    async fn write_bounded<W>(&self, writer: &mut W, bytes: &[u8]) -> Result<(), HandshakeError>
    where
        W: AsyncWrite + Unpin,
    {
        match timeout(self.write_timeout, writer.write_all(bytes)).await {
            Ok(result) => result.map_err(HandshakeError::Io),
            Err(_) => Err(HandshakeError::WriteTimeout),
        }
    }
}

async fn drop_connection<S>(
    mut stream: BufReader<S>,
    remote: SocketAddr,
    err: HandshakeError,
) -> Admission<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!(%remote, error = %err, "closing connection without response");
    let _ = stream.get_mut().shutdown().await;
    Admission::Dropped(err)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use futures::StreamExt;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex},
        sync::mpsc,
    };
    use tokio_tungstenite::client_async;

    use super::*;

    const REMOTE: &str = "192.168.4.20:50000";

    fn admitter(root: &std::path::Path) -> (Admitter, mpsc::UnboundedReceiver<uuid::Uuid>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let admitter = Admitter::new(
            StaticAssets::new(root),
            Duration::from_millis(200),
            Duration::from_secs(1),
            tx,
        );
        (admitter, rx)
    }

    async fn read_all(client: &mut DuplexStream) -> String {
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn full_registry_gets_503() {
        let dir = tempfile::tempdir().unwrap();
        let (admitter, _rx) = admitter(dir.path());
        let (mut client, server) = duplex(4096);

        let outcome = admitter.admit(server, REMOTE.parse().unwrap(), true).await;
        assert!(matches!(outcome, Admission::Rejected));
        drop(outcome);
        assert_eq!(read_all(&mut client).await, "HTTP/1.1 503 Too many connections\n\n");
    }

    #[tokio::test]
    async fn plain_request_is_served_and_closed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "scoreboard").unwrap();
        let (admitter, _rx) = admitter(dir.path());
        let (mut client, server) = duplex(4096);

        client
            .write_all(b"GET / HTTP/1.1\r\nHost: relay\r\n\r\n")
            .await
            .unwrap();
        let outcome = admitter.admit(server, REMOTE.parse().unwrap(), false).await;
        assert!(matches!(outcome, Admission::Served));
        drop(outcome);

        let response = read_all(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("scoreboard"));
    }

    #[tokio::test]
    async fn unread_static_response_is_abandoned() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.bin"), vec![0u8; 64 * 1024]).unwrap();
        let (admitter, _rx) = admitter(dir.path());
        let (mut client, server) = duplex(1024);

        client
            .write_all(b"GET /big.bin HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let outcome = timeout(
            Duration::from_secs(5),
            admitter.admit(server, REMOTE.parse().unwrap(), false),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, Admission::Served));
        drop(client);
    }

    #[tokio::test]
    async fn stalled_client_times_out_silently() {
        let dir = tempfile::tempdir().unwrap();
        let (admitter, _rx) = admitter(dir.path());
        let (mut client, server) = duplex(4096);

        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        let outcome = admitter.admit(server, REMOTE.parse().unwrap(), false).await;
        assert!(matches!(outcome, Admission::Dropped(HandshakeError::Timeout)));
        drop(outcome);
        assert_eq!(read_all(&mut client).await, "");
    }

    #[tokio::test]
    async fn upgrade_without_key_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (admitter, _rx) = admitter(dir.path());
        let (mut client, server) = duplex(4096);

        client
            .write_all(b"GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n")
            .await
            .unwrap();
        let outcome = admitter.admit(server, REMOTE.parse().unwrap(), false).await;
        assert!(matches!(
            outcome,
            Admission::Dropped(HandshakeError::MissingKey)
        ));
        drop(outcome);
        assert_eq!(read_all(&mut client).await, "");
    }

    #[tokio::test]
    async fn upgrade_completes_with_real_client() {
        let dir = tempfile::tempdir().unwrap();
        let (admitter, mut removals) = admitter(dir.path());
        let (client, server) = duplex(4096);

        let client_task =
            tokio::spawn(async move { client_async("ws://relay/", client).await });
        let outcome = admitter.admit(server, REMOTE.parse().unwrap(), false).await;
        let Admission::Upgraded(connection) = outcome else {
            panic!("expected upgrade");
        };

        let (socket, response) = client_task.await.unwrap().unwrap();
        assert_eq!(response.status().as_u16(), 101);

        // Peer going away is reported on the removal channel.
        drop(socket);
        let removed = removals.recv().await.unwrap();
        assert_eq!(removed, crate::services::connection::RelayClient::id(&connection));
    }

    #[tokio::test]
    async fn upgraded_client_receives_payload() {
        use crate::services::connection::RelayClient;

        let dir = tempfile::tempdir().unwrap();
        let (admitter, _removals) = admitter(dir.path());
        let (client, server) = duplex(4096);

        let client_task =
            tokio::spawn(async move { client_async("ws://relay/", client).await });
        let Admission::Upgraded(mut connection) =
            admitter.admit(server, REMOTE.parse().unwrap(), false).await
        else {
            panic!("expected upgrade");
        };
        let (mut socket, _) = client_task.await.unwrap().unwrap();

        connection.process(r#"{"buttons":["player1"]}"#).await.unwrap();
        let frame = socket.next().await.unwrap().unwrap();
        assert_eq!(frame.into_text().unwrap().as_str(), r#"{"buttons":["player1"]}"#);
    }
}
