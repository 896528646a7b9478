use std::{io, net::SocketAddr, time::Duration};

use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream},
    sync::{mpsc, watch},
    time::{Instant, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dto::ws::ButtonsMessage,
    services::{
        admission::{Admission, Admitter},
        assets::StaticAssets,
        connection::{ConnectionId, RelayClient, WsConnection},
        registry::{BroadcastReport, ClientRegistry},
    },
    state::{Engine, SharedEngine},
};

type RelayConnection = WsConnection<BufReader<TcpStream>>;

/// One network event serviced per iteration.
enum LoopEvent {
    Shutdown,
    Removed(ConnectionId),
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Idle,
}

/// Single cooperative driver of the controller.
///
/// Each iteration drains the event queue and relays it, sweeps LED deadlines,
/// then services at most one network event or sleeps for one tick.
pub struct MainLoop {
    engine: SharedEngine,
    listener: TcpListener,
    admitter: Admitter,
    registry: ClientRegistry<RelayConnection>,
    removals: mpsc::UnboundedReceiver<ConnectionId>,
    tick: Duration,
}

impl MainLoop {
    /// Assemble the loop around an already bound listener.
    pub fn new(engine: SharedEngine, listener: TcpListener, config: &AppConfig) -> Self {
        let (removals_tx, removals) = mpsc::unbounded_channel();
        Self {
            engine,
            listener,
            admitter: Admitter::new(
                StaticAssets::new(config.web_root.clone()),
                config.handshake_timeout,
                config.write_timeout,
                removals_tx,
            ),
            registry: ClientRegistry::new(config.max_connections),
            removals,
            tick: config.tick,
        }
    }

    /// Address the relay listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(addr = ?self.listener.local_addr().ok(), "relay loop started");

        loop {
            relay_events(&self.engine, &mut self.registry).await;
            self.engine.sweep_indicators(Instant::now().into_std());

            let event = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        LoopEvent::Shutdown
                    } else {
                        LoopEvent::Idle
                    }
                }
                Some(id) = self.removals.recv() => LoopEvent::Removed(id),
                accepted = self.listener.accept() => LoopEvent::Accepted(accepted),
                _ = sleep(self.tick) => LoopEvent::Idle,
            };

            match event {
                LoopEvent::Shutdown => break,
                LoopEvent::Removed(id) => {
                    if !self.registry.remove(id).await {
                        debug!(%id, "peer close for an already removed client");
                    }
                }
                LoopEvent::Accepted(Ok((stream, remote))) => self.admit(stream, remote).await,
                LoopEvent::Accepted(Err(err)) => warn!(error = %err, "accept failed"),
                LoopEvent::Idle => {}
            }
        }

        self.shutdown().await;
    }

    async fn admit(&mut self, stream: TcpStream, remote: SocketAddr) {
        let full = self.registry.is_full();
        match self.admitter.admit(stream, remote, full).await {
            Admission::Upgraded(connection) => {
                if let Err(mut connection) = self.registry.insert(connection) {
                    warn!(%remote, "registry filled during handshake; closing");
                    connection.close().await;
                } else {
                    info!(%remote, clients = self.registry.len(), "relay client registered");
                }
            }
            Admission::Served | Admission::Rejected | Admission::Dropped(_) => {}
        }
    }

    async fn shutdown(self) {
        let Self {
            engine,
            listener,
            mut registry,
            ..
        } = self;
        drop(listener);
        registry.close_all().await;
        engine.indicators_off();
        info!("relay loop stopped");
    }
}

/// Drain the engine's queue and broadcast it as one message.
///
/// Events drained while no client is connected are discarded.
pub async fn relay_events<C: RelayClient>(
    engine: &Engine,
    registry: &mut ClientRegistry<C>,
) -> Option<BroadcastReport> {
    let message = ButtonsMessage::from_names(engine.drain_names())?;
    let payload = match serde_json::to_string(&message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize relay message `{message:?}`");
            return None;
        }
    };

    info!(buttons = ?message.buttons, clients = registry.len(), "relaying presses");
    Some(registry.broadcast(&payload).await)
}
