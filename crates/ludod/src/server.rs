//! `LudodServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → rooms. Besides the
//! accept loop, a running server owns two background tasks:
//!
//! - the **coordinator**, which consumes [`RegistryNotice`]s from room
//!   actors — re-broadcasting the public room list and tearing down
//!   rooms the moment they empty;
//! - the **sweeper**, which periodically deletes rooms that somehow sat
//!   empty past the stale age.

use std::collections::HashMap;
use std::sync::Arc;

use ludod_protocol::{JsonCodec, PlayerId, ServerEvent};
use ludod_room::{
    ClientSender, MatchQueue, RegistryNotice, RoomConfig, RoomRegistry,
};
use ludod_transport::{Transport, WebSocketTransport};
use tokio::sync::{Mutex, mpsc};

use crate::LudodError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Lock
/// order, where more than one is held: queue → registry → clients.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<RoomRegistry>,
    pub(crate) queue: Mutex<MatchQueue>,
    pub(crate) clients: Mutex<HashMap<PlayerId, ClientSender>>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: RoomConfig,
}

/// Builder for configuring and starting a Ludo server.
///
/// # Example
///
/// ```rust,ignore
/// let server = LudodServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct LudodServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl LudodServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the room timing configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the transport and assembles the server.
    pub async fn build(self) -> Result<LudodServer, LudodError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(
                self.room_config.clone(),
                notice_tx,
            )),
            queue: Mutex::new(MatchQueue::new()),
            clients: Mutex::new(HashMap::new()),
            codec: JsonCodec,
            config: self.room_config,
        });

        Ok(LudodServer { transport, state, notices: notice_rx })
    }
}

impl Default for LudodServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Ludo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LudodServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    notices: mpsc::UnboundedReceiver<RegistryNotice>,
}

impl LudodServer {
    pub fn builder() -> LudodServerBuilder {
        LudodServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, LudodError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), LudodError> {
        let LudodServer { mut transport, state, notices } = self;
        tracing::info!("ludod server running");

        tokio::spawn(coordinate(Arc::clone(&state), notices));
        tokio::spawn(sweep_rooms(Arc::clone(&state)));

        loop {
            match transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Applies room-actor notices that reach beyond a single room.
async fn coordinate(
    state: Arc<ServerState>,
    mut notices: mpsc::UnboundedReceiver<RegistryNotice>,
) {
    while let Some(notice) = notices.recv().await {
        match notice {
            RegistryNotice::PublicRoomsChanged => {
                broadcast_room_list(&state).await;
            }
            RegistryNotice::RoomEmpty(code) => {
                state.registry.lock().await.destroy(&code).await;
            }
        }
    }
}

/// Pushes the current public room list to every connected client.
async fn broadcast_room_list(state: &ServerState) {
    let rooms = {
        let registry = state.registry.lock().await;
        registry.list_public_open().await
    };
    let event = ServerEvent::PublicRoomsList { rooms };
    let clients = state.clients.lock().await;
    for sender in clients.values() {
        let _ = sender.send(event.clone());
    }
}

async fn sweep_rooms(state: Arc<ServerState>) {
    let mut ticker = tokio::time::interval(state.config.sweep_interval);
    // The first tick is immediate; skip it.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let swept = state.registry.lock().await.sweep_stale().await;
        if swept > 0 {
            tracing::info!(swept, "stale rooms deleted");
        }
    }
}
