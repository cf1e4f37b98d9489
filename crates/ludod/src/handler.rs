//! Per-connection handler and request dispatch.
//!
//! Each accepted connection gets its own task. The loop multiplexes two
//! directions: frames from the client (decoded into [`ClientRequest`]s
//! and dispatched) and events for the client (queued on an unbounded
//! channel by room actors and server tasks, encoded and written out
//! here). The channel is what lets a room broadcast to a player whose
//! read side is idle.
//!
//! There is no handshake: the connection id is the player id, and a
//! player exists exactly as long as their socket does.

use std::sync::Arc;

use ludod_protocol::{ClientRequest, Codec, PlayerId, RoomCode, ServerEvent};
use ludod_room::{ClientSender, GameError, QUORUM, RoomAction, MatchQueue};
use ludod_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::LudodError;
use crate::server::ServerState;

/// Drop guard that cleans a player out of the server when the handler
/// exits. Cleanup runs even if the handler panics; since `Drop` is
/// synchronous, it spawns a task for the async locks.
struct DisconnectGuard {
    player_id: PlayerId,
    state: Arc<ServerState>,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(disconnect(state, player_id));
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), LudodError> {
    let player_id = PlayerId(conn.id().into_inner());
    tracing::info!(%player_id, "client connected");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.clients.lock().await.insert(player_id, tx.clone());
    let _guard = DisconnectGuard { player_id, state: Arc::clone(&state) };

    loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => {
                    match state.codec.decode::<ClientRequest>(&data) {
                        Ok(request) => {
                            dispatch(&state, player_id, &tx, request).await;
                        }
                        Err(e) => {
                            tracing::debug!(
                                %player_id, error = %e,
                                "undecodable request"
                            );
                            let _ = tx.send(ServerEvent::Error {
                                message: format!("invalid request: {e}"),
                            });
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!(%player_id, "connection closed");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "recv error");
                    break;
                }
            },
            outgoing = rx.recv() => match outgoing {
                Some(event) => {
                    let bytes = state.codec.encode(&event)?;
                    if conn.send(&bytes).await.is_err() {
                        break;
                    }
                }
                // All senders gone; nothing can reach this client.
                None => break,
            },
        }
    }

    // _guard drops here → disconnect cleanup fires.
    Ok(())
}

/// Removes every trace of a departed player: client map, quick-play
/// queue, and their room.
async fn disconnect(state: Arc<ServerState>, player_id: PlayerId) {
    tracing::info!(%player_id, "client disconnected");
    state.clients.lock().await.remove(&player_id);

    {
        let mut queue = state.queue.lock().await;
        if queue.dequeue(player_id) {
            broadcast_queue_status(&state, &queue).await;
        }
    }

    let room = {
        let mut registry = state.registry.lock().await;
        let code = registry.room_of(player_id);
        if code.is_some() {
            registry.unbind(player_id);
        }
        code.and_then(|c| registry.get(&c))
    };
    if let Some(handle) = room {
        handle.leave(player_id).await;
    }
}

async fn dispatch(
    state: &Arc<ServerState>,
    player_id: PlayerId,
    tx: &ClientSender,
    request: ClientRequest,
) {
    match request {
        ClientRequest::CreateRoom { player_name, is_public } => {
            create_room(state, player_id, tx, &player_name, is_public)
                .await;
        }
        ClientRequest::JoinRoom { room_id, player_name } => {
            join_room(state, player_id, tx, &room_id, &player_name).await;
        }
        ClientRequest::LeaveRoom { room_id } => {
            leave_room(state, player_id, tx, &room_id).await;
        }
        ClientRequest::ListRooms => {
            let rooms = {
                let registry = state.registry.lock().await;
                registry.list_public_open().await
            };
            let _ = tx.send(ServerEvent::PublicRoomsList { rooms });
        }
        ClientRequest::QuickPlay => {
            quick_play(state, player_id, tx).await;
        }
        ClientRequest::CancelQuickPlay => {
            cancel_quick_play(state, player_id).await;
        }
        ClientRequest::SelectColor { room_id, color } => {
            act(state, player_id, tx, &room_id, RoomAction::SelectColor(color))
                .await;
        }
        ClientRequest::SetPublic { room_id, is_public } => {
            act(state, player_id, tx, &room_id, RoomAction::SetPublic(is_public))
                .await;
        }
        ClientRequest::SetMaxPlayers { room_id, max_players } => {
            act(
                state,
                player_id,
                tx,
                &room_id,
                RoomAction::SetMaxPlayers(max_players),
            )
            .await;
        }
        ClientRequest::StartGame { room_id, settings } => {
            act(state, player_id, tx, &room_id, RoomAction::StartGame(settings))
                .await;
        }
        ClientRequest::RestartGame { room_id } => {
            act(state, player_id, tx, &room_id, RoomAction::RestartGame)
                .await;
        }
        ClientRequest::RollDice { room_id } => {
            act(state, player_id, tx, &room_id, RoomAction::RollDice).await;
        }
        ClientRequest::MoveToken {
            room_id,
            color,
            token_index,
            dice_value,
        } => {
            act(
                state,
                player_id,
                tx,
                &room_id,
                RoomAction::MoveToken { color, token_index, dice_value },
            )
            .await;
        }
        ClientRequest::NoMovePossible { room_id, player_color } => {
            act(
                state,
                player_id,
                tx,
                &room_id,
                RoomAction::NoMovePossible(player_color),
            )
            .await;
        }
    }
}

fn send_error(tx: &ClientSender, err: &GameError) {
    let _ = tx.send(ServerEvent::Error { message: err.to_string() });
}

async fn create_room(
    state: &Arc<ServerState>,
    player_id: PlayerId,
    tx: &ClientSender,
    player_name: &str,
    is_public: bool,
) {
    let handle = {
        let mut registry = state.registry.lock().await;
        if let Some(existing) = registry.room_of(player_id) {
            send_error(tx, &GameError::AlreadyJoined(existing));
            return;
        }
        registry.create(is_public)
    };
    match handle.join(player_id, player_name, tx.clone()).await {
        Ok(()) => {
            let mut registry = state.registry.lock().await;
            registry.bind(player_id, handle.code().clone());
        }
        Err(err) => send_error(tx, &err),
    }
}

async fn join_room(
    state: &Arc<ServerState>,
    player_id: PlayerId,
    tx: &ClientSender,
    room_id: &RoomCode,
    player_name: &str,
) {
    let handle = {
        let mut registry = state.registry.lock().await;
        if let Some(existing) = registry.room_of(player_id) {
            send_error(tx, &GameError::AlreadyJoined(existing));
            return;
        }
        registry.get(room_id)
    };
    let Some(handle) = handle else {
        send_error(tx, &GameError::RoomNotFound(room_id.clone()));
        return;
    };
    match handle.join(player_id, player_name, tx.clone()).await {
        Ok(()) => {
            let mut registry = state.registry.lock().await;
            registry.bind(player_id, room_id.clone());
        }
        Err(err) => send_error(tx, &err),
    }
}

async fn leave_room(
    state: &Arc<ServerState>,
    player_id: PlayerId,
    tx: &ClientSender,
    room_id: &RoomCode,
) {
    let handle = {
        let mut registry = state.registry.lock().await;
        match registry.room_of(player_id) {
            Some(bound) if bound == *room_id => {
                registry.unbind(player_id);
                registry.get(room_id)
            }
            _ => None,
        }
    };
    match handle {
        Some(handle) => handle.leave(player_id).await,
        None => send_error(tx, &GameError::RoomNotFound(room_id.clone())),
    }
}

/// Routes a room-scoped action. The player must actually be in the room
/// they name; anything else answers as if the room did not exist.
async fn act(
    state: &Arc<ServerState>,
    player_id: PlayerId,
    tx: &ClientSender,
    room_id: &RoomCode,
    action: RoomAction,
) {
    let handle = {
        let registry = state.registry.lock().await;
        match registry.room_of(player_id) {
            Some(bound) if bound == *room_id => registry.get(room_id),
            _ => None,
        }
    };
    match handle {
        Some(handle) => handle.act(player_id, action).await,
        None => send_error(tx, &GameError::RoomNotFound(room_id.clone())),
    }
}

// ---------------------------------------------------------------------------
// Quick play
// ---------------------------------------------------------------------------

async fn quick_play(
    state: &Arc<ServerState>,
    player_id: PlayerId,
    tx: &ClientSender,
) {
    {
        let registry = state.registry.lock().await;
        if let Some(existing) = registry.room_of(player_id) {
            send_error(tx, &GameError::AlreadyJoined(existing));
            return;
        }
    }
    let mut queue = state.queue.lock().await;
    if !queue.enqueue(player_id) {
        // Already waiting; nothing to do.
        return;
    }
    tracing::info!(%player_id, waiting = queue.len(), "quick-play queued");
    broadcast_queue_status(state, &queue).await;
    try_match(state, &mut queue).await;
}

async fn cancel_quick_play(state: &Arc<ServerState>, player_id: PlayerId) {
    let mut queue = state.queue.lock().await;
    if queue.dequeue(player_id) {
        tracing::info!(%player_id, "quick-play cancelled");
        broadcast_queue_status(state, &queue).await;
    }
}

/// Forms rooms while a full quorum of *connected* players is waiting.
///
/// Players who disconnected while queued are discarded; the connected
/// remainder of a short batch goes back to the front so their wait
/// still counts. Each pass discards at least one stale id or forms a
/// room, so the loop terminates.
async fn try_match(state: &Arc<ServerState>, queue: &mut MatchQueue) {
    while let Some(batch) = queue.claim_quorum() {
        let connected: Vec<(PlayerId, ClientSender)> = {
            let clients = state.clients.lock().await;
            batch
                .iter()
                .filter_map(|id| {
                    clients.get(id).map(|tx| (*id, tx.clone()))
                })
                .collect()
        };
        if connected.len() < QUORUM {
            queue.requeue_front(
                connected.iter().map(|(id, _)| *id).collect(),
            );
            broadcast_queue_status(state, queue).await;
            continue;
        }
        form_match(state, connected).await;
        broadcast_queue_status(state, queue).await;
    }
}

/// Creates a private four-seat room and seats the matched batch, first
/// player as host, everyone pre-readied.
async fn form_match(
    state: &Arc<ServerState>,
    players: Vec<(PlayerId, ClientSender)>,
) {
    let handle = state.registry.lock().await.create(false);
    let code = handle.code().clone();
    tracing::info!(room = %code, "quick-play match formed");

    let batch: Vec<_> = players
        .iter()
        .map(|(id, tx)| (*id, String::new(), tx.clone()))
        .collect();
    if handle.seed(batch).await.is_err() {
        return;
    }

    let mut registry = state.registry.lock().await;
    for (id, _) in &players {
        registry.bind(*id, code.clone());
    }
}

/// Tells everyone still waiting how close the next match is.
async fn broadcast_queue_status(state: &ServerState, queue: &MatchQueue) {
    let event = ServerEvent::QuickPlayStatus {
        count: queue.len(),
        max_players: QUORUM,
    };
    let clients = state.clients.lock().await;
    for player_id in queue.iter() {
        if let Some(tx) = clients.get(&player_id) {
            let _ = tx.send(event.clone());
        }
    }
}
