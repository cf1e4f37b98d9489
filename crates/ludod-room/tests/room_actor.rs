//! Actor-level tests: real room tasks, unbounded channels standing in
//! for client connections.

use std::time::Duration;

use ludod_board::Color;
use ludod_protocol::{GameSettings, PlayerId, RoomCode, ServerEvent};
use ludod_room::{
    GameError, RegistryNotice, RoomAction, RoomConfig, RoomHandle,
    RoomRegistry, spawn_room,
};
use tokio::sync::mpsc;

type EventRx = mpsc::UnboundedReceiver<ServerEvent>;

fn test_room(
    config: &RoomConfig,
) -> (RoomHandle, mpsc::UnboundedReceiver<RegistryNotice>) {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let code = RoomCode::parse("TEST01").unwrap();
    (spawn_room(code, false, config, notice_tx), notice_rx)
}

fn client() -> (ludod_room::ClientSender, EventRx) {
    mpsc::unbounded_channel()
}

async fn next_event(rx: &mut EventRx) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Reads events until one matches, panicking after `limit` misses.
async fn event_where(
    rx: &mut EventRx,
    mut pred: impl FnMut(&ServerEvent) -> bool,
) -> ServerEvent {
    for _ in 0..32 {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
    panic!("no matching event within 32 messages");
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_creator_gets_room_created_joiner_gets_room_joined() {
    let config = RoomConfig::default();
    let (room, _notices) = test_room(&config);
    let (tx1, mut rx1) = client();
    let (tx2, mut rx2) = client();

    room.join(PlayerId(1), "Ana", tx1).await.unwrap();
    let created = next_event(&mut rx1).await;
    assert!(matches!(
        created,
        ServerEvent::RoomCreated { is_host: true, player_count: 1, .. }
    ));

    room.join(PlayerId(2), "Ben", tx2).await.unwrap();
    let joined = next_event(&mut rx2).await;
    assert!(matches!(
        joined,
        ServerEvent::RoomJoined { is_host: false, player_count: 2, .. }
    ));

    // The creator hears about the newcomer.
    let notified = next_event(&mut rx1).await;
    match notified {
        ServerEvent::PlayerJoined { players, .. } => {
            assert_eq!(players.len(), 2);
            assert_eq!(players[1].name, "Ben");
        }
        other => panic!("expected player_joined, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fifth_join_is_rejected() {
    let config = RoomConfig::default();
    let (room, _notices) = test_room(&config);
    let mut clients = Vec::new();
    for i in 1..=4 {
        let (tx, rx) = client();
        room.join(PlayerId(i), "", tx).await.unwrap();
        clients.push(rx);
    }
    let (tx, _rx) = client();
    let result = room.join(PlayerId(5), "Eve", tx).await;
    assert!(matches!(result, Err(GameError::RoomFull(_))));
}

#[tokio::test]
async fn test_double_join_is_rejected() {
    let config = RoomConfig::default();
    let (room, _notices) = test_room(&config);
    let (tx, _rx) = client();
    room.join(PlayerId(1), "Ana", tx.clone()).await.unwrap();
    let result = room.join(PlayerId(1), "Ana", tx).await;
    assert!(matches!(result, Err(GameError::AlreadyJoined(_))));
}

// =========================================================================
// Game flow
// =========================================================================

async fn seated_pair(
    config: &RoomConfig,
) -> (RoomHandle, EventRx, EventRx) {
    let (room, _notices) = test_room(config);
    let (tx1, mut rx1) = client();
    let (tx2, mut rx2) = client();
    room.join(PlayerId(1), "Ana", tx1).await.unwrap();
    room.join(PlayerId(2), "Ben", tx2).await.unwrap();
    next_event(&mut rx1).await; // room_created
    next_event(&mut rx1).await; // player_joined
    next_event(&mut rx2).await; // room_joined
    (room, rx1, rx2)
}

#[tokio::test]
async fn test_non_host_cannot_start() {
    let config = RoomConfig::default();
    let (room, _rx1, mut rx2) = seated_pair(&config).await;
    room.act(PlayerId(2), RoomAction::StartGame(GameSettings::default()))
        .await;
    let event = next_event(&mut rx2).await;
    match event {
        ServerEvent::Error { message } => {
            assert_eq!(message, "only the host can do that")
        }
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_broadcasts_game_started_and_timer() {
    let config = RoomConfig::default();
    let (room, mut rx1, mut rx2) = seated_pair(&config).await;
    room.act(PlayerId(1), RoomAction::StartGame(GameSettings::default()))
        .await;

    for rx in [&mut rx1, &mut rx2] {
        let started = next_event(rx).await;
        match started {
            ServerEvent::GameStarted { current_player, player_colors, .. } => {
                // Auto-assignment: Ana red, Ben green; green starts
                // (alphabetically first of the claimed colors).
                assert_eq!(player_colors.red, Some(PlayerId(1)));
                assert_eq!(player_colors.green, Some(PlayerId(2)));
                assert_eq!(current_player, Color::Green);
            }
            other => panic!("expected game_started, got {other:?}"),
        }
        let timer = next_event(rx).await;
        assert!(matches!(
            timer,
            ServerEvent::TurnTimerStart { color: Color::Green, .. }
        ));
    }
}

#[tokio::test]
async fn test_roll_then_resolve_turn() {
    let config = RoomConfig::default();
    let (room, _rx1, mut rx2) = seated_pair(&config).await;
    room.act(PlayerId(1), RoomAction::StartGame(GameSettings::default()))
        .await;
    next_event(&mut rx2).await; // game_started
    next_event(&mut rx2).await; // turn_timer_start

    // Green (Ben) is up.
    room.act(PlayerId(2), RoomAction::RollDice).await;
    let rolled = next_event(&mut rx2).await;
    let value = match rolled {
        ServerEvent::DiceRolled { value, color: Color::Green, auto, .. } => {
            assert!(!auto);
            assert!((1..=6).contains(&value));
            value
        }
        other => panic!("expected dice_rolled, got {other:?}"),
    };

    if value == 6 {
        // A base token can enter the ring.
        room.act(PlayerId(2), RoomAction::MoveToken {
            color: Color::Green,
            token_index: 0,
            dice_value: 6,
        })
        .await;
        let moved = next_event(&mut rx2).await;
        assert!(matches!(
            moved,
            ServerEvent::TokenMoved { new_step: 0, .. }
        ));
        // A six keeps the turn.
        let turn = next_event(&mut rx2).await;
        assert!(matches!(
            turn,
            ServerEvent::PlayerTurn { color: Color::Green, .. }
        ));
    } else {
        // Everything is in base; pass.
        room.act(
            PlayerId(2),
            RoomAction::NoMovePossible(Color::Green),
        )
        .await;
        let passed = next_event(&mut rx2).await;
        assert!(matches!(
            passed,
            ServerEvent::NoMoveConfirmed {
                player_color: Color::Green,
                next_player: Color::Red,
            }
        ));
        let turn = next_event(&mut rx2).await;
        assert!(matches!(
            turn,
            ServerEvent::PlayerTurn { color: Color::Red, .. }
        ));
    }
}

#[tokio::test]
async fn test_rolling_out_of_turn_is_an_error_event() {
    let config = RoomConfig::default();
    let (room, mut rx1, _rx2) = seated_pair(&config).await;
    room.act(PlayerId(1), RoomAction::StartGame(GameSettings::default()))
        .await;
    next_event(&mut rx1).await; // game_started
    next_event(&mut rx1).await; // turn_timer_start

    // Green starts, so Ana (red) is out of turn.
    room.act(PlayerId(1), RoomAction::RollDice).await;
    let event = next_event(&mut rx1).await;
    assert!(matches!(event, ServerEvent::Error { .. }));
}

// =========================================================================
// Turn timer
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_turn_is_played_automatically() {
    let config = RoomConfig {
        turn_timeout: Duration::from_millis(100),
        ..RoomConfig::default()
    };
    let (room, _rx1, mut rx2) = seated_pair(&config).await;
    room.act(PlayerId(1), RoomAction::StartGame(GameSettings::default()))
        .await;

    // Nobody acts; the timer must roll for green.
    let rolled = event_where(&mut rx2, |e| {
        matches!(e, ServerEvent::DiceRolled { .. })
    })
    .await;
    assert!(matches!(
        rolled,
        ServerEvent::DiceRolled { auto: true, color: Color::Green, .. }
    ));

    // The forced roll resolves into a move or a pass, then a new turn
    // with a fresh countdown.
    let timer = event_where(&mut rx2, |e| {
        matches!(e, ServerEvent::TurnTimerStart { .. })
    })
    .await;
    assert!(matches!(timer, ServerEvent::TurnTimerStart { .. }));
}

// =========================================================================
// Quick-play seeding
// =========================================================================

#[tokio::test]
async fn test_seed_seats_batch_with_first_as_host() {
    let config = RoomConfig::default();
    let (room, _notices) = test_room(&config);
    let mut rxs = Vec::new();
    let mut batch = Vec::new();
    for i in 1..=4 {
        let (tx, rx) = client();
        batch.push((PlayerId(i), String::new(), tx));
        rxs.push(rx);
    }
    room.seed(batch).await.unwrap();

    let host_event = next_event(&mut rxs[0]).await;
    match host_event {
        ServerEvent::RoomCreated { is_host, players, player_count, .. } => {
            assert!(is_host);
            assert_eq!(player_count, 4);
            // Names default by seat and everyone is pre-readied.
            assert_eq!(players[0].name, "Player 1");
            assert!(players.iter().all(|p| p.ready));
        }
        other => panic!("expected room_created, got {other:?}"),
    }
    for rx in rxs.iter_mut().skip(1) {
        let event = next_event(rx).await;
        assert!(matches!(
            event,
            ServerEvent::RoomJoined { is_host: false, player_count: 4, .. }
        ));
    }
}

// =========================================================================
// Departures and notices
// =========================================================================

#[tokio::test]
async fn test_last_leave_reports_room_empty() {
    let config = RoomConfig::default();
    let (room, mut notices) = test_room(&config);
    let (tx, _rx) = client();
    room.join(PlayerId(1), "Ana", tx).await.unwrap();
    room.leave(PlayerId(1)).await;

    let notice = tokio::time::timeout(
        Duration::from_secs(5),
        notices.recv(),
    )
    .await
    .expect("timed out")
    .expect("notice channel closed");
    assert_eq!(
        notice,
        RegistryNotice::RoomEmpty(RoomCode::parse("TEST01").unwrap())
    );
}

#[tokio::test]
async fn test_leave_promotes_new_host() {
    let config = RoomConfig::default();
    let (room, mut rx1, mut rx2) = seated_pair(&config).await;
    room.leave(PlayerId(1)).await;
    drop(rx1);

    let event = next_event(&mut rx2).await;
    match event {
        ServerEvent::PlayerLeft { new_host, players, .. } => {
            assert_eq!(new_host, PlayerId(2));
            assert!(players[0].is_host);
        }
        other => panic!("expected player_left, got {other:?}"),
    }
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_registry_create_lookup_destroy() {
    let (notice_tx, _notice_rx) = mpsc::unbounded_channel();
    let mut registry =
        RoomRegistry::new(RoomConfig::default(), notice_tx);
    let handle = registry.create(false);
    let code = handle.code().clone();

    assert!(registry.get(&code).is_some());
    assert_eq!(registry.room_count(), 1);

    registry.bind(PlayerId(1), code.clone());
    assert_eq!(registry.room_of(PlayerId(1)), Some(code.clone()));

    registry.destroy(&code).await;
    assert!(registry.get(&code).is_none());
    assert_eq!(registry.room_of(PlayerId(1)), None);
}

#[tokio::test]
async fn test_public_list_hides_private_started_and_empty_rooms() {
    let (notice_tx, _notice_rx) = mpsc::unbounded_channel();
    let mut registry =
        RoomRegistry::new(RoomConfig::default(), notice_tx);

    let _private = registry.create(false);
    let empty_public = registry.create(true);
    let open_public = registry.create(true);

    let (tx, _rx) = client();
    open_public.join(PlayerId(1), "Ana", tx).await.unwrap();

    let list = registry.list_public_open().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].room_id, *open_public.code());
    assert_eq!(list[0].host_name, "Ana");
    assert_eq!(list[0].player_count, 1);
    assert_ne!(list[0].room_id, *empty_public.code());
}

#[tokio::test]
async fn test_public_list_keeps_full_lobbies() {
    let (notice_tx, _notice_rx) = mpsc::unbounded_channel();
    let mut registry =
        RoomRegistry::new(RoomConfig::default(), notice_tx);

    let room = registry.create(true);
    let mut receivers = Vec::new();
    for (id, name) in
        [(1, "Ana"), (2, "Ben"), (3, "Cem"), (4, "Dia")]
    {
        let (tx, rx) = client();
        room.join(PlayerId(id), name, tx).await.unwrap();
        receivers.push(rx);
    }

    // Four seats taken, game not started: still visible to browsers.
    let list = registry.list_public_open().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].player_count, 4);
    assert_eq!(list[0].max_players, 4);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_deletes_old_empty_rooms_only() {
    let (notice_tx, _notice_rx) = mpsc::unbounded_channel();
    let mut registry =
        RoomRegistry::new(RoomConfig::default(), notice_tx);

    let abandoned = registry.create(false);
    let occupied = registry.create(false);
    let (tx, _rx) = client();
    occupied.join(PlayerId(1), "Ana", tx).await.unwrap();

    // Young rooms survive.
    assert_eq!(registry.sweep_stale().await, 0);

    tokio::time::advance(Duration::from_secs(3 * 60 * 60)).await;
    assert_eq!(registry.sweep_stale().await, 1);
    assert!(registry.get(abandoned.code()).is_none());
    assert!(registry.get(occupied.code()).is_some());
}
