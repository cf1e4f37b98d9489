//! The room actor.
//!
//! Each room runs as one task owning its [`Room`] state, turn timer, and
//! the per-player event senders. Commands arrive over an mpsc channel via
//! [`RoomHandle`]; replies that need one travel back over oneshots. All
//! state mutation happens on this task, so game rules never race.
//!
//! The actor cannot reach clients outside the room (the public room list
//! goes to everyone connected), so it reports those changes as
//! [`RegistryNotice`]s for the server's coordinator task to act on.

use std::collections::HashMap;

use ludod_board::Color;
use ludod_protocol::{GameSettings, PlayerId, RoomCode, ServerEvent};
use ludod_timer::TurnTimer;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::config::RoomConfig;
use crate::engine::{self, Effects, Recipient, TimerDirective};
use crate::error::GameError;
use crate::state::Room;

/// Per-player outbound event channel, registered at join.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

/// Out-of-room consequences the server layer must handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryNotice {
    /// The public room list changed; re-broadcast it to everyone.
    PublicRoomsChanged,
    /// The last player left; the registry should drop the room.
    RoomEmpty(RoomCode),
}

/// A player action inside a room, already stripped of its room id.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomAction {
    SelectColor(Color),
    SetPublic(bool),
    SetMaxPlayers(usize),
    StartGame(GameSettings),
    RestartGame,
    RollDice,
    MoveToken {
        color: Color,
        token_index: usize,
        dice_value: u8,
    },
    NoMovePossible(Color),
}

/// Registry-facing snapshot of a room.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub player_count: usize,
    pub max_players: usize,
    pub is_public: bool,
    pub started: bool,
    pub host_name: Option<String>,
}

enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: ClientSender,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    /// Seat a matched batch at once: first entry is host, all ready.
    Seed {
        players: Vec<(PlayerId, String, ClientSender)>,
        reply: oneshot::Sender<()>,
    },
    Act {
        player_id: PlayerId,
        action: RoomAction,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<()>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Cheap clonable handle to a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats a player and registers their event channel.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: &str,
        sender: ClientSender,
    ) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        let cmd = RoomCommand::Join {
            player_id,
            name: name.to_string(),
            sender,
            reply,
        };
        if self.sender.send(cmd).await.is_err() {
            return Err(GameError::RoomNotFound(self.code.clone()));
        }
        rx.await
            .unwrap_or(Err(GameError::RoomNotFound(self.code.clone())))
    }

    /// Seats a matched quick-play batch in one step.
    pub async fn seed(
        &self,
        players: Vec<(PlayerId, String, ClientSender)>,
    ) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        let cmd = RoomCommand::Seed { players, reply };
        if self.sender.send(cmd).await.is_err() {
            return Err(GameError::RoomNotFound(self.code.clone()));
        }
        rx.await
            .map_err(|_| GameError::RoomNotFound(self.code.clone()))
    }

    /// Submits a player action. Rule violations come back to the player
    /// as `error` events, not through this call.
    pub async fn act(&self, player_id: PlayerId, action: RoomAction) {
        let _ = self
            .sender
            .send(RoomCommand::Act { player_id, action })
            .await;
    }

    /// Removes a player; resolves once the departure is processed.
    pub async fn leave(&self, player_id: PlayerId) {
        let (reply, rx) = oneshot::channel();
        let cmd = RoomCommand::Leave { player_id, reply };
        if self.sender.send(cmd).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn info(&self) -> Option<RoomInfo> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(RoomCommand::Info { reply }).await.ok()?;
        rx.await.ok()
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }
}

/// Spawns a room actor and returns its handle.
pub fn spawn_room(
    code: RoomCode,
    is_public: bool,
    config: &RoomConfig,
    notices: mpsc::UnboundedSender<RegistryNotice>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let actor = RoomActor {
        room: Room::new(code.clone(), is_public),
        senders: HashMap::new(),
        timer: TurnTimer::new(config.turn_timeout),
        pending_game_over: None,
        notices,
        config: config.clone(),
        commands: rx,
    };
    tokio::spawn(actor.run());
    RoomHandle { code, sender: tx }
}

struct RoomActor {
    room: Room,
    senders: HashMap<PlayerId, ClientSender>,
    timer: TurnTimer,
    /// A won game's final broadcast, held back so clients can animate
    /// the winning move first.
    pending_game_over: Option<(Instant, ServerEvent)>,
    notices: mpsc::UnboundedSender<RegistryNotice>,
    config: RoomConfig,
    commands: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        debug!(room = %self.room.code, "room actor started");
        loop {
            let game_over_at =
                self.pending_game_over.as_ref().map(|(at, _)| *at);
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    None | Some(RoomCommand::Shutdown) => break,
                    Some(cmd) => self.handle(cmd),
                },
                _ = self.timer.expired() => self.on_turn_expired(),
                _ = due(game_over_at) => self.fire_game_over(),
            }
        }
        debug!(room = %self.room.code, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { player_id, name, sender, reply } => {
                let result = self.seat_player(player_id, &name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Seed { players, reply } => {
                self.seed_players(players);
                let _ = reply.send(());
            }
            RoomCommand::Act { player_id, action } => {
                self.act(player_id, action);
            }
            RoomCommand::Leave { player_id, reply } => {
                self.remove_player(player_id);
                let _ = reply.send(());
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(RoomInfo {
                    code: self.room.code.clone(),
                    player_count: self.room.player_count(),
                    max_players: self.room.max_players,
                    is_public: self.room.is_public,
                    started: self.room.game.started,
                    host_name: self.room.host().map(|h| h.name.clone()),
                });
            }
            // Handled in the run loop.
            RoomCommand::Shutdown => {}
        }
    }

    fn seat_player(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: ClientSender,
    ) -> Result<(), GameError> {
        if self.room.contains(player_id) {
            return Err(GameError::AlreadyJoined(self.room.code.clone()));
        }
        if self.room.game.started {
            return Err(GameError::GameAlreadyStarted);
        }
        if self.room.is_full() {
            return Err(GameError::RoomFull(self.room.code.clone()));
        }

        self.room.seat(player_id, name, false);
        self.senders.insert(player_id, sender);

        let creator = self.room.player_count() == 1;
        if creator {
            self.route(
                Recipient::Player(player_id),
                ServerEvent::RoomCreated {
                    room_id: self.room.code.clone(),
                    players: self.room.snapshots(),
                    player_count: 1,
                    max_players: self.room.max_players,
                    is_public: self.room.is_public,
                    is_host: true,
                },
            );
        } else {
            self.route(
                Recipient::Player(player_id),
                ServerEvent::RoomJoined {
                    room_id: self.room.code.clone(),
                    players: self.room.snapshots(),
                    player_count: self.room.player_count(),
                    player_colors: self.room.game.player_colors,
                    max_players: self.room.max_players,
                    is_public: self.room.is_public,
                    is_host: false,
                },
            );
            self.route(
                Recipient::AllExcept(player_id),
                ServerEvent::PlayerJoined {
                    room_id: self.room.code.clone(),
                    players: self.room.snapshots(),
                    player_count: self.room.player_count(),
                    player_colors: self.room.game.player_colors,
                    max_players: self.room.max_players,
                    is_public: self.room.is_public,
                },
            );
        }
        if self.room.is_public {
            let _ = self.notices.send(RegistryNotice::PublicRoomsChanged);
        }
        info!(room = %self.room.code, player = %player_id, "player joined");
        Ok(())
    }

    fn seed_players(
        &mut self,
        players: Vec<(PlayerId, String, ClientSender)>,
    ) {
        for (player_id, name, sender) in players {
            self.room.seat(player_id, &name, true);
            self.senders.insert(player_id, sender);
        }
        // Everyone gets the same full snapshot; only the host flag and
        // event name differ.
        let snapshots = self.room.snapshots();
        let order = self.room.seating_order();
        for (i, player_id) in order.into_iter().enumerate() {
            let event = if i == 0 {
                ServerEvent::RoomCreated {
                    room_id: self.room.code.clone(),
                    players: snapshots.clone(),
                    player_count: self.room.player_count(),
                    max_players: self.room.max_players,
                    is_public: self.room.is_public,
                    is_host: true,
                }
            } else {
                ServerEvent::RoomJoined {
                    room_id: self.room.code.clone(),
                    players: snapshots.clone(),
                    player_count: self.room.player_count(),
                    player_colors: self.room.game.player_colors,
                    max_players: self.room.max_players,
                    is_public: self.room.is_public,
                    is_host: false,
                }
            };
            self.route(Recipient::Player(player_id), event);
        }
        info!(
            room = %self.room.code,
            players = self.room.player_count(),
            "quick-play room seeded"
        );
    }

    fn act(&mut self, player_id: PlayerId, action: RoomAction) {
        if !self.room.contains(player_id) {
            debug!(room = %self.room.code, player = %player_id,
                "action from non-member dropped");
            return;
        }
        let result = match action {
            RoomAction::SelectColor(color) => {
                engine::select_color(&mut self.room, player_id, color)
            }
            RoomAction::SetPublic(is_public) => {
                engine::set_public(&mut self.room, player_id, is_public)
            }
            RoomAction::SetMaxPlayers(n) => {
                engine::set_max_players(&mut self.room, player_id, n)
            }
            RoomAction::StartGame(settings) => {
                engine::start_game(&mut self.room, player_id, settings)
            }
            RoomAction::RestartGame => {
                engine::restart_game(&mut self.room, player_id)
            }
            RoomAction::RollDice => {
                let value = rand::rng().random_range(1..=6);
                engine::roll_dice(&mut self.room, player_id, value, false)
            }
            RoomAction::MoveToken { color, token_index, dice_value } => {
                engine::move_token(
                    &mut self.room,
                    player_id,
                    color,
                    token_index,
                    dice_value,
                )
            }
            RoomAction::NoMovePossible(color) => {
                engine::no_move_possible(&mut self.room, player_id, color)
            }
        };
        match result {
            Ok(fx) => self.apply(fx),
            Err(err) => {
                debug!(room = %self.room.code, player = %player_id, %err,
                    "action rejected");
                self.route(
                    Recipient::Player(player_id),
                    ServerEvent::Error { message: err.to_string() },
                );
            }
        }
    }

    fn remove_player(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
        let fx = engine::leave(&mut self.room, player_id);
        self.apply(fx);
        info!(room = %self.room.code, player = %player_id, "player left");
        if self.room.player_count() == 0 {
            let _ = self
                .notices
                .send(RegistryNotice::RoomEmpty(self.room.code.clone()));
        }
    }

    fn on_turn_expired(&mut self) {
        info!(room = %self.room.code, "turn expired, playing automatically");
        let dice = rand::rng().random_range(1..=6);
        let fx = engine::auto_play(&mut self.room, dice, |n| {
            rand::rng().random_range(0..n)
        });
        self.apply(fx);
    }

    fn fire_game_over(&mut self) {
        if let Some((_, event)) = self.pending_game_over.take() {
            info!(room = %self.room.code, "game over");
            self.route(Recipient::All, event);
        }
    }

    /// Plays out one transition's effects: events, timer, deferred
    /// `game_over`, and registry notices.
    fn apply(&mut self, fx: Effects) {
        for (recipient, event) in fx.events {
            self.route(recipient, event);
        }
        match fx.timer {
            TimerDirective::Keep => {}
            TimerDirective::Cancel => self.timer.cancel(),
            TimerDirective::Arm => {
                self.timer.arm();
                if let Some(color) = self.room.game.current_player {
                    self.route(
                        Recipient::All,
                        ServerEvent::TurnTimerStart {
                            duration: self
                                .config
                                .turn_timeout
                                .as_millis()
                                as u64,
                            color,
                        },
                    );
                }
            }
        }
        if fx.game_over_voided {
            self.pending_game_over = None;
        }
        if let Some(event) = fx.game_over {
            self.pending_game_over = Some((
                Instant::now() + self.config.game_over_delay,
                event,
            ));
        }
        if fx.rooms_changed {
            let _ = self.notices.send(RegistryNotice::PublicRoomsChanged);
        }
    }

    fn route(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for sender in self.senders.values() {
                    let _ = sender.send(event.clone());
                }
            }
            Recipient::Player(id) => {
                if let Some(sender) = self.senders.get(&id) {
                    let _ = sender.send(event);
                }
            }
            Recipient::AllExcept(skip) => {
                for (id, sender) in &self.senders {
                    if *id != skip {
                        let _ = sender.send(event.clone());
                    }
                }
            }
        }
    }
}

/// Pends forever while there is no deadline.
async fn due(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
