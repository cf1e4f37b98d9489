//! The turn state machine.
//!
//! Pure room-state transitions: every function takes `&mut Room`, checks
//! the rule guards, mutates, and returns the [`Effects`] the actor should
//! apply — events to route, what to do with the turn timer, and whether
//! the public room list changed. No I/O happens here, which is what makes
//! the rules unit-testable without spawning actors.
//!
//! Dice values come in as arguments rather than being rolled here, so
//! tests drive exact sequences; the actor supplies `rand` at the edge.

use ludod_board::{self as board, Color};
use ludod_protocol::{GameSettings, PlayerId, ServerEvent};

use crate::error::GameError;
use crate::state::{GameState, Room};

/// Who an event goes to. The actor resolves this against its sender map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recipient {
    All,
    Player(PlayerId),
    AllExcept(PlayerId),
}

/// What the actor should do with the room's turn timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TimerDirective {
    #[default]
    Keep,
    Arm,
    Cancel,
}

/// The outward-visible consequences of one state transition.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Effects {
    pub events: Vec<(Recipient, ServerEvent)>,
    pub timer: TimerDirective,
    /// A `game_over` to broadcast after the configured delay.
    pub game_over: Option<ServerEvent>,
    /// A new game launched; any still-pending `game_over` is stale and
    /// must not fire into it.
    pub game_over_voided: bool,
    /// The public room list needs re-broadcasting.
    pub rooms_changed: bool,
}

impl Effects {
    fn none() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Lobby operations
// ---------------------------------------------------------------------------

pub(crate) fn select_color(
    room: &mut Room,
    player_id: PlayerId,
    color: Color,
) -> Result<Effects, GameError> {
    if room.game.started {
        return Err(GameError::GameAlreadyStarted);
    }
    if let Some(owner) = room.game.player_colors[color] {
        if owner != player_id {
            return Err(GameError::ColorTaken(color));
        }
    }
    if room.max_players == 2 {
        if let Some(required) = pair_requirement(room, player_id) {
            if color != required {
                return Err(GameError::ColorRestricted(color));
            }
        }
    }
    room.claim_color(player_id, color);

    let mut fx = Effects::none();
    fx.events.push((
        Recipient::All,
        ServerEvent::ColorSelected {
            player_id,
            color,
            players: room.snapshots(),
            player_colors: room.game.player_colors,
        },
    ));
    Ok(fx)
}

/// In a two-player room, once any color is claimed by someone else the
/// only remaining legal pick is its fixed partner.
fn pair_requirement(room: &Room, player_id: PlayerId) -> Option<Color> {
    Color::ALL
        .into_iter()
        .find(|&c| {
            matches!(room.game.player_colors[c], Some(owner) if owner != player_id)
        })
        .map(Color::partner)
}

pub(crate) fn set_public(
    room: &mut Room,
    player_id: PlayerId,
    is_public: bool,
) -> Result<Effects, GameError> {
    require_host(room, player_id)?;
    if room.game.started {
        return Err(GameError::GameAlreadyStarted);
    }
    let was_public = room.is_public;
    room.is_public = is_public;

    let mut fx = Effects::none();
    fx.rooms_changed = was_public || is_public;
    fx.events.push((Recipient::All, room_updated(room)));
    Ok(fx)
}

pub(crate) fn set_max_players(
    room: &mut Room,
    player_id: PlayerId,
    max_players: usize,
) -> Result<Effects, GameError> {
    require_host(room, player_id)?;
    if room.game.started {
        return Err(GameError::GameAlreadyStarted);
    }
    if !matches!(max_players, 2 | 4) || room.player_count() > max_players {
        return Err(GameError::InvalidMaxPlayers(max_players));
    }
    room.max_players = max_players;

    let mut fx = Effects::none();
    fx.rooms_changed = room.is_public;
    fx.events.push((Recipient::All, room_updated(room)));
    Ok(fx)
}

fn room_updated(room: &Room) -> ServerEvent {
    ServerEvent::RoomUpdated {
        room_id: room.code.clone(),
        is_public: room.is_public,
        max_players: room.max_players,
    }
}

fn require_host(room: &Room, player_id: PlayerId) -> Result<(), GameError> {
    match room.host() {
        Some(host) if host.id == player_id => Ok(()),
        _ => Err(GameError::NotHost),
    }
}

// ---------------------------------------------------------------------------
// Game start / restart
// ---------------------------------------------------------------------------

pub(crate) fn start_game(
    room: &mut Room,
    player_id: PlayerId,
    settings: GameSettings,
) -> Result<Effects, GameError> {
    require_host(room, player_id)?;
    if room.game.started {
        return Err(GameError::GameAlreadyStarted);
    }
    if room.player_count() < 2 {
        return Err(GameError::InsufficientPlayers);
    }
    assign_missing_colors(room)?;
    room.game.reset_board(settings);
    launch(room)
}

/// Restart keeps color claims and settings; everything else resets.
pub(crate) fn restart_game(
    room: &mut Room,
    player_id: PlayerId,
) -> Result<Effects, GameError> {
    require_host(room, player_id)?;
    if room.game.active_colors().len() < 2 {
        return Err(GameError::InsufficientPlayers);
    }
    let settings = room.game.settings;
    room.game.reset_board(settings);
    launch(room)
}

fn assign_missing_colors(room: &mut Room) -> Result<(), GameError> {
    let unassigned: Vec<PlayerId> = room
        .seating_order()
        .into_iter()
        .filter(|id| {
            room.players.get(id).is_some_and(|p| p.color.is_none())
        })
        .collect();
    for id in unassigned {
        let color =
            free_color(room).ok_or(GameError::NoColorsAvailable)?;
        room.claim_color(id, color);
    }
    Ok(())
}

fn free_color(room: &Room) -> Option<Color> {
    if room.max_players == 2 {
        // Pairing constraint: the second seat gets the partner color.
        if let Some(claimed) = Color::ALL
            .into_iter()
            .find(|&c| room.game.player_colors[c].is_some())
        {
            let partner = claimed.partner();
            return room.game.player_colors[partner]
                .is_none()
                .then_some(partner);
        }
    }
    Color::ALL
        .into_iter()
        .find(|&c| room.game.player_colors[c].is_none())
}

fn launch(room: &mut Room) -> Result<Effects, GameError> {
    room.game.started = true;
    let first = first_turn_color(&room.game)
        .ok_or(GameError::InsufficientPlayers)?;
    room.game.current_player = Some(first);

    let mut fx = Effects::none();
    fx.game_over_voided = true;
    // Starting takes the room off the public list for good.
    fx.rooms_changed = room.is_public;
    room.is_public = false;
    fx.events.push((
        Recipient::All,
        ServerEvent::GameStarted {
            settings: room.game.settings,
            player_colors: room.game.player_colors,
            current_player: first,
            tokens: room.game.tokens,
        },
    ));
    fx.timer = TimerDirective::Arm;
    Ok(fx)
}

/// First turn goes to the alphabetically-first claimed color.
fn first_turn_color(game: &GameState) -> Option<Color> {
    const ALPHABETICAL: [Color; 4] =
        [Color::Blue, Color::Green, Color::Red, Color::Yellow];
    ALPHABETICAL
        .into_iter()
        .find(|&c| game.player_colors[c].is_some())
}

// ---------------------------------------------------------------------------
// Turn actions
// ---------------------------------------------------------------------------

pub(crate) fn roll_dice(
    room: &mut Room,
    player_id: PlayerId,
    value: u8,
    auto: bool,
) -> Result<Effects, GameError> {
    let color = turn_color_of(room, player_id)?;
    if room.game.dice_value != 0 {
        return Err(GameError::AlreadyRolled);
    }
    room.game.dice_value = value;

    let mut fx = Effects::none();
    fx.events.push((
        Recipient::All,
        ServerEvent::DiceRolled {
            player_id,
            color,
            name: room.player_name(player_id),
            value,
            auto,
        },
    ));
    // The countdown ends once the player acts; no timer runs while they
    // choose a token.
    fx.timer = TimerDirective::Cancel;
    Ok(fx)
}

pub(crate) fn move_token(
    room: &mut Room,
    player_id: PlayerId,
    color: Color,
    token_index: usize,
    dice_value: u8,
) -> Result<Effects, GameError> {
    let current = turn_color_of(room, player_id)?;
    if color != current {
        return Err(GameError::NotYourTurn);
    }
    if room.game.dice_value == 0 || dice_value != room.game.dice_value {
        return Err(GameError::InvalidDiceValue(dice_value));
    }
    if token_index >= 4 {
        return Err(GameError::IllegalMove);
    }
    apply_move(room, color, token_index)
}

/// The current player claims no token can move with the stored roll.
///
/// The claim is trusted (clients compute legality themselves); the turn
/// passes with no extra-turn bonus even on a six.
pub(crate) fn no_move_possible(
    room: &mut Room,
    player_id: PlayerId,
    claimed_color: Color,
) -> Result<Effects, GameError> {
    let current = turn_color_of(room, player_id)?;
    if claimed_color != current {
        return Err(GameError::NotYourTurn);
    }
    let mut fx = Effects::none();
    forced_pass(room, current, &mut fx);
    Ok(fx)
}

fn turn_color_of(
    room: &Room,
    player_id: PlayerId,
) -> Result<Color, GameError> {
    if !room.game.started {
        return Err(GameError::GameNotStarted);
    }
    let current =
        room.game.current_player.ok_or(GameError::GameNotStarted)?;
    if room.game.player_colors[current] != Some(player_id) {
        return Err(GameError::NotYourTurn);
    }
    Ok(current)
}

/// Resolves a validated move of the current color with the stored roll.
///
/// Handles capture, the extra-turn bonus (six or capture), the win
/// check, and turn advancement.
fn apply_move(
    room: &mut Room,
    color: Color,
    token_index: usize,
) -> Result<Effects, GameError> {
    let dice = room.game.dice_value;
    let step = room.game.tokens[color][token_index];
    let dest = board::destination(
        step,
        dice,
        room.game.settings.cut_to_home,
        room.game.cut_status[color],
    )
    .ok_or(GameError::IllegalMove)?;

    let mut captured = false;
    if let Some(cell) = board::absolute_cell(color, dest) {
        for (victim, idx) in
            board::capture_targets(&room.game.tokens, color, cell)
        {
            room.game.tokens[victim][idx] = board::BASE;
            captured = true;
        }
    }
    if captured {
        room.game.cut_status[color] = true;
    }
    room.game.tokens[color][token_index] = dest;

    let player_id =
        room.game.player_colors[color].ok_or(GameError::NotYourTurn)?;

    let mut fx = Effects::none();
    fx.events.push((
        Recipient::All,
        ServerEvent::TokenMoved {
            player_id,
            color,
            token_index,
            new_step: dest,
            dice_value: dice,
            tokens: room.game.tokens,
            kill_occurred: captured,
        },
    ));

    if board::all_home(&room.game.tokens[color]) {
        let winner_name = room.player_name(player_id);
        room.game.started = false;
        room.game.current_player = None;
        room.game.dice_value = 0;
        fx.timer = TimerDirective::Cancel;
        fx.game_over = Some(ServerEvent::GameOver {
            winner: player_id,
            winner_name,
            winner_color: color,
        });
        return Ok(fx);
    }

    room.game.dice_value = 0;
    if captured || dice == 6 {
        // Extra turn: same player rolls again, fresh countdown.
        fx.events.extend(player_turn_event(room, color));
    } else if let Some(next) = room.game.next_active_color(color) {
        room.game.current_player = Some(next);
        fx.events.extend(player_turn_event(room, next));
    }
    fx.timer = TimerDirective::Arm;
    Ok(fx)
}

/// Passes the turn from `color` without any bonus.
fn forced_pass(room: &mut Room, color: Color, fx: &mut Effects) {
    let Some(next) = room.game.next_active_color(color) else {
        return;
    };
    fx.events.push((
        Recipient::All,
        ServerEvent::NoMoveConfirmed {
            player_color: color,
            next_player: next,
        },
    ));
    room.game.dice_value = 0;
    room.game.current_player = Some(next);
    fx.events.extend(player_turn_event(room, next));
    fx.timer = TimerDirective::Arm;
}

fn player_turn_event(
    room: &Room,
    color: Color,
) -> Option<(Recipient, ServerEvent)> {
    let player_id = room.game.player_colors[color]?;
    Some((
        Recipient::All,
        ServerEvent::PlayerTurn {
            color,
            player_id,
            name: room.player_name(player_id),
        },
    ))
}

// ---------------------------------------------------------------------------
// Timer expiry
// ---------------------------------------------------------------------------

/// Plays the expired turn on the current player's behalf.
///
/// Rolls `dice` if they had not rolled, then moves a uniformly chosen
/// legal token via `pick` (given the candidate count, returns an index
/// into it), or passes when nothing can move. Infallible: an expired
/// timer on a finished or empty game is simply ignored.
pub(crate) fn auto_play(
    room: &mut Room,
    dice: u8,
    mut pick: impl FnMut(usize) -> usize,
) -> Effects {
    let mut fx = Effects::none();
    if !room.game.started {
        return fx;
    }
    let Some(color) = room.game.current_player else {
        return fx;
    };
    let Some(player_id) = room.game.player_colors[color] else {
        return fx;
    };

    if room.game.dice_value == 0 {
        room.game.dice_value = dice;
        fx.events.push((
            Recipient::All,
            ServerEvent::DiceRolled {
                player_id,
                color,
                name: room.player_name(player_id),
                value: dice,
                auto: true,
            },
        ));
    }

    let roll = room.game.dice_value;
    let legal = board::legal_moves(
        &room.game.tokens[color],
        roll,
        room.game.settings.cut_to_home,
        room.game.cut_status[color],
    );
    if legal.is_empty() {
        forced_pass(room, color, &mut fx);
        return fx;
    }

    let token_index = legal[pick(legal.len()) % legal.len()];
    match apply_move(room, color, token_index) {
        Ok(move_fx) => {
            fx.events.extend(move_fx.events);
            fx.timer = move_fx.timer;
            fx.game_over = move_fx.game_over;
            fx.rooms_changed |= move_fx.rooms_changed;
        }
        // Candidates were pre-filtered; if the move still fails, pass
        // rather than wedge the turn.
        Err(_) => forced_pass(room, color, &mut fx),
    }
    fx
}

// ---------------------------------------------------------------------------
// Departure
// ---------------------------------------------------------------------------

/// Removes a player, promoting a new host and advancing the turn when
/// the departing player held it. Infallible; unknown ids are a no-op.
pub(crate) fn leave(room: &mut Room, player_id: PlayerId) -> Effects {
    let mut fx = Effects::none();
    let Some(player) = room.remove_player(player_id) else {
        return fx;
    };
    fx.rooms_changed = room.is_public;

    if room.player_count() == 0 {
        // Actor tears the room down; nobody left to notify.
        fx.timer = TimerDirective::Cancel;
        return fx;
    }
    let Some(new_host) = room.host().map(|h| h.id) else {
        return fx;
    };

    let held_turn = room.game.started
        && player.color.is_some()
        && room.game.current_player == player.color;

    fx.events.push((
        Recipient::All,
        ServerEvent::PlayerLeft {
            left_player_id: player.id,
            left_player_name: player.name.clone(),
            players: room.snapshots(),
            player_count: room.player_count(),
            player_colors: room.game.player_colors,
            max_players: room.max_players,
            new_host,
        },
    ));

    if room.game.started {
        if room.game.active_colors().is_empty() {
            // Every remaining player is colorless; the game cannot go on.
            room.game.started = false;
            room.game.current_player = None;
            room.game.dice_value = 0;
            fx.timer = TimerDirective::Cancel;
        } else if held_turn {
            room.game.dice_value = 0;
            if let Some(prev) = player.color {
                if let Some(next) = room.game.next_active_color(prev) {
                    room.game.current_player = Some(next);
                    fx.events.extend(player_turn_event(room, next));
                    fx.timer = TimerDirective::Arm;
                }
            }
        }
    }
    fx
}

// =========================================================================
// Tests
// =========================================================================
