//! Room and game rule errors.
//!
//! Every variant maps to an `error` event on the wire; the `Display`
//! string is exactly what the client sees.

use ludod_board::Color;
use ludod_protocol::RoomCode;
use thiserror::Error;

/// A rejected room or game action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("already joined room {0}")]
    AlreadyJoined(RoomCode),

    #[error("only the host can do that")]
    NotHost,

    #[error("game already started")]
    GameAlreadyStarted,

    #[error("game not started")]
    GameNotStarted,

    #[error("not your turn")]
    NotYourTurn,

    #[error("dice already rolled this turn")]
    AlreadyRolled,

    #[error("dice value {0} does not match the roll")]
    InvalidDiceValue(u8),

    #[error("color {0} is already taken")]
    ColorTaken(Color),

    #[error("color {0} is not available in a two-player game")]
    ColorRestricted(Color),

    #[error("that move is not legal")]
    IllegalMove,

    #[error("need at least two players to start")]
    InsufficientPlayers,

    #[error("no colors left to assign")]
    NoColorsAvailable,

    #[error("max players must be 2 or 4, got {0}")]
    InvalidMaxPlayers(usize),
}
