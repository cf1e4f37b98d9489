//! Wire types: identities, requests, and events.

use std::fmt;

use ludod_board::{Color, ColorMap, TokenTable};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identity: the opaque connection id assigned on accept.
///
/// There is no authentication — a player exists exactly as long as their
/// connection does. Serializes as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Alphabet room codes are drawn from (36 symbols).
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a room code.
pub const CODE_LEN: usize = 6;

/// A six-character room code from `[A-Z0-9]`.
///
/// Lookup is case-insensitive: codes are normalized to uppercase when
/// parsed, so `abc123` and `ABC123` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Parses and normalizes a room code.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() != CODE_LEN
            || !code.bytes().all(|b| CODE_ALPHABET.contains(&b))
        {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(code))
    }

    /// The normalized code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(raw: String) -> Result<Self, ProtocolError> {
        Self::parse(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> String {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// Game options chosen by the host at start.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// When set, a token may only enter its home stretch after its color
    /// has captured at least one enemy token this game.
    #[serde(default)]
    pub cut_to_home: bool,
}

/// One seated player, as sent in room snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub ready: bool,
    pub color: Option<Color>,
}

/// One entry of the public room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomCode,
    pub host_name: String,
    pub player_count: usize,
    pub max_players: usize,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask for. One JSON object per frame, tagged by
/// `type`. Validation happens here at the boundary: an unknown tag or a
/// malformed room code fails deserialization before any handler runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    CreateRoom {
        player_name: String,
        #[serde(default)]
        is_public: bool,
    },
    JoinRoom {
        room_id: RoomCode,
        player_name: String,
    },
    SelectColor {
        room_id: RoomCode,
        color: Color,
    },
    SetPublic {
        room_id: RoomCode,
        is_public: bool,
    },
    SetMaxPlayers {
        room_id: RoomCode,
        max_players: usize,
    },
    StartGame {
        room_id: RoomCode,
        #[serde(default)]
        settings: GameSettings,
    },
    RestartGame {
        room_id: RoomCode,
    },
    RollDice {
        room_id: RoomCode,
    },
    MoveToken {
        room_id: RoomCode,
        color: Color,
        token_index: usize,
        dice_value: u8,
    },
    NoMovePossible {
        room_id: RoomCode,
        player_color: Color,
    },
    LeaveRoom {
        room_id: RoomCode,
    },
    ListRooms,
    QuickPlay,
    CancelQuickPlay,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

fn is_false(b: &bool) -> bool {
    !*b
}

/// Everything the server can emit. Broadcasts and point-to-point replies
/// share this one enum; the room layer decides who receives what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_id: RoomCode,
        players: Vec<PlayerSnapshot>,
        player_count: usize,
        max_players: usize,
        is_public: bool,
        is_host: bool,
    },
    RoomJoined {
        room_id: RoomCode,
        players: Vec<PlayerSnapshot>,
        player_count: usize,
        player_colors: ColorMap<Option<PlayerId>>,
        max_players: usize,
        is_public: bool,
        is_host: bool,
    },
    PlayerJoined {
        room_id: RoomCode,
        players: Vec<PlayerSnapshot>,
        player_count: usize,
        player_colors: ColorMap<Option<PlayerId>>,
        max_players: usize,
        is_public: bool,
    },
    ColorSelected {
        player_id: PlayerId,
        color: Color,
        players: Vec<PlayerSnapshot>,
        player_colors: ColorMap<Option<PlayerId>>,
    },
    RoomUpdated {
        room_id: RoomCode,
        is_public: bool,
        max_players: usize,
    },
    PublicRoomsList {
        rooms: Vec<RoomSummary>,
    },
    GameStarted {
        settings: GameSettings,
        player_colors: ColorMap<Option<PlayerId>>,
        current_player: Color,
        tokens: TokenTable,
    },
    DiceRolled {
        player_id: PlayerId,
        color: Color,
        name: String,
        value: u8,
        #[serde(default, skip_serializing_if = "is_false")]
        auto: bool,
    },
    TokenMoved {
        player_id: PlayerId,
        color: Color,
        token_index: usize,
        new_step: i8,
        dice_value: u8,
        tokens: TokenTable,
        kill_occurred: bool,
    },
    NoMoveConfirmed {
        player_color: Color,
        next_player: Color,
    },
    PlayerTurn {
        color: Color,
        player_id: PlayerId,
        name: String,
    },
    TurnTimerStart {
        /// Countdown length in milliseconds.
        duration: u64,
        color: Color,
    },
    GameOver {
        winner: PlayerId,
        winner_name: String,
        winner_color: Color,
    },
    PlayerLeft {
        left_player_id: PlayerId,
        left_player_name: String,
        players: Vec<PlayerSnapshot>,
        player_count: usize,
        player_colors: ColorMap<Option<PlayerId>>,
        max_players: usize,
        new_host: PlayerId,
    },
    QuickPlayStatus {
        count: usize,
        max_players: usize,
    },
    Error {
        message: String,
    },
}

// =========================================================================
// Tests
// =========================================================================
