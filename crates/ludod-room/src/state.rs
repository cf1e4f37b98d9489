//! Room and game state.
//!
//! Plain data, no channels: every mutation happens inside the owning
//! room actor, so none of these types need interior mutability.

use std::collections::HashMap;

use ludod_board::{Color, ColorMap, TokenTable, base_table};
use ludod_protocol::{GameSettings, PlayerId, PlayerSnapshot, RoomCode};

/// One seated player.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub ready: bool,
    pub color: Option<Color>,
    /// Join order within the room; drives snapshot ordering and host
    /// succession.
    pub seat: u64,
}

/// The per-game half of a room: tokens, turn, and color claims.
///
/// Reset wholesale on every (re)start; the seating half of [`Room`]
/// survives across games.
#[derive(Debug, Clone)]
pub struct GameState {
    pub tokens: TokenTable,
    pub player_colors: ColorMap<Option<PlayerId>>,
    pub current_player: Option<Color>,
    /// The stored roll for the turn in progress; `0` means "not rolled".
    pub dice_value: u8,
    pub started: bool,
    pub settings: GameSettings,
    /// Per color: has this color captured an enemy token this game?
    /// Gates the home stretch when `settings.cut_to_home` is on.
    pub cut_status: ColorMap<bool>,
}

impl GameState {
    fn new() -> Self {
        Self {
            tokens: base_table(),
            player_colors: ColorMap::default(),
            current_player: None,
            dice_value: 0,
            started: false,
            settings: GameSettings::default(),
            cut_status: ColorMap::default(),
        }
    }

    /// Colors currently claimed by a player, in turn order.
    pub fn active_colors(&self) -> Vec<Color> {
        Color::ALL
            .into_iter()
            .filter(|&c| self.player_colors[c].is_some())
            .collect()
    }

    /// The next claimed color after `current` in the fixed
    /// red → green → yellow → blue cycle.
    pub fn next_active_color(&self, current: Color) -> Option<Color> {
        let mut candidate = current.next();
        for _ in 0..Color::ALL.len() {
            if self.player_colors[candidate].is_some() {
                return Some(candidate);
            }
            candidate = candidate.next();
        }
        None
    }

    /// Puts every token back in base and clears per-game progress.
    ///
    /// Color claims are kept; restart reuses them.
    pub fn reset_board(&mut self, settings: GameSettings) {
        self.tokens = base_table();
        self.cut_status = ColorMap::default();
        self.dice_value = 0;
        self.settings = settings;
    }
}

/// A room: seating plus the game it hosts.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub players: HashMap<PlayerId, Player>,
    pub max_players: usize,
    pub is_public: bool,
    pub game: GameState,
    next_seat: u64,
}

impl Room {
    pub fn new(code: RoomCode, is_public: bool) -> Self {
        Self {
            code,
            players: HashMap::new(),
            max_players: 4,
            is_public,
            game: GameState::new(),
            next_seat: 0,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn player_name(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.values().find(|p| p.is_host)
    }

    /// Seats a new player. The first player in becomes host; an empty
    /// name falls back to `Player N` by seat order.
    pub fn seat(&mut self, id: PlayerId, name: &str, ready: bool) {
        let seat = self.next_seat;
        self.next_seat += 1;
        let name = if name.trim().is_empty() {
            format!("Player {}", self.players.len() + 1)
        } else {
            name.trim().to_string()
        };
        let is_host = self.players.is_empty();
        self.players.insert(
            id,
            Player {
                id,
                name,
                is_host,
                ready,
                color: None,
                seat,
            },
        );
    }

    /// Removes a player, releasing their color claim and promoting the
    /// earliest-seated survivor if the host left.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        if let Some(color) = player.color {
            self.game.player_colors[color] = None;
        }
        if player.is_host {
            if let Some(next) =
                self.players.values_mut().min_by_key(|p| p.seat)
            {
                next.is_host = true;
            }
        }
        Some(player)
    }

    /// Players in join order, as wire snapshots.
    pub fn snapshots(&self) -> Vec<PlayerSnapshot> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.seat);
        players
            .into_iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                is_host: p.is_host,
                ready: p.ready,
                color: p.color,
            })
            .collect()
    }

    /// Players in join order, by id.
    pub fn seating_order(&self) -> Vec<PlayerId> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.seat);
        players.into_iter().map(|p| p.id).collect()
    }

    /// Gives `player` the color, releasing any color they held before.
    ///
    /// The caller has already checked the claim is legal.
    pub fn claim_color(&mut self, player_id: PlayerId, color: Color) {
        if let Some(player) = self.players.get_mut(&player_id) {
            if let Some(old) = player.color.take() {
                self.game.player_colors[old] = None;
            }
            player.color = Some(color);
            self.game.player_colors[color] = Some(player_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new(RoomCode::parse("ABC123").unwrap(), false)
    }

    #[test]
    fn test_first_player_becomes_host() {
        let mut r = room();
        r.seat(PlayerId(1), "Ana", false);
        r.seat(PlayerId(2), "Ben", false);
        assert!(r.players[&PlayerId(1)].is_host);
        assert!(!r.players[&PlayerId(2)].is_host);
    }

    #[test]
    fn test_empty_name_defaults_by_seat() {
        let mut r = room();
        r.seat(PlayerId(1), "", false);
        r.seat(PlayerId(2), "   ", false);
        assert_eq!(r.players[&PlayerId(1)].name, "Player 1");
        assert_eq!(r.players[&PlayerId(2)].name, "Player 2");
    }

    #[test]
    fn test_host_succession_by_join_order() {
        let mut r = room();
        r.seat(PlayerId(1), "Ana", false);
        r.seat(PlayerId(2), "Ben", false);
        r.seat(PlayerId(3), "Cem", false);
        r.remove_player(PlayerId(1));
        assert!(r.players[&PlayerId(2)].is_host);
        assert!(!r.players[&PlayerId(3)].is_host);
    }

    #[test]
    fn test_remove_releases_color_claim() {
        let mut r = room();
        r.seat(PlayerId(1), "Ana", false);
        r.claim_color(PlayerId(1), Color::Red);
        assert_eq!(r.game.player_colors[Color::Red], Some(PlayerId(1)));
        r.remove_player(PlayerId(1));
        assert_eq!(r.game.player_colors[Color::Red], None);
    }

    #[test]
    fn test_repick_releases_previous_color() {
        let mut r = room();
        r.seat(PlayerId(1), "Ana", false);
        r.claim_color(PlayerId(1), Color::Red);
        r.claim_color(PlayerId(1), Color::Green);
        assert_eq!(r.game.player_colors[Color::Red], None);
        assert_eq!(r.game.player_colors[Color::Green], Some(PlayerId(1)));
        assert_eq!(r.players[&PlayerId(1)].color, Some(Color::Green));
    }

    #[test]
    fn test_next_active_color_skips_unclaimed() {
        let mut r = room();
        r.seat(PlayerId(1), "Ana", false);
        r.seat(PlayerId(2), "Ben", false);
        r.claim_color(PlayerId(1), Color::Red);
        r.claim_color(PlayerId(2), Color::Yellow);
        // Green is unclaimed, so red's successor is yellow.
        assert_eq!(
            r.game.next_active_color(Color::Red),
            Some(Color::Yellow)
        );
        assert_eq!(
            r.game.next_active_color(Color::Yellow),
            Some(Color::Red)
        );
    }

    #[test]
    fn test_snapshots_follow_join_order() {
        let mut r = room();
        r.seat(PlayerId(9), "Ana", false);
        r.seat(PlayerId(3), "Ben", false);
        r.seat(PlayerId(7), "Cem", false);
        let ids: Vec<PlayerId> =
            r.snapshots().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![PlayerId(9), PlayerId(3), PlayerId(7)]);
    }
}
