//! The room registry: code allocation, lookup, and the stale sweep.
//!
//! Owns every live [`RoomHandle`] plus the player → room index that
//! enforces the one-room-per-player invariant. Lives behind a mutex at
//! the server layer; the methods here never call back into it.

use std::collections::HashMap;

use ludod_protocol::{CODE_ALPHABET, CODE_LEN, PlayerId, RoomCode, RoomSummary};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RoomConfig;
use crate::room::{RegistryNotice, RoomHandle, spawn_room};

struct RoomEntry {
    handle: RoomHandle,
    created_at: Instant,
}

pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomEntry>,
    player_rooms: HashMap<PlayerId, RoomCode>,
    config: RoomConfig,
    notices: mpsc::UnboundedSender<RegistryNotice>,
}

impl RoomRegistry {
    pub fn new(
        config: RoomConfig,
        notices: mpsc::UnboundedSender<RegistryNotice>,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            config,
            notices,
        }
    }

    /// Spawns a new room under a fresh code.
    pub fn create(&mut self, is_public: bool) -> RoomHandle {
        let code = loop {
            let candidate = random_code();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let handle = spawn_room(
            code.clone(),
            is_public,
            &self.config,
            self.notices.clone(),
        );
        info!(room = %code, is_public, "room created");
        self.rooms.insert(code, RoomEntry {
            handle: handle.clone(),
            created_at: Instant::now(),
        });
        handle
    }

    pub fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).map(|e| e.handle.clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Stops the actor and forgets the room and its player bindings.
    pub async fn destroy(&mut self, code: &RoomCode) {
        if let Some(entry) = self.rooms.remove(code) {
            entry.handle.shutdown().await;
            self.player_rooms.retain(|_, c| c != code);
            info!(room = %code, "room destroyed");
        }
    }

    /// Records which room a player sits in. A player is in at most one
    /// room, so a stale binding here is a bug upstream.
    pub fn bind(&mut self, player_id: PlayerId, code: RoomCode) {
        if let Some(old) = self.player_rooms.insert(player_id, code) {
            warn!(player = %player_id, old_room = %old,
                "player rebound while still indexed to another room");
        }
    }

    pub fn unbind(&mut self, player_id: PlayerId) {
        self.player_rooms.remove(&player_id);
    }

    pub fn room_of(&self, player_id: PlayerId) -> Option<RoomCode> {
        self.player_rooms.get(&player_id).cloned()
    }

    /// Public rooms still in their lobby: public, not started, not
    /// empty. Full rooms stay listed; the summary carries the counts so
    /// clients can show them as full.
    pub async fn list_public_open(&self) -> Vec<RoomSummary> {
        let mut rooms = Vec::new();
        for entry in self.rooms.values() {
            let Some(info) = entry.handle.info().await else {
                continue;
            };
            if !info.is_public || info.started || info.player_count == 0 {
                continue;
            }
            rooms.push(RoomSummary {
                room_id: info.code,
                host_name: info.host_name.unwrap_or_default(),
                player_count: info.player_count,
                max_players: info.max_players,
            });
        }
        rooms.sort_by(|a, b| a.room_id.as_str().cmp(b.room_id.as_str()));
        rooms
    }

    /// Deletes rooms that have sat empty past the configured age.
    ///
    /// Normally the empty-room notice tears rooms down immediately; the
    /// sweep catches anything that slipped through. Returns how many
    /// rooms were deleted.
    pub async fn sweep_stale(&mut self) -> usize {
        let now = Instant::now();
        let mut stale = Vec::new();
        for (code, entry) in &self.rooms {
            if now.duration_since(entry.created_at) < self.config.stale_age
            {
                continue;
            }
            match entry.handle.info().await {
                Some(info) if info.player_count > 0 => {}
                _ => stale.push(code.clone()),
            }
        }
        for code in &stale {
            debug!(room = %code, "sweeping stale room");
            self.destroy(code).await;
        }
        stale.len()
    }
}

fn random_code() -> RoomCode {
    let mut rng = rand::rng();
    // The alphabet only produces valid codes, so this returns on the
    // first pass.
    loop {
        let raw: String = (0..CODE_LEN)
            .map(|_| {
                CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]
                    as char
            })
            .collect();
        if let Ok(code) = RoomCode::parse(&raw) {
            return code;
        }
    }
}
