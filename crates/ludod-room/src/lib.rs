//! Room orchestration for the Ludo server.
//!
//! A room is an actor: one task owning seating, color claims, the board,
//! and the turn timer, driven by commands from a [`RoomHandle`]. The
//! [`RoomRegistry`] allocates codes and tracks which room each player is
//! in; the [`MatchQueue`] collects quick-play hopefuls until four can be
//! seated together.
//!
//! Rule checking lives in the private `engine` module — actors apply its
//! effects but contain no game logic themselves.

mod config;
mod engine;
mod error;
mod matchmaker;
mod registry;
mod room;
mod state;

pub use config::RoomConfig;
pub use error::GameError;
pub use matchmaker::{MatchQueue, QUORUM};
pub use registry::RoomRegistry;
pub use room::{
    ClientSender, RegistryNotice, RoomAction, RoomHandle, RoomInfo,
    spawn_room,
};
pub use state::{GameState, Player, Room};
