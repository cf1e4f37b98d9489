//! ludod — an authoritative WebSocket server for multiplayer Ludo.
//!
//! Clients exchange flat JSON messages over a WebSocket; every room is
//! an actor task owning its board, seats, and turn timer. This crate is
//! the thin top layer: the accept loop, per-connection handlers, and
//! the glue between the registry, the quick-play queue, and connected
//! clients.
//!
//! The layers underneath:
//!
//! - [`board`] — board geometry and move legality, pure functions
//! - [`protocol`] — wire types and the JSON codec
//! - [`room`] — room actors, registry, matchmaking, turn state machine
//! - [`transport`] — the WebSocket listener and connections

mod error;
mod handler;
mod server;

pub use error::LudodError;
pub use server::{LudodServer, LudodServerBuilder};

pub use ludod_board as board;
pub use ludod_protocol as protocol;
pub use ludod_room as room;
pub use ludod_transport as transport;
