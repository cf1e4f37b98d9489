//! Wire protocol for the Ludo server.
//!
//! Defines the "language" clients and server speak:
//!
//! - **Types** ([`ClientRequest`], [`ServerEvent`], [`PlayerId`],
//!   [`RoomCode`], snapshots) — every message that travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong in between.
//!
//! Every frame is one JSON object tagged with a snake_case `type` field;
//! payload fields are camelCase to match the original client surface.
//! This layer knows nothing about connections or rooms — it only
//! validates and (de)serializes.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    CODE_ALPHABET, CODE_LEN, ClientRequest, GameSettings, PlayerId,
    PlayerSnapshot, RoomCode, RoomSummary, ServerEvent,
};
