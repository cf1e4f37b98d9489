//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating
/// wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` tag, or
    /// missing required fields.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that is not six characters of `[A-Z0-9]`.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// A message that parses but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
