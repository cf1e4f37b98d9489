//! Timing and capacity knobs for rooms.

use std::time::Duration;

/// Configuration shared by every room an actor spawns.
///
/// Production uses [`RoomConfig::default`]; tests shrink the timeouts so
/// auto-play and sweeps fire under `tokio::time::pause`.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long a player gets to act before the turn is played for them.
    pub turn_timeout: Duration,
    /// Delay between the winning move and the `game_over` broadcast, so
    /// clients can animate the final token.
    pub game_over_delay: Duration,
    /// How often the registry looks for abandoned rooms.
    pub sweep_interval: Duration,
    /// Age past which an empty room is deleted by the sweep.
    pub stale_age: Duration,
    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(10),
            game_over_delay: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(60 * 60),
            stale_age: Duration::from_secs(2 * 60 * 60),
            channel_size: 64,
        }
    }
}
