//! Pure Ludo board rules.
//!
//! Everything in this crate is stateless: geometry of the 52-cell ring
//! and the per-color home stretches, safe cells, move legality, and
//! capture detection. The room layer owns the mutable game state and
//! calls into these functions; keeping the rules pure means the player
//! path and the auto-play path cannot diverge.
//!
//! # Key types
//!
//! - [`Color`] — the four player colors, in fixed turn order
//! - [`ColorMap`] — a value per color (token tables, cut status)
//! - [`TokenTable`] — token step counters for every color
//!
//! # Step encoding
//!
//! Each token is one `i8` step counter, relative to its color's start:
//!
//! ```text
//! -1        in base (not yet released)
//!  0..=50   on the shared ring
//! 51..=55   home stretch (color-private, capture-free)
//! 56        home — finished, immutable
//! ```

mod color;
mod rules;

pub use color::{Color, ColorMap};
pub use rules::{
    BASE, HOME, RING_CELLS, RING_END, SAFE_CELLS, TokenSteps, TokenTable,
    absolute_cell, all_home, base_table, capture_targets, destination,
    is_safe_cell, legal_moves,
};
