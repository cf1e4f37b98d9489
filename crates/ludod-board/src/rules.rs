//! Board geometry, move legality, and capture detection.

use crate::{Color, ColorMap};

/// Step counters for one color's four tokens.
pub type TokenSteps = [i8; 4];

/// Token positions for every color. All four colors are always present;
/// unclaimed colors simply keep their tokens in base.
pub type TokenTable = ColorMap<TokenSteps>;

/// Step value for a token still in its base.
pub const BASE: i8 = -1;

/// Step value for a token that reached home. Final — a finished token
/// never moves again.
pub const HOME: i8 = 56;

/// Last step that is still on the shared ring. Steps 51..=55 are the
/// color-private home stretch.
pub const RING_END: i8 = 50;

/// Number of cells on the shared ring.
pub const RING_CELLS: u8 = 52;

/// Absolute ring cells where no capture can ever occur.
pub const SAFE_CELLS: [u8; 8] = [0, 8, 13, 21, 26, 34, 39, 47];

/// Returns `true` if `cell` is one of the eight fixed safe cells.
pub fn is_safe_cell(cell: u8) -> bool {
    SAFE_CELLS.contains(&cell)
}

/// Maps a track-relative step to its absolute ring cell.
///
/// Only ring steps occupy a shared cell; base, home stretch, and home
/// return `None` (they can neither capture nor be captured).
pub fn absolute_cell(color: Color, step: i8) -> Option<u8> {
    if (0..=RING_END).contains(&step) {
        Some((color.start_offset() + step as u8) % RING_CELLS)
    } else {
        None
    }
}

/// Where a token at `step` lands with `dice`, or `None` if the move is
/// illegal.
///
/// Rules, in order:
/// 1. A token in base may only move on a roll of exactly 6, entering
///    at step 0.
/// 2. Otherwise the destination is `step + dice` and must not overshoot
///    home (≤ 56). A finished token (step 56) always overshoots.
/// 3. Cut-to-home gate: when `cut_required` is set and this color has
///    not captured yet (`has_cut` false), a token may not cross from
///    the ring into its home stretch.
pub fn destination(
    step: i8,
    dice: u8,
    cut_required: bool,
    has_cut: bool,
) -> Option<i8> {
    let dest = match step {
        BASE => {
            if dice == 6 {
                0
            } else {
                return None;
            }
        }
        s => {
            let d = s + dice as i8;
            if d > HOME {
                return None;
            }
            d
        }
    };

    if cut_required && !has_cut && step <= RING_END && dest > RING_END {
        return None;
    }

    Some(dest)
}

/// Token indices that may legally move with this roll.
pub fn legal_moves(
    tokens: &TokenSteps,
    dice: u8,
    cut_required: bool,
    has_cut: bool,
) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|&(_, &s)| destination(s, dice, cut_required, has_cut).is_some())
        .map(|(i, _)| i)
        .collect()
}

/// Opposing tokens that landing on `cell` would capture.
///
/// Safe cells never capture. The mover's own color is skipped, so one
/// color's tokens stack freely on a shared cell. Unclaimed colors keep
/// all tokens in base and never match.
pub fn capture_targets(
    table: &TokenTable,
    mover: Color,
    cell: u8,
) -> Vec<(Color, usize)> {
    if is_safe_cell(cell) {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for color in Color::ALL {
        if color == mover {
            continue;
        }
        for (idx, &step) in table[color].iter().enumerate() {
            if absolute_cell(color, step) == Some(cell) {
                hits.push((color, idx));
            }
        }
    }
    hits
}

/// Returns `true` when every token of the color has reached home.
pub fn all_home(tokens: &TokenSteps) -> bool {
    tokens.iter().all(|&s| s == HOME)
}

/// A fresh table with every token of every color in base.
///
/// This is the pre-game and restart state. Note `TokenTable::default()`
/// would be all zeros — step 0 is *on the ring*, not in base.
pub fn base_table() -> TokenTable {
    ColorMap {
        red: [BASE; 4],
        green: [BASE; 4],
        yellow: [BASE; 4],
        blue: [BASE; 4],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Geometry
    // =====================================================================

    #[test]
    fn test_absolute_cell_applies_start_offset() {
        assert_eq!(absolute_cell(Color::Red, 0), Some(0));
        assert_eq!(absolute_cell(Color::Green, 0), Some(13));
        assert_eq!(absolute_cell(Color::Yellow, 0), Some(26));
        assert_eq!(absolute_cell(Color::Blue, 0), Some(39));
    }

    #[test]
    fn test_absolute_cell_wraps_the_ring() {
        // Blue at step 20: 39 + 20 = 59 → 59 % 52 = 7.
        assert_eq!(absolute_cell(Color::Blue, 20), Some(7));
        // Yellow at step 50: 26 + 50 = 76 → 24.
        assert_eq!(absolute_cell(Color::Yellow, 50), Some(24));
    }

    #[test]
    fn test_absolute_cell_none_off_ring() {
        assert_eq!(absolute_cell(Color::Red, BASE), None);
        assert_eq!(absolute_cell(Color::Red, 51), None);
        assert_eq!(absolute_cell(Color::Red, HOME), None);
    }

    #[test]
    fn test_every_color_start_is_a_safe_cell() {
        for color in Color::ALL {
            assert!(
                is_safe_cell(color.start_offset()),
                "{color} entry cell must be safe"
            );
        }
    }

    // =====================================================================
    // Destination / legality
    // =====================================================================

    #[test]
    fn test_base_token_needs_exactly_six() {
        for dice in 1..=5 {
            assert_eq!(destination(BASE, dice, false, false), None);
        }
        assert_eq!(destination(BASE, 6, false, false), Some(0));
    }

    #[test]
    fn test_overshoot_is_rejected() {
        assert_eq!(destination(55, 2, false, false), None);
        assert_eq!(destination(55, 1, false, false), Some(HOME));
        assert_eq!(destination(53, 3, false, false), Some(HOME));
    }

    #[test]
    fn test_finished_token_never_moves() {
        for dice in 1..=6 {
            assert_eq!(destination(HOME, dice, false, false), None);
        }
    }

    #[test]
    fn test_cut_gate_blocks_home_stretch_entry() {
        // Step 48 + 4 = 52 would enter the home stretch. Without a
        // capture on record the move is illegal under cut-to-home.
        assert_eq!(destination(48, 4, true, false), None);
        assert_eq!(destination(48, 4, true, true), Some(52));
        assert_eq!(destination(48, 4, false, false), Some(52));
    }

    #[test]
    fn test_cut_gate_ignores_moves_within_stretch_or_ring() {
        // Already in the stretch: gate does not apply.
        assert_eq!(destination(52, 3, true, false), Some(55));
        // Staying on the ring: gate does not apply.
        assert_eq!(destination(40, 6, true, false), Some(46));
        // Leaving base: enters at 0, nowhere near the stretch.
        assert_eq!(destination(BASE, 6, true, false), Some(0));
    }

    #[test]
    fn test_legal_moves_all_base_tokens_on_six() {
        let tokens = [BASE; 4];
        assert_eq!(legal_moves(&tokens, 6, false, false), vec![0, 1, 2, 3]);
        assert!(legal_moves(&tokens, 3, false, false).is_empty());
    }

    #[test]
    fn test_legal_moves_skips_blocked_tokens() {
        // Token 0 finished, token 1 would overshoot, tokens 2 and 3 fine.
        let tokens = [HOME, 55, 10, BASE];
        assert_eq!(legal_moves(&tokens, 6, false, false), vec![2, 3]);
    }

    // =====================================================================
    // Captures
    // =====================================================================

    #[test]
    fn test_capture_detects_enemy_on_cell() {
        let mut table = base_table();
        // Green token 2 sits on absolute cell 18 (13 + 5).
        table[Color::Green][2] = 5;
        let hits = capture_targets(&table, Color::Red, 18);
        assert_eq!(hits, vec![(Color::Green, 2)]);
    }

    #[test]
    fn test_capture_skips_own_color() {
        let mut table = base_table();
        // Two red tokens stacked on cell 18 — never self-capture.
        table[Color::Red][0] = 18;
        table[Color::Red][1] = 18;
        assert!(capture_targets(&table, Color::Red, 18).is_empty());
    }

    #[test]
    fn test_safe_cell_never_captures() {
        let mut table = base_table();
        // Green start cell 13 is safe; park an enemy there.
        table[Color::Green][0] = 0; // absolute 13
        for cell in SAFE_CELLS {
            assert!(
                capture_targets(&table, Color::Red, cell).is_empty(),
                "cell {cell} must be capture-free"
            );
        }
    }

    #[test]
    fn test_capture_hits_multiple_enemies_on_one_cell() {
        let mut table = base_table();
        // Green step 5 and yellow step 44 both land on absolute 18.
        table[Color::Green][0] = 5;
        table[Color::Yellow][3] = 44; // 26 + 44 = 70 → 18
        let mut hits = capture_targets(&table, Color::Red, 18);
        hits.sort_by_key(|(c, _)| *c as u8);
        assert_eq!(hits, vec![(Color::Green, 0), (Color::Yellow, 3)]);
    }

    #[test]
    fn test_home_stretch_tokens_cannot_be_captured() {
        let mut table = base_table();
        table[Color::Green][0] = 52; // in its private stretch
        for cell in 0..RING_CELLS {
            assert!(
                capture_targets(&table, Color::Red, cell).is_empty(),
                "stretch token must be unreachable at cell {cell}"
            );
        }
    }

    #[test]
    fn test_all_home() {
        assert!(all_home(&[HOME; 4]));
        assert!(!all_home(&[HOME, HOME, HOME, 55]));
    }

    // Every token is always exactly one of base / in play / home.
    #[test]
    fn test_token_states_partition() {
        let tokens: TokenSteps = [BASE, 0, 53, HOME];
        let in_base = tokens.iter().filter(|&&s| s == BASE).count();
        let in_play =
            tokens.iter().filter(|&&s| (0..HOME).contains(&s)).count();
        let home = tokens.iter().filter(|&&s| s == HOME).count();
        assert_eq!(in_base + in_play + home, 4);
    }
}
