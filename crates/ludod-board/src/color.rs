//! Player colors and per-color storage.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// One of the four player colors.
///
/// Declaration order is the fixed turn order (red → green → yellow →
/// blue, wrapping) and the priority order for auto-assignment at game
/// start. Serializes as a lowercase string (`"red"`), which also makes
/// it usable as a JSON map key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    /// All colors in turn order.
    pub const ALL: [Color; 4] =
        [Color::Red, Color::Green, Color::Yellow, Color::Blue];

    /// Ring cell where this color's step 0 lands.
    ///
    /// The four entry points split the 52-cell ring into quarters:
    /// `absolute = (start_offset + step) % 52`.
    pub fn start_offset(self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Green => 13,
            Color::Yellow => 26,
            Color::Blue => 39,
        }
    }

    /// The color whose turn follows this one (ignoring whether it is
    /// actually claimed — the room filters to active colors).
    pub fn next(self) -> Color {
        match self {
            Color::Red => Color::Green,
            Color::Green => Color::Yellow,
            Color::Yellow => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Fixed 2-player pairing: red ↔ yellow, green ↔ blue.
    ///
    /// Two-player rooms always use one color from each pair so the
    /// players sit on opposite corners of the board.
    pub fn partner(self) -> Color {
        match self {
            Color::Red => Color::Yellow,
            Color::Yellow => Color::Red,
            Color::Green => Color::Blue,
            Color::Blue => Color::Green,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Green => write!(f, "green"),
            Color::Yellow => write!(f, "yellow"),
            Color::Blue => write!(f, "blue"),
        }
    }
}

/// A value per color.
///
/// All four colors are always present even when unused, which keeps the
/// token table, cut status, and color claims the same shape.
/// Serializes as `{"red": …, "green": …, "yellow": …, "blue": …}`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct ColorMap<T> {
    pub red: T,
    pub green: T,
    pub yellow: T,
    pub blue: T,
}

impl<T> ColorMap<T> {
    /// Iterates entries in turn order.
    pub fn iter(&self) -> impl Iterator<Item = (Color, &T)> {
        Color::ALL.iter().map(move |&c| (c, &self[c]))
    }
}

impl<T> Index<Color> for ColorMap<T> {
    type Output = T;

    fn index(&self, color: Color) -> &T {
        match color {
            Color::Red => &self.red,
            Color::Green => &self.green,
            Color::Yellow => &self.yellow,
            Color::Blue => &self.blue,
        }
    }
}

impl<T> IndexMut<Color> for ColorMap<T> {
    fn index_mut(&mut self, color: Color) -> &mut T {
        match color {
            Color::Red => &mut self.red,
            Color::Green => &mut self.green,
            Color::Yellow => &mut self.yellow,
            Color::Blue => &mut self.blue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_order_cycles_through_all_colors() {
        let mut c = Color::Red;
        let mut seen = vec![c];
        for _ in 0..3 {
            c = c.next();
            seen.push(c);
        }
        assert_eq!(seen, Color::ALL);
        assert_eq!(c.next(), Color::Red);
    }

    #[test]
    fn test_partner_is_symmetric() {
        for color in Color::ALL {
            assert_eq!(color.partner().partner(), color);
            assert_ne!(color.partner(), color);
        }
    }

    #[test]
    fn test_start_offsets_quarter_the_ring() {
        let offsets: Vec<u8> =
            Color::ALL.iter().map(|c| c.start_offset()).collect();
        assert_eq!(offsets, vec![0, 13, 26, 39]);
    }

    #[test]
    fn test_color_serializes_lowercase() {
        let json = serde_json::to_string(&Color::Yellow).unwrap();
        assert_eq!(json, "\"yellow\"");
        let back: Color = serde_json::from_str("\"blue\"").unwrap();
        assert_eq!(back, Color::Blue);
    }

    #[test]
    fn test_color_map_index_round_trip() {
        let mut map = ColorMap::<u32>::default();
        map[Color::Green] = 7;
        assert_eq!(map[Color::Green], 7);
        assert_eq!(map[Color::Red], 0);
    }

    #[test]
    fn test_color_map_serializes_with_color_keys() {
        let map = ColorMap {
            red: 1,
            green: 2,
            yellow: 3,
            blue: 4,
        };
        let json: serde_json::Value = serde_json::to_value(&map).unwrap();
        assert_eq!(json["red"], 1);
        assert_eq!(json["blue"], 4);
    }
}
