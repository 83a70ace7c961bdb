pub mod packer;
pub mod perimeter;
pub mod table;

use crate::types::Color;

/// Colors and frame thickness shared by the labeled-cell layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelStyle {
    pub foreground: Color,
    pub background: Color,
    pub border: usize,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            foreground: Color::BLACK,
            background: Color::WHITE,
            border: 5,
        }
    }
}

/// Nearest integer, ties rounding up.
pub(crate) fn round_half_up(value: f32) -> usize {
    (value + 0.5).floor().max(0.0) as usize
}
