//! Terminal cell: the fundamental unit of the grid.
//!
//! Each cell stores one glyph (a Unicode scalar, rendered from 1-4 UTF-8
//! bytes on the wire) together with its colors and attribute flags. Cells
//! are plain `Copy` data so rows can be shifted with bulk memory moves and
//! the whole grid has a fixed, predictable footprint.

use bitflags::bitflags;

bitflags! {
    /// Text attribute flags, one bit per SGR attribute.
    ///
    /// The bit layout is part of the serialized screen format, so new
    /// attributes must only ever be appended.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        const BOLD      = 1 << 0;
        const FAINT     = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const FRAKTUR   = 1 << 5;
        const STRIKE    = 1 << 6;
        const INVERSE   = 1 << 7;
    }
}

/// A 4-bit palette color or the terminal default.
///
/// Indices 0-7 are the normal colors, 8-15 the bright variants. The
/// default sentinel defers to the configured default fg/bg at render time.
/// Inverse video swaps effective fg/bg at render time; stored colors are
/// never swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// Palette index 0-15.
    Indexed(u8),
}

impl Color {
    /// Fold a 256-color palette index (SGR 38;5;N / 48;5;N) onto the
    /// 16-color palette.
    ///
    /// 0-15 map to themselves. Cube entries (16-231) set the red/green/blue
    /// bit for each channel at level >= 3 and the bright bit when the level
    /// sum reaches 11. The grayscale ramp (232-255) maps to black, bright
    /// black, white, or bright white by quartile.
    #[must_use]
    pub fn from_palette_256(index: u16) -> Self {
        let index = index.min(255) as u8;
        match index {
            0..=15 => Color::Indexed(index),
            16..=231 => {
                let n = index - 16;
                let r = n / 36;
                let g = (n / 6) % 6;
                let b = n % 6;
                let mut base = 0u8;
                if r >= 3 {
                    base |= 1;
                }
                if g >= 3 {
                    base |= 2;
                }
                if b >= 3 {
                    base |= 4;
                }
                if r + g + b >= 11 {
                    base |= 8;
                }
                Color::Indexed(base)
            }
            _ => {
                // Grayscale ramp: 24 steps from near-black to near-white.
                let gray = index - 232;
                Color::Indexed(match gray {
                    0..=5 => 0,
                    6..=11 => 8,
                    12..=17 => 7,
                    _ => 15,
                })
            }
        }
    }

    /// Palette index for the serialized form: 0-15, or 16 for default.
    #[must_use]
    pub fn to_wire(self) -> u16 {
        match self {
            Color::Default => 16,
            Color::Indexed(i) => u16::from(i.min(15)),
        }
    }

    /// Inverse of [`Color::to_wire`].
    #[must_use]
    pub fn from_wire(value: u16) -> Self {
        match value {
            0..=15 => Color::Indexed(value as u8),
            _ => Color::Default,
        }
    }
}

/// The style half of a cell: colors plus attribute flags.
///
/// Also the cursor's live "brush" that each printed glyph is stamped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub attrs: AttrFlags,
}

impl CellStyle {
    /// Reset to the default style (SGR 0).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply one SGR parameter list, parameter by parameter.
    ///
    /// An empty list is SGR 0. Extended palette selections (38;5;N and
    /// 48;5;N) consume two extra parameters; any other 38/48 sub-format is
    /// skipped without consuming the rest of the list.
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let p = params[i];
            match p {
                0 => self.reset(),
                1 => self.attrs.insert(AttrFlags::BOLD),
                2 => self.attrs.insert(AttrFlags::FAINT),
                3 => self.attrs.insert(AttrFlags::ITALIC),
                4 => self.attrs.insert(AttrFlags::UNDERLINE),
                5 => self.attrs.insert(AttrFlags::BLINK),
                7 => self.attrs.insert(AttrFlags::INVERSE),
                9 => self.attrs.insert(AttrFlags::STRIKE),
                20 => self.attrs.insert(AttrFlags::FRAKTUR),
                22 => self.attrs.remove(AttrFlags::BOLD | AttrFlags::FAINT),
                23 => self.attrs.remove(AttrFlags::ITALIC | AttrFlags::FRAKTUR),
                24 => self.attrs.remove(AttrFlags::UNDERLINE),
                25 => self.attrs.remove(AttrFlags::BLINK),
                27 => self.attrs.remove(AttrFlags::INVERSE),
                29 => self.attrs.remove(AttrFlags::STRIKE),
                30..=37 => self.fg = Color::Indexed((p - 30) as u8),
                39 => self.fg = Color::Default,
                40..=47 => self.bg = Color::Indexed((p - 40) as u8),
                49 => self.bg = Color::Default,
                90..=97 => self.fg = Color::Indexed((p - 90 + 8) as u8),
                100..=107 => self.bg = Color::Indexed((p - 100 + 8) as u8),
                38 | 48 => {
                    if params.get(i + 1) == Some(&5) {
                        if let Some(&n) = params.get(i + 2) {
                            let color = Color::from_palette_256(n);
                            if p == 38 {
                                self.fg = color;
                            } else {
                                self.bg = color;
                            }
                        }
                        i += 2;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// A single cell in the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Glyph content. A space for blank/erased cells.
    glyph: char,
    /// Colors and attributes the glyph was stamped with.
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: ' ',
            style: CellStyle::default(),
        }
    }
}

impl Cell {
    /// Create a cell with the given glyph and default style.
    #[must_use]
    pub fn new(glyph: char) -> Self {
        Self {
            glyph,
            style: CellStyle::default(),
        }
    }

    /// Create a cell with the given glyph and style.
    #[must_use]
    pub fn styled(glyph: char, style: CellStyle) -> Self {
        Self { glyph, style }
    }

    /// The glyph content of this cell.
    #[must_use]
    pub fn glyph(&self) -> char {
        self.glyph
    }

    /// Replace the glyph, keeping the style.
    pub fn set_glyph(&mut self, glyph: char) {
        self.glyph = glyph;
    }

    /// Reset to a blank space carrying the given background.
    ///
    /// Used by every erase/scroll fill path (ED, EL, ECH, IL, DL, SU, SD):
    /// vacated cells take the current background but no other attributes.
    pub fn erase(&mut self, bg: Color) {
        self.glyph = ' ';
        self.style = CellStyle {
            bg,
            ..CellStyle::default()
        };
    }
}
