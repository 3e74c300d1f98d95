//! Cursor state: position, live style, character sets, scroll region and
//! tab stops.
//!
//! The column may equal the grid width: that is the pending-wrap state,
//! where the next printable glyph first wraps to the start of the next row.
//! Every other coordinate is kept strictly inside the grid.

use crate::cell::CellStyle;
use crate::grid::MAX_COLS;

/// A designated character set for one of the G0-G3 slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// US ASCII, the identity mapping.
    #[default]
    UsAscii,
    /// DEC Special Graphics: line-drawing glyphs in 0x60-0x7E.
    DecSpecialGraphics,
    /// British: '#' renders as the pound sign.
    Uk,
}

impl Charset {
    /// Decode an `ESC ( c`-style final designator byte.
    ///
    /// Unknown designators fall back to US ASCII, which is how lenient
    /// terminals treat sets they do not implement.
    #[must_use]
    pub fn from_designator(byte: u8) -> Self {
        match byte {
            b'0' => Charset::DecSpecialGraphics,
            b'A' => Charset::Uk,
            _ => Charset::UsAscii,
        }
    }
}

/// DEC Special Graphics glyphs for input bytes 0x60..=0x7E.
const DEC_GRAPHICS: [char; 31] = [
    '\u{25C6}', '\u{2592}', '\u{2409}', '\u{240C}', '\u{240D}', '\u{240A}', '\u{00B0}', '\u{00B1}',
    '\u{2424}', '\u{240B}', '\u{2518}', '\u{2510}', '\u{250C}', '\u{2514}', '\u{253C}', '\u{23BA}',
    '\u{23BB}', '\u{2500}', '\u{23BC}', '\u{23BD}', '\u{251C}', '\u{2524}', '\u{2534}', '\u{252C}',
    '\u{2502}', '\u{2264}', '\u{2265}', '\u{03C0}', '\u{2260}', '\u{00A3}', '\u{00B7}',
];

/// Translate a printable character through a character set.
///
/// Only ASCII 0x20-0x7E is affected; multi-byte glyphs pass through.
#[must_use]
pub fn translate_charset(ch: char, charset: Charset) -> char {
    match charset {
        Charset::UsAscii => ch,
        Charset::Uk => {
            if ch == '#' {
                '\u{00A3}'
            } else {
                ch
            }
        }
        Charset::DecSpecialGraphics => {
            let code = ch as u32;
            if (0x60..=0x7E).contains(&code) {
                DEC_GRAPHICS[(code - 0x60) as usize]
            } else {
                ch
            }
        }
    }
}

/// Snapshot taken by DECSC (`ESC 7`) and restored by DECRC (`ESC 8`).
///
/// The position-only save slot (`CSI s` / `CSI u`) stores just `row`/`col`
/// and leaves the rest at defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavedCursor {
    pub row: u16,
    pub col: u16,
    pub style: CellStyle,
    pub gsets: [Charset; 4],
    pub active_gl: u8,
}

/// Cursor state for one terminal screen.
#[derive(Debug, Clone)]
pub struct Cursor {
    /// Row, always `< rows`.
    pub row: u16,
    /// Column, `0..=cols`; `col == cols` is the pending-wrap state.
    pub col: u16,
    /// The brush applied to every printed glyph.
    pub style: CellStyle,
    /// Character sets designated into G0-G3.
    pub gsets: [Charset; 4],
    /// Which slot GL currently selects (0-3).
    pub active_gl: u8,
    /// One-shot charset override from SS2/SS3.
    pub single_shift: Option<u8>,
    cols: u16,
    rows: u16,
    scroll_top: u16,
    scroll_bottom: u16,
    tabs: [bool; MAX_COLS as usize],
}

impl Cursor {
    /// Create a homed cursor for a `cols x rows` screen with the default
    /// tab stops and a full-height scroll region.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        let mut cursor = Self {
            row: 0,
            col: 0,
            style: CellStyle::default(),
            gsets: [Charset::UsAscii; 4],
            active_gl: 0,
            single_shift: None,
            cols: cols.max(1),
            rows: rows.max(1),
            scroll_top: 0,
            scroll_bottom: rows.max(1) - 1,
            tabs: [false; MAX_COLS as usize],
        };
        cursor.reset_tab_stops();
        cursor
    }

    /// Adopt new screen dimensions: clamp the position, rebuild tab stops
    /// and the scroll region to defaults.
    pub fn rebuild(&mut self, cols: u16, rows: u16) {
        self.cols = cols.max(1);
        self.rows = rows.max(1);
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
        self.reset_tab_stops();
        self.clamp();
    }

    /// Screen width this cursor is tracking.
    #[must_use]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Screen height this cursor is tracking.
    #[must_use]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Whether the cursor sits one past the last column, waiting to wrap.
    #[must_use]
    pub fn pending_wrap(&self) -> bool {
        self.col >= self.cols
    }

    /// Clamp the position strictly inside the grid, leaving pending-wrap.
    pub fn clamp(&mut self) {
        self.row = self.row.min(self.rows - 1);
        self.col = self.col.min(self.cols - 1);
    }

    /// CR: return to column 0.
    pub fn carriage_return(&mut self) {
        self.col = 0;
    }

    /// Absolute move, clipped to the grid. Clears pending-wrap.
    pub fn move_to(&mut self, row: u16, col: u16) {
        self.row = row.min(self.rows - 1);
        self.col = col.min(self.cols - 1);
    }

    /// Relative move without scrolling.
    ///
    /// Horizontal motion clips to `[0, cols-1]` (a backspace out of the
    /// pending-wrap column lands on the last column). Vertical motion clips
    /// to the scroll region while the cursor starts inside it, to the full
    /// screen otherwise.
    pub fn move_rel(&mut self, dy: i32, dx: i32) {
        let col = i64::from(self.col) + i64::from(dx);
        self.col = col.clamp(0, i64::from(self.cols) - 1) as u16;

        let (lo, hi) = if self.in_scroll_region() {
            (i64::from(self.scroll_top), i64::from(self.scroll_bottom))
        } else {
            (0, i64::from(self.rows) - 1)
        };
        let row = i64::from(self.row) + i64::from(dy);
        self.row = row.clamp(lo, hi) as u16;
    }

    /// Whether the cursor row lies inside the scroll region.
    #[must_use]
    pub fn in_scroll_region(&self) -> bool {
        self.row >= self.scroll_top && self.row <= self.scroll_bottom
    }

    // ── Scroll region ───────────────────────────────────────────────

    /// Set the scroll region to the inclusive rows `[top, bottom]`.
    ///
    /// Invalid bounds (`top >= bottom` or `bottom` off-screen) are ignored,
    /// which is DECSTBM's behavior for degenerate parameters.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        if top < bottom && bottom < self.rows {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        }
    }

    /// Reset the scroll region to the full screen height.
    pub fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
    }

    /// First row of the scroll region.
    #[must_use]
    pub fn scroll_top(&self) -> u16 {
        self.scroll_top
    }

    /// Last row of the scroll region (inclusive).
    #[must_use]
    pub fn scroll_bottom(&self) -> u16 {
        self.scroll_bottom
    }

    // ── Tab stops ───────────────────────────────────────────────────

    /// Restore the default tab stops: every 8 columns starting at 0.
    pub fn reset_tab_stops(&mut self) {
        for (i, stop) in self.tabs.iter_mut().enumerate() {
            *stop = i % 8 == 0;
        }
    }

    /// HTS: set a tab stop at the cursor column.
    pub fn set_tab_stop(&mut self) {
        let col = self.col.min(self.cols - 1);
        self.tabs[col as usize] = true;
    }

    /// TBC 0: clear the tab stop at the cursor column.
    pub fn clear_tab_stop(&mut self) {
        let col = self.col.min(self.cols - 1);
        self.tabs[col as usize] = false;
    }

    /// TBC 3: clear every tab stop.
    pub fn clear_all_tab_stops(&mut self) {
        self.tabs = [false; MAX_COLS as usize];
    }

    /// The column of the next tab stop after the cursor, or the last column.
    #[must_use]
    pub fn next_tab_stop(&self) -> u16 {
        let from = self.col.min(self.cols - 1);
        for col in from + 1..self.cols {
            if self.tabs[col as usize] {
                return col;
            }
        }
        self.cols - 1
    }

    /// The column of the previous tab stop before the cursor, or column 0.
    #[must_use]
    pub fn prev_tab_stop(&self) -> u16 {
        let from = self.col.min(self.cols - 1);
        for col in (0..from).rev() {
            if self.tabs[col as usize] {
                return col;
            }
        }
        0
    }

    // ── Character sets ──────────────────────────────────────────────

    /// Designate a character set into slot G0-G3.
    pub fn designate_charset(&mut self, slot: u8, designator: u8) {
        if let Some(gset) = self.gsets.get_mut(slot as usize) {
            *gset = Charset::from_designator(designator);
        }
    }

    /// Select the slot GL maps to (SI, SO, LS2, LS3).
    pub fn select_gl(&mut self, slot: u8) {
        if slot < 4 {
            self.active_gl = slot;
            self.single_shift = None;
        }
    }

    /// Arm a single shift (SS2/SS3) for the next printed glyph only.
    pub fn set_single_shift(&mut self, slot: u8) {
        if slot == 2 || slot == 3 {
            self.single_shift = Some(slot);
        }
    }

    /// Translate one printable character through the active set, consuming
    /// any armed single shift.
    pub fn translate(&mut self, ch: char) -> char {
        let slot = self.single_shift.take().unwrap_or(self.active_gl);
        translate_charset(ch, self.gsets[slot as usize])
    }

    /// Reset all four slots to US ASCII and select G0.
    pub fn reset_charsets(&mut self) {
        self.gsets = [Charset::UsAscii; 4];
        self.active_gl = 0;
        self.single_shift = None;
    }

    // ── Save / restore ──────────────────────────────────────────────

    /// Snapshot for the DECSC save slot.
    #[must_use]
    pub fn save(&self) -> SavedCursor {
        SavedCursor {
            row: self.row,
            col: self.col.min(self.cols - 1),
            style: self.style,
            gsets: self.gsets,
            active_gl: self.active_gl,
        }
    }

    /// Restore a DECSC snapshot, clamping to the current screen.
    pub fn restore(&mut self, saved: &SavedCursor) {
        self.row = saved.row.min(self.rows - 1);
        self.col = saved.col.min(self.cols - 1);
        self.style = saved.style;
        self.gsets = saved.gsets;
        self.active_gl = saved.active_gl.min(3);
        self.single_shift = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{AttrFlags, Color};

    #[test]
    fn new_cursor_is_homed_with_full_region() {
        let c = Cursor::new(26, 10);
        assert_eq!((c.row, c.col), (0, 0));
        assert_eq!(c.scroll_top(), 0);
        assert_eq!(c.scroll_bottom(), 9);
        assert!(!c.pending_wrap());
    }

    #[test]
    fn move_to_clips() {
        let mut c = Cursor::new(10, 5);
        c.move_to(99, 99);
        assert_eq!((c.row, c.col), (4, 9));
    }

    #[test]
    fn move_rel_clips_horizontally() {
        let mut c = Cursor::new(10, 5);
        c.move_rel(0, -3);
        assert_eq!(c.col, 0);
        c.move_rel(0, 99);
        assert_eq!(c.col, 9);
    }

    #[test]
    fn backspace_from_pending_wrap_lands_on_last_column() {
        let mut c = Cursor::new(5, 3);
        c.col = 5; // pending-wrap
        assert!(c.pending_wrap());
        c.move_rel(0, -1);
        assert_eq!(c.col, 4);
        assert!(!c.pending_wrap());
    }

    #[test]
    fn vertical_move_clips_to_region_when_inside() {
        let mut c = Cursor::new(10, 10);
        c.set_scroll_region(2, 6);
        c.row = 4;
        c.move_rel(-9, 0);
        assert_eq!(c.row, 2);
        c.move_rel(9, 0);
        assert_eq!(c.row, 6);
    }

    #[test]
    fn vertical_move_outside_region_clips_to_screen() {
        let mut c = Cursor::new(10, 10);
        c.set_scroll_region(2, 6);
        c.row = 8;
        c.move_rel(9, 0);
        assert_eq!(c.row, 9);
    }

    #[test]
    fn invalid_scroll_region_is_ignored() {
        let mut c = Cursor::new(10, 5);
        c.set_scroll_region(3, 3);
        assert_eq!((c.scroll_top(), c.scroll_bottom()), (0, 4));
        c.set_scroll_region(1, 99);
        assert_eq!((c.scroll_top(), c.scroll_bottom()), (0, 4));
        c.set_scroll_region(1, 3);
        assert_eq!((c.scroll_top(), c.scroll_bottom()), (1, 3));
    }

    // ── Tab stops ───────────────────────────────────────────────────

    #[test]
    fn default_tab_stops_every_eight() {
        let c = Cursor::new(26, 10);
        assert_eq!(c.next_tab_stop(), 8);
        let mut c2 = Cursor::new(26, 10);
        c2.col = 8;
        assert_eq!(c2.next_tab_stop(), 16);
        c2.col = 24;
        // No stop after 24 within 26 columns: clamp to the last column.
        assert_eq!(c2.next_tab_stop(), 25);
    }

    #[test]
    fn custom_tab_stop_set_and_clear() {
        let mut c = Cursor::new(26, 10);
        c.col = 4;
        c.set_tab_stop();
        c.col = 0;
        assert_eq!(c.next_tab_stop(), 4);
        c.col = 4;
        c.clear_tab_stop();
        c.col = 0;
        assert_eq!(c.next_tab_stop(), 8);
    }

    #[test]
    fn clear_all_tab_stops_leaves_last_column() {
        let mut c = Cursor::new(26, 10);
        c.clear_all_tab_stops();
        assert_eq!(c.next_tab_stop(), 25);
    }

    #[test]
    fn prev_tab_stop_walks_backwards() {
        let mut c = Cursor::new(26, 10);
        c.col = 20;
        assert_eq!(c.prev_tab_stop(), 16);
        c.col = 16;
        assert_eq!(c.prev_tab_stop(), 8);
        c.col = 3;
        assert_eq!(c.prev_tab_stop(), 0);
    }

    // ── Character sets ──────────────────────────────────────────────

    #[test]
    fn dec_graphics_translates_line_drawing_range() {
        assert_eq!(translate_charset('q', Charset::DecSpecialGraphics), '─');
        assert_eq!(translate_charset('x', Charset::DecSpecialGraphics), '│');
        assert_eq!(translate_charset('l', Charset::DecSpecialGraphics), '┌');
        // Below 0x60 is unaffected.
        assert_eq!(translate_charset('A', Charset::DecSpecialGraphics), 'A');
    }

    #[test]
    fn uk_translates_only_hash() {
        assert_eq!(translate_charset('#', Charset::Uk), '£');
        assert_eq!(translate_charset('q', Charset::Uk), 'q');
    }

    #[test]
    fn shift_out_selects_g1() {
        let mut c = Cursor::new(10, 5);
        c.designate_charset(1, b'0');
        c.select_gl(1);
        assert_eq!(c.translate('q'), '─');
        c.select_gl(0);
        assert_eq!(c.translate('q'), 'q');
    }

    #[test]
    fn single_shift_applies_once() {
        let mut c = Cursor::new(10, 5);
        c.designate_charset(2, b'0');
        c.set_single_shift(2);
        assert_eq!(c.translate('q'), '─');
        assert_eq!(c.translate('q'), 'q');
    }

    // ── Save / restore ──────────────────────────────────────────────

    #[test]
    fn save_restore_roundtrips_position_and_style() {
        let mut c = Cursor::new(20, 10);
        c.move_to(3, 7);
        c.style.fg = Color::Indexed(2);
        c.style.attrs = AttrFlags::BOLD;
        c.designate_charset(0, b'0');
        let saved = c.save();

        c.move_to(9, 19);
        c.style = CellStyle::default();
        c.reset_charsets();

        c.restore(&saved);
        assert_eq!((c.row, c.col), (3, 7));
        assert_eq!(c.style.fg, Color::Indexed(2));
        assert!(c.style.attrs.contains(AttrFlags::BOLD));
        assert_eq!(c.gsets[0], Charset::DecSpecialGraphics);
    }

    #[test]
    fn restore_clamps_to_smaller_screen() {
        let mut c = Cursor::new(20, 10);
        c.move_to(9, 19);
        let saved = c.save();
        c.rebuild(5, 3);
        c.restore(&saved);
        assert_eq!((c.row, c.col), (2, 4));
    }

    #[test]
    fn rebuild_resets_region_and_tabs() {
        let mut c = Cursor::new(20, 10);
        c.set_scroll_region(2, 5);
        c.col = 4;
        c.set_tab_stop();
        c.rebuild(10, 4);
        assert_eq!((c.scroll_top(), c.scroll_bottom()), (0, 3));
        c.col = 0;
        assert_eq!(c.next_tab_stop(), 8);
    }
}
