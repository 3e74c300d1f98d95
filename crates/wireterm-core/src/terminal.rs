//! The terminal engine: one owned value tying together grid, cursor,
//! modes, parser and the configuration plane.
//!
//! The host wires up a single [`Terminal`] at start, feeds it the byte
//! stream coming off the session transport, and reads the grid back out
//! through the serializer. Replies (DSR, DA) and change notifications go
//! through the [`TerminalHost`] the caller passes to [`Terminal::feed`];
//! the engine itself never blocks and never allocates after construction
//! beyond the parser's small scratch buffers.

use tracing::{debug, trace};

use crate::cell::Cell;
use crate::config::{clean_label, TermConfig, TERM_TITLE_LEN};
use crate::cursor::{Cursor, SavedCursor};
use crate::grid::{Grid, MAX_COLS, MAX_ROWS};
use crate::modes::Modes;
use crate::parser::{Action, Parser};

/// Fixed primary device attributes reply (VT220-class with a few xterm
/// feature codes).
const DA1_REPLY: &[u8] = b"\x1b[?64;1;2;6;9;15;22c";

/// Change notification topics delivered to the host.
///
/// The host coalesces these; the engine fires them eagerly (content once
/// per `feed` batch, labels on every actual change).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTopic {
    /// Grid content, cursor or screen-level flags changed.
    ContentChanged,
    /// Title or a button label changed.
    LabelsChanged,
}

/// Collaborator interface for replies and notifications.
///
/// All methods default to no-ops so tests and headless hosts can pass
/// `&mut ()`.
pub trait TerminalHost {
    /// Queue reply bytes (DSR/DA responses) for the remote program.
    fn emit(&mut self, _bytes: &[u8]) {}
    /// A state change the front-end may want to pick up.
    fn notify(&mut self, _topic: NotifyTopic) {}
    /// The bell rang.
    fn bell(&mut self) {}
}

impl TerminalHost for () {}

/// The virtual terminal: screen state machine plus escape interpreter.
#[derive(Debug)]
pub struct Terminal {
    persisted: TermConfig,
    scratch: TermConfig,
    grid: Grid,
    cursor: Cursor,
    modes: Modes,
    parser: Parser,
    /// DECSC slot: position, attributes and charsets.
    saved_full: Option<SavedCursor>,
    /// SCOSC slot: position only.
    saved_pos: Option<(u16, u16)>,
    /// Icon name from OSC 1. Transient like the scratch config; the
    /// persisted bundle has no slot for it.
    icon_name: String,
    /// Reused between `feed` calls to keep the hot path allocation-free.
    actions: Vec<Action>,
    content_dirty: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(TermConfig::default())
    }
}

impl Terminal {
    /// Create a terminal from a persisted configuration bundle.
    #[must_use]
    pub fn new(config: TermConfig) -> Self {
        let cols = clamp_cols(config.width);
        let rows = clamp_rows(config.height);
        Self {
            scratch: config.clone(),
            persisted: config,
            grid: Grid::new(cols, rows),
            cursor: Cursor::new(cols, rows),
            modes: Modes::new(),
            parser: Parser::new(),
            saved_full: None,
            saved_pos: None,
            icon_name: String::new(),
            actions: Vec::new(),
            content_dirty: false,
        }
    }

    /// The screen grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The cursor.
    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// The mode plane.
    #[must_use]
    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// The transient configuration escape sequences mutate.
    #[must_use]
    pub fn scratch_config(&self) -> &TermConfig {
        &self.scratch
    }

    /// The persisted configuration baseline.
    #[must_use]
    pub fn persisted_config(&self) -> &TermConfig {
        &self.persisted
    }

    /// The icon name last set via OSC 1; empty until one arrives.
    #[must_use]
    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    // ── Byte input ──────────────────────────────────────────────────

    /// Consume a chunk of the remote program's output.
    ///
    /// Safe with any slice, including empty. A single content-changed
    /// notification fires per call when anything on screen moved.
    pub fn feed(&mut self, bytes: &[u8], host: &mut impl TerminalHost) {
        let cursor_before = (self.cursor.row, self.cursor.col);
        let mut actions = core::mem::take(&mut self.actions);
        actions.clear();
        self.parser.feed_into(bytes, &mut actions);
        for action in actions.drain(..) {
            self.apply(action, host);
        }
        self.actions = actions;

        // A moved cursor changes the serialized view just like cell edits.
        if (self.cursor.row, self.cursor.col) != cursor_before {
            self.content_dirty = true;
        }
        if self.content_dirty {
            self.content_dirty = false;
            host.notify(NotifyTopic::ContentChanged);
        }
    }

    // ── Configuration plane ─────────────────────────────────────────

    /// Replace the persisted baseline (e.g. after the host loaded or
    /// edited stored settings). Takes effect on the next apply.
    pub fn set_persisted_config(&mut self, config: TermConfig) {
        self.persisted = config;
    }

    /// Copy the persisted bundle over the scratch copy.
    ///
    /// With `reset_screen` the screen is fully reset and re-initialized to
    /// the configured size; without it only size, colors and labels are
    /// taken over and the cell content survives (live settings change).
    pub fn apply_settings(&mut self, host: &mut impl TerminalHost, reset_screen: bool) {
        debug!(
            width = self.persisted.width,
            height = self.persisted.height,
            reset_screen,
            "applying terminal settings"
        );
        let labels_changed = self.scratch.title() != self.persisted.title()
            || (0..5).any(|i| self.scratch.button(i) != self.persisted.button(i));

        if reset_screen {
            self.reset();
        } else {
            self.scratch = self.persisted.clone();
            let cols = clamp_cols(self.scratch.width);
            let rows = clamp_rows(self.scratch.height);
            self.resize(rows, cols);
        }

        if labels_changed {
            host.notify(NotifyTopic::LabelsChanged);
        }
        self.content_dirty = false;
        host.notify(NotifyTopic::ContentChanged);
    }

    /// Reset the persisted bundle to factory defaults and apply it.
    ///
    /// The host is responsible for writing `persisted_config().to_bytes()`
    /// back to its store.
    pub fn restore_defaults(&mut self, host: &mut impl TerminalHost) {
        self.persisted = TermConfig::default();
        self.apply_settings(host, true);
    }

    /// Full reset (RIS): scratch config from persisted, default modes,
    /// cleared grid, homed cursor, empty save slots, default tab stops,
    /// full-height scroll region, US ASCII charsets.
    pub fn reset(&mut self) {
        self.scratch = self.persisted.clone();
        let cols = clamp_cols(self.scratch.width);
        let rows = clamp_rows(self.scratch.height);
        self.grid.resize(cols, rows);
        self.grid.clear();
        self.cursor = Cursor::new(cols, rows);
        self.modes.reset();
        self.parser.reset();
        self.saved_full = None;
        self.saved_pos = None;
        self.icon_name.clear();
        self.content_dirty = true;
    }

    /// Change the screen size in place, clipping content and cursor.
    ///
    /// Tab stops and the scroll region are rebuilt to defaults. The new
    /// size is recorded in the scratch configuration.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        let cols = cols.clamp(1, MAX_COLS);
        let rows = rows.clamp(1, MAX_ROWS);
        self.grid.resize(cols, rows);
        self.cursor.rebuild(cols, rows);
        self.scratch.width = u32::from(cols);
        self.scratch.height = u32::from(rows);
        self.content_dirty = true;
    }

    // ── Action dispatch ─────────────────────────────────────────────

    fn apply(&mut self, action: Action, host: &mut impl TerminalHost) {
        match action {
            Action::Print(ch) => self.print(ch),
            Action::Bell => host.bell(),
            Action::Backspace => self.cursor.move_rel(0, -1),
            Action::Tab => {
                self.cursor.col = self.cursor.next_tab_stop();
            }
            Action::Newline => {
                self.index_down();
                if self.modes.newline_mode() {
                    self.cursor.carriage_return();
                }
            }
            Action::CarriageReturn => self.cursor.carriage_return(),
            Action::ShiftIn => self.cursor.select_gl(0),
            Action::ShiftOut => self.cursor.select_gl(1),
            Action::CursorUp(n) => self.cursor.move_rel(-i32::from(n), 0),
            Action::CursorDown(n) => self.cursor.move_rel(i32::from(n), 0),
            Action::CursorRight(n) => self.cursor.move_rel(0, i32::from(n)),
            Action::CursorLeft(n) => self.cursor.move_rel(0, -i32::from(n)),
            Action::CursorNextLine(n) => {
                self.cursor.move_rel(i32::from(n), 0);
                self.cursor.carriage_return();
            }
            Action::CursorPrevLine(n) => {
                self.cursor.move_rel(-i32::from(n), 0);
                self.cursor.carriage_return();
            }
            Action::CursorColumn(col) => {
                let row = self.cursor.row;
                self.cursor.move_to(row, col);
            }
            Action::CursorRow(row) => {
                let col = self.cursor.col.min(self.grid.cols() - 1);
                self.move_origin_relative(row, col);
            }
            Action::CursorPosition { row, col } => self.move_origin_relative(row, col),
            Action::SetScrollRegion { top, bottom } => {
                let rows = self.grid.rows();
                let bottom = if bottom == 0 { rows } else { bottom.min(rows) };
                // `bottom` is 1-indexed inclusive here.
                if bottom > 0 {
                    self.cursor.set_scroll_region(top, bottom - 1);
                }
                self.move_origin_relative(0, 0);
            }
            Action::ScrollUp(n) => {
                self.grid.scroll_up(
                    self.cursor.scroll_top(),
                    self.cursor.scroll_bottom(),
                    n,
                    self.cursor.style.bg,
                );
                self.content_dirty = true;
            }
            Action::ScrollDown(n) => {
                self.grid.scroll_down(
                    self.cursor.scroll_top(),
                    self.cursor.scroll_bottom(),
                    n,
                    self.cursor.style.bg,
                );
                self.content_dirty = true;
            }
            Action::InsertLines(n) => {
                self.grid.insert_lines(
                    self.cursor.row,
                    n,
                    self.cursor.scroll_top(),
                    self.cursor.scroll_bottom(),
                    self.cursor.style.bg,
                );
                self.content_dirty = true;
            }
            Action::DeleteLines(n) => {
                self.grid.delete_lines(
                    self.cursor.row,
                    n,
                    self.cursor.scroll_top(),
                    self.cursor.scroll_bottom(),
                    self.cursor.style.bg,
                );
                self.content_dirty = true;
            }
            Action::InsertChars(n) => {
                let col = self.cursor.col.min(self.grid.cols() - 1);
                self.grid
                    .insert_chars(self.cursor.row, col, n, self.cursor.style.bg);
                self.content_dirty = true;
            }
            Action::DeleteChars(n) => {
                let col = self.cursor.col.min(self.grid.cols() - 1);
                self.grid
                    .delete_chars(self.cursor.row, col, n, self.cursor.style.bg);
                self.content_dirty = true;
            }
            Action::EraseChars(n) => {
                let col = self.cursor.col.min(self.grid.cols() - 1);
                self.grid
                    .erase_chars(self.cursor.row, col, n, self.cursor.style.bg);
                self.content_dirty = true;
            }
            Action::EraseInDisplay(mode) => {
                let row = self.cursor.row;
                let col = self.cursor.col.min(self.grid.cols() - 1);
                let bg = self.cursor.style.bg;
                match mode {
                    0 => self.grid.erase_below(row, col, bg),
                    1 => self.grid.erase_above(row, col, bg),
                    _ => self.grid.erase_all(bg),
                }
                self.content_dirty = true;
            }
            Action::EraseInLine(mode) => {
                let row = self.cursor.row;
                let col = self.cursor.col.min(self.grid.cols() - 1);
                let bg = self.cursor.style.bg;
                match mode {
                    0 => self.grid.erase_line_right(row, col, bg),
                    1 => self.grid.erase_line_left(row, col, bg),
                    _ => self.grid.erase_line(row, bg),
                }
                self.content_dirty = true;
            }
            Action::Sgr(params) => self.cursor.style.apply_sgr(&params),
            Action::DecSet(params) => {
                for &mode in &params {
                    self.dec_mode(mode, true);
                }
            }
            Action::DecRst(params) => {
                for &mode in &params {
                    self.dec_mode(mode, false);
                }
            }
            Action::AnsiSet(params) => {
                for &mode in &params {
                    if !self.modes.set_ansi_mode(mode, true) {
                        trace!(mode, "ignoring unknown ANSI mode");
                    }
                }
            }
            Action::AnsiRst(params) => {
                for &mode in &params {
                    if !self.modes.set_ansi_mode(mode, false) {
                        trace!(mode, "ignoring unknown ANSI mode");
                    }
                }
            }
            Action::SaveCursor => self.saved_full = Some(self.cursor.save()),
            Action::RestoreCursor => {
                match self.saved_full {
                    Some(saved) => self.cursor.restore(&saved),
                    None => {
                        // Restoring an empty slot restores defaults.
                        self.cursor.move_to(0, 0);
                        self.cursor.style.reset();
                        self.cursor.reset_charsets();
                    }
                }
                self.content_dirty = true;
            }
            Action::SaveCursorPosition => {
                self.saved_pos =
                    Some((self.cursor.row, self.cursor.col.min(self.grid.cols() - 1)));
            }
            Action::RestoreCursorPosition => {
                let (row, col) = self.saved_pos.unwrap_or((0, 0));
                self.cursor.move_to(row, col);
                self.content_dirty = true;
            }
            Action::Index => self.index_down(),
            Action::ReverseIndex => self.index_up(),
            Action::NextLine => {
                self.index_down();
                self.cursor.carriage_return();
            }
            Action::FullReset => self.reset(),
            Action::SoftReset => {
                self.modes.reset();
                self.cursor.style.reset();
                self.cursor.reset_scroll_region();
                self.cursor.reset_charsets();
                self.cursor.clamp();
                self.content_dirty = true;
            }
            Action::SetTabStop => self.cursor.set_tab_stop(),
            Action::ClearTabStop(mode) => match mode {
                0 => self.cursor.clear_tab_stop(),
                3 => self.cursor.clear_all_tab_stops(),
                _ => {}
            },
            Action::BackTab(n) => {
                for _ in 0..n {
                    self.cursor.col = self.cursor.prev_tab_stop();
                }
            }
            Action::ApplicationKeypad => self.modes.set_application_keypad(true),
            Action::NormalKeypad => self.modes.set_application_keypad(false),
            Action::ScreenAlignment => {
                self.grid.fill_all('E');
                self.content_dirty = true;
            }
            Action::DesignateCharset { slot, charset } => {
                self.cursor.designate_charset(slot, charset);
            }
            Action::LockingShift2 => self.cursor.select_gl(2),
            Action::LockingShift3 => self.cursor.select_gl(3),
            Action::SingleShift2 => self.cursor.set_single_shift(2),
            Action::SingleShift3 => self.cursor.set_single_shift(3),
            Action::DeviceAttributes => host.emit(DA1_REPLY),
            Action::DeviceStatusReport => host.emit(b"\x1b[0n"),
            Action::CursorPositionReport => {
                // The cursor can sit above the region top (SCORC is not
                // origin-aware), so the relative row clips at zero.
                let row = if self.modes.origin_mode() {
                    self.cursor.row.saturating_sub(self.cursor.scroll_top())
                } else {
                    self.cursor.row
                };
                let col = self.cursor.col.min(self.grid.cols() - 1);
                let reply = format!("\x1b[{};{}R", row + 1, col + 1);
                host.emit(reply.as_bytes());
            }
            Action::SetTitle(title) => {
                if self.scratch.set_title(&title) {
                    host.notify(NotifyTopic::LabelsChanged);
                }
            }
            Action::SetIconName(name) => {
                let name = clean_label(&name, TERM_TITLE_LEN - 1);
                if self.icon_name != name {
                    self.icon_name = name;
                    host.notify(NotifyTopic::LabelsChanged);
                }
            }
            Action::SetButtonLabel { slot, text } => {
                if self.scratch.set_button(usize::from(slot), &text) {
                    host.notify(NotifyTopic::LabelsChanged);
                }
            }
        }
    }

    // ── Glyph output ────────────────────────────────────────────────

    /// Place one glyph at the cursor and advance, honoring pending wrap,
    /// insert mode and the active character set.
    fn print(&mut self, ch: char) {
        let ch = self.cursor.translate(ch);
        let cols = self.grid.cols();

        if self.cursor.pending_wrap() {
            if self.modes.autowrap() {
                self.cursor.carriage_return();
                self.index_down();
            } else {
                self.cursor.col = cols - 1;
            }
        }

        if self.modes.insert_mode() {
            self.grid.insert_chars(
                self.cursor.row,
                self.cursor.col,
                1,
                self.cursor.style.bg,
            );
        }

        let style = self.cursor.style;
        if let Some(cell) = self.grid.cell_mut(self.cursor.row, self.cursor.col) {
            *cell = Cell::styled(ch, style);
        }

        self.cursor.col += 1;
        if self.cursor.col >= cols && !self.modes.autowrap() {
            self.cursor.col = cols - 1;
        }
        self.content_dirty = true;
    }

    // ── Vertical motion with scrolling ──────────────────────────────

    /// IND / LF: move down one row, scrolling when at the bottom margin.
    fn index_down(&mut self) {
        let cols = self.grid.cols();
        self.cursor.col = self.cursor.col.min(cols - 1);
        if self.cursor.row == self.cursor.scroll_bottom() {
            self.grid.scroll_up(
                self.cursor.scroll_top(),
                self.cursor.scroll_bottom(),
                1,
                self.cursor.style.bg,
            );
            self.content_dirty = true;
        } else if self.cursor.row + 1 < self.grid.rows() {
            self.cursor.row += 1;
        }
    }

    /// RI: move up one row, scrolling when at the top margin.
    fn index_up(&mut self) {
        let cols = self.grid.cols();
        self.cursor.col = self.cursor.col.min(cols - 1);
        if self.cursor.row == self.cursor.scroll_top() {
            self.grid.scroll_down(
                self.cursor.scroll_top(),
                self.cursor.scroll_bottom(),
                1,
                self.cursor.style.bg,
            );
            self.content_dirty = true;
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    /// Absolute row/col addressing; in origin mode rows are relative to the
    /// scroll-region top and clipped to the region.
    fn move_origin_relative(&mut self, row: u16, col: u16) {
        if self.modes.origin_mode() {
            let top = self.cursor.scroll_top();
            let bottom = self.cursor.scroll_bottom();
            let row = top.saturating_add(row).min(bottom);
            self.cursor.move_to(row, col);
        } else {
            self.cursor.move_to(row, col);
        }
    }

    // ── Mode handling ───────────────────────────────────────────────

    fn dec_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            // DECCOLM: switch between 80 and 132 columns (clamped to the
            // grid's hard bound), clearing the screen and homing the cursor.
            3 => {
                let width: u16 = if enable { 132 } else { 80 };
                let rows = self.grid.rows();
                self.resize(rows, width);
                self.grid.clear();
                self.modes.set_dec_mode(mode, enable);
                self.move_origin_relative(0, 0);
            }
            // DECOM: origin change homes the cursor.
            6 => {
                self.modes.set_dec_mode(mode, enable);
                self.move_origin_relative(0, 0);
            }
            5 | 25 => {
                // Visual flags surface through the serialized header.
                self.modes.set_dec_mode(mode, enable);
                self.content_dirty = true;
            }
            _ => {
                if !self.modes.set_dec_mode(mode, enable) {
                    trace!(mode, enable, "ignoring unknown DEC private mode");
                }
            }
        }
    }
}

/// Configured width folded onto the supported column range.
fn clamp_cols(width: u32) -> u16 {
    (width.min(u32::from(MAX_COLS)) as u16).max(1)
}

/// Configured height folded onto the supported row range.
fn clamp_rows(height: u32) -> u16 {
    (height.min(u32::from(MAX_ROWS)) as u16).max(1)
}
