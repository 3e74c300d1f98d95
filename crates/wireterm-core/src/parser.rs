//! VT/ANSI parser.
//!
//! A deterministic byte-driven state machine that turns the remote
//! program's output stream into a sequence of actions for the terminal
//! engine. It recognizes:
//!
//! - printable characters (ASCII + full UTF-8) -> `Action::Print`
//! - C0 controls, also while a control sequence is being collected
//! - CSI sequences with numeric parameters, a private-mode marker and
//!   intermediates, including a malformed-parameter ignore state
//! - OSC strings (title, icon, button labels), BEL or ST terminated
//! - DCS strings, skipped up to ST
//! - ESC-level dispatch (save/restore, index family, charset designation,
//!   keypad, alignment test, full reset)
//!
//! Anything it does not understand is discarded silently; the parser never
//! fails. CAN (0x18) and SUB (0x1A) abort the sequence in progress, ESC
//! aborts it and starts a new one.

use smallvec::SmallVec;
use tracing::trace;

/// Inline capacity for CSI parameter lists.
///
/// Sequences seen in practice carry at most a handful of parameters; eight
/// slots keep SGR runs off the heap.
pub type CsiParams = SmallVec<[u16; 8]>;

/// Largest accepted numeric parameter; larger values are clamped here to
/// keep downstream arithmetic comfortably inside `u16`.
pub const PARAM_MAX: u16 = 16_383;

/// Parameters beyond this count are dropped (the sequence still dispatches).
pub const MAX_PARAMS: usize = 16;

/// Longest OSC payload retained; the rest is discarded up to the terminator.
const MAX_OSC: usize = 128;

/// Emitted for malformed UTF-8 input.
const REPLACEMENT: char = '\u{FFFD}';

/// Parser output actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print one glyph (ASCII or decoded multi-byte UTF-8).
    Print(char),
    /// BEL (0x07).
    Bell,
    /// BS (0x08).
    Backspace,
    /// HT (0x09): advance to the next tab stop.
    Tab,
    /// LF, VT or FF: index down, plus CR in newline mode.
    Newline,
    /// CR (0x0D).
    CarriageReturn,
    /// SO (0x0E): select G1 into GL.
    ShiftOut,
    /// SI (0x0F): select G0 into GL.
    ShiftIn,
    /// CUU (`CSI Ps A`).
    CursorUp(u16),
    /// CUD (`CSI Ps B`).
    CursorDown(u16),
    /// CUF (`CSI Ps C`).
    CursorRight(u16),
    /// CUB (`CSI Ps D`).
    CursorLeft(u16),
    /// CNL (`CSI Ps E`): down and to column 0.
    CursorNextLine(u16),
    /// CPL (`CSI Ps F`): up and to column 0.
    CursorPrevLine(u16),
    /// CHA (`CSI Ps G`): absolute column, 0-indexed.
    CursorColumn(u16),
    /// VPA (`CSI Ps d`): absolute row, 0-indexed.
    CursorRow(u16),
    /// CUP/HVP (`CSI Pr ; Pc H|f`): absolute position, 0-indexed.
    CursorPosition { row: u16, col: u16 },
    /// DECSTBM (`CSI Pt ; Pb r`). `top` is 0-indexed; `bottom == 0` means
    /// "full height" (the parser does not know the grid size), otherwise it
    /// is the 1-indexed inclusive bottom row.
    SetScrollRegion { top: u16, bottom: u16 },
    /// SU (`CSI Ps S`).
    ScrollUp(u16),
    /// SD (`CSI Ps T`).
    ScrollDown(u16),
    /// IL (`CSI Ps L`).
    InsertLines(u16),
    /// DL (`CSI Ps M`).
    DeleteLines(u16),
    /// ICH (`CSI Ps @`).
    InsertChars(u16),
    /// DCH (`CSI Ps P`).
    DeleteChars(u16),
    /// ECH (`CSI Ps X`).
    EraseChars(u16),
    /// ED (`CSI Ps J`), mode 0-2.
    EraseInDisplay(u8),
    /// EL (`CSI Ps K`), mode 0-2.
    EraseInLine(u8),
    /// SGR (`CSI ... m`): raw parameters, interpreted statefully downstream.
    Sgr(CsiParams),
    /// DECSET (`CSI ? Pm h`).
    DecSet(CsiParams),
    /// DECRST (`CSI ? Pm l`).
    DecRst(CsiParams),
    /// SM (`CSI Pm h`).
    AnsiSet(CsiParams),
    /// RM (`CSI Pm l`).
    AnsiRst(CsiParams),
    /// DECSC (`ESC 7`): save cursor with attributes and charsets.
    SaveCursor,
    /// DECRC (`ESC 8`): restore the DECSC snapshot.
    RestoreCursor,
    /// SCOSC (`CSI s`): save the cursor position only.
    SaveCursorPosition,
    /// SCORC (`CSI u`): restore the position-only save.
    RestoreCursorPosition,
    /// IND (`ESC D`).
    Index,
    /// RI (`ESC M`).
    ReverseIndex,
    /// NEL (`ESC E`).
    NextLine,
    /// RIS (`ESC c`).
    FullReset,
    /// DECSTR (`CSI ! p`): soft reset, screen content untouched.
    SoftReset,
    /// HTS (`ESC H`).
    SetTabStop,
    /// TBC (`CSI Ps g`): 0 = at cursor, 3 = all.
    ClearTabStop(u16),
    /// CBT (`CSI Ps Z`).
    BackTab(u16),
    /// DECKPAM (`ESC =`).
    ApplicationKeypad,
    /// DECKPNM (`ESC >`).
    NormalKeypad,
    /// DECALN (`ESC # 8`).
    ScreenAlignment,
    /// Designate a charset into G0-G3 (`ESC ( c` .. `ESC + c`).
    DesignateCharset { slot: u8, charset: u8 },
    /// LS2 (`ESC n`): lock G2 into GL.
    LockingShift2,
    /// LS3 (`ESC o`): lock G3 into GL.
    LockingShift3,
    /// SS2 (`ESC N`): G2 for the next glyph only.
    SingleShift2,
    /// SS3 (`ESC O`): G3 for the next glyph only.
    SingleShift3,
    /// DA1 (`CSI c` / `CSI 0 c`).
    DeviceAttributes,
    /// DSR 5 (`CSI 5 n`): operating status.
    DeviceStatusReport,
    /// DSR 6 (`CSI 6 n`): cursor position report.
    CursorPositionReport,
    /// OSC 0 / OSC 2.
    SetTitle(String),
    /// OSC 1.
    SetIconName(String),
    /// OSC 81-85: button label for slot 0-4.
    SetButtonLabel { slot: u8, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Esc,
    /// After `ESC` + an intermediate byte (0x20-0x2F); only `# 8` dispatches.
    EscIntermediate(u8),
    /// After `ESC (` / `)` / `*` / `+`, waiting for the designator.
    CharsetDesignate(u8),
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    /// Malformed CSI: swallow everything up to the final byte.
    CsiIgnore,
    OscString,
    OscEsc,
    DcsString,
    DcsEsc,
    /// Inside a multi-byte UTF-8 glyph; counts continuation bytes left.
    Utf8(u8),
}

/// VT/ANSI parser state.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    params: CsiParams,
    cur_param: u16,
    has_cur_param: bool,
    /// Private-marker byte (`?`, `<`, `=`, `>`) or 0.
    private: u8,
    /// First collected intermediate byte or 0.
    intermediate: u8,
    osc: Vec<u8>,
    utf8_buf: [u8; 4],
    utf8_len: u8,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: CsiParams::new(),
            cur_param: 0,
            has_cur_param: false,
            private: 0,
            intermediate: 0,
            osc: Vec::with_capacity(MAX_OSC),
            utf8_buf: [0; 4],
            utf8_len: 0,
        }
    }

    /// Feed a chunk of bytes and return the parsed actions.
    ///
    /// Safe to call with any slice, including an empty one; a sequence cut
    /// mid-way stays pending until more bytes arrive.
    #[must_use]
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Action> {
        let mut out = Vec::new();
        self.feed_into(bytes, &mut out);
        out
    }

    /// Feed a chunk of bytes, appending parsed actions to `out`.
    pub fn feed_into(&mut self, bytes: &[u8], out: &mut Vec<Action>) {
        for &b in bytes {
            self.advance(b, out);
        }
    }

    /// Drop any sequence in progress and return to ground state.
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_csi();
        self.osc.clear();
        self.utf8_len = 0;
    }

    fn advance(&mut self, b: u8, out: &mut Vec<Action>) {
        // CAN and SUB abort whatever is being collected, from any state.
        if (b == 0x18 || b == 0x1A) && self.state != State::Ground {
            if let State::Utf8(_) = self.state {
                out.push(Action::Print(REPLACEMENT));
            }
            self.reset();
            return;
        }

        match self.state {
            State::Ground => self.advance_ground(b, out),
            State::Esc => self.advance_esc(b, out),
            State::EscIntermediate(first) => self.advance_esc_intermediate(first, b, out),
            State::CharsetDesignate(slot) => self.advance_charset(slot, b, out),
            State::CsiEntry | State::CsiParam => self.advance_csi(b, out),
            State::CsiIntermediate => self.advance_csi_intermediate(b, out),
            State::CsiIgnore => self.advance_csi_ignore(b, out),
            State::OscString => self.advance_osc(b, out),
            State::OscEsc => self.advance_osc_esc(b, out),
            State::DcsString => self.advance_dcs(b),
            State::DcsEsc => self.advance_dcs_esc(b, out),
            State::Utf8(remaining) => self.advance_utf8(remaining, b, out),
        }
    }

    fn advance_ground(&mut self, b: u8, out: &mut Vec<Action>) {
        match b {
            0x1B => self.start_escape(),
            0x20..=0x7E => out.push(Action::Print(b as char)),
            0xC2..=0xDF => self.start_utf8(b, 1),
            0xE0..=0xEF => self.start_utf8(b, 2),
            0xF0..=0xF4 => self.start_utf8(b, 3),
            // Overlong leads (0xC0/0xC1), out-of-range leads (0xF5..) and
            // stray continuation bytes are all malformed input.
            0x80..=0xFF => out.push(Action::Print(REPLACEMENT)),
            _ => {
                if let Some(action) = c0_action(b) {
                    out.push(action);
                }
            }
        }
    }

    /// C0 controls execute even while an escape sequence is collected.
    fn execute_c0(&mut self, b: u8, out: &mut Vec<Action>) {
        if let Some(action) = c0_action(b) {
            out.push(action);
        }
    }

    fn start_escape(&mut self) {
        self.state = State::Esc;
        self.clear_csi();
    }

    fn clear_csi(&mut self) {
        self.params.clear();
        self.cur_param = 0;
        self.has_cur_param = false;
        self.private = 0;
        self.intermediate = 0;
    }

    fn start_utf8(&mut self, lead: u8, continuations: u8) {
        self.utf8_buf[0] = lead;
        self.utf8_len = 1;
        self.state = State::Utf8(continuations);
    }

    fn advance_utf8(&mut self, remaining: u8, b: u8, out: &mut Vec<Action>) {
        if !(0x80..=0xBF).contains(&b) {
            // Truncated sequence: emit the replacement glyph and reprocess
            // this byte from ground state (it may be ESC or a new lead).
            self.state = State::Ground;
            self.utf8_len = 0;
            out.push(Action::Print(REPLACEMENT));
            self.advance(b, out);
            return;
        }

        let idx = self.utf8_len as usize;
        if idx < 4 {
            self.utf8_buf[idx] = b;
            self.utf8_len += 1;
        }
        if remaining > 1 {
            self.state = State::Utf8(remaining - 1);
            return;
        }

        // Sequence complete; `from_utf8` rejects overlong encodings and
        // surrogate ranges that the lead-byte ranges alone cannot.
        self.state = State::Ground;
        let len = self.utf8_len as usize;
        let ch = core::str::from_utf8(&self.utf8_buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(REPLACEMENT);
        self.utf8_len = 0;
        out.push(Action::Print(ch));
    }

    fn advance_esc(&mut self, b: u8, out: &mut Vec<Action>) {
        match b {
            b'[' => {
                self.state = State::CsiEntry;
                return;
            }
            b']' => {
                self.osc.clear();
                self.state = State::OscString;
                return;
            }
            b'P' => {
                self.state = State::DcsString;
                return;
            }
            b'(' | b')' | b'*' | b'+' => {
                self.state = State::CharsetDesignate(b - b'(');
                return;
            }
            0x20..=0x2F => {
                self.state = State::EscIntermediate(b);
                return;
            }
            0x1B => {
                // ESC ESC: restart.
                self.start_escape();
                return;
            }
            _ => {}
        }

        self.state = State::Ground;
        let action = match b {
            b'7' => Some(Action::SaveCursor),
            b'8' => Some(Action::RestoreCursor),
            b'c' => Some(Action::FullReset),
            b'D' => Some(Action::Index),
            b'M' => Some(Action::ReverseIndex),
            b'E' => Some(Action::NextLine),
            b'H' => Some(Action::SetTabStop),
            b'=' => Some(Action::ApplicationKeypad),
            b'>' => Some(Action::NormalKeypad),
            b'n' => Some(Action::LockingShift2),
            b'o' => Some(Action::LockingShift3),
            b'N' => Some(Action::SingleShift2),
            b'O' => Some(Action::SingleShift3),
            b'\\' => None, // stray ST
            _ => {
                trace!(byte = b, "discarding unknown ESC dispatch");
                None
            }
        };
        if let Some(action) = action {
            out.push(action);
        }
    }

    fn advance_esc_intermediate(&mut self, first: u8, b: u8, out: &mut Vec<Action>) {
        match b {
            0x20..=0x2F => {} // collect further intermediates, keep the first
            0x1B => self.start_escape(),
            0x30..=0x7E => {
                self.state = State::Ground;
                if first == b'#' && b == b'8' {
                    out.push(Action::ScreenAlignment);
                } else {
                    trace!(intermediate = first, byte = b, "discarding unknown ESC sequence");
                }
            }
            _ => self.execute_c0(b, out),
        }
    }

    fn advance_charset(&mut self, slot: u8, b: u8, out: &mut Vec<Action>) {
        match b {
            0x30..=0x7E => {
                self.state = State::Ground;
                out.push(Action::DesignateCharset { slot, charset: b });
            }
            0x1B => self.start_escape(),
            0x20..=0x2F => {} // multi-byte designators: keep waiting for the final
            _ => self.execute_c0(b, out),
        }
    }

    fn advance_csi(&mut self, b: u8, out: &mut Vec<Action>) {
        match b {
            b'0'..=b'9' => {
                let digit = u16::from(b - b'0');
                self.cur_param = self
                    .cur_param
                    .saturating_mul(10)
                    .saturating_add(digit)
                    .min(PARAM_MAX);
                self.has_cur_param = true;
                self.state = State::CsiParam;
            }
            b';' => {
                self.push_param();
                self.state = State::CsiParam;
            }
            0x3C..=0x3F => {
                // Private markers are only valid before any parameter.
                if self.state == State::CsiEntry {
                    self.private = b;
                } else {
                    self.state = State::CsiIgnore;
                }
            }
            b':' => self.state = State::CsiIgnore,
            0x20..=0x2F => {
                self.intermediate = b;
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => self.dispatch_csi(b, out),
            0x1B => self.start_escape(),
            _ => self.execute_c0(b, out),
        }
    }

    fn advance_csi_intermediate(&mut self, b: u8, out: &mut Vec<Action>) {
        match b {
            0x20..=0x2F => {} // keep the first intermediate
            0x30..=0x3F => self.state = State::CsiIgnore,
            0x40..=0x7E => self.dispatch_csi(b, out),
            0x1B => self.start_escape(),
            _ => self.execute_c0(b, out),
        }
    }

    fn advance_csi_ignore(&mut self, b: u8, out: &mut Vec<Action>) {
        match b {
            0x40..=0x7E => {
                self.state = State::Ground;
                trace!(final_byte = b, "discarding malformed CSI sequence");
            }
            0x1B => self.start_escape(),
            0x20..=0x3F => {}
            _ => self.execute_c0(b, out),
        }
    }

    fn push_param(&mut self) {
        if self.params.len() < MAX_PARAMS {
            self.params.push(self.cur_param);
        }
        self.cur_param = 0;
        self.has_cur_param = false;
    }

    fn dispatch_csi(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        if self.has_cur_param || !self.params.is_empty() {
            self.push_param();
        }
        self.state = State::Ground;
        let params = core::mem::take(&mut self.params);
        let private = self.private;
        let intermediate = self.intermediate;

        if let Some(action) = Self::decode_csi(final_byte, private, intermediate, &params) {
            out.push(action);
        } else {
            trace!(
                final_byte,
                private,
                intermediate,
                "discarding unrecognized CSI sequence"
            );
        }
    }

    fn decode_csi(
        final_byte: u8,
        private: u8,
        intermediate: u8,
        params: &CsiParams,
    ) -> Option<Action> {
        if intermediate != 0 {
            // DECSTR (CSI ! p) is the only intermediate form handled.
            if intermediate == b'!' && final_byte == b'p' && private == 0 {
                return Some(Action::SoftReset);
            }
            return None;
        }

        if private == b'?' {
            return match final_byte {
                b'h' => Some(Action::DecSet(params.clone())),
                b'l' => Some(Action::DecRst(params.clone())),
                _ => None,
            };
        }
        if private != 0 {
            return None;
        }

        let first = params.first().copied();
        match final_byte {
            b'A' => Some(Action::CursorUp(count_or_one(first))),
            b'B' => Some(Action::CursorDown(count_or_one(first))),
            b'C' => Some(Action::CursorRight(count_or_one(first))),
            b'D' => Some(Action::CursorLeft(count_or_one(first))),
            b'E' => Some(Action::CursorNextLine(count_or_one(first))),
            b'F' => Some(Action::CursorPrevLine(count_or_one(first))),
            b'G' => Some(Action::CursorColumn(count_or_one(first) - 1)),
            b'd' => Some(Action::CursorRow(count_or_one(first) - 1)),
            b'H' | b'f' => {
                let row = count_or_one(first) - 1;
                let col = count_or_one(params.get(1).copied()) - 1;
                Some(Action::CursorPosition { row, col })
            }
            b'J' => {
                let mode = first.unwrap_or(0);
                (mode <= 2).then(|| Action::EraseInDisplay(mode as u8))
            }
            b'K' => {
                let mode = first.unwrap_or(0);
                (mode <= 2).then(|| Action::EraseInLine(mode as u8))
            }
            b'@' => Some(Action::InsertChars(count_or_one(first))),
            b'P' => Some(Action::DeleteChars(count_or_one(first))),
            b'X' => Some(Action::EraseChars(count_or_one(first))),
            b'L' => Some(Action::InsertLines(count_or_one(first))),
            b'M' => Some(Action::DeleteLines(count_or_one(first))),
            b'S' => Some(Action::ScrollUp(count_or_one(first))),
            b'T' => {
                // CSI with extra params on 'T' is mouse-tracking config.
                (params.len() <= 1).then(|| Action::ScrollDown(count_or_one(first)))
            }
            b'r' => {
                let top = count_or_one(first) - 1;
                let bottom = params.get(1).copied().unwrap_or(0);
                Some(Action::SetScrollRegion { top, bottom })
            }
            b'm' => Some(Action::Sgr(params.clone())),
            b'g' => {
                let mode = first.unwrap_or(0);
                Some(Action::ClearTabStop(mode))
            }
            b'Z' => Some(Action::BackTab(count_or_one(first))),
            b's' => params.is_empty().then_some(Action::SaveCursorPosition),
            b'u' => params.is_empty().then_some(Action::RestoreCursorPosition),
            b'h' => Some(Action::AnsiSet(params.clone())),
            b'l' => Some(Action::AnsiRst(params.clone())),
            b'c' => (first.unwrap_or(0) == 0).then_some(Action::DeviceAttributes),
            b'n' => match first.unwrap_or(0) {
                5 => Some(Action::DeviceStatusReport),
                6 => Some(Action::CursorPositionReport),
                _ => None,
            },
            _ => None,
        }
    }

    fn advance_osc(&mut self, b: u8, out: &mut Vec<Action>) {
        match b {
            0x07 => {
                self.state = State::Ground;
                if let Some(action) = self.take_osc() {
                    out.push(action);
                }
            }
            0x1B => self.state = State::OscEsc,
            _ => {
                // Over-long payloads keep the prefix; the rest is discarded
                // up to the terminator.
                if self.osc.len() < MAX_OSC {
                    self.osc.push(b);
                }
            }
        }
    }

    fn advance_osc_esc(&mut self, b: u8, out: &mut Vec<Action>) {
        if b == b'\\' {
            self.state = State::Ground;
            if let Some(action) = self.take_osc() {
                out.push(action);
            }
        } else {
            // Not an ST: the OSC is abandoned and the ESC starts over.
            self.osc.clear();
            self.start_escape();
            self.advance_esc(b, out);
        }
    }

    fn take_osc(&mut self) -> Option<Action> {
        let payload = core::mem::take(&mut self.osc);
        let semi = payload.iter().position(|&b| b == b';')?;
        let cmd: u16 = core::str::from_utf8(&payload[..semi]).ok()?.parse().ok()?;
        let text = String::from_utf8_lossy(&payload[semi + 1..]).into_owned();

        match cmd {
            0 | 2 => Some(Action::SetTitle(text)),
            1 => Some(Action::SetIconName(text)),
            81..=85 => Some(Action::SetButtonLabel {
                slot: (cmd - 81) as u8,
                text,
            }),
            _ => {
                trace!(cmd, "discarding unknown OSC command");
                None
            }
        }
    }

    fn advance_dcs(&mut self, b: u8) {
        if b == 0x1B {
            self.state = State::DcsEsc;
        }
        // Everything else inside a DCS is skipped.
    }

    fn advance_dcs_esc(&mut self, b: u8, out: &mut Vec<Action>) {
        if b == b'\\' {
            self.state = State::Ground;
        } else {
            self.start_escape();
            self.advance_esc(b, out);
        }
    }
}

/// Map a C0 control byte to its action, if any.
fn c0_action(b: u8) -> Option<Action> {
    match b {
        0x07 => Some(Action::Bell),
        0x08 => Some(Action::Backspace),
        0x09 => Some(Action::Tab),
        0x0A | 0x0B | 0x0C => Some(Action::Newline),
        0x0D => Some(Action::CarriageReturn),
        0x0E => Some(Action::ShiftOut),
        0x0F => Some(Action::ShiftIn),
        _ => None,
    }
}

/// Empty and zero parameters default to 1 for count-style sequences.
fn count_or_one(value: Option<u16>) -> u16 {
    value.unwrap_or(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    // ── Ground state ────────────────────────────────────────────────

    #[test]
    fn printable_ascii_emits_print() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"hi"), vec![Action::Print('h'), Action::Print('i')]);
    }

    #[test]
    fn c0_controls_emit_actions() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x07\x08\t\r\n"),
            vec![
                Action::Bell,
                Action::Backspace,
                Action::Tab,
                Action::CarriageReturn,
                Action::Newline,
            ]
        );
    }

    #[test]
    fn vt_and_ff_are_newline() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x0b\x0c"), vec![Action::Newline, Action::Newline]);
    }

    #[test]
    fn shift_in_out() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x0e\x0f"), vec![Action::ShiftOut, Action::ShiftIn]);
    }

    #[test]
    fn unhandled_c0_is_ignored() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x00\x01\x05").is_empty());
    }

    // ── UTF-8 ───────────────────────────────────────────────────────

    #[test]
    fn utf8_two_three_four_byte_scalars() {
        let mut p = Parser::new();
        assert_eq!(p.feed("é".as_bytes()), vec![Action::Print('é')]);
        assert_eq!(p.feed("中".as_bytes()), vec![Action::Print('中')]);
        assert_eq!(p.feed("🎉".as_bytes()), vec![Action::Print('🎉')]);
    }

    #[test]
    fn utf8_split_across_feeds() {
        let mut p = Parser::new();
        assert!(p.feed(&[0xF0]).is_empty());
        assert!(p.feed(&[0x9F]).is_empty());
        assert!(p.feed(&[0x8E]).is_empty());
        assert_eq!(p.feed(&[0x89]), vec![Action::Print('🎉')]);
    }

    #[test]
    fn utf8_bad_lead_yields_replacement() {
        let mut p = Parser::new();
        assert_eq!(p.feed(&[0xC0]), vec![Action::Print('\u{FFFD}')]);
        assert_eq!(p.feed(&[0xFF]), vec![Action::Print('\u{FFFD}')]);
        assert_eq!(p.feed(&[0x85]), vec![Action::Print('\u{FFFD}')]);
    }

    #[test]
    fn utf8_truncated_sequence_yields_replacement_then_reprocesses() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(&[0xC3, b'a']),
            vec![Action::Print('\u{FFFD}'), Action::Print('a')]
        );
    }

    #[test]
    fn utf8_interrupted_by_escape() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(&[0xC3, 0x1b, b'c']),
            vec![Action::Print('\u{FFFD}'), Action::FullReset]
        );
    }

    #[test]
    fn utf8_overlong_three_byte_yields_replacement() {
        // E0 80 80 is an overlong encoding of NUL.
        let mut p = Parser::new();
        assert_eq!(p.feed(&[0xE0, 0x80, 0x80]), vec![Action::Print('\u{FFFD}')]);
    }

    #[test]
    fn utf8_surrogate_yields_replacement() {
        // ED A0 80 encodes U+D800.
        let mut p = Parser::new();
        assert_eq!(p.feed(&[0xED, 0xA0, 0x80]), vec![Action::Print('\u{FFFD}')]);
    }

    // ── ESC dispatch ────────────────────────────────────────────────

    #[test]
    fn esc_singles() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b7"), vec![Action::SaveCursor]);
        assert_eq!(p.feed(b"\x1b8"), vec![Action::RestoreCursor]);
        assert_eq!(p.feed(b"\x1bD"), vec![Action::Index]);
        assert_eq!(p.feed(b"\x1bM"), vec![Action::ReverseIndex]);
        assert_eq!(p.feed(b"\x1bE"), vec![Action::NextLine]);
        assert_eq!(p.feed(b"\x1bc"), vec![Action::FullReset]);
        assert_eq!(p.feed(b"\x1bH"), vec![Action::SetTabStop]);
        assert_eq!(p.feed(b"\x1b="), vec![Action::ApplicationKeypad]);
        assert_eq!(p.feed(b"\x1b>"), vec![Action::NormalKeypad]);
    }

    #[test]
    fn esc_shift_selection() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1bn"), vec![Action::LockingShift2]);
        assert_eq!(p.feed(b"\x1bo"), vec![Action::LockingShift3]);
        assert_eq!(p.feed(b"\x1bN"), vec![Action::SingleShift2]);
        assert_eq!(p.feed(b"\x1bO"), vec![Action::SingleShift3]);
    }

    #[test]
    fn esc_hash_eight_is_screen_alignment() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b#8"), vec![Action::ScreenAlignment]);
    }

    #[test]
    fn esc_hash_unknown_is_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b#3").is_empty());
    }

    #[test]
    fn esc_unknown_final_is_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1bz").is_empty());
        // Parser must be back in ground.
        assert_eq!(p.feed(b"A"), vec![Action::Print('A')]);
    }

    #[test]
    fn charset_designation_all_slots() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b(0\x1b)B\x1b*A\x1b+0"),
            vec![
                Action::DesignateCharset { slot: 0, charset: b'0' },
                Action::DesignateCharset { slot: 1, charset: b'B' },
                Action::DesignateCharset { slot: 2, charset: b'A' },
                Action::DesignateCharset { slot: 3, charset: b'0' },
            ]
        );
    }

    // ── CSI ─────────────────────────────────────────────────────────

    #[test]
    fn csi_cursor_moves() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b[2A\x1b[B\x1b[3C\x1b[0D"),
            vec![
                Action::CursorUp(2),
                Action::CursorDown(1),
                Action::CursorRight(3),
                Action::CursorLeft(1),
            ]
        );
    }

    #[test]
    fn csi_cup_is_zero_indexed() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b[5;10H"),
            vec![Action::CursorPosition { row: 4, col: 9 }]
        );
        assert_eq!(
            p.feed(b"\x1b[0;0H"),
            vec![Action::CursorPosition { row: 0, col: 0 }]
        );
        assert_eq!(
            p.feed(b"\x1b[;7f"),
            vec![Action::CursorPosition { row: 0, col: 6 }]
        );
    }

    #[test]
    fn csi_cha_vpa() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[5G"), vec![Action::CursorColumn(4)]);
        assert_eq!(p.feed(b"\x1b[0G"), vec![Action::CursorColumn(0)]);
        assert_eq!(p.feed(b"\x1b[3d"), vec![Action::CursorRow(2)]);
    }

    #[test]
    fn csi_erase_modes() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[J"), vec![Action::EraseInDisplay(0)]);
        assert_eq!(p.feed(b"\x1b[1J"), vec![Action::EraseInDisplay(1)]);
        assert_eq!(p.feed(b"\x1b[2J"), vec![Action::EraseInDisplay(2)]);
        assert_eq!(p.feed(b"\x1b[K"), vec![Action::EraseInLine(0)]);
        assert_eq!(p.feed(b"\x1b[2K"), vec![Action::EraseInLine(2)]);
        // ED 3 (scrollback erase) is not supported here.
        assert!(p.feed(b"\x1b[3J").is_empty());
    }

    #[test]
    fn csi_editing_sequences() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b[4@\x1b[P\x1b[2X\x1b[3L\x1b[M"),
            vec![
                Action::InsertChars(4),
                Action::DeleteChars(1),
                Action::EraseChars(2),
                Action::InsertLines(3),
                Action::DeleteLines(1),
            ]
        );
    }

    #[test]
    fn csi_scroll_and_region() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b[2;4r\x1b[r\x1b[2S\x1b[T"),
            vec![
                Action::SetScrollRegion { top: 1, bottom: 4 },
                Action::SetScrollRegion { top: 0, bottom: 0 },
                Action::ScrollUp(2),
                Action::ScrollDown(1),
            ]
        );
    }

    #[test]
    fn csi_sgr_params_are_raw() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[31;1m"), vec![Action::Sgr(smallvec![31, 1])]);
        assert_eq!(p.feed(b"\x1b[m"), vec![Action::Sgr(smallvec![])]);
        assert_eq!(
            p.feed(b"\x1b[38;5;196m"),
            vec![Action::Sgr(smallvec![38, 5, 196])]
        );
    }

    #[test]
    fn csi_empty_params_default_to_zero_slots() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[;5H"), vec![Action::CursorPosition { row: 0, col: 4 }]);
        assert_eq!(p.feed(b"\x1b[5;m"), vec![Action::Sgr(smallvec![5, 0])]);
    }

    #[test]
    fn csi_dec_private_modes() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[?25l"), vec![Action::DecRst(smallvec![25])]);
        assert_eq!(p.feed(b"\x1b[?7h"), vec![Action::DecSet(smallvec![7])]);
        assert_eq!(
            p.feed(b"\x1b[?1049;1006h"),
            vec![Action::DecSet(smallvec![1049, 1006])]
        );
    }

    #[test]
    fn csi_ansi_modes() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[4h"), vec![Action::AnsiSet(smallvec![4])]);
        assert_eq!(p.feed(b"\x1b[20l"), vec![Action::AnsiRst(smallvec![20])]);
    }

    #[test]
    fn csi_save_restore_position() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[s"), vec![Action::SaveCursorPosition]);
        assert_eq!(p.feed(b"\x1b[u"), vec![Action::RestoreCursorPosition]);
        // With parameters these are different (unsupported) sequences.
        assert!(p.feed(b"\x1b[1;2s").is_empty());
    }

    #[test]
    fn csi_tab_sequences() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[g"), vec![Action::ClearTabStop(0)]);
        assert_eq!(p.feed(b"\x1b[3g"), vec![Action::ClearTabStop(3)]);
        assert_eq!(p.feed(b"\x1b[2Z"), vec![Action::BackTab(2)]);
    }

    #[test]
    fn csi_device_queries() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[c"), vec![Action::DeviceAttributes]);
        assert_eq!(p.feed(b"\x1b[0c"), vec![Action::DeviceAttributes]);
        assert_eq!(p.feed(b"\x1b[5n"), vec![Action::DeviceStatusReport]);
        assert_eq!(p.feed(b"\x1b[6n"), vec![Action::CursorPositionReport]);
        assert!(p.feed(b"\x1b[1c").is_empty());
        assert!(p.feed(b"\x1b[4n").is_empty());
    }

    #[test]
    fn csi_soft_reset() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[!p"), vec![Action::SoftReset]);
    }

    #[test]
    fn csi_unknown_final_is_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b[5y").is_empty());
        assert_eq!(p.feed(b"A"), vec![Action::Print('A')]);
    }

    #[test]
    fn csi_colon_param_enters_ignore() {
        let mut p = Parser::new();
        // Colon sub-parameters are not supported: the sequence is swallowed
        // whole, including its final byte.
        assert!(p.feed(b"\x1b[38:5:196m").is_empty());
        assert_eq!(p.feed(b"B"), vec![Action::Print('B')]);
    }

    #[test]
    fn csi_misplaced_private_marker_enters_ignore() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b[5?25h").is_empty());
        assert_eq!(p.feed(b"B"), vec![Action::Print('B')]);
    }

    #[test]
    fn csi_param_value_is_clamped() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b[99999999A"),
            vec![Action::CursorUp(PARAM_MAX)]
        );
    }

    #[test]
    fn csi_excess_params_are_dropped() {
        let mut p = Parser::new();
        let mut input = b"\x1b[".to_vec();
        for i in 0..30 {
            if i > 0 {
                input.push(b';');
            }
            input.extend_from_slice(i.to_string().as_bytes());
        }
        input.push(b'm');
        let actions = p.feed(&input);
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Sgr(params) => {
                assert_eq!(params.len(), MAX_PARAMS);
                assert_eq!(params[0], 0);
                assert_eq!(params[MAX_PARAMS - 1], (MAX_PARAMS - 1) as u16);
            }
            other => panic!("expected Sgr, got {other:?}"),
        }
    }

    #[test]
    fn c0_executes_inside_csi() {
        let mut p = Parser::new();
        // A carriage return in the middle of CSI collection executes
        // immediately; the sequence still completes.
        assert_eq!(
            p.feed(b"\x1b[2\rA"),
            vec![Action::CarriageReturn, Action::CursorUp(2)]
        );
    }

    // ── Cancellation ────────────────────────────────────────────────

    #[test]
    fn can_aborts_a_csi_in_progress() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b[12\x18").is_empty());
        assert_eq!(p.feed(b"A"), vec![Action::Print('A')]);
    }

    #[test]
    fn sub_aborts_an_osc_in_progress() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b]0;part\x1a").is_empty());
        assert_eq!(p.feed(b"A"), vec![Action::Print('A')]);
    }

    #[test]
    fn esc_inside_csi_starts_new_sequence() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1b[12\x1b[3A"), vec![Action::CursorUp(3)]);
    }

    // ── OSC ─────────────────────────────────────────────────────────

    #[test]
    fn osc_title_bel_and_st() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b]0;Hello\x07"),
            vec![Action::SetTitle("Hello".to_string())]
        );
        assert_eq!(
            p.feed(b"\x1b]2;World\x1b\\"),
            vec![Action::SetTitle("World".to_string())]
        );
    }

    #[test]
    fn osc_icon_name() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b]1;icon\x07"),
            vec![Action::SetIconName("icon".to_string())]
        );
    }

    #[test]
    fn osc_button_labels() {
        let mut p = Parser::new();
        assert_eq!(
            p.feed(b"\x1b]81;OK\x07"),
            vec![Action::SetButtonLabel { slot: 0, text: "OK".to_string() }]
        );
        assert_eq!(
            p.feed(b"\x1b]85;Cancel\x1b\\"),
            vec![Action::SetButtonLabel { slot: 4, text: "Cancel".to_string() }]
        );
    }

    #[test]
    fn osc_unknown_command_is_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b]777;x\x07").is_empty());
    }

    #[test]
    fn osc_without_semicolon_is_discarded() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b]0\x07").is_empty());
    }

    #[test]
    fn osc_utf8_payload() {
        let mut p = Parser::new();
        let mut input = b"\x1b]0;".to_vec();
        input.extend_from_slice("čaj".as_bytes());
        input.push(0x07);
        assert_eq!(p.feed(&input), vec![Action::SetTitle("čaj".to_string())]);
    }

    #[test]
    fn osc_overlong_payload_keeps_prefix() {
        let mut p = Parser::new();
        let mut input = b"\x1b]0;".to_vec();
        input.extend_from_slice(&vec![b'x'; 500]);
        input.push(0x07);
        let actions = p.feed(&input);
        match &actions[..] {
            [Action::SetTitle(title)] => {
                assert!(title.len() < 500);
                assert!(title.starts_with("xxx"));
            }
            other => panic!("expected one SetTitle, got {other:?}"),
        }
    }

    #[test]
    fn osc_esc_non_st_abandons_string() {
        let mut p = Parser::new();
        // ESC c inside an OSC abandons it and executes the reset.
        assert_eq!(p.feed(b"\x1b]0;part\x1bc"), vec![Action::FullReset]);
    }

    // ── DCS ─────────────────────────────────────────────────────────

    #[test]
    fn dcs_is_skipped_to_st() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1bPsome payload\x1b\\").is_empty());
        assert_eq!(p.feed(b"A"), vec![Action::Print('A')]);
    }

    #[test]
    fn dcs_esc_non_st_starts_new_sequence() {
        let mut p = Parser::new();
        assert_eq!(p.feed(b"\x1bPpayload\x1b[2J"), vec![Action::EraseInDisplay(2)]);
    }

    // ── Determinism / robustness ────────────────────────────────────

    #[test]
    fn feed_empty_is_noop() {
        let mut p = Parser::new();
        assert!(p.feed(b"").is_empty());
    }

    #[test]
    fn mixed_stream() {
        let mut p = Parser::new();
        let mut input = Vec::new();
        input.extend_from_slice("ab".as_bytes());
        input.extend_from_slice(b"\x1b[31m");
        input.extend_from_slice("č".as_bytes());
        input.extend_from_slice(b"\x1b]0;t\x07");
        input.extend_from_slice(b"\r\n");
        assert_eq!(
            p.feed(&input),
            vec![
                Action::Print('a'),
                Action::Print('b'),
                Action::Sgr(smallvec![31]),
                Action::Print('č'),
                Action::SetTitle("t".to_string()),
                Action::CarriageReturn,
                Action::Newline,
            ]
        );
    }

    #[test]
    fn parser_reset_drops_pending_sequence() {
        let mut p = Parser::new();
        assert!(p.feed(b"\x1b[12;").is_empty());
        p.reset();
        assert_eq!(p.feed(b"A"), vec![Action::Print('A')]);
    }
}
