//! Screen and label serialization for the front-end transport.
//!
//! The screen stream is NUL-free and resumable: the caller hands in a
//! buffer plus a [`ScreenCursor`] and keeps calling until
//! [`SerializeStatus::Done`]. The format is stable within a run:
//!
//! - a 10-byte header: height, width, cursor row, cursor column and a
//!   flag word, each as an [`encode2b`] pair
//! - per cell, in row-major order: an attribute marker (0x01 + pair) when
//!   the attribute byte changes, a color marker (0x03 + pair packing fg
//!   and bg) when the colors change, the glyph's UTF-8 bytes, and a
//!   repeat marker (0x02 + pair) run-length-encoding identical cells
//!
//! Marker bytes cannot collide with glyphs (cells never store controls)
//! and `encode2b` output starts at 1, so no byte of the stream is NUL.

use crate::cell::{CellStyle, Color};
use crate::terminal::Terminal;

/// Attribute-change marker.
pub const MARK_ATTRS: u8 = 0x01;
/// Run-length marker: the previous cell repeats N more times.
pub const MARK_REPEAT: u8 = 0x02;
/// Color-change marker.
pub const MARK_COLORS: u8 = 0x03;

/// Separator between the title and each button label.
const LABEL_SEPARATOR: u8 = 0x01;

/// Header flag bits.
const FLAG_CURSOR_VISIBLE: u16 = 1 << 0;
const FLAG_APP_CURSOR: u16 = 1 << 1;
const FLAG_APP_KEYPAD: u16 = 1 << 2;
const FLAG_REVERSE_VIDEO: u16 = 1 << 3;
const FLAG_INSERT: u16 = 1 << 4;
const FLAG_FN_ALT: u16 = 1 << 5;

/// Encode a 16-bit integer as two NUL-free bytes (both start at 1).
///
/// Values up to 32 384 fit; screen coordinates, attribute bytes and run
/// lengths are all far below that.
#[must_use]
pub fn encode2b(value: u16) -> [u8; 2] {
    [(value % 127) as u8 + 1, (value / 127) as u8 + 1]
}

/// Inverse of [`encode2b`].
#[must_use]
pub fn decode2b(lsb: u8, msb: u8) -> u16 {
    u16::from(lsb.saturating_sub(1)) + u16::from(msb.saturating_sub(1)) * 127
}

/// Opaque resumption state for [`serialize_screen`].
///
/// A fresh cursor starts a new snapshot; the same cursor must be passed to
/// every continuation call.
#[derive(Debug, Clone, Default)]
pub struct ScreenCursor {
    header_done: bool,
    index: usize,
    style: CellStyle,
    finished: bool,
}

impl ScreenCursor {
    /// Start a new serialization pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of one serialization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeStatus {
    /// The snapshot is complete; `written` bytes were added this call.
    Done { written: usize },
    /// The buffer filled up; call again with the same cursor.
    More { written: usize },
}

impl SerializeStatus {
    /// Bytes written by this call.
    #[must_use]
    pub fn written(&self) -> usize {
        match *self {
            SerializeStatus::Done { written } | SerializeStatus::More { written } => written,
        }
    }
}

/// Write a compact snapshot of the screen into `buf`, resuming across
/// calls via `cursor`.
///
/// Buffers shorter than 10 bytes may make no progress; anything larger
/// always advances. Exhaustion is not an error: the call returns
/// [`SerializeStatus::More`] and the next call picks up where it left off.
pub fn serialize_screen(
    term: &Terminal,
    buf: &mut [u8],
    cursor: &mut ScreenCursor,
) -> SerializeStatus {
    let grid = term.grid();
    let cols = grid.cols();
    let rows = grid.rows();
    let total = usize::from(cols) * usize::from(rows);
    let mut pos = 0;

    if cursor.finished {
        return SerializeStatus::Done { written: 0 };
    }

    if !cursor.header_done {
        if buf.len() < 10 {
            return SerializeStatus::More { written: 0 };
        }
        let cur = term.cursor();
        write_pair(buf, &mut pos, rows);
        write_pair(buf, &mut pos, cols);
        write_pair(buf, &mut pos, cur.row);
        write_pair(buf, &mut pos, cur.col.min(cols - 1));
        write_pair(buf, &mut pos, header_flags(term));
        cursor.header_done = true;
        cursor.style = CellStyle::default();
    }

    while cursor.index < total {
        let row = (cursor.index / usize::from(cols)) as u16;
        let col = (cursor.index % usize::from(cols)) as u16;
        let Some(cell) = grid.cell(row, col) else {
            break;
        };

        if cell.style.attrs != cursor.style.attrs {
            if pos + 3 > buf.len() {
                return SerializeStatus::More { written: pos };
            }
            buf[pos] = MARK_ATTRS;
            pos += 1;
            write_pair(buf, &mut pos, u16::from(cell.style.attrs.bits()));
            cursor.style.attrs = cell.style.attrs;
        }

        if cell.style.fg != cursor.style.fg || cell.style.bg != cursor.style.bg {
            if pos + 3 > buf.len() {
                return SerializeStatus::More { written: pos };
            }
            buf[pos] = MARK_COLORS;
            pos += 1;
            write_pair(buf, &mut pos, pack_colors(cell.style.fg, cell.style.bg));
            cursor.style.fg = cell.style.fg;
            cursor.style.bg = cell.style.bg;
        }

        // Run-length: identical consecutive cells collapse into one glyph
        // plus a repeat marker.
        let mut run = 1usize;
        while cursor.index + run < total {
            let r = ((cursor.index + run) / usize::from(cols)) as u16;
            let c = ((cursor.index + run) % usize::from(cols)) as u16;
            if grid.cell(r, c) == Some(cell) {
                run += 1;
            } else {
                break;
            }
        }

        let mut glyph = [0u8; 4];
        let glyph = cell.glyph().encode_utf8(&mut glyph).as_bytes();
        let needed = glyph.len() + if run > 1 { 3 } else { 0 };
        if pos + needed > buf.len() {
            return SerializeStatus::More { written: pos };
        }
        buf[pos..pos + glyph.len()].copy_from_slice(glyph);
        pos += glyph.len();
        if run > 1 {
            buf[pos] = MARK_REPEAT;
            pos += 1;
            write_pair(buf, &mut pos, (run - 1).min(usize::from(u16::MAX)) as u16);
        }
        cursor.index += run;
    }

    cursor.finished = true;
    SerializeStatus::Done { written: pos }
}

/// Emit the title and the five button labels in a single shot, separated
/// by 0x01 bytes. Returns the number of bytes written; output that does
/// not fit is truncated.
pub fn serialize_labels(term: &Terminal, buf: &mut [u8]) -> usize {
    let config = term.scratch_config();
    let mut pos = 0;
    write_truncated(buf, &mut pos, config.title().as_bytes());
    for slot in 0..5 {
        if pos < buf.len() {
            buf[pos] = LABEL_SEPARATOR;
            pos += 1;
        }
        write_truncated(buf, &mut pos, config.button(slot).as_bytes());
    }
    pos
}

fn header_flags(term: &Terminal) -> u16 {
    let modes = term.modes();
    let mut flags = 0;
    if modes.cursor_visible() {
        flags |= FLAG_CURSOR_VISIBLE;
    }
    if modes.application_cursor() {
        flags |= FLAG_APP_CURSOR;
    }
    if modes.application_keypad() {
        flags |= FLAG_APP_KEYPAD;
    }
    if modes.reverse_video() {
        flags |= FLAG_REVERSE_VIDEO;
    }
    if modes.insert_mode() {
        flags |= FLAG_INSERT;
    }
    if term.scratch_config().fn_alt_mode {
        flags |= FLAG_FN_ALT;
    }
    flags
}

/// Pack fg and bg wire indices (0-15, 16 = default) into one word.
fn pack_colors(fg: Color, bg: Color) -> u16 {
    fg.to_wire() | (bg.to_wire() << 5)
}

fn write_pair(buf: &mut [u8], pos: &mut usize, value: u16) {
    let pair = encode2b(value);
    buf[*pos] = pair[0];
    buf[*pos + 1] = pair[1];
    *pos += 2;
}

fn write_truncated(buf: &mut [u8], pos: &mut usize, bytes: &[u8]) {
    let room = buf.len().saturating_sub(*pos);
    let take = bytes.len().min(room);
    buf[*pos..*pos + take].copy_from_slice(&bytes[..take]);
    *pos += take;
}
