#![forbid(unsafe_code)]

//! Host-agnostic terminal engine for a network-attached virtual screen.
//!
//! `wireterm-core` is the platform-independent heart of a wire-attached
//! terminal: it consumes the byte stream a remote program emits, keeps a
//! bounded rectangular grid of styled cells in sync with it, and hands a
//! compact serialized snapshot to whatever transport renders it (web
//! socket, UART bridge, test harness).
//!
//! # Primary responsibilities
//!
//! - **Grid**: fixed-capacity 2D cell matrix with scroll regions,
//!   insert/delete and erase semantics.
//! - **Cell**: one glyph plus colors and attribute flags, plain `Copy` data.
//! - **Parser**: VT/ANSI state machine over C0, ESC, CSI, OSC, DCS and
//!   UTF-8 input; tolerates any byte stream.
//! - **Cursor**: position with pending-wrap tracking, charsets, tab stops.
//! - **Modes**: DEC private and ANSI mode plane.
//! - **Terminal**: the single owned value wiring it all together, plus the
//!   persisted/scratch configuration pair.
//! - **Serialize**: NUL-free resumable snapshot stream and label export.
//!
//! # Design principles
//!
//! - **No I/O**: the host adapter supplies bytes and receives replies
//!   through a callback trait; nothing here blocks.
//! - **Bounded**: one fixed grid allocation at startup, clamped
//!   parameters, truncated strings.
//! - **Lenient consumer, strict producer**: garbage input is discarded or
//!   replaced, serialized output is always well-formed.

pub mod cell;
pub mod config;
pub mod cursor;
pub mod grid;
pub mod modes;
pub mod parser;
pub mod serialize;
pub mod terminal;

pub use cell::{AttrFlags, Cell, CellStyle, Color};
pub use config::{ConfigError, TermConfig, TERMCONF_SIZE, TERM_BTN_COUNT, TERM_BTN_LEN, TERM_TITLE_LEN};
pub use cursor::{translate_charset, Charset, Cursor, SavedCursor};
pub use grid::{Grid, MAX_CELLS, MAX_COLS, MAX_ROWS};
pub use modes::{AnsiModes, DecModes, Modes};
pub use parser::{Action, CsiParams, Parser, MAX_PARAMS, PARAM_MAX};
pub use serialize::{
    decode2b, encode2b, serialize_labels, serialize_screen, ScreenCursor, SerializeStatus,
};
pub use terminal::{NotifyTopic, Terminal, TerminalHost};
