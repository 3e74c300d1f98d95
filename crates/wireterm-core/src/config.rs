//! Persisted terminal configuration bundle.
//!
//! The bundle serializes to exactly [`TERMCONF_SIZE`] bytes with a frozen
//! field layout, so stored settings survive firmware upgrades. The live
//! engine works on a scratch copy that escape sequences may mutate;
//! re-applying settings overwrites the scratch copy from the persisted one.

use thiserror::Error;

/// Fixed size of the serialized bundle. Must never change.
pub const TERMCONF_SIZE: usize = 200;
/// Title storage size, including the NUL terminator.
pub const TERM_TITLE_LEN: usize = 64;
/// Button label storage size, including the NUL terminator.
pub const TERM_BTN_LEN: usize = 10;
/// Number of front-end buttons.
pub const TERM_BTN_COUNT: usize = 5;

/// Serialized offset of each field; the tail up to 200 bytes is padding.
const OFF_WIDTH: usize = 0;
const OFF_HEIGHT: usize = 4;
const OFF_DEFAULT_BG: usize = 8;
const OFF_DEFAULT_FG: usize = 9;
const OFF_TITLE: usize = 10;
const OFF_BTN: usize = OFF_TITLE + TERM_TITLE_LEN;
const OFF_THEME: usize = OFF_BTN + TERM_BTN_COUNT * TERM_BTN_LEN;
const OFF_PARSER_TOUT: usize = OFF_THEME + 1;
const OFF_DISPLAY_TOUT: usize = OFF_PARSER_TOUT + 4;
const OFF_FN_ALT: usize = OFF_DISPLAY_TOUT + 4;

/// Errors decoding a stored configuration bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The stored blob does not have the fixed bundle size.
    #[error("config bundle must be {TERMCONF_SIZE} bytes, got {0}")]
    WrongSize(usize),
}

/// The persisted terminal settings.
///
/// String fields are kept within their serialized capacity at all times
/// (title <= 63 bytes, button labels <= 9 bytes, both NUL-terminated on
/// the wire), truncating on UTF-8 character boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermConfig {
    pub width: u32,
    pub height: u32,
    pub default_bg: u8,
    pub default_fg: u8,
    title: String,
    buttons: [String; TERM_BTN_COUNT],
    pub theme: u8,
    pub parser_tout_ms: u32,
    pub display_tout_ms: u32,
    pub fn_alt_mode: bool,
}

impl Default for TermConfig {
    /// Factory defaults.
    fn default() -> Self {
        Self {
            width: 26,
            height: 10,
            default_bg: 0,
            default_fg: 7,
            title: "ESPTerm".to_string(),
            buttons: ["1", "2", "3", "4", "5"].map(str::to_string),
            theme: 0,
            parser_tout_ms: 10,
            display_tout_ms: 20,
            fn_alt_mode: false,
        }
    }
}

impl TermConfig {
    /// The configured title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the title, truncated to the stored capacity.
    ///
    /// Control characters are dropped so stored labels stay clean for the
    /// NUL-free serialized stream. Returns `true` when the stored value
    /// actually changed.
    pub fn set_title(&mut self, title: &str) -> bool {
        let clean = clean_label(title, TERM_TITLE_LEN - 1);
        if self.title == clean {
            return false;
        }
        self.title = clean;
        true
    }

    /// The label of button `slot` (0-4); empty for out-of-range slots.
    #[must_use]
    pub fn button(&self, slot: usize) -> &str {
        self.buttons.get(slot).map_or("", String::as_str)
    }

    /// Set a button label, truncated to the stored capacity.
    ///
    /// Returns `true` when the stored value actually changed.
    pub fn set_button(&mut self, slot: usize, label: &str) -> bool {
        let Some(stored) = self.buttons.get_mut(slot) else {
            return false;
        };
        let clean = clean_label(label, TERM_BTN_LEN - 1);
        if *stored == clean {
            return false;
        }
        *stored = clean;
        true
    }

    /// Serialize to the fixed 200-byte layout (little-endian integers,
    /// NUL-terminated strings, zero padding).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; TERMCONF_SIZE] {
        let mut out = [0u8; TERMCONF_SIZE];
        out[OFF_WIDTH..OFF_WIDTH + 4].copy_from_slice(&self.width.to_le_bytes());
        out[OFF_HEIGHT..OFF_HEIGHT + 4].copy_from_slice(&self.height.to_le_bytes());
        out[OFF_DEFAULT_BG] = self.default_bg;
        out[OFF_DEFAULT_FG] = self.default_fg;
        write_str(&mut out[OFF_TITLE..OFF_TITLE + TERM_TITLE_LEN], &self.title);
        for (i, label) in self.buttons.iter().enumerate() {
            let start = OFF_BTN + i * TERM_BTN_LEN;
            write_str(&mut out[start..start + TERM_BTN_LEN], label);
        }
        out[OFF_THEME] = self.theme;
        out[OFF_PARSER_TOUT..OFF_PARSER_TOUT + 4]
            .copy_from_slice(&self.parser_tout_ms.to_le_bytes());
        out[OFF_DISPLAY_TOUT..OFF_DISPLAY_TOUT + 4]
            .copy_from_slice(&self.display_tout_ms.to_le_bytes());
        out[OFF_FN_ALT] = u8::from(self.fn_alt_mode);
        out
    }

    /// Decode a stored bundle.
    ///
    /// Only the size is validated; field values are taken as-is and are
    /// clamped where they are used (the screen clamps its dimensions, the
    /// strings were bounded when stored).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != TERMCONF_SIZE {
            return Err(ConfigError::WrongSize(bytes.len()));
        }
        let u32_at = |off: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[off..off + 4]);
            u32::from_le_bytes(raw)
        };
        let mut config = Self {
            width: u32_at(OFF_WIDTH),
            height: u32_at(OFF_HEIGHT),
            default_bg: bytes[OFF_DEFAULT_BG],
            default_fg: bytes[OFF_DEFAULT_FG],
            title: String::new(),
            buttons: Default::default(),
            theme: bytes[OFF_THEME],
            parser_tout_ms: u32_at(OFF_PARSER_TOUT),
            display_tout_ms: u32_at(OFF_DISPLAY_TOUT),
            fn_alt_mode: bytes[OFF_FN_ALT] != 0,
        };
        config.set_title(&read_str(&bytes[OFF_TITLE..OFF_TITLE + TERM_TITLE_LEN]));
        for i in 0..TERM_BTN_COUNT {
            let start = OFF_BTN + i * TERM_BTN_LEN;
            config.set_button(i, &read_str(&bytes[start..start + TERM_BTN_LEN]));
        }
        Ok(config)
    }
}

/// Copy a string into a NUL-terminated fixed field, truncating on a UTF-8
/// boundary. The field is pre-zeroed by the caller.
fn write_str(field: &mut [u8], value: &str) {
    let truncated = truncate_utf8(value, field.len() - 1);
    field[..truncated.len()].copy_from_slice(truncated.as_bytes());
}

/// Read a NUL-terminated fixed field, tolerating invalid UTF-8.
fn read_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Sanitize a label value: drop control characters (they would corrupt
/// the label stream framing) and truncate to the stored capacity.
pub(crate) fn clean_label(value: &str, max_bytes: usize) -> String {
    let clean: String = value.chars().filter(|c| !c.is_control()).collect();
    truncate_utf8(&clean, max_bytes).to_string()
}

/// The longest prefix of `value` that fits `max_bytes` without splitting a
/// character.
fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
