//! Terminal mode plane: DEC private modes and ANSI standard modes.
//!
//! Modes are stored as bitflags behind named accessors. Modes with side
//! effects (column mode, origin mode) are intercepted by the terminal
//! before being recorded here; this module only tracks state.

use bitflags::bitflags;

bitflags! {
    /// DEC private modes (`CSI ? Pm h` / `CSI ? Pm l`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecModes: u16 {
        /// ?1 DECCKM: cursor keys send application sequences.
        const APPLICATION_CURSOR = 1 << 0;
        /// ?5 DECSCNM: reverse video for the whole screen.
        const REVERSE_VIDEO = 1 << 1;
        /// ?6 DECOM: cursor addressing relative to the scroll region.
        const ORIGIN = 1 << 2;
        /// ?7 DECAWM: wrap at the right margin.
        const AUTOWRAP = 1 << 3;
        /// ?25 DECTCEM: cursor visible.
        const CURSOR_VISIBLE = 1 << 4;
        /// ?66 DECNKM: application keypad.
        const APPLICATION_KEYPAD = 1 << 5;
        /// ?47 / ?1047 / ?1049: alternate screen requested (stored only).
        const ALT_SCREEN = 1 << 6;
        /// ?1000: report mouse button press/release.
        const MOUSE_BUTTON = 1 << 7;
        /// ?1002: report mouse motion while a button is held.
        const MOUSE_CELL_MOTION = 1 << 8;
        /// ?1003: report all mouse motion.
        const MOUSE_ALL_MOTION = 1 << 9;
        /// ?1006: SGR mouse coordinate encoding.
        const MOUSE_SGR = 1 << 10;
    }
}

bitflags! {
    /// ANSI standard modes (`CSI Pm h` / `CSI Pm l`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AnsiModes: u8 {
        /// 4 IRM: insert instead of replace.
        const INSERT = 1 << 0;
        /// 20 LNM: line feed implies carriage return.
        const NEWLINE = 1 << 1;
    }
}

/// Combined mode state with power-on defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    dec: DecModes,
    ansi: AnsiModes,
}

impl Default for Modes {
    fn default() -> Self {
        Self::new()
    }
}

impl Modes {
    /// Power-on defaults: auto-wrap on, cursor visible, everything else off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dec: DecModes::AUTOWRAP | DecModes::CURSOR_VISIBLE,
            ansi: AnsiModes::empty(),
        }
    }

    /// Reset to power-on defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a DEC private mode change by its numeric identifier.
    ///
    /// Returns `false` for modes this terminal does not track.
    pub fn set_dec_mode(&mut self, mode: u16, enabled: bool) -> bool {
        let flag = match mode {
            1 => DecModes::APPLICATION_CURSOR,
            5 => DecModes::REVERSE_VIDEO,
            6 => DecModes::ORIGIN,
            7 => DecModes::AUTOWRAP,
            25 => DecModes::CURSOR_VISIBLE,
            66 => DecModes::APPLICATION_KEYPAD,
            47 | 1047 | 1049 => DecModes::ALT_SCREEN,
            1000 => DecModes::MOUSE_BUTTON,
            1002 => DecModes::MOUSE_CELL_MOTION,
            1003 => DecModes::MOUSE_ALL_MOTION,
            1006 => DecModes::MOUSE_SGR,
            _ => return false,
        };
        self.dec.set(flag, enabled);
        true
    }

    /// Record an ANSI mode change by its numeric identifier.
    ///
    /// Returns `false` for modes this terminal does not track.
    pub fn set_ansi_mode(&mut self, mode: u16, enabled: bool) -> bool {
        let flag = match mode {
            4 => AnsiModes::INSERT,
            20 => AnsiModes::NEWLINE,
            _ => return false,
        };
        self.ansi.set(flag, enabled);
        true
    }

    /// Raw DEC flag set.
    #[must_use]
    pub fn dec_flags(&self) -> DecModes {
        self.dec
    }

    /// Raw ANSI flag set.
    #[must_use]
    pub fn ansi_flags(&self) -> AnsiModes {
        self.ansi
    }

    #[must_use]
    pub fn origin_mode(&self) -> bool {
        self.dec.contains(DecModes::ORIGIN)
    }

    #[must_use]
    pub fn autowrap(&self) -> bool {
        self.dec.contains(DecModes::AUTOWRAP)
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.dec.contains(DecModes::CURSOR_VISIBLE)
    }

    #[must_use]
    pub fn reverse_video(&self) -> bool {
        self.dec.contains(DecModes::REVERSE_VIDEO)
    }

    #[must_use]
    pub fn application_cursor(&self) -> bool {
        self.dec.contains(DecModes::APPLICATION_CURSOR)
    }

    #[must_use]
    pub fn application_keypad(&self) -> bool {
        self.dec.contains(DecModes::APPLICATION_KEYPAD)
    }

    /// Set the keypad mode directly (DECKPAM / DECKPNM are plain escapes,
    /// not mode sequences).
    pub fn set_application_keypad(&mut self, enabled: bool) {
        self.dec.set(DecModes::APPLICATION_KEYPAD, enabled);
    }

    #[must_use]
    pub fn insert_mode(&self) -> bool {
        self.ansi.contains(AnsiModes::INSERT)
    }

    #[must_use]
    pub fn newline_mode(&self) -> bool {
        self.ansi.contains(AnsiModes::NEWLINE)
    }
}
