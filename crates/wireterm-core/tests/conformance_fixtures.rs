//! JSON-driven conformance fixtures.
//!
//! Each file under `tests/fixtures/` describes one scenario: an initial
//! screen size, an input byte stream (hex), and the expected cursor
//! position, cell contents and title afterwards. The fixtures cover the
//! classic DEC/xterm corner cases: pending wrap, scroll regions, origin
//! mode, SGR state, charset translation and malformed UTF-8.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use wireterm_core::{AttrFlags, Color, TermConfig, Terminal};

#[derive(Debug, Deserialize)]
struct Fixture {
    name: String,
    #[allow(dead_code)]
    description: String,
    /// `[cols, rows]`.
    initial_size: [u16; 2],
    input_bytes_hex: String,
    expected: Expected,
}

#[derive(Debug, Deserialize)]
struct Expected {
    cursor: CursorPos,
    cells: Vec<CellExpectation>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CursorPos {
    row: u16,
    col: u16,
}

#[derive(Debug, Deserialize)]
struct CellExpectation {
    row: u16,
    col: u16,
    #[serde(rename = "char")]
    ch: String,
    /// Palette index, or -1 for the default color. Absent = not checked.
    #[serde(default)]
    fg: Option<i32>,
    #[serde(default)]
    bg: Option<i32>,
    #[serde(default)]
    bold: Option<bool>,
    #[serde(default)]
    underline: Option<bool>,
    #[serde(default)]
    inverse: Option<bool>,
}

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn decode_hex(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "odd-length hex string");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("invalid hex"))
        .collect()
}

fn expected_color(value: i32) -> Color {
    if value < 0 {
        Color::Default
    } else {
        Color::Indexed(value as u8)
    }
}

fn run_fixture(fixture: &Fixture) {
    let [cols, rows] = fixture.initial_size;
    let mut config = TermConfig::default();
    config.width = u32::from(cols);
    config.height = u32::from(rows);
    let mut term = Terminal::new(config);

    term.feed(&decode_hex(&fixture.input_bytes_hex), &mut ());

    assert_eq!(
        (term.cursor().row, term.cursor().col),
        (fixture.expected.cursor.row, fixture.expected.cursor.col),
        "{}: cursor mismatch",
        fixture.name
    );

    for cell_exp in &fixture.expected.cells {
        let cell = term
            .grid()
            .cell(cell_exp.row, cell_exp.col)
            .unwrap_or_else(|| {
                panic!(
                    "{}: cell ({}, {}) out of bounds",
                    fixture.name, cell_exp.row, cell_exp.col
                )
            });
        let expected_ch = cell_exp.ch.chars().next().expect("empty char expectation");
        assert_eq!(
            cell.glyph(),
            expected_ch,
            "{}: glyph at ({}, {})",
            fixture.name,
            cell_exp.row,
            cell_exp.col
        );
        if let Some(fg) = cell_exp.fg {
            assert_eq!(
                cell.style.fg,
                expected_color(fg),
                "{}: fg at ({}, {})",
                fixture.name,
                cell_exp.row,
                cell_exp.col
            );
        }
        if let Some(bg) = cell_exp.bg {
            assert_eq!(
                cell.style.bg,
                expected_color(bg),
                "{}: bg at ({}, {})",
                fixture.name,
                cell_exp.row,
                cell_exp.col
            );
        }
        for (flag, expected) in [
            (AttrFlags::BOLD, cell_exp.bold),
            (AttrFlags::UNDERLINE, cell_exp.underline),
            (AttrFlags::INVERSE, cell_exp.inverse),
        ] {
            if let Some(expected) = expected {
                assert_eq!(
                    cell.style.attrs.contains(flag),
                    expected,
                    "{}: attr {:?} at ({}, {})",
                    fixture.name,
                    flag,
                    cell_exp.row,
                    cell_exp.col
                );
            }
        }
    }

    if let Some(title) = &fixture.expected.title {
        assert_eq!(
            term.scratch_config().title(),
            title,
            "{}: title mismatch",
            fixture.name
        );
    }
}

#[test]
fn all_fixtures_pass() {
    let dir = fixture_dir();
    let mut ran = 0;
    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    for path in entries {
        let raw = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
        let fixture: Fixture = serde_json::from_str(&raw)
            .unwrap_or_else(|e| panic!("cannot parse {}: {e}", path.display()));
        run_fixture(&fixture);
        ran += 1;
    }

    assert!(ran >= 10, "expected the full fixture set, ran {ran}");
}
