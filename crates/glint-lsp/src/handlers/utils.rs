//! Conversions between LSP and glint addressing.
//!
//! Both sides use zero-based lines. LSP columns count UTF-16 code units,
//! glint columns count characters, so converting a column needs the text of
//! its line. Columns past the end of a line keep their distance from it.

use lsp_types::{Position, Range};

/// Convert an LSP position into `text`.
pub fn to_position(position: Position, text: &str) -> glint_core::Position {
    let character = line_text(text, position.line).map_or(position.character, |line| {
        utf16_to_chars(line, position.character)
    });
    glint_core::Position::new(position.line, character)
}

/// Convert a glint position into `text`.
pub fn to_lsp_position(position: glint_core::Position, text: &str) -> Position {
    let character = line_text(text, position.line).map_or(position.character, |line| {
        chars_to_utf16(line, position.character)
    });
    Position {
        line: position.line,
        character,
    }
}

/// Convert a glint range into `text`.
pub fn to_lsp_range(range: glint_core::Range, text: &str) -> Range {
    Range {
        start: to_lsp_position(range.start, text),
        end: to_lsp_position(range.end, text),
    }
}

/// Text of `line` in `source`, without its terminator.
pub fn line_text(source: &str, line: u32) -> Option<&str> {
    let text = source.split('\n').nth(line as usize)?;
    Some(text.strip_suffix('\r').unwrap_or(text))
}

fn utf16_to_chars(line: &str, units: u32) -> u32 {
    let mut seen = 0;
    let mut chars = 0;
    for c in line.chars() {
        if seen >= units {
            return chars;
        }
        seen += c.len_utf16() as u32;
        chars += 1;
    }
    chars + units.saturating_sub(seen)
}

fn chars_to_utf16(line: &str, chars: u32) -> u32 {
    let mut units = 0;
    let mut seen = 0;
    for c in line.chars().take(chars as usize) {
        units += c.len_utf16() as u32;
        seen += 1;
    }
    units + chars.saturating_sub(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_text() {
        let source = "let a = 1\r\nlet b = 2\n";
        assert_eq!(line_text(source, 0), Some("let a = 1"));
        assert_eq!(line_text(source, 1), Some("let b = 2"));
        assert_eq!(line_text(source, 2), Some(""));
        assert_eq!(line_text(source, 3), None);
    }

    #[test]
    fn test_range_conversion() {
        let text = "let a = 1\nlet bb = a";
        let range = glint_core::Range::new(
            glint_core::Position::new(1, 4),
            glint_core::Position::new(1, 6),
        );
        let lsp = to_lsp_range(range, text);
        assert_eq!(lsp.start, Position::new(1, 4));
        assert_eq!(lsp.end, Position::new(1, 6));
        assert_eq!(to_position(lsp.start, text), range.start);
    }

    #[test]
    fn test_columns_after_astral_characters() {
        // U+1F600 is one character and two UTF-16 units.
        let text = "let s = \"\u{1F600}\" + z";
        let z = glint_core::Position::new(0, 14);

        assert_eq!(to_lsp_position(z, text), Position::new(0, 15));
        assert_eq!(to_position(Position::new(0, 15), text), z);
        assert_eq!(to_position(Position::new(0, 8), text).character, 8);
    }

    #[test]
    fn test_columns_past_line_end() {
        let text = "\u{e9}t\u{e9}";
        assert_eq!(to_position(Position::new(0, 5), text).character, 5);
        assert_eq!(to_lsp_position(glint_core::Position::new(0, 4), text).character, 4);
        // Lines the text does not have pass through.
        assert_eq!(to_position(Position::new(3, 7), text).character, 7);
    }
}
