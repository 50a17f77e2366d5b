//! Lexical scanner for DTA text.
//!
//! Every function takes the input buffer and a cursor, advances the cursor and
//! reports the span it passed over. Nothing is copied and nothing fails here:
//! reaching the end of the buffer in the middle of a lexeme simply stops the scan,
//! and the parser decides whether a missing terminator is an error.
//!
//! A NUL byte counts as the end of the text.

use std::ops::Range;

/// Whitespace as classified by C `isspace` in the "C" locale.
pub fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

pub fn is_bracket(c: u8) -> bool {
    matches!(c, b'[' | b']' | b'(' | b')' | b'{' | b'}')
}

/// True when `cursor` is past the last meaningful byte.
pub fn at_end(src: &[u8], cursor: usize) -> bool {
    src.get(cursor).map_or(true, |&c| c == 0)
}

/// Skip whitespace, `; ...` comments and `// ...` comments up to the next
/// significant byte, the end of the buffer or a NUL (even inside a comment).
pub fn skip_whitespace_and_comments(src: &[u8], cursor: &mut usize) {
    let mut in_comment = false;
    while let Some(&c) = src.get(*cursor) {
        if c == 0 {
            break;
        } else if in_comment {
            if c == b'\n' {
                in_comment = false;
            }
        } else if c == b';' || (c == b'/' && src.get(*cursor + 1) == Some(&b'/')) {
            in_comment = true;
        } else if !is_space(c) {
            break;
        }
        *cursor += 1;
    }
}

/// Advance over a bare lexeme: everything up to whitespace, a bracket or NUL.
/// Quotes and comment starters inside the lexeme are part of it.
pub fn scan_bare_symbol(src: &[u8], cursor: &mut usize) -> Range<usize> {
    let start = *cursor;
    while let Some(&c) = src.get(*cursor) {
        if is_space(c) || is_bracket(c) || c == 0 {
            break;
        }
        *cursor += 1;
    }
    start..*cursor
}

/// Advance to the closing `'` (left under the cursor) or the end of the text.
/// The cursor must already be past the opening quote.
pub fn scan_single_quoted(src: &[u8], cursor: &mut usize) -> Range<usize> {
    scan_until(src, cursor, b'\'')
}

/// Advance to the closing `"` (left under the cursor) or the end of the text.
/// `\q` escapes are kept verbatim; they are resolved when encoding to DTB.
pub fn scan_double_quoted(src: &[u8], cursor: &mut usize) -> Range<usize> {
    scan_until(src, cursor, b'"')
}

fn scan_until(src: &[u8], cursor: &mut usize, quote: u8) -> Range<usize> {
    let start = *cursor;
    while let Some(&c) = src.get(*cursor) {
        if c == quote || c == 0 {
            break;
        }
        *cursor += 1;
    }
    start..*cursor
}
