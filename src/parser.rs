//! Recursive-descent parser: DTA text into a [`Document`].
//!
//! [`parse_chunk`] classifies exactly one lexeme after skipping trivia, and
//! [`parse_tree`] calls it until the enclosing tree ends (a closing bracket or the
//! end of the text). Text payloads borrow from the input buffer, so the returned
//! tree cannot outlive it; use [`Document::into_owned`] to detach.

use crate::chunk::{Chunk, Delimiter, DirectiveKind, Document, Tree, MAX_DEPTH};
use crate::scanner::{
    at_end, scan_bare_symbol, scan_double_quoted, scan_single_quoted, skip_whitespace_and_comments,
};
use std::borrow::Cow;
use std::ops::Range;

const UNHANDLED_TOKEN: &[u8] = b"kDataUnhandled";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected end of input at offset {offset}: expected '{expected}'")]
    UnexpectedEndOfInput { expected: char, offset: usize },
    #[error("Unmatched '{found}' at offset {offset}: {}", describe_expected(.expected))]
    UnmatchedCloser {
        expected: Option<char>,
        found: char,
        offset: usize,
    },
    #[error("Unknown directive #{name} at offset {offset}")]
    UnknownDirective { name: String, offset: usize },
    #[error("Directive #{directive} at offset {offset} has no argument")]
    MissingDirectiveArgument { directive: &'static str, offset: usize },
    #[error("Directive #{directive} argument at offset {offset} has no text")]
    InvalidDirectiveArgument { directive: &'static str, offset: usize },
    #[error("Nesting deeper than {} levels at offset {offset}", MAX_DEPTH)]
    NestingTooDeep { offset: usize },
}

fn describe_expected(expected: &Option<char>) -> String {
    match expected {
        Some(c) => format!("expected '{}'", c),
        None => "no open bracket to close".to_string(),
    }
}

/// Parse a whole DTA buffer. The format marker is left at 0.
pub fn parse(src: &[u8]) -> Result<Document<'_>, ParseError> {
    let mut cursor = 0;
    let tree = parse_tree(src, &mut cursor)?;
    if !at_end(src, cursor) {
        // parse_tree only stops early on a closing bracket
        return Err(ParseError::UnmatchedCloser {
            expected: None,
            found: src[cursor] as char,
            offset: cursor,
        });
    }
    log::debug!(
        "parsed {} bytes: {} top-level chunks, {} trees",
        src.len(),
        tree.len(),
        tree.node_count()
    );
    Ok(Document::new(0, tree))
}

pub fn parse_str(src: &str) -> Result<Document<'_>, ParseError> {
    parse(src.as_bytes())
}

/// Parse chunks until a closing bracket (left unconsumed) or the end of the text.
pub fn parse_tree<'a>(src: &'a [u8], cursor: &mut usize) -> Result<Tree<'a>, ParseError> {
    parse_tree_at(src, cursor, 0)
}

/// Parse the next chunk, or `None` at a closing bracket or the end of the text.
pub fn parse_chunk<'a>(src: &'a [u8], cursor: &mut usize) -> Result<Option<Chunk<'a>>, ParseError> {
    Ok(parse_lexeme(src, cursor, 0)?.map(|(chunk, _)| chunk))
}

/// `depth` is the nesting level of the tree being filled, 0 at top level.
fn parse_tree_at<'a>(
    src: &'a [u8],
    cursor: &mut usize,
    depth: usize,
) -> Result<Tree<'a>, ParseError> {
    let mut chunks = Vec::new();
    while let Some((chunk, _)) = parse_lexeme(src, cursor, depth)? {
        chunks.push(chunk);
    }
    Ok(Tree::new(chunks))
}

/// Like [`parse_chunk`], also returning the text span a directive would adopt if
/// this chunk were its argument.
fn parse_lexeme<'a>(
    src: &'a [u8],
    cursor: &mut usize,
    depth: usize,
) -> Result<Option<(Chunk<'a>, Range<usize>)>, ParseError> {
    skip_whitespace_and_comments(src, cursor);
    if at_end(src, *cursor) {
        return Ok(None);
    }
    let start = *cursor;
    let lexeme = match src[start] {
        b'\'' => {
            *cursor += 1;
            let span = scan_single_quoted(src, cursor);
            expect_closer(src, cursor, b'\'')?;
            (Chunk::Symbol(Cow::Borrowed(&src[span.clone()])), span)
        }
        b'"' => {
            *cursor += 1;
            let span = scan_double_quoted(src, cursor);
            expect_closer(src, cursor, b'"')?;
            (Chunk::String(Cow::Borrowed(&src[span.clone()])), span)
        }
        b'(' => (parse_nested(src, cursor, Delimiter::Parens, depth)?, start..*cursor),
        b'[' => (parse_nested(src, cursor, Delimiter::Brackets, depth)?, start..*cursor),
        b'{' => (parse_nested(src, cursor, Delimiter::Braces, depth)?, start..*cursor),
        b'$' => {
            *cursor += 1;
            let span = scan_bare_symbol(src, cursor);
            (Chunk::Variable(Cow::Borrowed(&src[span.clone()])), span)
        }
        b'#' => parse_directive(src, cursor, depth)?,
        b')' | b']' | b'}' => return Ok(None),
        _ => {
            let span = scan_bare_symbol(src, cursor);
            (classify_bare(&src[span.clone()]), span)
        }
    };
    log::trace!("{:?} chunk at offset {}", lexeme.0.tag(), start);
    Ok(Some(lexeme))
}

fn parse_nested<'a>(
    src: &'a [u8],
    cursor: &mut usize,
    delim: Delimiter,
    depth: usize,
) -> Result<Chunk<'a>, ParseError> {
    if depth >= MAX_DEPTH {
        return Err(ParseError::NestingTooDeep { offset: *cursor });
    }
    *cursor += 1;
    let tree = parse_tree_at(src, cursor, depth + 1)?;
    expect_closer(src, cursor, delim.close())?;
    Ok(Chunk::SubTree(delim, tree))
}

fn parse_directive<'a>(
    src: &'a [u8],
    cursor: &mut usize,
    depth: usize,
) -> Result<(Chunk<'a>, Range<usize>), ParseError> {
    let offset = *cursor;
    *cursor += 1;
    let word = scan_bare_symbol(src, cursor);
    let keyword = &src[word.clone()];
    let chunk = match keyword {
        b"else" => Chunk::Else,
        b"endif" => Chunk::EndIf,
        b"autorun" => Chunk::AutoRun,
        _ => {
            let kind = DirectiveKind::from_keyword(keyword).ok_or_else(|| {
                ParseError::UnknownDirective {
                    name: String::from_utf8_lossy(keyword).into_owned(),
                    offset,
                }
            })?;
            let arg_offset = *cursor;
            let (arg, span) =
                parse_lexeme(src, cursor, depth)?.ok_or(ParseError::MissingDirectiveArgument {
                    directive: kind.keyword(),
                    offset: arg_offset,
                })?;
            match arg {
                Chunk::SubTree(..)
                | Chunk::Directive(..)
                | Chunk::Else
                | Chunk::EndIf
                | Chunk::AutoRun => {
                    return Err(ParseError::InvalidDirectiveArgument {
                        directive: kind.keyword(),
                        offset: span.start,
                    })
                }
                _ => {}
            }
            Chunk::Directive(kind, Cow::Borrowed(&src[span]))
        }
    };
    Ok((chunk, word))
}

/// Consume `closer` at the cursor.
fn expect_closer(src: &[u8], cursor: &mut usize, closer: u8) -> Result<(), ParseError> {
    if at_end(src, *cursor) {
        return Err(ParseError::UnexpectedEndOfInput {
            expected: closer as char,
            offset: *cursor,
        });
    }
    let found = src[*cursor];
    if found != closer {
        return Err(ParseError::UnmatchedCloser {
            expected: Some(closer as char),
            found: found as char,
            offset: *cursor,
        });
    }
    *cursor += 1;
    Ok(())
}

/// Integer, then float, then `kDataUnhandled`, then plain symbol.
fn classify_bare(text: &[u8]) -> Chunk<'_> {
    if let Some(i) = parse_integer(text) {
        Chunk::Int(i)
    } else if let Some(f) = parse_float(text) {
        Chunk::Float(f)
    } else if text == UNHANDLED_TOKEN {
        Chunk::Unhandled
    } else {
        Chunk::Symbol(Cow::Borrowed(text))
    }
}

fn split_sign(text: &[u8]) -> (bool, &[u8]) {
    match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    }
}

fn is_exponent_marker(c: u8) -> bool {
    c == b'e' || c == b'E'
}

/// Optional sign followed by decimal digits only. Overflow wraps.
pub fn parse_integer(text: &[u8]) -> Option<i32> {
    let (negative, digits) = split_sign(text);
    if digits.is_empty() {
        return None;
    }
    let mut result: i32 = 0;
    for &c in digits {
        if !c.is_ascii_digit() {
            return None;
        }
        result = result.wrapping_mul(10).wrapping_add((c - b'0') as i32);
    }
    Some(if negative { result.wrapping_neg() } else { result })
}

/// `[sign] digits [. digits] [(e|E) integer]`, accumulated digit by digit in `f32`.
///
/// Each fractional digit adds `digit * 10^-k`, with `10^-k` itself built by repeated
/// division; the result therefore differs from a correctly rounded decimal parse for
/// many inputs, and that difference is part of the output format. Either a `.` or an
/// exponent (after at least one digit) is required.
pub fn parse_float(text: &[u8]) -> Option<f32> {
    let (negative, body) = split_sign(text);
    if body.is_empty() {
        return None;
    }

    let mut result = 0f32;
    let mut i = 0;
    while i < body.len() && body[i] != b'.' && !is_exponent_marker(body[i]) {
        let c = body[i];
        if !c.is_ascii_digit() {
            return None;
        }
        result = result * 10.0 + (c - b'0') as f32;
        i += 1;
    }
    let int_digits = i;

    let has_point = i < body.len() && body[i] == b'.';
    if has_point {
        i += 1;
        let mut fraction = 1f32;
        while i < body.len() && !is_exponent_marker(body[i]) {
            let c = body[i];
            if !c.is_ascii_digit() {
                return None;
            }
            fraction /= 10.0;
            result += fraction * (c - b'0') as f32;
            i += 1;
        }
    }

    if i < body.len() {
        if !has_point && int_digits == 0 {
            return None;
        }
        let exponent = parse_integer(&body[i + 1..])?;
        result = (result as f64 * 10f64.powi(exponent)) as f32;
    } else if !has_point {
        return None;
    }

    Some(if negative { -result } else { result })
}
