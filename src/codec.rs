//! DTB encoder and decoder.
//!
//! Layout, little-endian throughout:
//!
//! | Item | Encoding |
//! |------|----------|
//! | document | `byte_zero: u8`, top-level tree |
//! | tree | `chunk_count: u16`, `node_id: u32`, chunks |
//! | chunk | `tag: u32`, payload |
//!
//! Payloads: `Int` is an `i32`, `Float` an IEEE-754 `f32`; symbol-like chunks and
//! argument-taking directives are `len: u32` plus raw bytes; `String` is the same
//! but with every `\q` collapsed to `"` first; nested trees follow their tag
//! directly; `Unhandled`, `Else`, `EndIf` and `AutoRun` carry a zero `u32`.
//!
//! The decoder refuses trees nested deeper than [`MAX_DEPTH`].
//!
//! Escape resolution is one-way: decoded `String` chunks hold the resolved bytes and
//! never contain a reconstructed `\q`.

use crate::chunk::{Chunk, Delimiter, DirectiveKind, Document, Tag, Tree, MAX_DEPTH};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::io::{self, Cursor, Read, Write};

/// Smallest encoded chunk: tag plus a four-byte payload.
const MIN_CHUNK_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] io::Error),
    #[error("Unknown tag 0x{tag:02x} at offset {offset}")]
    UnknownTag { tag: u32, offset: u64 },
    #[error("Tree has {0} chunks; at most 65535 fit the chunk count")]
    TooManyChunks(usize),
    #[error("Text of {0} bytes does not fit a u32 length")]
    TextTooLong(usize),
    #[error("Trailing bytes: {remaining} after document at offset {offset}")]
    TrailingBytes { offset: u64, remaining: usize },
    #[error("Nesting deeper than {} levels at offset {offset}", MAX_DEPTH)]
    NestingTooDeep { offset: u64 },
}

/// Encode a document into a fresh buffer.
pub fn encode(doc: &Document) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode_into(&mut out, doc)?;
    log::debug!("encoded {} bytes of DTB", out.len());
    Ok(out)
}

/// Encode a document into any writer.
pub fn encode_into<W: Write>(w: &mut W, doc: &Document) -> Result<(), CodecError> {
    w.write_u8(doc.byte_zero)?;
    write_tree(w, &doc.tree)
}

fn write_tree<W: Write>(w: &mut W, tree: &Tree) -> Result<(), CodecError> {
    let count = u16::try_from(tree.chunks.len())
        .map_err(|_| CodecError::TooManyChunks(tree.chunks.len()))?;
    w.write_u16::<LittleEndian>(count)?;
    w.write_u32::<LittleEndian>(tree.node_id)?;
    for chunk in &tree.chunks {
        write_chunk(w, chunk)?;
    }
    Ok(())
}

fn write_chunk<W: Write>(w: &mut W, chunk: &Chunk) -> Result<(), CodecError> {
    w.write_u32::<LittleEndian>(chunk.tag().code())?;
    match chunk {
        Chunk::Int(i) => w.write_i32::<LittleEndian>(*i)?,
        Chunk::Float(f) => w.write_f32::<LittleEndian>(*f)?,
        Chunk::Symbol(text) | Chunk::Variable(text) | Chunk::Directive(_, text) => {
            write_text(w, text)?
        }
        Chunk::String(text) => write_text(w, &resolve_string_escapes(text))?,
        Chunk::SubTree(_, tree) => write_tree(w, tree)?,
        Chunk::Unhandled | Chunk::Else | Chunk::EndIf | Chunk::AutoRun => {
            w.write_u32::<LittleEndian>(0)?
        }
    }
    Ok(())
}

fn write_text<W: Write>(w: &mut W, text: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(text.len()).map_err(|_| CodecError::TextTooLong(text.len()))?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(text)?;
    Ok(())
}

/// Collapse every two-byte `\q` into a single `"`. A trailing lone `\` is kept.
pub fn resolve_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && raw.get(i + 1) == Some(&b'q') {
            out.push(b'"');
            i += 2;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

/// Decode a complete DTB buffer. The whole buffer must be consumed.
pub fn decode(bytes: &[u8]) -> Result<Document<'static>, CodecError> {
    let mut r = Cursor::new(bytes);
    let byte_zero = r.read_u8()?;
    let tree = read_tree(&mut r, 0)?;
    let consumed = r.position();
    if (consumed as usize) < bytes.len() {
        return Err(CodecError::TrailingBytes {
            offset: consumed,
            remaining: bytes.len() - consumed as usize,
        });
    }
    log::debug!("decoded {} bytes of DTB: {} trees", bytes.len(), tree.node_count());
    Ok(Document::new(byte_zero, tree))
}

fn remaining(r: &Cursor<&[u8]>) -> usize {
    r.get_ref().len().saturating_sub(r.position() as usize)
}

fn read_tree(r: &mut Cursor<&[u8]>, depth: usize) -> Result<Tree<'static>, CodecError> {
    let count = r.read_u16::<LittleEndian>()? as usize;
    let node_id = r.read_u32::<LittleEndian>()?;
    let mut chunks = Vec::with_capacity(count.min(remaining(r) / MIN_CHUNK_LEN));
    for _ in 0..count {
        chunks.push(read_chunk(r, depth)?);
    }
    Ok(Tree { node_id, chunks })
}

/// `depth` is the nesting level of the tree this chunk belongs to.
fn read_chunk(r: &mut Cursor<&[u8]>, depth: usize) -> Result<Chunk<'static>, CodecError> {
    let offset = r.position();
    let code = r.read_u32::<LittleEndian>()?;
    let tag = Tag::from_u32(code).ok_or(CodecError::UnknownTag { tag: code, offset })?;
    Ok(match tag {
        Tag::Int => Chunk::Int(r.read_i32::<LittleEndian>()?),
        Tag::Float => Chunk::Float(r.read_f32::<LittleEndian>()?),
        Tag::Symbol => Chunk::Symbol(read_text(r)?),
        Tag::Variable => Chunk::Variable(read_text(r)?),
        Tag::String => Chunk::String(read_text(r)?),
        Tag::IfDef => Chunk::Directive(DirectiveKind::IfDef, read_text(r)?),
        Tag::IfNDef => Chunk::Directive(DirectiveKind::IfNDef, read_text(r)?),
        Tag::Define => Chunk::Directive(DirectiveKind::Define, read_text(r)?),
        Tag::Include => Chunk::Directive(DirectiveKind::Include, read_text(r)?),
        Tag::Merge => Chunk::Directive(DirectiveKind::Merge, read_text(r)?),
        Tag::Undef => Chunk::Directive(DirectiveKind::Undef, read_text(r)?),
        Tag::Parens | Tag::Braces | Tag::Brackets => {
            if depth >= MAX_DEPTH {
                return Err(CodecError::NestingTooDeep { offset });
            }
            let delim = match tag {
                Tag::Parens => Delimiter::Parens,
                Tag::Braces => Delimiter::Braces,
                _ => Delimiter::Brackets,
            };
            Chunk::SubTree(delim, read_tree(r, depth + 1)?)
        }
        Tag::Unhandled | Tag::Else | Tag::EndIf | Tag::AutoRun => {
            // placeholder, value ignored
            r.read_u32::<LittleEndian>()?;
            match tag {
                Tag::Unhandled => Chunk::Unhandled,
                Tag::Else => Chunk::Else,
                Tag::EndIf => Chunk::EndIf,
                _ => Chunk::AutoRun,
            }
        }
    })
}

fn read_text(r: &mut Cursor<&[u8]>) -> Result<Cow<'static, [u8]>, CodecError> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    if len > remaining(r) {
        return Err(CodecError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("text of {} bytes runs past end of input", len),
        )));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(Cow::Owned(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn string_escape_resolution() {
        let doc = Document::new(0, Tree::new(vec![Chunk::string(r"he\qllo")]));
        let bytes = encode(&doc).expect("encode");
        // byte_zero, count, node_id, tag
        let payload = &bytes[1 + 2 + 4 + 4..];
        assert_eq!(&payload[..4], &6u32.to_le_bytes());
        assert_eq!(&payload[4..], b"he\"llo");
    }

    #[test]
    fn escape_cannot_start_at_last_byte() {
        assert_eq!(resolve_string_escapes(br"ab\"), br"ab\".to_vec());
        assert_eq!(resolve_string_escapes(br"\q\q"), b"\"\"".to_vec());
        assert_eq!(resolve_string_escapes(br"\\q"), br#"\""#.to_vec());
    }

    #[test]
    fn exact_layout_of_small_document() {
        let mut doc = parse_str("1 (x) #else").expect("parse");
        doc.byte_zero = 1;
        doc.renumber_from(1);
        let bytes = encode(&doc).expect("encode");
        let mut expected = vec![0x01];
        expected.extend_from_slice(&3u16.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        // Int 1
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        // Parens (x), node 2
        expected.extend_from_slice(&0x10u32.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&0x05u32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.push(b'x');
        // Else with placeholder
        expected.extend_from_slice(&0x08u32.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn float_is_little_endian() {
        let doc = Document::new(0, Tree::new(vec![Chunk::Float(1.5)]));
        let bytes = encode(&doc).expect("encode");
        assert_eq!(&bytes[11..], &1.5f32.to_le_bytes());
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x03u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        match decode(&bytes) {
            Err(CodecError::UnknownTag { tag: 3, offset: 7 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_rejects_truncated_and_trailing() {
        let doc = parse_str("(a 'b c' 2.5)").expect("parse");
        let bytes = encode(&doc).expect("encode");
        for cut in [0, 1, 5, bytes.len() - 1] {
            assert!(matches!(decode(&bytes[..cut]), Err(CodecError::Io(_))), "cut {}", cut);
        }
        let mut extra = bytes.clone();
        extra.push(0);
        assert!(matches!(
            decode(&extra),
            Err(CodecError::TrailingBytes { remaining: 1, .. })
        ));
    }

    #[test]
    fn oversized_text_length_is_an_error() {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0x05u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(CodecError::Io(_))));
    }

    /// `levels` Parens headers, each holding the next, around an empty tree.
    fn nested_parens(levels: usize) -> Vec<u8> {
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        for i in 0..levels {
            bytes.extend_from_slice(&0x10u32.to_le_bytes());
            let count: u16 = if i + 1 == levels { 0 } else { 1 };
            bytes.extend_from_slice(&count.to_le_bytes());
            bytes.extend_from_slice(&0u32.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn decode_nesting_limit() {
        let doc = decode(&nested_parens(MAX_DEPTH)).expect("decode");
        assert_eq!(doc.tree.node_count(), MAX_DEPTH + 1);

        // header of 7 bytes, then 10 bytes per level
        match decode(&nested_parens(MAX_DEPTH + 1)) {
            Err(CodecError::NestingTooDeep { offset }) => {
                assert_eq!(offset, 7 + 10 * MAX_DEPTH as u64)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn hostile_nesting_is_an_error() {
        let bytes = nested_parens(100_000);
        assert!(matches!(decode(&bytes), Err(CodecError::NestingTooDeep { .. })));
    }

    #[test]
    fn error_messages() {
        let e = CodecError::TrailingBytes {
            offset: 9,
            remaining: 2,
        };
        assert_eq!(e.to_string(), "Trailing bytes: 2 after document at offset 9");
        let e = CodecError::NestingTooDeep { offset: 4 };
        assert_eq!(e.to_string(), "Nesting deeper than 128 levels at offset 4");
    }

    #[test]
    fn too_many_chunks() {
        let tree = Tree::new(vec![Chunk::Int(0); u16::MAX as usize + 1]);
        let doc = Document::new(0, tree);
        assert!(matches!(encode(&doc), Err(CodecError::TooManyChunks(65536))));
    }
}
