//! Native serializer: a naive field-by-field dump of the tree model for local
//! persistence. It is not DTB and not portable between hosts.
//!
//! - Host byte order for every number, `usize`-wide text lengths.
//! - `String` text is stored raw; `\q` stays unresolved.
//! - No chunk counts: a tree's chunks run until its byte stream is exhausted. The
//!   top-level tree ends with the input; a nested tree is stored as a `usize` byte
//!   length followed by its bytes, which bounds the stream its chunks are read from.
//! - Tag-only chunks (`Unhandled`, `Else`, `EndIf`, `AutoRun`) have no payload.
//! - Reading stops with [`CodecError::NestingTooDeep`] past [`MAX_DEPTH`] levels.

use crate::chunk::{Chunk, Delimiter, DirectiveKind, Document, Tag, Tree, MAX_DEPTH};
use crate::codec::CodecError;
use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::io::{self, Cursor, Read, Write};
use std::mem::size_of;

pub fn serialize<W: Write>(doc: &Document, w: &mut W) -> Result<(), CodecError> {
    w.write_u8(doc.byte_zero)?;
    write_tree(w, &doc.tree)
}

pub fn to_bytes(doc: &Document) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    serialize(doc, &mut out)?;
    Ok(out)
}

/// Reads `r` to the end and decodes it.
pub fn deserialize<R: Read>(r: &mut R) -> Result<Document<'static>, CodecError> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    from_bytes(&bytes)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Document<'static>, CodecError> {
    let mut r = Cursor::new(bytes);
    let byte_zero = r.read_u8()?;
    let tree = read_tree(&mut r, 0, 0)?;
    Ok(Document::new(byte_zero, tree))
}

fn write_tree<W: Write>(w: &mut W, tree: &Tree) -> Result<(), CodecError> {
    w.write_u32::<NativeEndian>(tree.node_id)?;
    for chunk in &tree.chunks {
        write_chunk(w, chunk)?;
    }
    Ok(())
}

fn write_chunk<W: Write>(w: &mut W, chunk: &Chunk) -> Result<(), CodecError> {
    w.write_u32::<NativeEndian>(chunk.tag().code())?;
    match chunk {
        Chunk::Int(i) => w.write_i32::<NativeEndian>(*i)?,
        Chunk::Float(f) => w.write_f32::<NativeEndian>(*f)?,
        Chunk::Symbol(text)
        | Chunk::Variable(text)
        | Chunk::String(text)
        | Chunk::Directive(_, text) => write_sized(w, text)?,
        Chunk::SubTree(_, tree) => {
            let mut nested = Vec::new();
            write_tree(&mut nested, tree)?;
            write_sized(w, &nested)?;
        }
        Chunk::Unhandled | Chunk::Else | Chunk::EndIf | Chunk::AutoRun => {}
    }
    Ok(())
}

fn write_sized<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    w.write_all(&bytes.len().to_ne_bytes())?;
    w.write_all(bytes)
}

fn read_sized<'b>(r: &mut Cursor<&'b [u8]>) -> Result<&'b [u8], CodecError> {
    let mut len = [0u8; size_of::<usize>()];
    r.read_exact(&mut len)?;
    let len = usize::from_ne_bytes(len);
    let data: &'b [u8] = *r.get_ref();
    let start = r.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("field of {} bytes runs past end of input", len),
            )
        })?;
    r.set_position(end as u64);
    Ok(&data[start..end])
}

fn read_text(r: &mut Cursor<&[u8]>) -> Result<Cow<'static, [u8]>, CodecError> {
    Ok(Cow::Owned(read_sized(r)?.to_vec()))
}

/// `base` is the offset of `r`'s first byte within the whole input, so errors
/// from a nested sub-stream still report absolute offsets.
fn read_tree(
    r: &mut Cursor<&[u8]>,
    base: u64,
    depth: usize,
) -> Result<Tree<'static>, CodecError> {
    let node_id = r.read_u32::<NativeEndian>()?;
    let mut chunks = Vec::new();
    while (r.position() as usize) < r.get_ref().len() {
        chunks.push(read_chunk(r, base, depth)?);
    }
    Ok(Tree { node_id, chunks })
}

fn read_chunk(
    r: &mut Cursor<&[u8]>,
    base: u64,
    depth: usize,
) -> Result<Chunk<'static>, CodecError> {
    let offset = base + r.position();
    let code = r.read_u32::<NativeEndian>()?;
    let tag = Tag::from_u32(code).ok_or(CodecError::UnknownTag { tag: code, offset })?;
    Ok(match tag {
        Tag::Int => Chunk::Int(r.read_i32::<NativeEndian>()?),
        Tag::Float => Chunk::Float(r.read_f32::<NativeEndian>()?),
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
            let body = read_sized(r)?;
            let nested_base = base + r.position() - body.len() as u64;
            Chunk::SubTree(delim, read_tree(&mut Cursor::new(body), nested_base, depth + 1)?)
        }
        Tag::Unhandled => Chunk::Unhandled,
        Tag::Else => Chunk::Else,
        Tag::EndIf => Chunk::EndIf,
        Tag::AutoRun => Chunk::AutoRun,
    })
}
